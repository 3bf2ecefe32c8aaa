//! Speech collaborator traits.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::{AudioUnit, Language, TranscriptionResult};

/// Audio bytes as they arrive from the synthesis provider.
pub type AudioStream = BoxStream<'static, Result<Bytes>>;

/// Text-to-speech provider.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Start synthesizing `text`; the returned stream yields audio bytes.
    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioStream>;
}

/// Playback surface for synthesized audio.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play one unit to completion, or return early once `cancel` fires.
    async fn play(&self, unit: AudioUnit, cancel: &CancellationToken) -> Result<()>;
}

/// Speech-to-text provider.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: Bytes, language: Language) -> Result<TranscriptionResult>;
}
