//! ElevenLabs text-to-speech client.
//!
//! Calls the streaming endpoint and hands the response body to the caller
//! chunk by chunk, so playback can start before the whole file is down.

use async_trait::async_trait;
use futures::StreamExt;
use porter_core::config::{SpeechConfig, VoiceSettings};
use porter_core::traits::{AudioStream, SpeechSynthesizer};
use porter_core::{Error, Language, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;

use crate::voices::VoiceTable;

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

/// Streaming synthesizer backed by the ElevenLabs API.
pub struct ElevenLabsSynthesizer {
    http: Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    model_id: String,
    voice_settings: VoiceSettings,
    voices: VoiceTable,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        reqwest::Url::parse(&config.synthesis_base_url).map_err(|e| {
            Error::config(format!(
                "Invalid synthesis_base_url '{}': {}",
                config.synthesis_base_url, e
            ))
        })?;
        let http = Client::builder()
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.synthesis_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model_id: config.model_id.clone(),
            voice_settings: config.voice_settings,
            voices: VoiceTable::with_overrides(&config.voices),
        })
    }

    pub fn voices(&self) -> &VoiceTable {
        &self.voices
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioStream> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::config("ELEVENLABS_API_KEY not set for speech synthesis"))?;
        let voice = self.voices.voice_for(language);
        let url = format!("{}/text-to-speech/{}/stream", self.base_url, voice.voice_id);

        tracing::debug!(
            language = %language,
            voice = %voice.name,
            chars = text.chars().count(),
            "Requesting speech synthesis"
        );

        let resp = self
            .http
            .post(&url)
            .header("xi-api-key", api_key.expose_secret())
            .json(&SynthesisRequest {
                text,
                model_id: &self.model_id,
                voice_settings: &self.voice_settings,
            })
            .send()
            .await
            .map_err(|e| Error::synthesis(format!("request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::synthesis(format!(
                "provider returned {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| Error::synthesis(format!("audio stream broke: {}", e))));
        Ok(Box::pin(stream))
    }
}
