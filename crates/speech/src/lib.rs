//! Speech layer for Porter.
//!
//! Turns a live token stream into spoken audio: sentence segmentation, a
//! bounded-concurrency synthesis queue with strictly ordered playback, and
//! the provider clients for synthesis and transcription.

pub mod elevenlabs;
pub mod queue;
pub mod reorder;
pub mod segmenter;
pub mod sink;
pub mod voices;
pub mod whisper;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use queue::{SpeechQueue, SpeechQueueConfig};
pub use reorder::ReorderBuffer;
pub use segmenter::SentenceSegmenter;
pub use sink::ChannelSink;
pub use voices::{Voice, VoiceTable};
pub use whisper::{LanguageDetector, WhisperTranscriber};
