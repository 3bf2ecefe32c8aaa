//! Core traits for Porter.
//!
//! - `llm`: the language-model gateway (`LlmClient`)
//! - `speech`: synthesis, playback and transcription collaborators

mod llm;
mod speech;

pub use llm::*;
pub use speech::*;
