//! Error types for Porter.

use serde::Serialize;
use thiserror::Error;

use crate::types::StageName;

/// Result type alias using Porter's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for language-model gateway calls.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Why a gateway call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorReason {
    /// Network or provider failure.
    Transport,
    /// The model answered, but not with the structured output that was asked for.
    InvalidOutput,
    /// The provider did not answer within the configured deadline.
    Timeout,
}

impl std::fmt::Display for GatewayErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Transport => "transport",
            Self::InvalidOutput => "invalid_output",
            Self::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// Error surfaced by an [`LlmClient`](crate::traits::LlmClient).
///
/// The gateway never retries; callers decide what to do based on `reason`.
#[derive(Error, Debug, Clone)]
#[error("Model gateway {reason} error: {message}")]
pub struct GatewayError {
    /// Reason code.
    pub reason: GatewayErrorReason,
    /// Human readable detail.
    pub message: String,
    /// HTTP status returned by the provider, when there was one.
    pub status: Option<u16>,
}

impl GatewayError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self {
            reason: GatewayErrorReason::Transport,
            message: msg.into(),
            status: None,
        }
    }

    /// Create an invalid-output error.
    pub fn invalid_output(msg: impl Into<String>) -> Self {
        Self {
            reason: GatewayErrorReason::InvalidOutput,
            message: msg.into(),
            status: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self {
            reason: GatewayErrorReason::Timeout,
            message: msg.into(),
            status: None,
        }
    }

    /// Attach the provider's HTTP status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Transport-level failures (including timeouts) abort a pipeline run.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.reason,
            GatewayErrorReason::Transport | GatewayErrorReason::Timeout
        )
    }
}

/// Core error type for Porter.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Request Errors
    // =========================================================================
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported user role: {0}")]
    UnknownRole(String),

    #[error("Unsupported language: {0}")]
    UnknownLanguage(String),

    // =========================================================================
    // Model Gateway & Pipeline Errors
    // =========================================================================
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Pipeline aborted at {stage} stage: {source}")]
    PipelineAborted {
        stage: StageName,
        #[source]
        source: GatewayError,
    },

    #[error("Template rendering error: {0}")]
    Template(String),

    // =========================================================================
    // Speech Errors
    // =========================================================================
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Audio playback failed: {0}")]
    Playback(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a synthesis error.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    /// Create a playback error.
    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback(msg.into())
    }

    /// Create a transcription error.
    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller sent something we refuse to process.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_) | Self::UnknownRole(_) | Self::UnknownLanguage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_counts_as_transport() {
        assert!(GatewayError::timeout("slow").is_transport());
        assert!(GatewayError::transport("reset").is_transport());
        assert!(!GatewayError::invalid_output("not json").is_transport());
    }

    #[test]
    fn test_reason_codes_serialize_snake_case() {
        let json = serde_json::to_string(&GatewayErrorReason::InvalidOutput).unwrap();
        assert_eq!(json, "\"invalid_output\"");
        assert_eq!(GatewayErrorReason::Timeout.to_string(), "timeout");
    }

    #[test]
    fn test_pipeline_abort_message_names_stage() {
        let err = Error::PipelineAborted {
            stage: StageName::Analyzer,
            source: GatewayError::transport("connection reset").with_status(502),
        };
        let msg = err.to_string();
        assert!(msg.contains("analyzer"));
        assert!(msg.contains("connection reset"));
    }
}
