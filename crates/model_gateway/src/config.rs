use porter_core::config::ModelGatewayConfig;
use porter_core::{Error, Result};
use secrecy::Secret;
use std::time::Duration;

/// Connection settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<Secret<String>>,
    /// Deadline for the whole buffered call, and for each gap between
    /// streamed chunks.
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validated, slash-trimmed base URL.
    pub(crate) fn endpoint_base(&self) -> Result<String> {
        validate_base_url(&self.base_url)?;
        Ok(self.base_url.trim_end_matches('/').to_string())
    }
}

impl From<&ModelGatewayConfig> for OpenAiConfig {
    fn from(cfg: &ModelGatewayConfig) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: Duration::from_millis(cfg.request_timeout_ms),
        }
    }
}

/// HTTPS everywhere except loopback hosts, where local model servers live.
fn validate_base_url(base_url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(base_url)
        .map_err(|e| Error::config(format!("Invalid base_url '{}': {}", base_url, e)))?;
    let host = parsed.host_str().unwrap_or("");

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1") => {
            tracing::warn!(base_url, "Using unencrypted HTTP for a local model server");
            Ok(())
        }
        "http" => Err(Error::config(format!(
            "HTTP is only permitted for localhost (base_url: '{}')",
            base_url
        ))),
        scheme => Err(Error::config(format!(
            "Unsupported URL scheme '{}' in base_url '{}'",
            scheme, base_url
        ))),
    }
}
