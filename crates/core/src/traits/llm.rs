//! Language-model gateway traits.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};
use crate::types::ImageRef;

/// Lazy sequence of incremental text fragments.
pub type TextStream = BoxStream<'static, GatewayResult<String>>;

/// User turn: text plus at most one image.
#[derive(Debug, Clone)]
pub struct UserContent {
    pub text: String,
    pub image: Option<ImageRef>,
}

impl UserContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Option<ImageRef>) -> Self {
        self.image = image;
        self
    }
}

/// Shape of the output the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    /// A single JSON object.
    Json,
}

/// Sampling and formatting options for one call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1200,
            temperature: 0.7,
            response_format: ResponseFormat::Text,
        }
    }
}

/// A single gateway call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_content: UserContent,
    pub options: CompletionOptions,
}

/// Buffered response from an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated content.
    pub content: String,
    /// Finish reason.
    pub finish_reason: String,
    /// Token usage.
    pub usage: LlmUsage,
}

/// Token usage from LLM call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// LLM client interface.
///
/// Implementations perform exactly one provider call per method invocation
/// and never retry.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a buffered completion.
    async fn complete(&self, request: &CompletionRequest) -> GatewayResult<LlmResponse>;

    /// Generate a completion as a stream of text fragments.
    async fn complete_stream(&self, request: &CompletionRequest) -> GatewayResult<TextStream>;

    /// Generate a completion that must be a JSON object.
    ///
    /// Non-JSON output is reported as `invalid_output`.
    async fn complete_json(&self, request: &CompletionRequest) -> GatewayResult<Value> {
        let mut request = request.clone();
        request.options.response_format = ResponseFormat::Json;
        let response = self.complete(&request).await?;
        extract_json(&response.content).ok_or_else(|| {
            GatewayError::invalid_output(format!(
                "expected a JSON object, got {} chars of text",
                response.content.len()
            ))
        })
    }
}

/// Pull a JSON object out of model output, tolerating markdown fences and
/// prose around the object.
pub fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(unfenced) {
        return Some(value);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&unfenced[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}
