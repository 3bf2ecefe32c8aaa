//! OpenAI-compatible chat-completions client.
//!
//! Implements [`LlmClient`] with one HTTP call per invocation: buffered
//! completions (optionally in JSON mode) and SSE token streaming. The client
//! never retries.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use porter_core::{
    traits::{CompletionRequest, LlmClient, LlmResponse, LlmUsage, ResponseFormat, TextStream},
    GatewayError, GatewayResult, Result,
};

use crate::config::OpenAiConfig;
use crate::sse::{SseDecoder, SseEvent};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatSpec>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormatSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

// =============================================================================
// Client
// =============================================================================

/// Chat-completions client for OpenAI and compatible servers.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Build a client. Fails on an unusable base URL.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let base_url = config.endpoint_base()?;
        let http = Client::builder()
            .build()
            .map_err(|e| porter_core::Error::config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest, stream: bool) -> ChatRequest<'a> {
        let user = &request.user_content;
        let content = match &user.image {
            Some(image) => MessageContent::Parts(vec![
                ContentPart::Text { text: &user.text },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.as_url(),
                    },
                },
            ]),
            None => MessageContent::Text(&user.text),
        };

        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(&request.system_prompt),
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
            response_format: match request.options.response_format {
                ResponseFormat::Json => Some(ResponseFormatSpec {
                    kind: "json_object",
                }),
                ResponseFormat::Text => None,
            },
            stream,
        }
    }

    /// Send the request and turn non-2xx answers into transport errors.
    async fn send(&self, body: &ChatRequest<'_>) -> GatewayResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.http.post(&url).json(body);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let resp = builder.send().await.map_err(classify_reqwest)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        tracing::error!(status = %status, model = %self.config.model, "Provider API error");
        Err(GatewayError::transport(format!(
            "provider returned {}: {}",
            status,
            truncate(&text, 500)
        ))
        .with_status(status.as_u16()))
    }

    async fn complete_inner(&self, request: &CompletionRequest) -> GatewayResult<LlmResponse> {
        let body = self.body(request, false);
        let resp = self.send(&body).await?;
        let text = resp.text().await.map_err(classify_reqwest)?;

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            GatewayError::transport(format!("malformed provider response: {}", e))
        })?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::invalid_output("no choices in response"))?;
        let content = choice
            .message
            .content
            .ok_or_else(|| GatewayError::invalid_output("response has no content"))?;
        let usage = parsed.usage.map_or_else(LlmUsage::default, |u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(LlmResponse {
            content,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> GatewayResult<LlmResponse> {
        tracing::debug!(
            model = %self.config.model,
            max_tokens = request.options.max_tokens,
            json = request.options.response_format == ResponseFormat::Json,
            image = request.user_content.image.is_some(),
            "Calling LLM"
        );

        let timeout = self.config.timeout;
        let response = tokio::time::timeout(timeout, self.complete_inner(request))
            .await
            .map_err(|_| GatewayError::timeout(format!("no response within {:?}", timeout)))??;

        tracing::debug!(
            completion_tokens = response.usage.completion_tokens,
            finish_reason = %response.finish_reason,
            "LLM call complete"
        );
        Ok(response)
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> GatewayResult<TextStream> {
        tracing::debug!(
            model = %self.config.model,
            max_tokens = request.options.max_tokens,
            image = request.user_content.image.is_some(),
            "Calling LLM (streaming)"
        );

        let timeout = self.config.timeout;
        let body = self.body(request, true);
        let resp = tokio::time::timeout(timeout, self.send(&body))
            .await
            .map_err(|_| GatewayError::timeout(format!("no response within {:?}", timeout)))??;

        Ok(sse_text_stream(resp.bytes_stream().boxed(), timeout))
    }
}

// =============================================================================
// Streaming
// =============================================================================

struct StreamState {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    finished: bool,
    idle_timeout: Duration,
}

/// Turn an SSE body into text fragments. Every gap between chunks is bounded
/// by `idle_timeout`.
fn sse_text_stream(
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    idle_timeout: Duration,
) -> TextStream {
    let state = StreamState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
        idle_timeout,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(text) = st.pending.pop_front() {
                return Some((Ok(text), st));
            }
            if st.finished {
                return None;
            }

            let next = match tokio::time::timeout(st.idle_timeout, st.body.next()).await {
                Ok(next) => next,
                Err(_) => {
                    st.finished = true;
                    return Some((Err(GatewayError::timeout("stream stalled")), st));
                }
            };

            let events = match next {
                Some(Ok(chunk)) => st.decoder.push(&chunk),
                Some(Err(e)) => Err(classify_reqwest(e)),
                None => {
                    st.finished = true;
                    st.decoder.finish().map(|e| e.into_iter().collect())
                }
            };

            match events {
                Ok(events) => {
                    for event in events {
                        match event {
                            SseEvent::Delta(text) => st.pending.push_back(text),
                            SseEvent::Done => st.finished = true,
                        }
                    }
                }
                Err(e) => {
                    st.finished = true;
                    st.pending.clear();
                    return Some((Err(e), st));
                }
            }
        }
    })
    .boxed()
}

fn classify_reqwest(err: reqwest::Error) -> GatewayError {
    let gateway_err = if err.is_timeout() {
        GatewayError::timeout(err.to_string())
    } else {
        GatewayError::transport(err.to_string())
    };
    match err.status() {
        Some(status) => gateway_err.with_status(status.as_u16()),
        None => gateway_err,
    }
}

/// Truncate on a char boundary.
fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_core::traits::{CompletionOptions, UserContent};
    use porter_core::ImageRef;

    fn client() -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig::new("https://api.openai.com/v1", "gpt-4o")).unwrap()
    }

    #[test]
    fn test_body_with_image_uses_content_parts() {
        let client = client();
        let request = CompletionRequest {
            system_prompt: "sys".into(),
            user_content: UserContent::text("look")
                .with_image(Some(ImageRef::Url("https://example.com/a.png".into()))),
            options: CompletionOptions {
                max_tokens: 1500,
                temperature: 0.7,
                response_format: ResponseFormat::Json,
            },
        };
        let body = serde_json::to_value(client.body(&request, false)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["content"], "sys");
        assert_eq!(body["messages"][1]["content"][0]["type"], "text");
        assert_eq!(
            body["messages"][1]["content"][1]["image_url"]["url"],
            "https://example.com/a.png"
        );
    }

    #[test]
    fn test_text_body_is_plain_string() {
        let client = client();
        let request = CompletionRequest {
            system_prompt: "sys".into(),
            user_content: UserContent::text("hello"),
            options: CompletionOptions::default(),
        };
        let body = serde_json::to_value(client.body(&request, true)).unwrap();
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["stream"], true);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
