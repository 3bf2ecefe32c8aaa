//! Request/response types and error mapping for the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use porter_core::{
    AgentContext, AudioUnit, ConversationMessage, DashboardSnapshot, Error, PipelineResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

// =============================================================================
// Chat
// =============================================================================

/// Body of every chat endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    pub language: Option<String>,
    pub user_role: Option<String>,
    pub dashboard_data: Option<DashboardSnapshot>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationMessage>,
    pub screenshot_url: Option<String>,
}

impl ChatRequest {
    /// Validate the request into a pipeline context, falling back to the
    /// given language and role when the caller sent none.
    pub fn into_context(self, default_language: &str, default_role: &str) -> porter_core::Result<AgentContext> {
        let mut ctx = AgentContext::from_parts(
            &self.message,
            self.language.as_deref().unwrap_or(default_language),
            self.user_role.as_deref().unwrap_or(default_role),
            self.screenshot_url.as_deref(),
        )?;
        if let Some(dashboard) = self.dashboard_data {
            ctx = ctx.with_dashboard(dashboard);
        }
        Ok(ctx.with_history(self.conversation_history))
    }
}

/// Multi-stage answer, flattened next to the success flag.
#[derive(Debug, Serialize)]
pub struct DetailedChatResponse {
    pub success: bool,
    #[serde(flatten)]
    pub response: PipelineResponse,
}

/// One NDJSON line of a streamed answer.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Text {
        data: String,
    },
    Audio {
        seq: u64,
        sentence: String,
        #[serde(rename = "mimeType")]
        mime_type: &'static str,
        /// Base64-encoded audio bytes.
        data: String,
    },
    Error {
        data: String,
    },
    Done,
}

impl StreamEvent {
    pub fn text(data: impl Into<String>) -> Self {
        StreamEvent::Text { data: data.into() }
    }

    pub fn error(data: impl Into<String>) -> Self {
        StreamEvent::Error { data: data.into() }
    }

    pub fn audio(unit: &AudioUnit) -> Self {
        StreamEvent::Audio {
            seq: unit.seq,
            sentence: unit.text.clone(),
            mime_type: unit.format.mime_type(),
            data: base64::engine::general_purpose::STANDARD.encode(&unit.audio),
        }
    }

    /// Serialized line including the trailing newline.
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error"}"#.to_string());
        line.push('\n');
        line
    }
}

// =============================================================================
// Voice
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: String,
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeParams {
    pub language: Option<String>,
}

// =============================================================================
// Errors
// =============================================================================

/// Failure of one API call, rendered as `{success: false, error, details?}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }

    /// Map a core error: caller mistakes become 400 with their own message,
    /// everything else a 500 with a generic one.
    pub fn from_error(err: &Error, generic: &str, expose_details: bool) -> Self {
        if err.is_client_error() {
            return Self::bad_request(client_message(err));
        }
        tracing::error!(error = %err, "Request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: generic.to_string(),
            details: expose_details.then(|| err.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn client_message(err: &Error) -> String {
    match err {
        Error::InvalidRequest(msg) => msg.clone(),
        other => other.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.message,
        });
        if let Some(details) = self.details {
            body["details"] = json!(details);
        }
        (self.status, Json(body)).into_response()
    }
}
