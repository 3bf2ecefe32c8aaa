use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{Error, Result};

// =============================================================================
// Closed enumerations
// =============================================================================

/// Audience tier the answer is tailored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Executive leadership.
    TopManagement,
    /// Operational management.
    MiddleManagement,
    /// Operational staff and ground personnel.
    FrontlineOperations,
}

impl UserRole {
    /// All roles, in seniority order.
    pub const ALL: [UserRole; 3] = [
        UserRole::TopManagement,
        UserRole::MiddleManagement,
        UserRole::FrontlineOperations,
    ];

    /// Wire identifier (`top_management`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::TopManagement => "top_management",
            UserRole::MiddleManagement => "middle_management",
            UserRole::FrontlineOperations => "frontline_operations",
        }
    }
}

impl FromStr for UserRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text direction of a language's script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    Ltr,
    Rtl,
}

/// Supported response languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh-CN")]
    SimplifiedChinese,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "ar")]
    Arabic,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "hi")]
    Hindi,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::SimplifiedChinese,
        Language::Spanish,
        Language::Arabic,
        Language::French,
        Language::Hindi,
    ];

    /// BCP-47 style code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::SimplifiedChinese => "zh-CN",
            Language::Spanish => "es",
            Language::Arabic => "ar",
            Language::French => "fr",
            Language::Hindi => "hi",
        }
    }

    /// English name, used inside prompts.
    pub fn english_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::SimplifiedChinese => "Simplified Chinese",
            Language::Spanish => "Spanish",
            Language::Arabic => "Arabic",
            Language::French => "French",
            Language::Hindi => "Hindi",
        }
    }

    pub fn native_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::SimplifiedChinese => "简体中文",
            Language::Spanish => "Español",
            Language::Arabic => "العربية",
            Language::French => "Français",
            Language::Hindi => "हिन्दी",
        }
    }

    pub fn direction(&self) -> TextDirection {
        match self {
            Language::Arabic => TextDirection::Rtl,
            _ => TextDirection::Ltr,
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    /// Accepts a code (`zh-CN`, `fr`) or an English name (`Chinese`, `French`).
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        let by_name = match needle.as_str() {
            "chinese" | "mandarin" => Some(Language::SimplifiedChinese),
            _ => None,
        };
        by_name
            .or_else(|| {
                Language::ALL.into_iter().find(|lang| {
                    lang.code().to_ascii_lowercase() == needle
                        || lang.english_name().to_ascii_lowercase() == needle
                })
            })
            .ok_or_else(|| Error::UnknownLanguage(s.to_string()))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Dashboard snapshot
// =============================================================================

/// Snapshot of the embedded BI dashboard, produced by the frontend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSnapshot {
    pub report_id: String,
    pub report_name: String,
    /// Metric name to value (number or string).
    pub current_metrics: BTreeMap<String, Value>,
    /// Active filters, field to selected value.
    pub filters: BTreeMap<String, String>,
    pub visuals: Vec<VisualData>,
    pub last_updated: String,
}

/// Summary of one visual on the dashboard page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualData {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<serde_json::Map<String, Value>>,
}

// =============================================================================
// Conversation history
// =============================================================================

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Function,
}

/// One prior turn, most-recent-last in [`AgentContext::history`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            name: None,
        }
    }
}

// =============================================================================
// Image references
// =============================================================================

/// A dashboard screenshot handed in by the capture collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Remote image.
    Url(String),
    /// Inline `data:` URL with a validated base64 payload.
    Inline { mime_type: String, data_url: String },
}

impl ImageRef {
    /// Parse an `http(s)://` URL or a `data:<mime>;base64,<payload>` URL.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(ImageRef::Url(raw.to_string()));
        }

        let rest = raw
            .strip_prefix("data:")
            .ok_or_else(|| Error::invalid_request("image must be an http(s) or data URL"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::invalid_request("malformed data URL"))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::invalid_request("data URL must be base64 encoded"))?;
        if !mime_type.starts_with("image/") {
            return Err(Error::invalid_request(format!(
                "unsupported image type: {}",
                mime_type
            )));
        }
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| Error::invalid_request(format!("invalid base64 image payload: {}", e)))?;

        Ok(ImageRef::Inline {
            mime_type: mime_type.to_string(),
            data_url: raw.to_string(),
        })
    }

    /// The URL to hand to a vision-capable model.
    pub fn as_url(&self) -> &str {
        match self {
            ImageRef::Url(url) => url,
            ImageRef::Inline { data_url, .. } => data_url,
        }
    }
}

// =============================================================================
// Agent context
// =============================================================================

/// Request-scoped input shared by every stage of one pipeline run.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub user_query: String,
    pub language: Language,
    pub user_role: UserRole,
    pub dashboard: Option<DashboardSnapshot>,
    pub history: Vec<ConversationMessage>,
    pub image: Option<ImageRef>,
}

impl AgentContext {
    /// Create a context with no dashboard, history, or image.
    pub fn new(user_query: impl Into<String>, language: Language, user_role: UserRole) -> Self {
        Self {
            user_query: user_query.into(),
            language,
            user_role,
            dashboard: None,
            history: Vec::new(),
            image: None,
        }
    }

    /// Build a context from loosely typed request fields, failing fast on
    /// anything outside the closed role and language sets.
    pub fn from_parts(
        user_query: &str,
        language: &str,
        user_role: &str,
        screenshot: Option<&str>,
    ) -> Result<Self> {
        if user_query.trim().is_empty() {
            return Err(Error::invalid_request("Message is required"));
        }
        let mut ctx = Self::new(user_query, language.parse()?, user_role.parse()?);
        ctx.image = screenshot
            .filter(|s| !s.trim().is_empty())
            .map(ImageRef::parse)
            .transpose()?;
        Ok(ctx)
    }

    pub fn with_dashboard(mut self, dashboard: DashboardSnapshot) -> Self {
        self.dashboard = Some(dashboard);
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }

    /// The last `n` turns of history, oldest first.
    pub fn recent_history(&self, n: usize) -> &[ConversationMessage] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}
