//! Structured outputs of the three pipeline stages.
//!
//! All records are plain data: created fresh per request, passed by value
//! from one stage to the next, and dropped once the envelope is returned.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::context::Language;

// =============================================================================
// Stage bookkeeping
// =============================================================================

/// Identifies a step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    ContextReader,
    Analyzer,
    Consolidator,
    /// Single-pass streaming mode.
    Streaming,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::ContextReader => "context_reader",
            StageName::Analyzer => "analyzer",
            StageName::Consolidator => "consolidator",
            StageName::Streaming => "streaming",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stage produced its output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutcome {
    /// The model output matched the expected shape.
    Parsed,
    /// The deterministic fallback was used.
    Fallback { reason: String },
}

impl StageOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, StageOutcome::Fallback { .. })
    }
}

/// Telemetry for one stage invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: StageName,
    pub outcome: StageOutcome,
    pub elapsed_ms: u64,
}

// =============================================================================
// Context Reader
// =============================================================================

/// Direction of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

/// How pressing the user's question is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReading {
    pub name: String,
    pub value: String,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSummary {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub key_insights: Vec<String>,
}

/// What was visible on the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisualContext {
    pub metrics: Vec<MetricReading>,
    pub charts: Vec<ChartSummary>,
    pub anomalies: Vec<String>,
    pub timeframe: String,
}

/// What the user is asking for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIntentExtraction {
    pub primary_question: String,
    #[serde(default)]
    pub specific_metrics: Vec<String>,
    /// Named locations (terminals, berths).
    #[serde(default)]
    pub terminals: Vec<String>,
    #[serde(default)]
    pub timeframe: String,
    #[serde(default)]
    pub urgency_level: Urgency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextReaderOutput {
    pub visual_context: VisualContext,
    pub user_intent: UserIntentExtraction,
    pub context_summary: String,
}

// =============================================================================
// Analyzer
// =============================================================================

/// Ordered four-level severity scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedIssue {
    pub category: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub impact: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Analysis {
    pub key_findings: Vec<String>,
    pub trends: Vec<String>,
    pub issues_detected: Vec<DetectedIssue>,
    pub benchmark_comparison: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendations {
    pub immediate: Vec<String>,
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub benefit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerOutput {
    pub analysis: Analysis,
    #[serde(default)]
    pub recommendations: Recommendations,
    #[serde(default)]
    pub suggested_next_steps: Vec<SuggestedAction>,
}

impl AnalyzerOutput {
    /// Highest severity among detected issues, if any.
    pub fn max_severity(&self) -> Option<Severity> {
        self.analysis.issues_detected.iter().map(|i| i.severity).max()
    }
}

// =============================================================================
// Consolidator
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextStepCategory {
    Analysis,
    Filter,
    Report,
    Action,
    Comparison,
}

/// A follow-up the user can pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextStep {
    pub id: String,
    /// Short action label.
    pub action: String,
    pub detail: String,
    pub category: NextStepCategory,
}

/// UI actions the frontend knows how to perform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    ShowReport,
    FilterData,
    HighlightMetric,
    ShowChart,
    Navigate,
    #[default]
    None,
}

impl IntentAction {
    pub const ALL: [IntentAction; 6] = [
        IntentAction::ShowReport,
        IntentAction::FilterData,
        IntentAction::HighlightMetric,
        IntentAction::ShowChart,
        IntentAction::Navigate,
        IntentAction::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentAction::ShowReport => "show_report",
            IntentAction::FilterData => "filter_data",
            IntentAction::HighlightMetric => "highlight_metric",
            IntentAction::ShowChart => "show_chart",
            IntentAction::Navigate => "navigate",
            IntentAction::None => "none",
        }
    }
}

/// Machine-readable UI action derived from the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendIntent {
    pub action: IntentAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl FrontendIntent {
    /// Intent for conversational answers with no UI action.
    pub fn none() -> Self {
        Self::default()
    }

    /// Clamp confidence into `[0, 1]`; non-finite values are dropped.
    pub fn normalized(mut self) -> Self {
        self.confidence = self
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatorOutput {
    /// Spoken answer, bounded by the configured word ceiling.
    pub chat_response: String,
    #[serde(default)]
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub next_steps: Vec<NextStep>,
    #[serde(default)]
    pub frontend_intent: FrontendIntent,
    pub language: Language,
}
