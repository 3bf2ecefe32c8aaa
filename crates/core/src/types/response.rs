use serde::{Deserialize, Serialize};

use super::context::Language;
use super::stage::{ConsolidatorOutput, FrontendIntent, NextStep, StageName, StageReport};

/// Observability data for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetadata {
    /// Wall-clock duration of the whole run.
    pub elapsed_ms: u64,
    /// Stages actually invoked, in order.
    pub stages_invoked: Vec<StageName>,
    pub stage_reports: Vec<StageReport>,
}

impl PipelineMetadata {
    /// Stages that fell back to their deterministic output.
    pub fn fallback_stages(&self) -> Vec<StageName> {
        self.stage_reports
            .iter()
            .filter(|r| r.outcome.is_fallback())
            .map(|r| r.stage)
            .collect()
    }
}

/// Final envelope returned by the multi-stage pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub chat_response: String,
    pub key_insights: Vec<String>,
    pub next_steps: Vec<NextStep>,
    pub frontend_intent: FrontendIntent,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PipelineMetadata>,
}

impl PipelineResponse {
    pub fn from_consolidated(output: ConsolidatorOutput, metadata: PipelineMetadata) -> Self {
        Self {
            chat_response: output.chat_response,
            key_insights: output.key_insights,
            next_steps: output.next_steps,
            frontend_intent: output.frontend_intent,
            language: output.language,
            metadata: Some(metadata),
        }
    }
}
