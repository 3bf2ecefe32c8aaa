//! Pipeline orchestration.
//!
//! Two modes share one gateway:
//! - multi-stage: Context-Reader, then Analyzer, then Consolidator, strictly
//!   sequential, all-or-nothing at the envelope level;
//! - streaming: one unstructured call whose fragments go straight to the caller.

use std::sync::Arc;
use std::time::Instant;

use porter_core::config::PipelineConfig;
use porter_core::policy;
use porter_core::traits::{
    CompletionOptions, CompletionRequest, LlmClient, ResponseFormat, TextStream, UserContent,
};
use porter_core::{
    AgentContext, Error, PipelineMetadata, PipelineResponse, Result, StageName, StageReport,
};

use crate::agents::{
    run_stage, AnalyzerAgent, ConsolidatorAgent, ContextReaderAgent, StageAgent, StageRun,
};
use crate::builder::OrchestratorBuilder;
use crate::word_limit::enforce_word_limit;

/// Runs the stage agents against a shared model gateway.
pub struct Orchestrator {
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) pipeline: PipelineConfig,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn new(llm: Arc<dyn LlmClient>, pipeline: PipelineConfig) -> Self {
        Self { llm, pipeline }
    }

    pub fn pipeline_config(&self) -> &PipelineConfig {
        &self.pipeline
    }

    // =========================================================================
    // Multi-stage mode
    // =========================================================================

    /// Run all three stages and assemble the envelope.
    ///
    /// Fails with [`Error::PipelineAborted`] if any stage hits a transport
    /// failure; no partial envelope is returned in that case.
    pub async fn run(&self, ctx: &AgentContext) -> Result<PipelineResponse> {
        let started = Instant::now();
        let mut reports: Vec<StageReport> = Vec::with_capacity(3);
        let cfg = &self.pipeline;

        tracing::info!(
            role = %ctx.user_role,
            language = %ctx.language,
            has_dashboard = ctx.dashboard.is_some(),
            has_image = ctx.image.is_some(),
            "Starting multi-stage pipeline"
        );

        let reader = self
            .stage(&ContextReaderAgent::new(cfg.context_reader), ctx, &mut reports)
            .await?;

        let analyzer = self
            .stage(
                &AnalyzerAgent::new(&reader, cfg.analyzer, cfg.history_window.analyzer),
                ctx,
                &mut reports,
            )
            .await?;

        let mut consolidated = self
            .stage(
                &ConsolidatorAgent::new(&reader, &analyzer, cfg.consolidator, cfg.response_word_limit),
                ctx,
                &mut reports,
            )
            .await?;

        let (chat_response, truncated) =
            enforce_word_limit(&consolidated.chat_response, cfg.response_word_limit);
        if truncated {
            consolidated.chat_response = chat_response;
        }

        let metadata = PipelineMetadata {
            elapsed_ms: started.elapsed().as_millis() as u64,
            stages_invoked: reports.iter().map(|r| r.stage).collect(),
            stage_reports: reports,
        };
        porter_governance::track_pipeline_run("ok");
        tracing::info!(
            elapsed_ms = metadata.elapsed_ms,
            fallbacks = metadata.fallback_stages().len(),
            intent = consolidated.frontend_intent.action.as_str(),
            "Pipeline complete"
        );

        Ok(PipelineResponse::from_consolidated(consolidated, metadata))
    }

    async fn stage<A: StageAgent>(
        &self,
        agent: &A,
        ctx: &AgentContext,
        reports: &mut Vec<StageReport>,
    ) -> Result<A::Output> {
        match run_stage(self.llm.as_ref(), agent, ctx).await {
            Ok(StageRun { output, report }) => {
                reports.push(report);
                Ok(output)
            }
            Err(e) => Err(abort(agent.stage(), e)),
        }
    }

    // =========================================================================
    // Streaming mode
    // =========================================================================

    /// Single-pass answer as a lazy sequence of text fragments.
    ///
    /// Connection failures surface here; failures after the first fragment
    /// arrive as stream items.
    pub async fn stream(&self, ctx: &AgentContext) -> Result<TextStream> {
        let cfg = &self.pipeline;
        let request = CompletionRequest {
            system_prompt: policy::streaming_prompt(ctx.user_role, ctx.language, cfg.response_word_limit)?,
            user_content: UserContent::text(policy::streaming_user_text(ctx, cfg.history_window.streaming)?)
                .with_image(ctx.image.clone()),
            options: CompletionOptions {
                max_tokens: cfg.streaming.max_tokens,
                temperature: cfg.streaming.temperature,
                response_format: ResponseFormat::Text,
            },
        };

        tracing::info!(
            role = %ctx.user_role,
            language = %ctx.language,
            "Starting streaming response"
        );

        match self.llm.complete_stream(&request).await {
            Ok(stream) => {
                porter_governance::track_pipeline_run("streamed");
                Ok(stream)
            }
            Err(e) => Err(abort(StageName::Streaming, Error::Gateway(e))),
        }
    }
}

fn abort(stage: StageName, err: Error) -> Error {
    match err {
        Error::Gateway(source) => {
            tracing::error!(stage = %stage, error = %source, "Pipeline aborted");
            porter_governance::track_pipeline_run("aborted");
            Error::PipelineAborted { stage, source }
        }
        other => other,
    }
}
