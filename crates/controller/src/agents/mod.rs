//! Stage agents of the multi-stage pipeline.
//!
//! Each agent renders its prompt, makes exactly one structured gateway call,
//! and parses the answer into its typed output. Shape failures and
//! `invalid_output` errors are absorbed into a deterministic fallback; only
//! transport failures (including timeouts) leave the agent.

mod analyzer;
mod consolidator;
mod context_reader;

pub use analyzer::AnalyzerAgent;
pub use consolidator::ConsolidatorAgent;
pub use context_reader::ContextReaderAgent;

use porter_core::config::StageSettings;
use porter_core::traits::{CompletionOptions, CompletionRequest, LlmClient, ResponseFormat, UserContent};
use porter_core::{AgentContext, Error, Result, StageName, StageOutcome, StageReport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;

use crate::parser;

/// One step of the multi-stage pipeline.
pub trait StageAgent {
    type Output: DeserializeOwned;

    fn stage(&self) -> StageName;

    fn settings(&self) -> StageSettings;

    fn system_prompt(&self, ctx: &AgentContext) -> Result<String>;

    fn user_content(&self, ctx: &AgentContext) -> Result<UserContent>;

    /// Turn the model's JSON into the stage output, or explain why it doesn't fit.
    fn parse(&self, _ctx: &AgentContext, value: Value) -> std::result::Result<Self::Output, String> {
        parser::parse_output(value)
    }

    /// Deterministic output used when the model answer is unusable.
    fn fallback(&self, ctx: &AgentContext) -> Self::Output;
}

/// Result of one stage run.
#[derive(Debug, Clone)]
pub struct StageRun<T> {
    pub output: T,
    pub report: StageReport,
}

/// Run one stage: render, call the gateway once, parse or fall back.
///
/// Returns `Error::Gateway` only for transport-level failures.
pub async fn run_stage<A: StageAgent>(
    llm: &dyn LlmClient,
    agent: &A,
    ctx: &AgentContext,
) -> Result<StageRun<A::Output>> {
    let stage = agent.stage();
    let started = Instant::now();
    let settings = agent.settings();

    tracing::debug!(stage = %stage, "Rendering stage prompt");
    let request = CompletionRequest {
        system_prompt: agent.system_prompt(ctx)?,
        user_content: agent.user_content(ctx)?,
        options: CompletionOptions {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            response_format: ResponseFormat::Json,
        },
    };

    tracing::debug!(stage = %stage, "Awaiting model");
    let (output, outcome) = match llm.complete_json(&request).await {
        Ok(value) => match agent.parse(ctx, value) {
            Ok(output) => (output, StageOutcome::Parsed),
            Err(reason) => {
                tracing::warn!(stage = %stage, reason = %reason, "Stage output did not match shape, using fallback");
                (agent.fallback(ctx), StageOutcome::Fallback { reason })
            }
        },
        Err(e) if e.is_transport() => {
            tracing::error!(stage = %stage, error = %e, "Stage gateway call failed");
            porter_governance::track_stage(stage, started.elapsed().as_secs_f64(), false);
            return Err(Error::Gateway(e));
        }
        Err(e) => {
            tracing::warn!(stage = %stage, error = %e, "Stage output unusable, using fallback");
            (
                agent.fallback(ctx),
                StageOutcome::Fallback {
                    reason: e.to_string(),
                },
            )
        }
    };

    let elapsed = started.elapsed();
    porter_governance::track_stage(stage, elapsed.as_secs_f64(), outcome.is_fallback());
    tracing::info!(
        stage = %stage,
        elapsed_ms = elapsed.as_millis() as u64,
        fallback = outcome.is_fallback(),
        "Stage complete"
    );

    Ok(StageRun {
        output,
        report: StageReport {
            stage,
            outcome,
            elapsed_ms: elapsed.as_millis() as u64,
        },
    })
}
