//! Builder for Orchestrator.

use porter_core::config::PipelineConfig;
use porter_core::traits::LlmClient;
use porter_core::{Error, Result};
use std::sync::Arc;

use crate::orchestrator::Orchestrator;

/// Builder for constructing an Orchestrator.
pub struct OrchestratorBuilder {
    pipeline: PipelineConfig,
    llm: Option<Arc<dyn LlmClient>>,
}

impl OrchestratorBuilder {
    /// Create a new builder with default pipeline settings.
    pub fn new() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            llm: None,
        }
    }

    /// Set the pipeline settings.
    pub fn with_pipeline_config(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Set the LLM client.
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> Result<Orchestrator> {
        let llm = self
            .llm
            .ok_or_else(|| Error::config("Orchestrator requires an LLM client"))?;
        Ok(Orchestrator::new(llm, self.pipeline))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
