//! Pipeline controller for Porter.
//!
//! This crate provides the stage agents (Context-Reader, Analyzer,
//! Consolidator), the output parser, and the orchestrator that runs them
//! either as a multi-stage pipeline or as a single streaming pass.

pub mod agents;
pub mod builder;
pub mod orchestrator;
pub mod parser;
pub mod word_limit;

pub use agents::{run_stage, AnalyzerAgent, ConsolidatorAgent, ContextReaderAgent, StageAgent, StageRun};
pub use builder::OrchestratorBuilder;
pub use orchestrator::Orchestrator;
pub use word_limit::enforce_word_limit;
