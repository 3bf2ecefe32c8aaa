//! Governance for Porter.
//!
//! This crate provides:
//! - Tracing subscriber setup (env filter, JSON logs, OTLP export)
//! - Prometheus metrics recorder and recording helpers

pub mod metrics;
pub mod tracing_layer;

pub use metrics::{
    setup_metrics_recorder, track_pipeline_run, track_request, track_stage, track_synthesis,
};
pub use tracing_layer::{configure_tracing, SERVICE_NAME};
