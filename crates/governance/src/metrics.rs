//! Metrics implementation using Prometheus.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use porter_core::{Error, Result, StageName};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .map_err(|e| Error::internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Helper to track HTTP request metrics (latency, count).
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}

/// Record one stage run and whether it fell back.
pub fn track_stage(stage: StageName, latency_sec: f64, fallback: bool) {
    metrics::histogram!("pipeline_stage_duration_seconds", "stage" => stage.as_str())
        .record(latency_sec);
    if fallback {
        metrics::counter!("pipeline_stage_fallbacks_total", "stage" => stage.as_str()).increment(1);
    }
}

/// Record a finished pipeline run (`ok`, `aborted`, `streamed`).
pub fn track_pipeline_run(outcome: &'static str) {
    metrics::counter!("pipeline_runs_total", "outcome" => outcome).increment(1);
}

/// Record one sentence synthesis (`ok`, `failed`, `discarded`).
pub fn track_synthesis(outcome: &'static str) {
    metrics::counter!("speech_synthesis_total", "outcome" => outcome).increment(1);
}
