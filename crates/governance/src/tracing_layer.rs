//! Logging and distributed tracing configuration.

use porter_core::config::LoggingConfig;
use porter_core::{Error, Result};
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const SERVICE_NAME: &str = "porter-assistant";

/// Install the global subscriber: env filter, plain or JSON stdout logs, and
/// an OTLP exporter when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.
pub fn configure_tracing(config: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured default
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.filter.clone()),
    );

    let json_layer = config
        .json
        .then(|| tracing_subscriber::fmt::layer().json().with_current_span(true));
    let plain_layer = (!config.json).then(tracing_subscriber::fmt::layer);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(plain_layer);

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint.clone()),
            )
            .with_trace_config(
                sdktrace::config().with_resource(Resource::new(vec![KeyValue::new(
                    "service.name",
                    SERVICE_NAME,
                )])),
            )
            .install_batch(runtime::Tokio)
            .map_err(|e| Error::internal(format!("Failed to install OTLP pipeline: {}", e)))?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        registry
            .with(otel_layer)
            .try_init()
            .map_err(|e| Error::internal(format!("Failed to install subscriber: {}", e)))?;
        tracing::info!(endpoint = %endpoint, "OpenTelemetry tracing enabled");
    } else {
        registry
            .try_init()
            .map_err(|e| Error::internal(format!("Failed to install subscriber: {}", e)))?;
    }

    tracing::debug!(filter = %config.filter, json = config.json, "Tracing configured");
    Ok(())
}
