//! Logging and tracing bootstrap.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::{LoggingConfig, TracingConfig};

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter '{directive}': {source}")]
    InvalidFilter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Tracer provider tagged with the configured service name. No exporter is attached.
#[must_use]
pub fn build_tracer_provider(cfg: &TracingConfig) -> SdkTracerProvider {
    let resource = Resource::builder_empty()
        .with_attributes([KeyValue::new("service.name", cfg.service_name.clone())])
        .build();
    SdkTracerProvider::builder().with_resource(resource).build()
}

/// Install the global subscriber and the W3C propagator.
///
/// `RUST_LOG` takes precedence over `logging.level`. Spans created through
/// `tracing` are bridged to the returned provider.
///
/// # Errors
/// Returns [`TelemetryError`] when the filter directive is invalid or a
/// global subscriber is already installed.
pub fn init_logging(
    logging: &LoggingConfig,
    tracing_cfg: &TracingConfig,
) -> Result<SdkTracerProvider, TelemetryError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(&logging.level).map_err(|source| TelemetryError::InvalidFilter {
            directive: logging.level.clone(),
            source,
        })
    })?;

    global::set_text_map_propagator(TraceContextPropagator::new());
    let provider = build_tracer_provider(tracing_cfg);
    let otel_layer =
        tracing_opentelemetry::layer().with_tracer(provider.tracer(tracing_cfg.service_name.clone()));

    let fmt_layer = if logging.json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .with(filter)
        .try_init()?;

    tracing::info!(
        service = %tracing_cfg.service_name,
        json = logging.json,
        "Logging initialized"
    );
    Ok(provider)
}
