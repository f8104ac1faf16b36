//! HTTP boundary for summer services.
//!
//! - [`problem`]: error to RFC 9457 Problem conversion and response writing
//! - [`middleware`]: ordered request wrappers (tracing, panic recovery, CORS)
//! - [`otel`]: W3C Trace Context header helpers
//! - [`config`]: layered server configuration
//! - [`telemetry`]: logging and tracing bootstrap
//!
//! ```rust,no_run
//! use axum::Router;
//! use axum::response::IntoResponse;
//! use opentelemetry::trace::TracerProvider as _;
//! use opentelemetry_sdk::propagation::TraceContextPropagator;
//! use summer_http::config::SummerConfig;
//! use summer_http::middleware::{Chain, CorsMiddleware, RecoverMiddleware, TraceMiddleware};
//! use summer_http::problem::ProblemWriter;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = SummerConfig::load(None)?;
//! let provider = summer_http::telemetry::init_logging(&cfg.logging, &cfg.tracing)?;
//! let writer = ProblemWriter::default();
//!
//! let chain = Chain::new()
//!     .append(
//!         TraceMiddleware::new(provider.tracer("http"), TraceContextPropagator::new())
//!             .with_debug(cfg.debug),
//!     )
//!     .append(RecoverMiddleware::new(writer.clone()).with_debug(cfg.debug))
//!     .append(CorsMiddleware::from_config(&cfg.cors));
//!
//! let app: Router = Router::new()
//!     .route_service("/health", chain.then_fn(|_req| async { "ok".into_response() }));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod middleware;
pub mod otel;
pub mod problem;
pub mod telemetry;

pub use config::{ConfigError, ConfigOverlay, SummerConfig};
pub use middleware::{Chain, Handler, Middleware};
pub use problem::{ProblemBuilder, ProblemWriter};
pub use telemetry::TelemetryError;
