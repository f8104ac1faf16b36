//! Request tracing.
//!
//! [`TraceMiddleware`] continues the caller's W3C trace (or starts a new one),
//! opens an OpenTelemetry server span from the injected tracer, and runs the
//! downstream handler inside a `tracing` span carrying `trace_id` and
//! `span_id`, so every log line of the request can be correlated. The
//! `tracing` span is parented to the server span, so with the
//! `tracing-opentelemetry` layer installed every span opened by the handler
//! lands in the same trace.
//!
//! Completion is logged once per request:
//! - below 400: `Request completed` at debug
//! - 4xx: `Client request rejected` at error
//! - 5xx: `Internal server error occurred` at error
//!
//! In debug mode the request and response bodies are buffered and attached to
//! the 4xx/5xx lines, and a 500 line also carries both header sets.

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::response::Response;
use http::{HeaderMap, Method, StatusCode, Uri};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::{FutureExt as _, SpanKind, Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use summer_errors::Error;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{Handler, Middleware};
use crate::otel;
use crate::problem::ProblemWriter;

/// Trace identity of the current request, available as a request extension.
#[derive(Debug, Clone)]
pub struct RequestTrace {
    pub trace_id: String,
    pub span_id: String,
    /// Context holding the server span; use it as parent for child spans.
    pub context: Context,
}

/// Ends the server span on every exit path, including unwinding.
struct EndOnDrop(Context);

impl Drop for EndOnDrop {
    fn drop(&mut self) {
        self.0.span().end();
    }
}

struct Inner<T> {
    tracer: Arc<T>,
    propagator: Arc<dyn TextMapPropagator + Send + Sync>,
    writer: ProblemWriter,
    debug: bool,
}

impl<T> Clone for Inner<T> {
    fn clone(&self) -> Self {
        Self {
            tracer: Arc::clone(&self.tracer),
            propagator: Arc::clone(&self.propagator),
            writer: self.writer.clone(),
            debug: self.debug,
        }
    }
}

/// Opens a span per request and logs its outcome.
pub struct TraceMiddleware<T> {
    inner: Inner<T>,
}

impl<T> Clone for TraceMiddleware<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> TraceMiddleware<T>
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + Sync + 'static,
{
    #[must_use]
    pub fn new<P>(tracer: T, propagator: P) -> Self
    where
        P: TextMapPropagator + Send + Sync + 'static,
    {
        Self {
            inner: Inner {
                tracer: Arc::new(tracer),
                propagator: Arc::new(propagator),
                writer: ProblemWriter::default(),
                debug: false,
            },
        }
    }

    /// Replace the writer used when a body cannot be buffered.
    #[must_use]
    pub fn with_writer(mut self, writer: ProblemWriter) -> Self {
        self.inner.writer = writer;
        self
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.inner.debug = debug;
        self
    }
}

impl<T> Middleware for TraceMiddleware<T>
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + Sync + 'static,
{
    fn wrap(&self, next: Handler) -> Handler {
        let inner = Arc::new(self.inner.clone());
        Handler::new(move |req: Request| {
            let inner = Arc::clone(&inner);
            let next = next.clone();
            async move { inner.handle(req, next).await }
        })
    }
}

/// What debug mode keeps of an exchange.
#[derive(Default)]
struct Captured {
    request_headers: Option<HeaderMap>,
    request_body: Option<Bytes>,
    response_body: Option<Bytes>,
}

impl<T> Inner<T>
where
    T: Tracer + Send + Sync + 'static,
    T::Span: Send + Sync + 'static,
{
    async fn handle(&self, mut req: Request, next: Handler) -> Response {
        let started = Instant::now();
        let method = req.method().clone();
        let uri = req.uri().clone();

        let parent_cx = otel::extract_context(self.propagator.as_ref(), req.headers());
        let upstream = parent_cx.span().span_context().clone();
        let builder = self
            .tracer
            .span_builder(format!("{method} {}", uri.path()))
            .with_kind(SpanKind::Server)
            .with_attributes([
                KeyValue::new("http.request.method", method.to_string()),
                KeyValue::new("url.path", uri.path().to_owned()),
                KeyValue::new("url.query", uri.query().unwrap_or_default().to_owned()),
            ]);
        let span = self.tracer.build_with_context(builder, &parent_cx);
        let cx = parent_cx.with_span(span);
        let _end = EndOnDrop(cx.clone());
        cx.span().add_event("HTTPRequestStarted", Vec::new());

        let span_context = cx.span().span_context().clone();
        let trace_id = span_context.trace_id().to_string();
        let span_id = span_context.span_id().to_string();
        let log_span = tracing::info_span!(
            "http_request",
            method = %method,
            path = uri.path(),
            trace_id = %trace_id,
            span_id = %span_id,
            parent.trace_id = tracing::field::Empty
        );
        if let Some(parent_trace_id) =
            otel::get_traceparent(req.headers()).and_then(otel::parse_trace_id)
        {
            log_span.record("parent.trace_id", parent_trace_id);
        }
        // Must happen before the span is first entered.
        if let Err(e) = log_span.set_parent(cx.clone()) {
            tracing::trace!(error = %e, "Request span not linked to the server span");
        }

        log_span.in_scope(|| {
            if upstream.is_valid() {
                tracing::debug!(
                    upstream_trace_id = %upstream.trace_id(),
                    "Upstream trace available"
                );
            } else {
                tracing::debug!("No upstream trace available, creating a new one");
            }
        });

        req.extensions_mut().insert(RequestTrace {
            trace_id,
            span_id,
            context: cx.clone(),
        });

        let mut captured = Captured::default();
        if self.debug {
            captured.request_headers = Some(req.headers().clone());
            let (parts, body) = req.into_parts();
            match axum::body::to_bytes(body, usize::MAX).await {
                Ok(bytes) => {
                    captured.request_body = Some(bytes.clone());
                    req = Request::from_parts(parts, Body::from(bytes));
                }
                Err(e) => {
                    log_span.in_scope(|| {
                        tracing::error!(error = %e, "Failed to read request body");
                    });
                    return self.writer.respond(Some(&uri), &Error::internal(e));
                }
            }
        }

        let mut resp = next
            .call(req)
            .with_context(cx.clone())
            .instrument(log_span.clone())
            .await;
        let status = resp.status();

        cx.span().set_attribute(KeyValue::new(
            "http.response.status_code",
            i64::from(status.as_u16()),
        ));
        if status.is_server_error() {
            cx.span().set_status(Status::error(status.to_string()));
        }

        if self.debug && (status.is_client_error() || status.is_server_error()) {
            let (parts, body) = resp.into_parts();
            match axum::body::to_bytes(body, usize::MAX).await {
                Ok(bytes) => {
                    captured.response_body = Some(bytes.clone());
                    resp = Response::from_parts(parts, Body::from(bytes));
                }
                Err(e) => {
                    log_span.in_scope(|| {
                        tracing::error!(error = %e, "Failed to read response body");
                    });
                    return self.writer.respond(Some(&uri), &Error::internal(e));
                }
            }
        }

        log_span.in_scope(|| {
            log_completion(&method, &uri, status, started, &resp, &captured);
        });
        resp
    }
}

fn log_completion(
    method: &Method,
    uri: &Uri,
    status: StatusCode,
    started: Instant,
    resp: &Response,
    captured: &Captured,
) {
    let code = status.as_u16();
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if !(status.is_client_error() || status.is_server_error()) {
        tracing::debug!(status = code, elapsed_ms, "Request completed");
        return;
    }

    let request_body = captured.request_body.as_ref().map(|b| String::from_utf8_lossy(b));
    let response_body = captured.response_body.as_ref().map(|b| String::from_utf8_lossy(b));

    if status.is_client_error() {
        tracing::error!(
            status = code,
            elapsed_ms,
            request_body = request_body.as_deref(),
            response_body = response_body.as_deref(),
            "Client request rejected"
        );
        return;
    }

    if status == StatusCode::INTERNAL_SERVER_ERROR
        && let Some(request_headers) = &captured.request_headers
    {
        tracing::error!(
            status = code,
            elapsed_ms,
            method = %method,
            uri = %uri,
            request_headers = %render_headers(request_headers),
            response_headers = %render_headers(resp.headers()),
            request_body = request_body.as_deref(),
            response_body = response_body.as_deref(),
            "Internal server error occurred"
        );
    } else {
        tracing::error!(
            status = code,
            elapsed_ms,
            request_body = request_body.as_deref(),
            response_body = response_body.as_deref(),
            "Internal server error occurred"
        );
    }
}

fn render_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {}", String::from_utf8_lossy(value.as_bytes())))
        .collect::<Vec<_>>()
        .join(", ")
}
