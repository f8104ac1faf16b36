//! W3C Trace Context helpers for inbound HTTP headers.

use http::{HeaderMap, HeaderName};
use opentelemetry::Context;
use opentelemetry::propagation::{Extractor, TextMapPropagator};

pub const TRACEPARENT: &str = "traceparent";

/// Raw `traceparent` value, if present and printable.
#[must_use]
pub fn get_traceparent(headers: &HeaderMap) -> Option<&str> {
    headers.get(TRACEPARENT)?.to_str().ok()
}

/// Trace id of a version `00` `traceparent` (`00-{trace_id}-{span_id}-{flags}`).
///
/// Returns `None` unless the id is 32 hex digits.
#[must_use]
pub fn parse_trace_id(traceparent: &str) -> Option<&str> {
    let mut fields = traceparent.split('-');
    let (Some("00"), Some(trace_id), Some(_), Some(_)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return None;
    };
    (trace_id.len() == 32 && trace_id.bytes().all(|b| b.is_ascii_hexdigit())).then_some(trace_id)
}

/// Read-only view of request headers for a [`TextMapPropagator`].
pub struct HeadersExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeadersExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(HeaderName::as_str).collect()
    }
}

/// Upstream context carried by `headers`, or an empty context when there is none.
///
/// Always starts from an empty context so the ambient one never leaks in.
#[must_use]
pub fn extract_context(propagator: &dyn TextMapPropagator, headers: &HeaderMap) -> Context {
    propagator.extract_with_context(&Context::new(), &HeadersExtractor(headers))
}
