//! Writes Problems to a response.
//!
//! The writer talks to a [`ResponseSink`] rather than a concrete response type
//! so that anything able to take a header, a status and a body can receive
//! Problems. [`ResponseBuffer`] is the sink that yields an `axum` response.

use std::io;

use axum::body::{Body, Bytes};
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use summer_errors::{APPLICATION_PROBLEM_JSON, Error};

use super::builder::{INTERNAL_DETAIL, ProblemBuilder};

/// Destination for a single response.
pub trait ResponseSink {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    fn write_status(&mut self, status: StatusCode);

    /// # Errors
    /// Returns an error when the body cannot be delivered.
    fn write_body(&mut self, body: Bytes) -> io::Result<()>;
}

/// In-memory sink that turns into an `axum` response.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ResponseBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` while nothing has been written.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.status.is_none() && self.headers.is_empty() && self.body.is_none()
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

impl ResponseSink for ResponseBuffer {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn write_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    fn write_body(&mut self, body: Bytes) -> io::Result<()> {
        self.body = Some(body);
        Ok(())
    }
}

impl IntoResponse for ResponseBuffer {
    fn into_response(self) -> Response {
        let mut resp = Response::new(self.body.map_or_else(Body::empty, Body::from));
        *resp.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *resp.headers_mut() = self.headers;
        resp
    }
}

/// Serializes errors as `application/problem+json`.
#[derive(Debug, Clone, Default)]
pub struct ProblemWriter {
    builder: ProblemBuilder,
}

impl ProblemWriter {
    #[must_use]
    pub fn new(builder: ProblemBuilder) -> Self {
        Self { builder }
    }

    #[must_use]
    pub fn builder(&self) -> &ProblemBuilder {
        &self.builder
    }

    /// Write `err` to `sink`; does nothing at all when `err` is `None`.
    ///
    /// With a request URI, the Problem's `instance` is the request path without
    /// its query string.
    pub fn write_to<S>(&self, sink: &mut S, uri: Option<&Uri>, err: Option<&Error>)
    where
        S: ResponseSink + ?Sized,
    {
        let Some(err) = err else {
            return;
        };

        let mut problem = self.builder.build(err);
        if let Some(uri) = uri {
            problem = problem.with_instance(uri.path());
        }

        let body = match serde_json::to_vec(&problem) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize problem response");
                sink.set_header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                );
                sink.write_status(StatusCode::INTERNAL_SERVER_ERROR);
                if let Err(e) = sink.write_body(Bytes::from_static(INTERNAL_DETAIL.as_bytes())) {
                    tracing::error!(error = %e, "Failed to write fallback response body");
                }
                return;
            }
        };

        sink.set_header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_PROBLEM_JSON));
        sink.write_status(problem.status);
        if let Err(e) = sink.write_body(Bytes::from(body)) {
            tracing::error!(
                error = %e,
                status = problem.status.as_u16(),
                "Failed to write problem response body"
            );
        }
    }

    /// Build the complete response for `err`.
    #[must_use]
    pub fn respond(&self, uri: Option<&Uri>, err: &Error) -> Response {
        let mut buffer = ResponseBuffer::new();
        self.write_to(&mut buffer, uri, Some(err));
        buffer.into_response()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use summer_errors::{NotFoundError, Problem};

    #[derive(Default)]
    struct CountingSink {
        writes: usize,
    }

    impl ResponseSink for CountingSink {
        fn set_header(&mut self, _name: HeaderName, _value: HeaderValue) {
            self.writes += 1;
        }

        fn write_status(&mut self, _status: StatusCode) {
            self.writes += 1;
        }

        fn write_body(&mut self, _body: Bytes) -> io::Result<()> {
            self.writes += 1;
            Ok(())
        }
    }

    struct BrokenPipe {
        status: Option<StatusCode>,
    }

    impl ResponseSink for BrokenPipe {
        fn set_header(&mut self, _name: HeaderName, _value: HeaderValue) {}

        fn write_status(&mut self, status: StatusCode) {
            self.status = Some(status);
        }

        fn write_body(&mut self, _body: Bytes) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn none_error_writes_nothing() {
        let writer = ProblemWriter::default();
        let uri: Uri = "/users?page=2".parse().unwrap();

        let mut sink = CountingSink::default();
        writer.write_to(&mut sink, Some(&uri), None);
        assert_eq!(sink.writes, 0);

        let mut buffer = ResponseBuffer::new();
        writer.write_to(&mut buffer, None, None);
        assert!(buffer.is_untouched());
    }

    #[test]
    fn instance_is_path_without_query() {
        let uri: Uri = "/users/abc?expand=roles".parse().unwrap();
        let mut buffer = ResponseBuffer::new();
        let err: Error = NotFoundError::for_key("users", "id", "abc").into();
        ProblemWriter::default().write_to(&mut buffer, Some(&uri), Some(&err));

        assert_eq!(buffer.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(
            buffer.headers().get(CONTENT_TYPE).unwrap(),
            APPLICATION_PROBLEM_JSON
        );
        let problem: Problem = serde_json::from_slice(buffer.body().unwrap()).unwrap();
        assert_eq!(problem.instance.as_deref(), Some("/users/abc"));
        assert_eq!(problem.detail, "unable to find users with id 'abc'");
    }

    #[test]
    fn missing_request_leaves_instance_empty() {
        let mut buffer = ResponseBuffer::new();
        ProblemWriter::default().write_to(&mut buffer, None, Some(&Error::forbidden()));
        let value: serde_json::Value = serde_json::from_slice(buffer.body().unwrap()).unwrap();
        assert!(value.get("instance").is_none());
        assert_eq!(value["status"], 403);
    }

    #[test]
    fn body_write_failure_keeps_status() {
        let mut sink = BrokenPipe { status: None };
        ProblemWriter::default().write_to(&mut sink, None, Some(&Error::unauthorized()));
        assert_eq!(sink.status, Some(StatusCode::UNAUTHORIZED));
    }
}
