#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use summer_http::Handler;

/// Handler answering 200 "ok" and counting how often it ran.
pub fn counting_handler() -> (Handler, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let handler = Handler::new(move |_req| {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            "ok".into_response()
        }
    });
    (handler, calls)
}

pub fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

pub fn request(method: &str, uri: &str) -> http::request::Builder {
    Request::builder().method(method).uri(uri)
}

pub fn empty(builder: http::request::Builder) -> Request {
    builder.body(Body::empty()).unwrap()
}

pub async fn body_bytes(resp: Response) -> axum::body::Bytes {
    axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_json(resp: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}
