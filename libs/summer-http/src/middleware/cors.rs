//! Cross-origin policy.
//!
//! Requests without an `Origin` header pass through untouched. For the rest:
//! - `*` in the allow-list admits any origin and answers
//!   `Access-Control-Allow-Origin: *` without credentials
//! - an exact match echoes the origin and sets
//!   `Access-Control-Allow-Credentials: true`
//! - anything else is rejected with a 403 Problem before the handler runs
//!
//! Preflight (`OPTIONS`) requests from an admitted origin are answered with 200
//! directly.

use std::sync::Arc;

use axum::extract::Request;
use axum::response::IntoResponse;
use http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN,
};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use summer_errors::catalog;

use super::{Handler, Middleware};
use crate::config::CorsConfig;

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";
pub const REJECTED_DETAIL: &str = "CORS not allowed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Any,
    Exact,
}

#[derive(Debug)]
struct AllowList {
    wildcard: bool,
    origins: Vec<String>,
}

impl AllowList {
    fn admit(&self, origin: &HeaderValue) -> Option<Admission> {
        if self.wildcard {
            return Some(Admission::Any);
        }
        let origin = origin.to_str().ok()?;
        self.origins
            .iter()
            .any(|o| o == origin)
            .then_some(Admission::Exact)
    }
}

/// Enforces an origin allow-list.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    allow: Arc<AllowList>,
}

impl CorsMiddleware {
    #[must_use]
    pub fn new<I, S>(allowed_origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let origins: Vec<String> = allowed_origins.into_iter().map(Into::into).collect();
        let wildcard = origins.iter().any(|o| o == "*");
        if wildcard {
            tracing::warn!(
                "CORS is configured with allowed_origins=['*']; any website may call this API"
            );
        }
        Self {
            allow: Arc::new(AllowList { wildcard, origins }),
        }
    }

    #[must_use]
    pub fn from_config(cfg: &CorsConfig) -> Self {
        Self::new(cfg.allowed_origins.iter().cloned())
    }
}

fn apply_headers(headers: &mut HeaderMap, origin: &HeaderValue, admission: Admission) {
    match admission {
        Admission::Any => {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
        Admission::Exact => {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
            headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }
    }
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOWED_HEADERS));
}

impl Middleware for CorsMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        let allow = Arc::clone(&self.allow);
        Handler::new(move |req: Request| {
            let allow = Arc::clone(&allow);
            let next = next.clone();
            async move {
                let Some(origin) = req.headers().get(ORIGIN).cloned() else {
                    return next.call(req).await;
                };

                let Some(admission) = allow.admit(&origin) else {
                    tracing::warn!(
                        origin = %String::from_utf8_lossy(origin.as_bytes()),
                        path = req.uri().path(),
                        "CORS request from origin not in allow-list"
                    );
                    return catalog::FORBIDDEN
                        .as_problem(REJECTED_DETAIL)
                        .with_instance(req.uri().path())
                        .into_response();
                };

                let mut resp = if *req.method() == Method::OPTIONS {
                    StatusCode::OK.into_response()
                } else {
                    next.call(req).await
                };
                apply_headers(resp.headers_mut(), &origin, admission);
                resp
            }
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn admission_rules() {
        let exact = AllowList {
            wildcard: false,
            origins: vec!["http://good.example".to_owned()],
        };
        let admit = |list: &AllowList, origin: &[u8]| {
            list.admit(&HeaderValue::from_bytes(origin).unwrap())
        };
        assert_eq!(admit(&exact, b"http://good.example"), Some(Admission::Exact));
        assert_eq!(admit(&exact, b"http://evil.example"), None);
        assert_eq!(admit(&exact, b"http://good.example.evil"), None);
        assert_eq!(admit(&exact, b"http://g\xf6od.example"), None);

        let any = AllowList {
            wildcard: true,
            origins: vec!["*".to_owned()],
        };
        assert_eq!(admit(&any, b"http://whatever.example"), Some(Admission::Any));
        // not visible ASCII, still admitted by the wildcard
        assert_eq!(admit(&any, b"http://b\xfccher.example"), Some(Admission::Any));
    }

    #[test]
    fn wildcard_never_sets_credentials() {
        let mut headers = HeaderMap::new();
        let origin = HeaderValue::from_static("http://a.example");
        apply_headers(&mut headers, &origin, Admission::Any);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(!headers.contains_key(ACCESS_CONTROL_ALLOW_CREDENTIALS));
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_METHODS], ALLOWED_METHODS);

        let mut headers = HeaderMap::new();
        apply_headers(&mut headers, &origin, Admission::Exact);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "http://a.example");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], ALLOWED_HEADERS);
    }
}
