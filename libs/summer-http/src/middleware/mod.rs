//! Ordered request wrappers.
//!
//! A [`Handler`] is a cloneable, type-erased async function from request to
//! response. A [`Middleware`] wraps one handler into another. A [`Chain`]
//! applies its middleware outer-to-inner in append order, so for a chain built
//! as `A`, `B`, `C` the request flows through `A(B(C(handler)))`: `A` sees the
//! request first and the response last.
//!
//! Handlers implement [`tower::Service`], so a wrapped handler mounts directly
//! on an `axum` router with `Router::route_service`.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::response::Response;
use futures::FutureExt;
use futures::future::BoxFuture;

pub mod cors;
pub mod recover;
pub mod trace;

pub use cors::CorsMiddleware;
pub use recover::RecoverMiddleware;
pub use trace::{RequestTrace, TraceMiddleware};

type HandlerFn = dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync;

/// Type-erased request handler.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    #[must_use]
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self(Arc::new(move |req| f(req).boxed()))
    }

    pub fn call(&self, req: Request) -> BoxFuture<'static, Response> {
        (self.0)(req)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

impl tower::Service<Request> for Handler {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        Handler::call(self, req).map(Ok).boxed()
    }
}

/// Wraps a handler into another handler.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Handler) -> Handler;
}

impl<F> Middleware for F
where
    F: Fn(Handler) -> Handler + Send + Sync,
{
    fn wrap(&self, next: Handler) -> Handler {
        self(next)
    }
}

/// Immutable, ordered set of middleware.
///
/// Appending returns a new chain and leaves the receiver untouched, so a base
/// chain can be shared and extended from many places at once.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Arc<[Arc<dyn Middleware>]>,
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("len", &self.layers.len()).finish()
    }
}

impl Chain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn append<M>(&self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        let mut layers: Vec<Arc<dyn Middleware>> = self.layers.to_vec();
        layers.push(Arc::new(middleware));
        Self {
            layers: layers.into(),
        }
    }

    /// Append every layer of `other` after this chain's layers.
    #[must_use]
    pub fn extend(&self, other: &Chain) -> Self {
        let layers: Vec<Arc<dyn Middleware>> =
            self.layers.iter().chain(other.layers.iter()).cloned().collect();
        Self {
            layers: layers.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wrap `handler` with every layer; the first appended ends up outermost.
    #[must_use]
    pub fn then(&self, handler: Handler) -> Handler {
        self.layers
            .iter()
            .rev()
            .fold(handler, |next, layer| layer.wrap(next))
    }

    /// Convenience for `then(Handler::new(f))`.
    #[must_use]
    pub fn then_fn<F, Fut>(&self, f: F) -> Handler
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.then(Handler::new(f))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::response::IntoResponse;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording(name: &'static str, log: Log) -> impl Middleware {
        move |next: Handler| {
            let log = log.clone();
            Handler::new(move |req| {
                let log = log.clone();
                let next = next.clone();
                async move {
                    log.lock().unwrap().push(format!("{name} in"));
                    let resp = next.call(req).await;
                    log.lock().unwrap().push(format!("{name} out"));
                    resp
                }
            })
        }
    }

    fn terminal(log: Log) -> Handler {
        Handler::new(move |_req| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push("handler".to_owned());
                "ok".into_response()
            }
        })
    }

    #[tokio::test]
    async fn append_order_is_outer_to_inner() {
        let log: Log = Arc::default();
        let chain = Chain::new()
            .append(recording("A", log.clone()))
            .append(recording("B", log.clone()))
            .append(recording("C", log.clone()));

        chain
            .then(terminal(log.clone()))
            .call(Request::new(Body::empty()))
            .await;

        assert_eq!(
            *log.lock().unwrap(),
            ["A in", "B in", "C in", "handler", "C out", "B out", "A out"]
        );
    }

    #[tokio::test]
    async fn append_never_mutates_the_base() {
        let log: Log = Arc::default();
        let base = Chain::new().append(recording("base", log.clone()));
        let left = base.append(recording("left", log.clone()));
        let right = base.append(recording("right", log.clone()));

        assert_eq!((base.len(), left.len(), right.len()), (1, 2, 2));

        right
            .then(terminal(log.clone()))
            .call(Request::new(Body::empty()))
            .await;
        assert_eq!(
            *log.lock().unwrap(),
            ["base in", "right in", "handler", "right out", "base out"]
        );
    }

    #[tokio::test]
    async fn empty_chain_is_the_handler() {
        let log: Log = Arc::default();
        let chain = Chain::new();
        assert!(chain.is_empty());
        let resp = chain
            .then(terminal(log.clone()))
            .call(Request::new(Body::empty()))
            .await;
        assert!(resp.status().is_success());
        assert_eq!(*log.lock().unwrap(), ["handler"]);
    }

    #[test]
    fn extend_concatenates() {
        let log: Log = Arc::default();
        let a = Chain::new().append(recording("A", log.clone()));
        let b = Chain::new()
            .append(recording("B", log.clone()))
            .append(recording("C", log));
        assert_eq!(a.extend(&b).len(), 3);
        assert_eq!(a.len(), 1);
    }
}
