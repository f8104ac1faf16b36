//! Panic containment.
//!
//! [`RecoverMiddleware`] runs the downstream future inside an unwind-catching
//! scope. A panic is logged together with its payload and the frames leading
//! to it, and the caller gets the internal server error Problem instead of a
//! dropped connection. The panic is also recorded as a `PanicRecovered` event
//! on the request's OpenTelemetry span.
//!
//! Frames are captured by a process-wide panic hook that is installed once.
//! The hook only records frames while the panicking thread is polling inside a
//! recovery scope; everywhere else it defers to the previously installed hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{AssertUnwindSafe, PanicHookInfo};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use axum::extract::Request;
use futures::FutureExt;
use opentelemetry::KeyValue;
use opentelemetry::trace::TraceContextExt;
use pin_project_lite::pin_project;
use summer_errors::{BoxError, Error};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::trace::RequestTrace;
use super::{Handler, Middleware};
use crate::problem::ProblemWriter;

/// Frame symbols that belong to the unwinding machinery or to this module.
const SKIPPED_FRAME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "rust_begin_unwind",
    "rust_panic",
    "__rust",
    "<std::",
    "<core::",
    "<alloc::",
    "futures_util::",
    "<futures_util::",
    "summer_http::middleware::recover",
    "<summer_http::middleware::recover",
];

thread_local! {
    static SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Where a recovered panic happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanicSite {
    /// `file:line:column` of the panic, when the runtime reported it.
    pub location: Option<String>,
    /// Caller frames, innermost first, as `symbol at file:line`.
    pub frames: Vec<String>,
}

fn install_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            if SCOPE_DEPTH.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let site = PanicSite {
                location: info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
                frames: parse_frames(&Backtrace::force_capture().to_string()),
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(site));
        }));
    });
}

/// Turn the rendered form of a backtrace into `symbol at file:line` entries.
fn parse_frames(rendered: &str) -> Vec<String> {
    let mut frames: Vec<String> = Vec::new();
    let mut skipping = false;
    for line in rendered.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if !skipping && let Some(last) = frames.last_mut() {
                last.push_str(" at ");
                last.push_str(location);
            }
            continue;
        }
        let Some((index, symbol)) = line.split_once(": ") else {
            continue;
        };
        if index.parse::<usize>().is_err() {
            continue;
        }
        skipping = SKIPPED_FRAME_PREFIXES.iter().any(|p| symbol.starts_with(p));
        if !skipping {
            frames.push(symbol.to_owned());
        }
    }
    frames
}

/// Marks the current thread as polling inside a recovery scope.
struct ScopeGuard;

impl ScopeGuard {
    fn enter() -> Self {
        SCOPE_DEPTH.with(|d| d.set(d.get() + 1));
        ScopeGuard
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPE_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

pin_project! {
    struct Scoped<F> {
        #[pin]
        inner: F,
    }
}

impl<F: Future> Future for Scoped<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _scope = ScopeGuard::enter();
        self.project().inner.poll(cx)
    }
}

/// Best-effort text of a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(e) = payload.downcast_ref::<BoxError>() {
        e.to_string()
    } else if let Some(e) = payload.downcast_ref::<anyhow::Error>() {
        e.to_string()
    } else if let Some(e) = payload.downcast_ref::<Error>() {
        e.to_string()
    } else if let Some(e) = payload.downcast_ref::<std::io::Error>() {
        e.to_string()
    } else {
        "unknown panic payload".to_owned()
    }
}

/// Converts handler panics into internal server error Problems.
#[derive(Debug, Clone, Default)]
pub struct RecoverMiddleware {
    writer: ProblemWriter,
    debug: bool,
}

impl RecoverMiddleware {
    #[must_use]
    pub fn new(writer: ProblemWriter) -> Self {
        Self {
            writer,
            debug: false,
        }
    }

    /// Echo captured frames to stderr as well as to the log.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Middleware for RecoverMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        install_hook();
        let this = self.clone();
        Handler::new(move |req: Request| {
            let this = this.clone();
            let next = next.clone();
            async move {
                let uri = req.uri().clone();
                let method = req.method().clone();
                let trace_cx = req.extensions().get::<RequestTrace>().map(|t| t.context.clone());
                let outcome = AssertUnwindSafe(Scoped {
                    inner: next.call(req),
                })
                .catch_unwind()
                .await;

                match outcome {
                    Ok(resp) => resp,
                    Err(payload) => {
                        let site = LAST_PANIC.with(|slot| slot.borrow_mut().take()).unwrap_or_default();
                        let message = panic_message(&*payload);
                        let event = vec![KeyValue::new("panic", message.clone())];
                        match &trace_cx {
                            Some(cx) => cx.span().add_event("PanicRecovered", event),
                            None => tracing::Span::current().add_event("PanicRecovered", event),
                        }
                        tracing::error!(
                            panic = %message,
                            location = site.location.as_deref().unwrap_or("unknown"),
                            frames = %site.frames.join("\n"),
                            method = %method,
                            path = uri.path(),
                            "Recovered from panic in request handler"
                        );
                        if this.debug {
                            eprintln!("panic: {message}");
                            for frame in &site.frames {
                                eprintln!("    {frame}");
                            }
                        }
                        this.writer
                            .respond(Some(&uri), &Error::internal(format!("panic: {message}")))
                    }
                }
            }
        })
    }
}
