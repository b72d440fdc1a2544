//! The generator capability and its closure adapters.
//!
//! A generator turns a request into an optional response. It has three ways to
//! finish:
//!
//! - `Ok(Some(response))` - a candidate response
//! - `Ok(None)` - declined; the dispatcher falls back to the wildcard generator
//! - `Err(GeneratorError)` - a fault; the dispatcher answers 500 without fallback
//!
//! ```rust
//! use conneg::generator::{from_fn, from_sync_fn};
//! use conneg::NegotiationResponse;
//!
//! let html = from_sync_fn(|req| {
//!     Ok(Some(NegotiationResponse::text(200, "text/html", format!("<h1>{}</h1>", req.url))))
//! });
//!
//! let csv = from_fn(|_req| async move {
//!     Ok(Some(NegotiationResponse::text(200, "text/csv", "id,name\n")))
//! });
//! # let _ = (html, csv);
//! ```

use std::future::Future;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::json;

use crate::error::GeneratorError;
use crate::message::{NegotiationRequest, NegotiationResponse};

/// Completion value of one generator invocation.
pub type GeneratorResult = Result<Option<NegotiationResponse>, GeneratorError>;

/// Produces an optional response for a request.
///
/// Implementations must be shareable across concurrently resolved requests.
pub trait Generator: Send + Sync {
    fn generate<'a>(&'a self, req: &'a NegotiationRequest) -> BoxFuture<'a, GeneratorResult>;
}

/// Adapter for async closures, see [`from_fn`].
pub struct FnGenerator<F>(F);

impl<F, Fut> Generator for FnGenerator<F>
where
    F: Fn(NegotiationRequest) -> Fut + Send + Sync,
    Fut: Future<Output = GeneratorResult> + Send + 'static,
{
    fn generate<'a>(&'a self, req: &'a NegotiationRequest) -> BoxFuture<'a, GeneratorResult> {
        (self.0)(req.clone()).boxed()
    }
}

/// Wrap an async closure as a generator.
///
/// The closure receives its own copy of the request so the returned future can
/// be `'static`.
pub fn from_fn<F, Fut>(f: F) -> FnGenerator<F>
where
    F: Fn(NegotiationRequest) -> Fut + Send + Sync,
    Fut: Future<Output = GeneratorResult> + Send + 'static,
{
    FnGenerator(f)
}

/// Adapter for synchronous closures, see [`from_sync_fn`].
pub struct SyncFnGenerator<F>(F);

impl<F> Generator for SyncFnGenerator<F>
where
    F: Fn(&NegotiationRequest) -> GeneratorResult + Send + Sync,
{
    fn generate<'a>(&'a self, req: &'a NegotiationRequest) -> BoxFuture<'a, GeneratorResult> {
        // Run on first poll so a panicking closure is caught with the future.
        future::lazy(move |_| (self.0)(req)).boxed()
    }
}

/// Wrap a synchronous closure as a generator.
pub fn from_sync_fn<F>(f: F) -> SyncFnGenerator<F>
where
    F: Fn(&NegotiationRequest) -> GeneratorResult + Send + Sync,
{
    SyncFnGenerator(f)
}

/// The built-in wildcard generator: `200 {"data": null}` for every request.
///
/// Never faults and never declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGenerator;

impl DefaultGenerator {
    #[must_use]
    pub fn response() -> NegotiationResponse {
        NegotiationResponse::json(200, json!({ "data": null }))
    }
}

impl Generator for DefaultGenerator {
    fn generate<'a>(&'a self, _req: &'a NegotiationRequest) -> BoxFuture<'a, GeneratorResult> {
        future::ready(Ok(Some(Self::response()))).boxed()
    }
}
