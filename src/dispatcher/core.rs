//! Negotiator core - registry and the resolve path.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::NegotiatorConfig;
use crate::error::{DispatchFailure, GeneratorError, RegistrationError};
use crate::generator::{DefaultGenerator, Generator, GeneratorResult};
use crate::message::{NegotiationRequest, NegotiationResponse};
use crate::preference;

/// Reserved registry key of the fallback generator.
pub const WILDCARD: &str = "*/*";

/// Media-type registry and dispatcher.
///
/// Holds one generator per media type plus the wildcard generator seeded at
/// construction. Register everything during setup, then share the negotiator
/// (for example behind an `Arc`) for concurrent `resolve` calls.
pub struct Negotiator {
    generators: HashMap<String, Arc<dyn Generator>>,
    config: NegotiatorConfig,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Negotiator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiator")
            .field("media_types", &self.media_types())
            .field("config", &self.config)
            .finish()
    }
}

impl Negotiator {
    /// Negotiator with default settings and only the wildcard generator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(NegotiatorConfig::default())
    }

    #[must_use]
    pub fn with_config(config: NegotiatorConfig) -> Self {
        let mut generators: HashMap<String, Arc<dyn Generator>> = HashMap::new();
        generators.insert(WILDCARD.to_string(), Arc::new(DefaultGenerator));
        Negotiator { generators, config }
    }

    #[must_use]
    pub fn config(&self) -> &NegotiatorConfig {
        &self.config
    }

    /// Register `generator` for `media_type`, replacing any previous one.
    ///
    /// The media type is trimmed before use. Empty media types and the
    /// wildcard key are rejected and leave the registry unchanged.
    pub fn register<G>(&mut self, media_type: &str, generator: G) -> Result<(), RegistrationError>
    where
        G: Generator + 'static,
    {
        let key = media_type.trim();
        if key.is_empty() {
            return Err(RegistrationError::InvalidArgument {
                media_type: media_type.to_string(),
                reason: "must not be empty",
            });
        }
        if key == WILDCARD {
            return Err(RegistrationError::InvalidArgument {
                media_type: media_type.to_string(),
                reason: "is reserved for the built-in fallback generator",
            });
        }

        if self
            .generators
            .insert(key.to_string(), Arc::new(generator))
            .is_some()
        {
            warn!(
                media_type = %key,
                total_generators = self.generators.len(),
                "Replaced existing generator"
            );
        } else {
            info!(
                media_type = %key,
                total_generators = self.generators.len(),
                "Generator registered successfully"
            );
        }
        Ok(())
    }

    /// Whether a generator is registered under exactly `media_type`.
    #[must_use]
    pub fn contains(&self, media_type: &str) -> bool {
        self.generators.contains_key(media_type)
    }

    /// Number of registered generators, wildcard included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// `false` for every negotiator built through the public API, since the
    /// wildcard entry is seeded at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Registered media types, wildcard included, sorted.
    #[must_use]
    pub fn media_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.generators.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// The single media type `resolve` will look up for `req`.
    #[must_use]
    pub fn preferred_type<'a>(&'a self, req: &'a NegotiationRequest) -> &'a str {
        preference::preferred_type(
            req.get_header(&self.config.preference_header),
            &self.config.default_media_type,
        )
    }

    /// Produce the response for `req`.
    ///
    /// Always returns a response: 200 unless a generator faulted (or no valid
    /// response survived the fallback), in which case 500.
    pub async fn resolve(&self, req: &NegotiationRequest) -> NegotiationResponse {
        let span = info_span!(
            "negotiate",
            request_id = %req.request_id,
            method = %req.method,
            url = %req.url,
        );
        self.resolve_inner(req).instrument(span).await
    }

    async fn resolve_inner(&self, req: &NegotiationRequest) -> NegotiationResponse {
        let start = Instant::now();
        let media_type = self.preferred_type(req);
        debug!(
            media_type = %media_type,
            available_generators = self.generators.len(),
            "Generator lookup"
        );

        let mut candidate: Option<NegotiationResponse> = None;
        match self.generators.get(media_type) {
            // The wildcard entry is only ever reached through the fallback below.
            Some(generator) if media_type != WILDCARD => {
                match self.invoke(generator.as_ref(), req).await {
                    Ok(Some(res)) if res.is_valid() => candidate = Some(res),
                    Ok(Some(res)) => warn!(
                        media_type = %media_type,
                        status = res.status,
                        "Generator returned an invalid response - falling back"
                    ),
                    Ok(None) => debug!(
                        media_type = %media_type,
                        "Generator declined - falling back"
                    ),
                    Err(error) => {
                        return self.fail(DispatchFailure::GeneratorFault {
                            media_type: media_type.to_string(),
                            error,
                        })
                    }
                }
            }
            _ => debug!(media_type = %media_type, "No generator registered - falling back"),
        }

        if candidate.is_none() {
            if let Some(wildcard) = self.generators.get(WILDCARD) {
                match self.invoke(wildcard.as_ref(), req).await {
                    Ok(res) => candidate = res,
                    Err(error) => return self.fail(DispatchFailure::WildcardFault { error }),
                }
            }
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        match candidate {
            Some(res) if res.status == 200 => {
                info!(media_type = %media_type, status = 200, latency_ms, "Response negotiated");
                res
            }
            Some(res) if res.is_valid() => {
                warn!(
                    media_type = %media_type,
                    original_status = res.status,
                    latency_ms,
                    "Generator returned non-200 status - forcing 200"
                );
                res.into_forced_ok()
            }
            _ => self.fail(DispatchFailure::MissingFinalResponse {
                media_type: media_type.to_string(),
            }),
        }
    }

    /// Run one generator to completion, turning panics and timeouts into faults.
    async fn invoke(&self, generator: &dyn Generator, req: &NegotiationRequest) -> GeneratorResult {
        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| generator.generate(req))) {
            Ok(future) => future,
            Err(payload) => return Err(GeneratorError::panicked(&*payload)),
        };
        let guarded = AssertUnwindSafe(future).catch_unwind();

        let outcome = match self.config.generator_timeout() {
            Some(limit) if timer_available() => {
                // A timer that fails while polling is reported as a fault too.
                match AssertUnwindSafe(tokio::time::timeout(limit, guarded))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(_)) => {
                        return Err(GeneratorError::timed_out(limit.as_millis() as u64));
                    }
                    Err(payload) => return Err(GeneratorError::panicked(&*payload)),
                }
            }
            Some(_) => {
                warn!("Generator timeout configured but no Tokio timer is available - running unbounded");
                guarded.await
            }
            None => guarded.await,
        };

        outcome.unwrap_or_else(|payload| Err(GeneratorError::panicked(&*payload)))
    }

    fn fail(&self, failure: DispatchFailure) -> NegotiationResponse {
        error!(
            code = failure.code(),
            error = %failure,
            "Dispatch failed - returning 500"
        );
        NegotiationResponse::json(500, failure.to_body())
    }
}

/// Whether the current context has a Tokio runtime with its time driver enabled.
///
/// Tokio exposes no query for the time driver; creating a sleep panics without one.
fn timer_available() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
        && std::panic::catch_unwind(|| drop(tokio::time::sleep(Duration::ZERO))).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::from_sync_fn;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(accept: &str) -> NegotiationRequest {
        NegotiationRequest::get("https://example.test/resource").with_header("accept", accept)
    }

    #[test]
    fn test_new_seeds_wildcard() {
        let negotiator = Negotiator::new();
        assert_eq!(negotiator.media_types(), vec![WILDCARD]);
    }

    #[test]
    fn test_len_counts_wildcard_and_replacements_once() {
        let mut negotiator = Negotiator::new();
        assert_eq!(negotiator.len(), 1);
        assert!(!negotiator.is_empty());
        negotiator.register("text/html", DefaultGenerator).unwrap();
        negotiator.register("text/html", DefaultGenerator).unwrap();
        negotiator.register("text/csv", DefaultGenerator).unwrap();
        assert!(negotiator.register("", DefaultGenerator).is_err());
        assert_eq!(negotiator.len(), 3);
    }

    #[test]
    fn test_register_trims_key() {
        let mut negotiator = Negotiator::new();
        negotiator
            .register("  text/html ", DefaultGenerator)
            .unwrap();
        assert!(negotiator.contains("text/html"));
        assert!(!negotiator.contains("  text/html "));
    }

    #[test]
    fn test_register_rejects_padded_wildcard() {
        let mut negotiator = Negotiator::new();
        let err = negotiator.register(" */* ", DefaultGenerator).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidArgument { .. }));
        assert_eq!(negotiator.media_types(), vec![WILDCARD]);
    }

    #[tokio::test]
    async fn test_wildcard_fault_returns_500() {
        let mut negotiator = Negotiator::new();
        negotiator.generators.insert(
            WILDCARD.to_string(),
            Arc::new(from_sync_fn(|_| Err(GeneratorError::new("fallback broke")))),
        );
        let res = negotiator.resolve(&request("text/html")).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["error"], "wildcard_fault");
        assert_eq!(res.body["media_type"], WILDCARD);
    }

    fn counting_wildcard(negotiator: &mut Negotiator) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        negotiator.generators.insert(
            WILDCARD.to_string(),
            Arc::new(from_sync_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some(DefaultGenerator::response()))
            })),
        );
        hits
    }

    #[tokio::test]
    async fn test_matched_fault_never_reaches_wildcard() {
        let mut negotiator = Negotiator::new();
        let wildcard_hits = counting_wildcard(&mut negotiator);
        negotiator
            .register(
                "text/html",
                from_sync_fn(|_| Err(GeneratorError::new("template missing"))),
            )
            .unwrap();
        negotiator
            .register("text/plain", from_sync_fn(|_| panic!("renderer exploded")))
            .unwrap();

        let res = negotiator.resolve(&request("text/html")).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["error"], "generator_fault");
        let res = negotiator.resolve(&request("text/plain")).await;
        assert_eq!(res.status, 500);
        assert_eq!(wildcard_hits.load(Ordering::SeqCst), 0);

        // Declining still falls back, exactly once.
        negotiator
            .register("text/csv", from_sync_fn(|_| Ok(None)))
            .unwrap();
        let res = negotiator.resolve(&request("text/csv")).await;
        assert_eq!(res.status, 200);
        assert_eq!(wildcard_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_timeout_without_time_driver_runs_unbounded() {
        let config = NegotiatorConfig {
            generator_timeout_ms: Some(50),
            ..NegotiatorConfig::default()
        };
        let mut negotiator = Negotiator::with_config(config);
        negotiator
            .register(
                "text/html",
                from_sync_fn(|_| Ok(Some(NegotiationResponse::text(200, "text/html", "<p>ok</p>")))),
            )
            .unwrap();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let res = runtime.block_on(negotiator.resolve(&request("text/html")));
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!("<p>ok</p>"));
    }

    #[tokio::test]
    async fn test_missing_wildcard_returns_500() {
        let mut negotiator = Negotiator::new();
        negotiator.generators.remove(WILDCARD);
        let res = negotiator.resolve(&request("text/html")).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["error"], "missing_final_response");
        assert_eq!(res.body["media_type"], "text/html");
    }

    #[tokio::test]
    async fn test_defective_wildcard_returns_500() {
        let mut negotiator = Negotiator::new();
        negotiator
            .generators
            .insert(WILDCARD.to_string(), Arc::new(from_sync_fn(|_| Ok(None))));
        let res = negotiator.resolve(&request("application/json")).await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body["error"], "missing_final_response");
    }

    #[tokio::test]
    async fn test_explicit_wildcard_preference_uses_fallback_once() {
        let negotiator = Negotiator::new();
        let res = negotiator.resolve(&request("*/*")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, json!({ "data": null }));
    }
}
