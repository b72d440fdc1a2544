//! # Dispatcher Module
//!
//! The dispatcher owns the media-type registry and resolves each request to
//! exactly one response.
//!
//! ## Overview
//!
//! - Generators are registered per media type (`text/html`, `application/json`, ...)
//! - The wildcard key `*/*` always holds the built-in fallback generator
//! - Each request is answered by at most one registered generator plus, when
//!   needed, the wildcard generator
//!
//! ## Registration
//!
//! ```rust
//! use conneg::generator::from_sync_fn;
//! use conneg::{Negotiator, NegotiationResponse};
//!
//! let mut negotiator = Negotiator::new();
//! negotiator
//!     .register("text/html", from_sync_fn(|req| {
//!         Ok(Some(NegotiationResponse::text(200, "text/html", format!("<p>{}</p>", req.url))))
//!     }))
//!     .expect("valid media type");
//!
//! // The wildcard key is reserved
//! assert!(negotiator.register("*/*", conneg::generator::DefaultGenerator).is_err());
//! ```
//!
//! ## Request Flow
//!
//! 1. Read the preference header (`accept` by default); absent means `application/json`
//! 2. Keep only the first comma-separated candidate, without parameters
//! 3. Invoke the generator registered for that type, if any
//! 4. If there was none, or it declined, invoke the wildcard generator
//! 5. Return the result with its status forced to 200
//!
//! ## Error Handling
//!
//! - A faulting (or panicking) registered generator yields a 500 response and
//!   the wildcard generator is **not** consulted
//! - A faulting wildcard generator yields a 500 response
//! - `resolve` itself never fails and never panics on generator misbehaviour
//!
//! ## Timeouts
//!
//! By default a hung generator hangs `resolve`. Setting
//! `generator_timeout_ms` turns an overrun into a fault on the path that timed
//! out.

mod core;

pub use core::{Negotiator, WILDCARD};
