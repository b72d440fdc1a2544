//! # conneg
//!
//! **conneg** is a content-negotiation dispatcher for request-interception
//! hosts: a Service Worker style fetch hook, an edge function, or an in-process
//! HTTP service. It picks one registered generator by the request's preferred
//! media type and guarantees that every request is answered.
//!
//! ## Architecture
//!
//! - **[`dispatcher`]** - the [`Negotiator`]: media-type registry and `resolve`
//! - **[`generator`]** - the [`Generator`] capability, closure adapters, wildcard default
//! - **[`message`]** - request/response value objects and `http` conversions
//! - **[`preference`]** - extraction of the single preferred media type
//! - **[`error`]** - registration and dispatch error taxonomy
//! - **[`config`]** - settings from defaults, YAML, and environment
//! - **[`telemetry`]** - `tracing-subscriber` setup
//!
//! ### Resolve Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant Negotiator
//!     participant Generator as Generator<br/>(preferred type)
//!     participant Wildcard as Wildcard<br/>(*/*)
//!
//!     Host->>Negotiator: resolve(request)
//!     Negotiator->>Negotiator: first Accept candidate,<br/>parameters stripped
//!
//!     alt Generator registered
//!         Negotiator->>Generator: generate(request)
//!         alt Fault or panic
//!             Negotiator-->>Host: 500 generator_fault
//!         end
//!     end
//!
//!     alt No generator, declined, or invalid response
//!         Negotiator->>Wildcard: generate(request)
//!         alt Fault
//!             Negotiator-->>Host: 500 wildcard_fault
//!         end
//!     end
//!
//!     Negotiator-->>Host: response, status forced to 200
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use conneg::generator::from_fn;
//! use conneg::{NegotiationRequest, NegotiationResponse, Negotiator};
//!
//! # tokio_test_block(async {
//! let mut negotiator = Negotiator::new();
//! negotiator
//!     .register("text/csv", from_fn(|_req| async move {
//!         Ok(Some(NegotiationResponse::text(200, "text/csv", "id,name\n1,Fluffy\n")))
//!     }))
//!     .expect("register");
//!
//! let req = NegotiationRequest::get("/pets").with_header("Accept", "text/csv;q=0.9, */*");
//! let res = negotiator.resolve(&req).await;
//! assert_eq!(res.status, 200);
//! assert_eq!(res.get_header("content-type"), Some("text/csv"));
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Runtime Considerations
//!
//! `resolve` is a plain future and works on any executor. Only the optional
//! generator timeout needs a Tokio runtime; without one it is skipped with a
//! warning.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod generator;
pub mod ids;
pub mod message;
pub mod preference;
pub mod telemetry;

pub use config::NegotiatorConfig;
pub use dispatcher::{Negotiator, WILDCARD};
pub use error::{DispatchFailure, GeneratorError, RegistrationError};
pub use generator::{Generator, GeneratorResult};
pub use message::{HeaderVec, NegotiationRequest, NegotiationResponse};
