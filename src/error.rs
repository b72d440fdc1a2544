//! Error taxonomy for registration and dispatch.
//!
//! Only [`RegistrationError`] ever reaches a caller as an `Err`. Generator faults
//! are carried as [`GeneratorError`] and classified as a [`DispatchFailure`], which
//! `resolve` turns into a 500 response.

use std::fmt;

use serde_json::{json, Value};

/// Returned by `Negotiator::register` when its arguments are rejected.
///
/// The registry is left untouched whenever this error is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The media type is empty or is the reserved wildcard key.
    InvalidArgument {
        /// The rejected media type as supplied by the caller
        media_type: String,
        /// Human-readable reason
        reason: &'static str,
    },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::InvalidArgument { media_type, reason } => {
                write!(f, "invalid argument: media type '{media_type}' {reason}")
            }
        }
    }
}

impl std::error::Error for RegistrationError {}

/// A fault raised while a generator was producing a response.
///
/// Generators return this through their `Err` channel. The dispatcher also
/// synthesizes one when a generator panics or overruns its timeout.
#[derive(Debug)]
pub struct GeneratorError {
    message: String,
    source: Option<anyhow::Error>,
}

impl GeneratorError {
    /// Fault with a plain message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Fault wrapping an underlying error; the source chain is folded into the message.
    pub fn with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        let source = source.into();
        Self {
            message: format!("{}: {source:#}", message.into()),
            source: Some(source),
        }
    }

    pub(crate) fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new(format!("generator panicked: {detail}"))
    }

    pub(crate) fn timed_out(timeout_ms: u64) -> Self {
        Self::new(format!("generator did not complete within {timeout_ms}ms"))
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for GeneratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GeneratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| &**e as &(dyn std::error::Error + 'static))
    }
}

impl From<anyhow::Error> for GeneratorError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: format!("{err:#}"),
            source: Some(err),
        }
    }
}

/// Why a `resolve` call ended in an internal-error response.
#[derive(Debug)]
pub enum DispatchFailure {
    /// The generator registered for the preferred media type faulted.
    GeneratorFault {
        media_type: String,
        error: GeneratorError,
    },
    /// The wildcard generator faulted.
    WildcardFault { error: GeneratorError },
    /// Neither attempt left a valid response behind.
    MissingFinalResponse { media_type: String },
}

impl DispatchFailure {
    /// Stable machine-readable code, used as the `error` field of the 500 body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            DispatchFailure::GeneratorFault { .. } => "generator_fault",
            DispatchFailure::WildcardFault { .. } => "wildcard_fault",
            DispatchFailure::MissingFinalResponse { .. } => "missing_final_response",
        }
    }

    /// JSON body of the 500 response describing this failure.
    #[must_use]
    pub fn to_body(&self) -> Value {
        match self {
            DispatchFailure::GeneratorFault { media_type, error } => json!({
                "error": self.code(),
                "media_type": media_type,
                "message": error.to_string(),
            }),
            DispatchFailure::WildcardFault { error } => json!({
                "error": self.code(),
                "media_type": crate::WILDCARD,
                "message": error.to_string(),
            }),
            DispatchFailure::MissingFinalResponse { media_type } => json!({
                "error": self.code(),
                "media_type": media_type,
                "message": "no generator produced a valid response",
            }),
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchFailure::GeneratorFault { media_type, error } => {
                write!(f, "generator for '{media_type}' faulted: {error}")
            }
            DispatchFailure::WildcardFault { error } => {
                write!(f, "wildcard generator faulted: {error}")
            }
            DispatchFailure::MissingFinalResponse { media_type } => {
                write!(f, "no valid response for '{media_type}' after fallback")
            }
        }
    }
}

impl std::error::Error for DispatchFailure {}
