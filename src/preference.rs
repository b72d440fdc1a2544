//! Extraction of the single preferred media type from a preference header.
//!
//! This is deliberately not RFC 9110 negotiation: only the first listed
//! candidate counts, parameters (including `q=`) are dropped, and no ranking or
//! `type/*` matching happens.

/// Pick the preferred media type out of a raw header value.
///
/// Takes the first comma-separated candidate and the part of it before the
/// first `;`, trimmed. Returns `None` when that leaves nothing.
///
/// ```
/// use conneg::preference::first_candidate;
///
/// assert_eq!(first_candidate("text/html;q=0.9, application/json"), Some("text/html"));
/// assert_eq!(first_candidate(" ;q=1"), None);
/// ```
#[must_use]
pub fn first_candidate(header_value: &str) -> Option<&str> {
    let first = header_value.split(',').next().unwrap_or_default();
    let media_type = first.split(';').next().unwrap_or_default().trim();
    (!media_type.is_empty()).then_some(media_type)
}

/// Preferred media type for a possibly absent header value.
///
/// A missing header, or one with an empty first candidate, yields `default`.
#[must_use]
pub fn preferred_type<'a>(header_value: Option<&'a str>, default: &'a str) -> &'a str {
    header_value.and_then(first_candidate).unwrap_or(default)
}
