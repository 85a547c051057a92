//! Bundle input detection and validation.
//!
//! A bundle can arrive either as a URL to fetch or as inline JSON pasted by
//! the user. Detection is shape-based: a leading `{` means JSON, a known URL
//! scheme means URL. Validation additionally enforces the transport policy
//! for URLs (HTTPS, with a localhost escape hatch for testing) and the
//! minimal structure for JSON.

use serde_json::Value;
use thiserror::Error;

/// The recognized shape of a bundle input string.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum InputKind {
    /// A URL to fetch the bundle document from.
    Url,
    /// An inline JSON bundle document.
    Json,
}

/// An error rejecting a bundle input string.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum InputError {
    /// The input is empty or whitespace.
    #[error("URL or bundle JSON is required")]
    Empty,

    /// The input starts like JSON but does not parse.
    #[error("invalid JSON format")]
    InvalidJson,

    /// The JSON parses but lacks a `keys` array.
    #[error("invalid bundle structure: missing 'keys' array")]
    MissingKeys,

    /// The URL uses plain HTTP outside of localhost.
    #[error("URL must use HTTPS protocol (or http://localhost for testing)")]
    InsecureUrl,

    /// The input is neither a URL nor JSON.
    #[error("input must be either a valid HTTPS URL or bundle JSON")]
    Unrecognized,
}

/// Detects whether an input string is a URL or inline JSON.
///
/// Returns `None` when the input is neither: empty, a leading `{` that is
/// not valid JSON, or text with no recognized URL scheme.
pub fn detect_input_kind(input: &str) -> Option<InputKind> {
    let trimmed = input.trim();

    if trimmed.starts_with('{') {
        return serde_json::from_str::<Value>(trimmed)
            .ok()
            .map(|_| InputKind::Json);
    }

    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        return Some(InputKind::Url);
    }

    None
}

/// Validates a bundle input string and reports its kind.
///
/// JSON inputs must parse and carry a `keys` array. URL inputs must use
/// HTTPS; plain HTTP is allowed only for localhost.
///
/// # Errors
///
/// Returns an [`InputError`] naming the first problem found.
pub fn validate_input(input: &str) -> Result<InputKind, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }

    if trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed).map_err(|_| InputError::InvalidJson)?;
        if value.get("keys").and_then(Value::as_array).is_none() {
            return Err(InputError::MissingKeys);
        }
        return Ok(InputKind::Json);
    }

    if trimmed.starts_with("https://") || trimmed.starts_with("http://localhost") {
        return Ok(InputKind::Url);
    }
    if trimmed.starts_with("http://") {
        return Err(InputError::InsecureUrl);
    }

    Err(InputError::Unrecognized)
}

#[cfg(test)]
mod input_tests {
    use super::*;

    #[test]
    fn test_detect_json() {
        assert_eq!(detect_input_kind(r#"{"keys": []}"#), Some(InputKind::Json));
        assert_eq!(
            detect_input_kind("  {\"keys\": []}\n"),
            Some(InputKind::Json)
        );
    }

    #[test]
    fn test_detect_url() {
        assert_eq!(
            detect_input_kind("https://example.org/bundle"),
            Some(InputKind::Url)
        );
        assert_eq!(
            detect_input_kind("http://localhost:8443/bundle"),
            Some(InputKind::Url)
        );
    }

    #[test]
    fn test_detect_rejects_broken_json_and_plain_text() {
        assert_eq!(detect_input_kind("{not json"), None);
        assert_eq!(detect_input_kind("just some text"), None);
        assert_eq!(detect_input_kind(""), None);
    }

    #[test]
    fn test_validate_json_requires_keys_array() {
        assert_eq!(validate_input(r#"{"keys": []}"#), Ok(InputKind::Json));
        assert_eq!(validate_input(r#"{}"#), Err(InputError::MissingKeys));
        assert_eq!(
            validate_input(r#"{"keys": "nope"}"#),
            Err(InputError::MissingKeys)
        );
        assert_eq!(validate_input("{broken"), Err(InputError::InvalidJson));
    }

    #[test]
    fn test_validate_url_transport_policy() {
        assert_eq!(
            validate_input("https://example.org/bundle"),
            Ok(InputKind::Url)
        );
        assert_eq!(
            validate_input("http://localhost:8080/bundle"),
            Ok(InputKind::Url)
        );
        assert_eq!(
            validate_input("http://example.org/bundle"),
            Err(InputError::InsecureUrl)
        );
    }

    #[test]
    fn test_validate_empty_and_unrecognized() {
        assert_eq!(validate_input("   "), Err(InputError::Empty));
        assert_eq!(
            validate_input("ftp://example.org"),
            Err(InputError::Unrecognized)
        );
    }
}
