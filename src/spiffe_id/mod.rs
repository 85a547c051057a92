//! SPIFFE-ID type and URI grammar validation.

use std::convert::TryFrom;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

const SPIFFE_SCHEME: &str = "spiffe";
const SCHEME_PREFIX: &str = "spiffe://";

/// Represents a [SPIFFE ID](https://github.com/spiffe/spiffe/blob/main/standards/SPIFFE-ID.md#2-spiffe-identity).
///
/// The input string is decomposed as-is: no case folding, percent-decoding,
/// or other normalization is performed, so [`SpiffeId::to_string`]
/// reconstructs exactly the string that was parsed.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SpiffeId {
    trust_domain: String,
    path: String,
}

/// An error that can arise parsing a SPIFFE ID.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum SpiffeIdError {
    /// An empty string cannot be parsed as a SPIFFE ID.
    #[error("cannot be empty")]
    Empty,

    /// A SPIFFE ID must start with the 'spiffe://' scheme.
    #[error("scheme is missing or invalid")]
    WrongScheme,

    /// The trust domain name of a SPIFFE ID cannot be empty.
    #[error("trust domain is missing")]
    MissingTrustDomain,

    /// The trust domain name contains a character that is not allowed.
    #[error("trust domain contains invalid characters")]
    BadTrustDomainChar,

    /// Path cannot contain empty segments, e.g '//'.
    #[error("path cannot contain empty segments")]
    EmptySegment,

    /// Path cannot have a trailing slash.
    #[error("path cannot have a trailing slash")]
    TrailingSlash,
}

impl SpiffeId {
    /// Attempts to parse a SPIFFE ID from the given id string.
    ///
    /// # Arguments
    ///
    /// * `id` - A SPIFFE ID, e.g. 'spiffe://trustdomain/path/other'
    ///
    /// # Errors
    ///
    /// If the function cannot parse the input as a SPIFFE ID, a [`SpiffeIdError`] variant will be returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use spiffe_bundle_explorer::spiffe_id::SpiffeId;
    ///
    /// let spiffe_id = SpiffeId::new("spiffe://trustdomain/path").unwrap();
    /// assert_eq!("trustdomain", spiffe_id.trust_domain());
    /// assert_eq!("/path", spiffe_id.path());
    /// ```
    pub fn new(id: &str) -> Result<Self, SpiffeIdError> {
        if id.is_empty() {
            return Err(SpiffeIdError::Empty);
        }

        if !id.starts_with(SCHEME_PREFIX) {
            return Err(SpiffeIdError::WrongScheme);
        }

        let rest = &id[SCHEME_PREFIX.len()..];
        if rest.is_empty() {
            return Err(SpiffeIdError::MissingTrustDomain);
        }

        let i = rest.find('/').unwrap_or(rest.len());
        if i == 0 {
            // Path attached directly to the scheme, no trust domain.
            return Err(SpiffeIdError::MissingTrustDomain);
        }

        let trust_domain = &rest[..i];
        if trust_domain.contains(' ') {
            return Err(SpiffeIdError::BadTrustDomainChar);
        }

        let path = &rest[i..];
        if !path.is_empty() {
            validate_path(path)?;
        }

        Ok(Self {
            trust_domain: trust_domain.to_string(),
            path: path.to_string(),
        })
    }

    /// Returns the trust domain of the SPIFFE ID. Never empty.
    pub fn trust_domain(&self) -> &str {
        &self.trust_domain
    }

    /// Returns the path of the SPIFFE ID. Either empty or starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Display for SpiffeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", SPIFFE_SCHEME, self.trust_domain, self.path)
    }
}

impl FromStr for SpiffeId {
    type Err = SpiffeIdError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        Self::new(id)
    }
}

impl TryFrom<String> for SpiffeId {
    type Error = SpiffeIdError;
    fn try_from(s: String) -> Result<SpiffeId, Self::Error> {
        Self::new(s.as_ref())
    }
}

impl TryFrom<&str> for SpiffeId {
    type Error = SpiffeIdError;
    fn try_from(s: &str) -> Result<SpiffeId, Self::Error> {
        Self::new(s)
    }
}

/// Validates a non-empty SPIFFE ID path: it must start with `/`, contain no
/// empty segments, and have no trailing slash.
fn validate_path(path: &str) -> Result<(), SpiffeIdError> {
    if !path.starts_with('/') {
        return Err(SpiffeIdError::EmptySegment);
    }

    if path.contains("//") {
        return Err(SpiffeIdError::EmptySegment);
    }

    if path.ends_with('/') {
        return Err(SpiffeIdError::TrailingSlash);
    }

    Ok(())
}

#[cfg(test)]
mod spiffe_id_tests {
    use std::str::FromStr;

    use super::*;

    macro_rules! spiffe_id_success_tests {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (input, expected_trust_domain, expected_path) = $value;
                let spiffe_id = SpiffeId::from_str(input).unwrap();
                assert_eq!(spiffe_id.trust_domain(), expected_trust_domain);
                assert_eq!(spiffe_id.path(), expected_path);

                // Reconstruction is exact, byte for byte.
                assert_eq!(spiffe_id.to_string(), input);
            }
        )*
        }
    }

    spiffe_id_success_tests! {
        from_trust_domain_only: ("spiffe://trustdomain", "trustdomain", ""),
        from_id_with_path: ("spiffe://trustdomain/path/element", "trustdomain", "/path/element"),
        from_id_with_dotted_domain: ("spiffe://example.org/workload/web", "example.org", "/workload/web"),
        from_id_with_uppercase: ("spiffe://Example.ORG/Workload", "Example.ORG", "/Workload"),
        from_id_with_percent_encoding_kept_verbatim: (
            "spiffe://example.org/p%20th", "example.org", "/p%20th"
        ),
    }

    macro_rules! spiffe_id_error_tests {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (input, expected_error) = $value;
                let error = SpiffeId::from_str(input).unwrap_err();
                assert_eq!(error, expected_error);
            }
        )*
        }
    }

    spiffe_id_error_tests! {
        from_empty_str: ("", SpiffeIdError::Empty),
        from_str_without_scheme: ("example.org/path", SpiffeIdError::WrongScheme),
        from_str_with_other_scheme: ("http://domain.test/path", SpiffeIdError::WrongScheme),
        from_str_scheme_only: ("spiffe://", SpiffeIdError::MissingTrustDomain),
        from_str_empty_trust_domain: ("spiffe:///path", SpiffeIdError::MissingTrustDomain),
        from_str_trust_domain_with_space: ("spiffe://domain .test/path", SpiffeIdError::BadTrustDomainChar),
        from_str_path_with_empty_segment: ("spiffe://a.b//c", SpiffeIdError::EmptySegment),
        from_str_path_with_trailing_slash: ("spiffe://a.b/c/", SpiffeIdError::TrailingSlash),
        from_str_root_slash_only: ("spiffe://test.org/", SpiffeIdError::TrailingSlash),
        from_str_double_slash_only: ("spiffe://test.org//", SpiffeIdError::EmptySegment),
    }

    #[test]
    fn test_try_from_string() {
        let spiffe_id = SpiffeId::try_from(String::from("spiffe://example.org/path")).unwrap();

        assert_eq!(spiffe_id.trust_domain(), "example.org");
        assert_eq!(spiffe_id.path(), "/path");
    }

    #[test]
    fn test_try_from_str() {
        let spiffe_id = SpiffeId::try_from("spiffe://example.org").unwrap();

        assert_eq!(spiffe_id.trust_domain(), "example.org");
        assert_eq!(spiffe_id.path(), "");
    }
}
