//! Trust bundle document type and key classification.
//!
//! A bundle is a JWKS-shaped JSON document whose keys are routed by their
//! `use` member into JWT-SVID, X.509-SVID, and WIT-SVID groups. Individual
//! malformed keys never abort classification; they are skipped and recorded
//! as [`Diagnostic`] entries so the caller always sees the partial result set.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use thiserror::Error;
use time::OffsetDateTime;

use crate::cert::{Certificate, DecodeWarning};
use crate::spiffe_id::SpiffeId;

pub mod input;

/// A SPIFFE trust bundle document, parsed but not yet classified.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    sequence: Option<u64>,
    refresh_hint: Option<u64>,
    keys: Vec<Value>,
}

/// An error that can arise parsing a [`Bundle`] document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BundleError {
    /// The document lacks a `keys` array. This is the single fatal,
    /// whole-input error; everything else degrades to diagnostics.
    #[error("invalid bundle structure: missing 'keys' array")]
    MissingKeys,

    /// The input is not valid JSON.
    #[error("cannot deserialize bundle json")]
    Deserialize(#[from] serde_json::Error),
}

/// A JSON Web Key as carried in a trust bundle.
///
/// All members are optional at this layer; classification decides what a key
/// of a given `use` actually requires. Members the explorer does not
/// interpret (`key_ops`, `x5t`, `x5t#S256`, ...) are passed through in
/// [`Jwk::additional`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, e.g. `RSA` or `EC`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,
    /// Public key use; routes the key during classification.
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Key ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// EC curve name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// EC x coordinate (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// EC y coordinate (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// X.509 certificate chain as base64 DER entries, ordered leaf first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,
    /// Uninterpreted members, passed through verbatim.
    #[serde(flatten)]
    pub additional: BTreeMap<String, Value>,
}

/// A JWT-SVID or WIT-SVID key with its display identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JwtKeyEntry {
    /// `kid` when present, else a positional identifier.
    pub id: String,
    /// The original JWK.
    pub jwk: Jwk,
}

/// An X.509-SVID key with its decoded certificate chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct X509KeyEntry {
    /// Positional identifier, `x509-{index}`.
    pub id: String,
    /// The original JWK.
    pub jwk: Jwk,
    /// Decoded certificates in chain order, leaf first.
    pub certificates: Vec<Certificate>,
}

/// A recoverable anomaly recorded while classifying a bundle.
///
/// Diagnostics replace console warnings: callers can surface or assert on
/// them without capturing log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum Diagnostic {
    /// A key could not be deserialized as a JWK.
    MalformedKey {
        /// Position of the key in the bundle's `keys` array.
        index: usize,
        /// Deserialization failure detail.
        detail: String,
    },
    /// A key carries an unknown or missing `use` member.
    UnknownKeyUse {
        /// Position of the key in the bundle's `keys` array.
        index: usize,
        /// The unrecognized `use` value, when present.
        key_use: Option<String>,
    },
    /// An X.509-SVID key has an empty or missing `x5c` chain.
    MissingCertificateChain {
        /// Position of the key in the bundle's `keys` array.
        index: usize,
    },
    /// An `x5c` entry failed to decode; the whole key grouping was skipped.
    MalformedCertificate {
        /// Position of the key in the bundle's `keys` array.
        index: usize,
        /// Decode failure detail.
        detail: String,
    },
    /// A certificate carries multiple URI SANs (SPIFFE spec violation).
    MultipleUriSans {
        /// Position of the key in the bundle's `keys` array.
        index: usize,
        /// Number of URI SAN entries found.
        count: usize,
    },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedKey { index, detail } => {
                write!(f, "failed to parse key at index {index}: {detail}")
            }
            Diagnostic::UnknownKeyUse { index, key_use } => match key_use {
                Some(u) => write!(f, "unknown 'use' parameter '{u}' for key at index {index}"),
                None => write!(f, "missing 'use' parameter for key at index {index}"),
            },
            Diagnostic::MissingCertificateChain { index } => {
                write!(f, "X.509 SVID key at index {index} missing x5c parameter")
            }
            Diagnostic::MalformedCertificate { index, detail } => {
                write!(
                    f,
                    "failed to decode certificate for key at index {index}: {detail}"
                )
            }
            Diagnostic::MultipleUriSans { index, count } => {
                write!(
                    f,
                    "key at index {index}: certificate has {count} URI SANs - SPIFFE spec violation"
                )
            }
        }
    }
}

/// The classified output of one bundle: keys partitioned by SVID type plus
/// the diagnostics collected along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedBundle {
    /// JWT-SVID keys.
    pub jwt_keys: Vec<JwtKeyEntry>,
    /// X.509-SVID keys with decoded certificate chains.
    pub x509_keys: Vec<X509KeyEntry>,
    /// WIT-SVID keys.
    pub wit_keys: Vec<JwtKeyEntry>,
    /// Recoverable anomalies observed during classification.
    pub diagnostics: Vec<Diagnostic>,
}

impl ClassifiedBundle {
    /// Total number of successfully classified keys across all groups.
    pub fn total_keys(&self) -> usize {
        self.jwt_keys.len() + self.x509_keys.len() + self.wit_keys.len()
    }

    /// Best-effort trust domain discovery from the first X.509 leaf's
    /// SPIFFE ID. An unparseable or absent SPIFFE ID yields `None`, never an
    /// error.
    pub fn trust_domain(&self) -> Option<String> {
        let cert = self.x509_keys.first()?.certificates.first()?;
        SpiffeId::new(&cert.spiffe_id)
            .ok()
            .map(|id| id.trust_domain().to_string())
    }
}

impl Bundle {
    /// Parses a bundle document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::Deserialize`] for invalid JSON and
    /// [`BundleError::MissingKeys`] when the document has no `keys` array.
    ///
    /// # Examples
    ///
    /// ```
    /// use spiffe_bundle_explorer::Bundle;
    ///
    /// let bundle = Bundle::from_json(br#"{"spiffe_sequence": 3, "keys": []}"#).unwrap();
    /// assert_eq!(bundle.sequence(), Some(3));
    /// assert!(bundle.keys().is_empty());
    /// ```
    pub fn from_json(json: &[u8]) -> Result<Self, BundleError> {
        let value: Value = serde_json::from_slice(json)?;
        Self::from_value(value)
    }

    /// Builds a bundle from an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError::MissingKeys`] when the value has no `keys` array.
    pub fn from_value(value: Value) -> Result<Self, BundleError> {
        let keys = value
            .get("keys")
            .and_then(Value::as_array)
            .ok_or(BundleError::MissingKeys)?
            .clone();

        Ok(Self {
            sequence: value.get("spiffe_sequence").and_then(Value::as_u64),
            refresh_hint: value.get("spiffe_refresh_hint").and_then(Value::as_u64),
            keys,
        })
    }

    /// The bundle's `spiffe_sequence` version number, when present.
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// The bundle's `spiffe_refresh_hint` in seconds, when present.
    pub fn refresh_hint_seconds(&self) -> Option<u64> {
        self.refresh_hint
    }

    /// The raw key entries of the bundle.
    pub fn keys(&self) -> &[Value] {
        &self.keys
    }

    /// Partitions the bundle's keys into JWT-SVID, X.509-SVID, and WIT-SVID
    /// groups, decoding every `x5c` certificate entry along the way.
    ///
    /// Keys are processed independently: a malformed key, an unknown `use`,
    /// or a certificate decode failure skips that key with a [`Diagnostic`]
    /// and never aborts its siblings. `now` is the reference time for
    /// certificate validity classification.
    pub fn classify(&self, now: OffsetDateTime) -> ClassifiedBundle {
        let mut classified = ClassifiedBundle::default();

        for (index, raw_key) in self.keys.iter().enumerate() {
            let jwk: Jwk = match serde_json::from_value(raw_key.clone()) {
                Ok(jwk) => jwk,
                Err(e) => {
                    push_diagnostic(
                        &mut classified.diagnostics,
                        Diagnostic::MalformedKey {
                            index,
                            detail: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            let key_use = jwk.key_use.as_deref().map(str::to_ascii_lowercase);
            match key_use.as_deref() {
                Some("jwt-svid") => {
                    let id = jwk.kid.clone().unwrap_or_else(|| format!("jwt-{index}"));
                    classified.jwt_keys.push(JwtKeyEntry { id, jwk });
                }
                Some("wit-svid") => {
                    let id = jwk.kid.clone().unwrap_or_else(|| format!("wit-{index}"));
                    classified.wit_keys.push(JwtKeyEntry { id, jwk });
                }
                Some("x509-svid") => {
                    self.classify_x509_key(index, jwk, now, &mut classified);
                }
                other => {
                    push_diagnostic(
                        &mut classified.diagnostics,
                        Diagnostic::UnknownKeyUse {
                            index,
                            key_use: other.map(str::to_string),
                        },
                    );
                }
            }
        }

        classified
    }

    fn classify_x509_key(
        &self,
        index: usize,
        jwk: Jwk,
        now: OffsetDateTime,
        classified: &mut ClassifiedBundle,
    ) {
        let x5c = match jwk.x5c.as_ref().filter(|chain| !chain.is_empty()) {
            Some(chain) => chain,
            None => {
                push_diagnostic(
                    &mut classified.diagnostics,
                    Diagnostic::MissingCertificateChain { index },
                );
                return;
            }
        };

        let mut certificates = Vec::with_capacity(x5c.len());
        for entry in x5c {
            match Certificate::from_x5c(entry, now) {
                Ok(decoded) => {
                    for warning in &decoded.warnings {
                        let DecodeWarning::MultipleUriSans { count } = warning;
                        push_diagnostic(
                            &mut classified.diagnostics,
                            Diagnostic::MultipleUriSans {
                                index,
                                count: *count,
                            },
                        );
                    }
                    certificates.push(decoded.certificate);
                }
                Err(e) => {
                    // One bad entry discards the whole grouping but never
                    // the sibling keys.
                    push_diagnostic(
                        &mut classified.diagnostics,
                        Diagnostic::MalformedCertificate {
                            index,
                            detail: e.to_string(),
                        },
                    );
                    return;
                }
            }
        }

        classified.x509_keys.push(X509KeyEntry {
            id: format!("x509-{index}"),
            jwk,
            certificates,
        });
    }
}

fn push_diagnostic(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    log::warn!("{diagnostic}");
    diagnostics.push(diagnostic);
}

/// Renders a duration in seconds as its most significant unit, e.g. the
/// bundle refresh hint: `"2 days"`, `"3 hours"`, `"45 minutes"`.
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{days} day{}", if days != 1 { "s" } else { "" })
    } else if hours > 0 {
        format!("{hours} hour{}", if hours != 1 { "s" } else { "" })
    } else {
        format!("{minutes} minute{}", if minutes != 1 { "s" } else { "" })
    }
}
