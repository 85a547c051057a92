//! X.509 certificate record type and `x5c` decoding.
//!
//! [`Certificate`] is an owned, immutable value record produced at decode
//! time. The underlying parser's types never cross this module boundary;
//! callers needing deeper inspection should extend the record instead.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::Serialize;
use std::fmt;
use std::fmt::{Display, Formatter};
use time::OffsetDateTime;

use crate::cert::status::{classify_validity, CertificateStatus};

pub mod errors;
pub(crate) mod oids;
pub(crate) mod parsing;
pub mod status;

pub use errors::CertificateError;
pub use parsing::format_serial_number;

/// Sentinel value reported when a certificate carries no URI SAN.
pub const NO_SPIFFE_ID_FOUND: &str = "No SPIFFE ID found";

/// A decoded X.509 certificate from an `x5c` bundle entry.
///
/// Immutable once produced; a new bundle load replaces records wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// SPIFFE ID from the first URI SAN, or [`NO_SPIFFE_ID_FOUND`].
    pub spiffe_id: String,
    /// Subject as ordered `short=value` pairs joined with `", "`.
    pub subject: String,
    /// Issuer, formatted like the subject.
    pub issuer: String,
    /// Serial number as a plain lowercase hex string. See
    /// [`format_serial_number`] for the colon-grouped display form.
    pub serial_number: String,
    /// Start of the validity window.
    #[serde(with = "time::serde::rfc3339")]
    pub valid_from: OffsetDateTime,
    /// End of the validity window.
    #[serde(with = "time::serde::rfc3339")]
    pub valid_until: OffsetDateTime,
    /// Whether the reference time fell inside the validity window.
    pub is_valid: bool,
    /// Whole days until expiry; `None` outside the validity window.
    pub days_remaining: Option<i64>,
    /// Derived validity status.
    pub status: CertificateStatus,
    /// Public key family: `"RSA"`, `"EC"`, or `"Unknown"`.
    pub public_key_algorithm: String,
    /// Modulus bit length for RSA, curve name for EC.
    pub public_key_size: String,
    /// Signature algorithm name, or the dotted OID when unrecognized.
    pub signature_algorithm: String,
    /// Key usage flags.
    pub key_usage: KeyUsage,
    /// Human-readable extended key usage purposes.
    pub extended_key_usage: Vec<String>,
    /// Basic constraints.
    pub basic_constraints: BasicConstraints,
    /// Subject alternative names, in encoded order.
    pub subject_alt_names: Vec<SubjectAltName>,
    /// Subject key identifier as colon-grouped uppercase hex, if present.
    pub subject_key_identifier: Option<String>,
    /// Authority key identifier as colon-grouped uppercase hex, if present.
    pub authority_key_identifier: Option<String>,
    /// Public key parameters for display.
    pub public_key_params: PublicKeyParams,
    /// Canonical PEM encoding; byte-reproducible for the same DER input.
    pub pem_encoded: String,
    /// The original base64 DER string.
    pub der_encoded: String,
}

/// Key usage extension flags. Zero-valued when the extension is absent.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyUsage {
    /// digitalSignature bit.
    pub digital_signature: bool,
    /// keyEncipherment bit.
    pub key_encipherment: bool,
    /// keyAgreement bit.
    pub key_agreement: bool,
    /// keyCertSign bit.
    pub key_cert_sign: bool,
    /// cRLSign bit.
    pub crl_sign: bool,
    /// Whether the extension was marked critical.
    pub critical: bool,
}

/// Basic constraints extension. Zero-valued when the extension is absent.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicConstraints {
    /// The cA boolean.
    #[serde(rename = "cA")]
    pub ca: bool,
    /// Path length constraint, when encoded.
    pub path_len_constraint: Option<u32>,
    /// Whether the extension was marked critical.
    pub critical: bool,
}

/// A single subject-alternative-name entry.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SubjectAltName {
    /// The general-name type of the entry.
    #[serde(rename = "type")]
    pub kind: SanKind,
    /// The entry value; IP entries carry a formatted address when possible.
    pub value: String,
}

/// Subject-alternative-name general-name types recognized by the explorer.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize)]
pub enum SanKind {
    /// uniformResourceIdentifier (type 6).
    #[serde(rename = "URI")]
    Uri,
    /// dNSName (type 2).
    #[serde(rename = "DNS")]
    Dns,
    /// iPAddress (type 7).
    #[serde(rename = "IP")]
    Ip,
    /// rfc822Name (type 1).
    #[serde(rename = "EMAIL")]
    Email,
}

impl Display for SanKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            SanKind::Uri => "URI",
            SanKind::Dns => "DNS",
            SanKind::Ip => "IP",
            SanKind::Email => "EMAIL",
        };
        write!(f, "{s}")
    }
}

/// Public key parameters serialized for display.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "algorithm")]
pub enum PublicKeyParams {
    /// RSA modulus and exponent.
    #[serde(rename = "RSA")]
    Rsa {
        /// Base64 of the modulus's big-endian byte representation.
        modulus: String,
        /// Public exponent as a decimal string.
        exponent: String,
    },
    /// EC curve and point coordinates.
    #[serde(rename = "EC")]
    Ec {
        /// JWK curve name, or the dotted OID when unrecognized.
        curve: String,
        /// Base64 x coordinate, when the point form exposes one.
        x: Option<String>,
        /// Base64 y coordinate, when the point form exposes one.
        y: Option<String>,
    },
    /// No recognizable key family.
    #[serde(rename = "Unknown")]
    Unknown,
}

/// A non-fatal anomaly observed while decoding a certificate.
#[derive(Debug, Clone, Eq, PartialEq)]
#[non_exhaustive]
pub enum DecodeWarning {
    /// The certificate carries more than one URI SAN, which violates the
    /// SPIFFE Bundle specification. The first entry still wins.
    MultipleUriSans {
        /// Number of URI SAN entries found.
        count: usize,
    },
}

impl Display for DecodeWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::MultipleUriSans { count } => write!(
                f,
                "certificate has {count} URI SANs - SPIFFE spec violation, using the first"
            ),
        }
    }
}

/// A decoded certificate together with any non-fatal warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCertificate {
    /// The structured certificate record.
    pub certificate: Certificate,
    /// Anomalies that did not prevent the decode.
    pub warnings: Vec<DecodeWarning>,
}

impl Certificate {
    /// Decodes a base64 DER `x5c` entry into a structured record.
    ///
    /// `now` is the reference time for validity classification; it is an
    /// explicit input so the result is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError`] when the entry is not valid base64 or the
    /// decoded bytes are not a well-formed DER-encoded X.509 certificate.
    pub fn from_x5c(
        x5c_entry: &str,
        now: OffsetDateTime,
    ) -> Result<DecodedCertificate, CertificateError> {
        let der = BASE64_STANDARD.decode(x5c_entry)?;
        Self::build(&der, x5c_entry.to_string(), now)
    }

    /// Decodes raw DER bytes into a structured record.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError`] when the bytes are not a well-formed
    /// DER-encoded X.509 certificate.
    pub fn from_der(
        der: &[u8],
        now: OffsetDateTime,
    ) -> Result<DecodedCertificate, CertificateError> {
        let encoded = BASE64_STANDARD.encode(der);
        Self::build(der, encoded, now)
    }

    fn build(
        der: &[u8],
        der_encoded: String,
        now: OffsetDateTime,
    ) -> Result<DecodedCertificate, CertificateError> {
        let extracted = parsing::extract_certificate(der)?;

        let mut warnings = Vec::new();
        let uri_sans: Vec<&SubjectAltName> = extracted
            .subject_alt_names
            .iter()
            .filter(|san| san.kind == SanKind::Uri)
            .collect();
        let spiffe_id = match uri_sans.first() {
            Some(san) => san.value.clone(),
            None => NO_SPIFFE_ID_FOUND.to_string(),
        };
        if uri_sans.len() > 1 {
            warnings.push(DecodeWarning::MultipleUriSans {
                count: uri_sans.len(),
            });
        }

        let validity = classify_validity(extracted.valid_from, extracted.valid_until, now);

        let certificate = Certificate {
            spiffe_id,
            subject: extracted.subject,
            issuer: extracted.issuer,
            serial_number: extracted.serial_number,
            valid_from: extracted.valid_from,
            valid_until: extracted.valid_until,
            is_valid: validity.is_valid,
            days_remaining: validity.days_remaining,
            status: validity.status,
            public_key_algorithm: extracted.public_key_algorithm,
            public_key_size: extracted.public_key_size,
            signature_algorithm: extracted.signature_algorithm,
            key_usage: extracted.key_usage,
            extended_key_usage: extracted.extended_key_usage,
            basic_constraints: extracted.basic_constraints,
            subject_alt_names: extracted.subject_alt_names,
            subject_key_identifier: extracted.subject_key_identifier,
            authority_key_identifier: extracted.authority_key_identifier,
            public_key_params: extracted.public_key_params,
            pem_encoded: parsing::encode_pem(der),
            der_encoded,
        };

        Ok(DecodedCertificate {
            certificate,
            warnings,
        })
    }

    /// Serial number in the colon-grouped display form, e.g. `"1a:2b:3c"`.
    pub fn display_serial_number(&self) -> String {
        format_serial_number(&self.serial_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_756_000_000).unwrap()
    }

    #[test]
    fn test_from_x5c_rejects_invalid_base64() {
        let err = Certificate::from_x5c("not-valid-base64!!!", now()).unwrap_err();
        assert!(matches!(err, CertificateError::DecodeBase64(_)));
    }

    #[test]
    fn test_from_x5c_rejects_non_der_payload() {
        // Valid base64 of bytes that are not a DER certificate.
        let entry = BASE64_STANDARD.encode(b"clearly not a certificate");
        let err = Certificate::from_x5c(&entry, now()).unwrap_err();
        assert!(matches!(err, CertificateError::ParseX509Certificate(_)));
    }

    #[test]
    fn test_from_der_rejects_empty_input() {
        let err = Certificate::from_der(&[], now()).unwrap_err();
        assert!(matches!(err, CertificateError::ParseX509Certificate(_)));
    }
}
