//! Error type for X.509 certificate decoding.

use x509_parser::error::X509Error;

/// An error that may arise decoding an `x5c` certificate entry.
///
/// These errors are fatal only for the single entry being decoded; bundle
/// classification isolates them per key.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateError {
    /// The `x5c` entry is not valid base64.
    #[error("failed decoding base64 certificate entry")]
    DecodeBase64(#[from] base64::DecodeError),

    /// Error returned by the X.509 parsing library.
    #[error("failed parsing DER-encoded X.509 certificate")]
    ParseX509Certificate(#[from] X509Error),
}
