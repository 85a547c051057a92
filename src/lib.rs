#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

//! Explorer for [SPIFFE trust bundles](https://github.com/spiffe/spiffe/blob/main/standards/SPIFFE_Trust_Domain_and_Bundle.md).
//!
//! This crate takes a trust bundle document (a JWKS-shaped JSON structure
//! carrying cryptographic key material) and produces a structured,
//! human-inspectable model of the identities and certificates it contains.
//! It is an explorer, not a verifier: certificate chains and signatures are
//! never validated, and trust decisions are out of scope.
//!
//! Bundle keys are partitioned by their `use` member into JWT-SVID,
//! X.509-SVID, and WIT-SVID groups. Each `x5c` entry of an X.509-SVID key is
//! decoded from base64 DER into a [`Certificate`] record: identity fields,
//! validity window and status, X.509 extensions, public key parameters, and a
//! reproducible PEM form. Recoverable anomalies (a malformed key, multiple
//! URI SANs, a missing certificate chain) are collected as [`Diagnostic`]
//! entries alongside the classified output instead of aborting it.
//!
//! ```no_run
//! use spiffe_bundle_explorer::Bundle;
//! use time::OffsetDateTime;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bundle_json = std::fs::read("bundle.json")?;
//! let bundle = Bundle::from_json(&bundle_json)?;
//!
//! let classified = bundle.classify(OffsetDateTime::now_utc());
//!
//! for entry in &classified.x509_keys {
//!     for cert in &entry.certificates {
//!         println!("{} expires {}", cert.spiffe_id, cert.valid_until);
//!     }
//! }
//! for diagnostic in &classified.diagnostics {
//!     eprintln!("warning: {diagnostic}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! All operations are synchronous, pure functions of their inputs; the
//! reference time used for validity classification is always an explicit
//! parameter, never an implicit wall-clock read.

pub mod bundle;
pub mod cert;
pub mod spiffe_id;

pub use crate::bundle::{
    Bundle, BundleError, ClassifiedBundle, Diagnostic, Jwk, JwtKeyEntry, X509KeyEntry,
};
pub use crate::cert::status::{classify_validity, CertificateStatus, ValidityStatus};
pub use crate::cert::{
    BasicConstraints, Certificate, CertificateError, DecodeWarning, DecodedCertificate, KeyUsage,
    PublicKeyParams, SanKind, SubjectAltName,
};
pub use crate::spiffe_id::{SpiffeId, SpiffeIdError};
