//! Internal DER extraction and formatting helpers.
//!
//! The x509-parser handle stays inside this module; everything crossing the
//! boundary is copied into owned, structured data.

use crate::cert::errors::CertificateError;
use crate::cert::oids::{curve_name, signature_algorithm_name};
use crate::cert::{BasicConstraints, KeyUsage, PublicKeyParams, SanKind, SubjectAltName};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use std::fmt::Write as _;
use std::net::{Ipv4Addr, Ipv6Addr};
use time::OffsetDateTime;
use x509_parser::certificate::X509Certificate;
use x509_parser::error::X509Error;
use x509_parser::extensions::{GeneralName, ParsedExtension};
use x509_parser::nom::Err;
use x509_parser::objects::{oid2abbrev, oid_registry};
use x509_parser::public_key::PublicKey;
use x509_parser::x509::X509Name;

const PEM_LINE_WIDTH: usize = 64;

/// Everything extracted from one DER-encoded certificate, fully owned.
pub(crate) struct ExtractedCertificate {
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub valid_from: OffsetDateTime,
    pub valid_until: OffsetDateTime,
    pub public_key_algorithm: String,
    pub public_key_size: String,
    pub public_key_params: PublicKeyParams,
    pub signature_algorithm: String,
    pub key_usage: KeyUsage,
    pub extended_key_usage: Vec<String>,
    pub basic_constraints: BasicConstraints,
    pub subject_alt_names: Vec<SubjectAltName>,
    pub subject_key_identifier: Option<String>,
    pub authority_key_identifier: Option<String>,
}

/// Parses DER bytes and extracts the full structured record.
pub(crate) fn extract_certificate(der: &[u8]) -> Result<ExtractedCertificate, CertificateError> {
    let cert = parse_der_encoded_bytes_as_x509_certificate(der)?;

    let subject = format_distinguished_name(cert.subject());
    let issuer = format_distinguished_name(cert.issuer());
    let serial_number = hex_lower(cert.tbs_certificate.raw_serial());

    let valid_from = cert.validity().not_before.to_datetime();
    let valid_until = cert.validity().not_after.to_datetime();

    let signature_algorithm =
        signature_algorithm_name(&cert.signature_algorithm.algorithm.to_id_string());

    let (public_key_algorithm, public_key_size, public_key_params) = extract_public_key(&cert);

    let mut extracted = ExtractedCertificate {
        subject,
        issuer,
        serial_number,
        valid_from,
        valid_until,
        public_key_algorithm,
        public_key_size,
        public_key_params,
        signature_algorithm,
        key_usage: KeyUsage::default(),
        extended_key_usage: Vec::new(),
        basic_constraints: BasicConstraints::default(),
        subject_alt_names: Vec::new(),
        subject_key_identifier: None,
        authority_key_identifier: None,
    };
    extract_extensions(&cert, &mut extracted);

    Ok(extracted)
}

/// Parses the given DER-encoded bytes as an X.509 certificate.
///
/// Returns a [`CertificateError`] if the input is not a parseable DER-encoded
/// X.509 certificate. Trailing bytes after the certificate are ignored.
pub(crate) fn parse_der_encoded_bytes_as_x509_certificate(
    der_bytes: &[u8],
) -> Result<X509Certificate<'_>, CertificateError> {
    match x509_parser::parse_x509_certificate(der_bytes) {
        Ok((_, cert)) => Ok(cert),
        Err(Err::Incomplete(_)) => Err(CertificateError::ParseX509Certificate(
            X509Error::InvalidCertificate,
        )),
        Err(Err::Error(e) | Err::Failure(e)) => Err(CertificateError::ParseX509Certificate(e)),
    }
}

/// Formats a distinguished name as ordered `short=value` pairs joined with
/// `", "`, preserving attribute order as encoded.
fn format_distinguished_name(name: &X509Name<'_>) -> String {
    let mut out = String::new();
    for attr in name.iter_attributes() {
        if !out.is_empty() {
            out.push_str(", ");
        }

        let short = match oid2abbrev(attr.attr_type(), oid_registry()) {
            Ok(abbrev) => abbrev.to_string(),
            Err(_) => attr.attr_type().to_id_string(),
        };
        let value = match attr.as_str() {
            Ok(s) => s.to_string(),
            // Non-string attribute values are rare; render the raw bytes.
            Err(_) => String::from_utf8_lossy(attr.attr_value().data).into_owned(),
        };

        let _ = write!(out, "{short}={value}");
    }
    out
}

/// Determines the public key family structurally: modulus and exponent mean
/// RSA, a named curve means EC, anything else reports `"Unknown"`.
fn extract_public_key(cert: &X509Certificate<'_>) -> (String, String, PublicKeyParams) {
    let spki = cert.public_key();

    match spki.parsed() {
        Ok(PublicKey::RSA(rsa)) => {
            let bits = modulus_bit_length(rsa.modulus);
            let params = PublicKeyParams::Rsa {
                modulus: BASE64_STANDARD.encode(rsa.modulus),
                exponent: exponent_decimal(rsa.exponent),
            };
            ("RSA".to_string(), bits.to_string(), params)
        }
        Ok(PublicKey::EC(point)) => {
            let curve = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.as_oid().ok())
                .map(|oid| curve_name(&oid.to_id_string()))
                .unwrap_or_else(|| "Unknown curve".to_string());
            let (x, y) = split_ec_point(point.data());
            let params = PublicKeyParams::Ec {
                curve: curve.clone(),
                x,
                y,
            };
            ("EC".to_string(), curve, params)
        }
        _ => (
            "Unknown".to_string(),
            "Unknown".to_string(),
            PublicKeyParams::Unknown,
        ),
    }
}

/// Bit length of a big-endian RSA modulus, ignoring leading zero bytes.
fn modulus_bit_length(modulus: &[u8]) -> usize {
    let mut bytes = modulus;
    while let Some((&first, rest)) = bytes.split_first() {
        if first != 0 {
            return bytes.len() * 8 - first.leading_zeros() as usize;
        }
        bytes = rest;
    }
    0
}

/// Renders a big-endian RSA public exponent as a decimal string.
///
/// Real-world exponents fit comfortably in a u128; larger values fall back to
/// a hex rendering rather than failing the decode.
fn exponent_decimal(exponent: &[u8]) -> String {
    if exponent.len() <= 16 {
        let value = exponent
            .iter()
            .fold(0u128, |acc, &b| (acc << 8) | u128::from(b));
        value.to_string()
    } else {
        format!("0x{}", hex_lower(exponent))
    }
}

/// Splits an SEC1 EC point into base64-encoded x/y coordinates.
///
/// Uncompressed points (leading 0x04) split into equal halves; any other form
/// is kept whole under `x` with no `y`.
fn split_ec_point(data: &[u8]) -> (Option<String>, Option<String>) {
    if data.first() == Some(&0x04) && data.len() % 2 == 1 {
        let coords = &data[1..];
        let (x, y) = coords.split_at(coords.len() / 2);
        (
            Some(BASE64_STANDARD.encode(x)),
            Some(BASE64_STANDARD.encode(y)),
        )
    } else if data.is_empty() {
        (None, None)
    } else {
        (Some(BASE64_STANDARD.encode(data)), None)
    }
}

/// Walks the extension list once, filling in whichever extensions are present.
/// A missing extension leaves its zero-value default in place; it is never an
/// error.
fn extract_extensions(cert: &X509Certificate<'_>, out: &mut ExtractedCertificate) {
    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::KeyUsage(ku) => {
                out.key_usage = KeyUsage {
                    digital_signature: ku.digital_signature(),
                    key_encipherment: ku.key_encipherment(),
                    key_agreement: ku.key_agreement(),
                    key_cert_sign: ku.key_cert_sign(),
                    crl_sign: ku.crl_sign(),
                    critical: ext.critical,
                };
            }
            ParsedExtension::ExtendedKeyUsage(eku) => {
                // Only populated when serverAuth is present.
                if !eku.server_auth {
                    continue;
                }
                let purposes: [(bool, &str); 5] = [
                    (eku.server_auth, "TLS Server Authentication"),
                    (eku.client_auth, "TLS Client Authentication"),
                    (eku.code_signing, "Code Signing"),
                    (eku.email_protection, "Email Protection"),
                    (eku.time_stamping, "Time Stamping"),
                ];
                out.extended_key_usage = purposes
                    .iter()
                    .filter(|(set, _)| *set)
                    .map(|(_, label)| (*label).to_string())
                    .collect();
            }
            ParsedExtension::BasicConstraints(bc) => {
                out.basic_constraints = BasicConstraints {
                    ca: bc.ca,
                    path_len_constraint: bc.path_len_constraint,
                    critical: ext.critical,
                };
            }
            ParsedExtension::SubjectAlternativeName(san) => {
                out.subject_alt_names = san
                    .general_names
                    .iter()
                    .filter_map(general_name_to_san)
                    .collect();
            }
            ParsedExtension::SubjectKeyIdentifier(ki) => {
                out.subject_key_identifier = Some(format_key_identifier(ki.0));
            }
            ParsedExtension::AuthorityKeyIdentifier(aki) => {
                out.authority_key_identifier = aki
                    .key_identifier
                    .as_ref()
                    .map(|ki| format_key_identifier(ki.0));
            }
            _ => {}
        }
    }
}

fn general_name_to_san(name: &GeneralName<'_>) -> Option<SubjectAltName> {
    let (kind, value) = match name {
        GeneralName::URI(uri) => (SanKind::Uri, (*uri).to_string()),
        GeneralName::DNSName(dns) => (SanKind::Dns, (*dns).to_string()),
        GeneralName::IPAddress(bytes) => (SanKind::Ip, format_ip_address(bytes)),
        GeneralName::RFC822Name(email) => (SanKind::Email, (*email).to_string()),
        _ => return None,
    };
    Some(SubjectAltName { kind, value })
}

/// Formats an IP SAN value as an address when the byte length is
/// recognizable, falling back to the raw bytes in hex.
fn format_ip_address(bytes: &[u8]) -> String {
    match bytes.len() {
        4 => Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]).to_string(),
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(bytes);
            Ipv6Addr::from(octets).to_string()
        }
        _ => hex_lower(bytes),
    }
}

/// Regroups a key identifier into colon-separated uppercase byte pairs.
pub(crate) fn format_key_identifier(bytes: &[u8]) -> String {
    let pairs: Vec<String> = bytes.iter().map(|b| format!("{b:02X}")).collect();
    pairs.join(":")
}

/// Formats a hex serial number string into colon-grouped pairs for display,
/// e.g. `"1a2b3c"` becomes `"1a:2b:3c"`.
pub fn format_serial_number(serial: &str) -> String {
    let hex = serial.to_lowercase();
    let chars: Vec<char> = hex.chars().collect();
    let groups: Vec<String> = chars.chunks(2).map(|pair| pair.iter().collect()).collect();
    groups.join(":")
}

/// Encodes DER bytes as a PEM `CERTIFICATE` block with a 64-column body.
///
/// The output is deterministic: encoding the same DER bytes always yields the
/// identical PEM string.
pub(crate) fn encode_pem(der: &[u8]) -> String {
    let body = BASE64_STANDARD.encode(der);
    let mut pem = String::with_capacity(body.len() + body.len() / PEM_LINE_WIDTH + 64);

    pem.push_str("-----BEGIN CERTIFICATE-----\n");
    let bytes = body.as_bytes();
    for line in bytes.chunks(PEM_LINE_WIDTH) {
        // Base64 output is always ASCII.
        pem.push_str(std::str::from_utf8(line).unwrap_or_default());
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

pub(crate) fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_serial_number_pairs() {
        assert_eq!(format_serial_number("1a2b3c"), "1a:2b:3c");
    }

    #[test]
    fn test_format_serial_number_lowercases() {
        assert_eq!(format_serial_number("1A2B3C"), "1a:2b:3c");
    }

    #[test]
    fn test_format_serial_number_odd_length_keeps_tail() {
        assert_eq!(format_serial_number("abc"), "ab:c");
    }

    #[test]
    fn test_format_key_identifier_uppercase_pairs() {
        assert_eq!(format_key_identifier(&[0xde, 0xad, 0x01]), "DE:AD:01");
    }

    #[test]
    fn test_modulus_bit_length_strips_leading_zeros() {
        // DER integers carry a leading 0x00 when the high bit is set.
        let modulus = [0x00, 0x80, 0x00];
        assert_eq!(modulus_bit_length(&modulus), 16);
        assert_eq!(modulus_bit_length(&[0x01]), 1);
        assert_eq!(modulus_bit_length(&[0x00, 0x00]), 0);
    }

    #[test]
    fn test_exponent_decimal() {
        assert_eq!(exponent_decimal(&[0x01, 0x00, 0x01]), "65537");
        assert_eq!(exponent_decimal(&[0x03]), "3");
    }

    #[test]
    fn test_split_ec_point_uncompressed() {
        let mut point = vec![0x04];
        point.extend_from_slice(&[0xaa; 32]);
        point.extend_from_slice(&[0xbb; 32]);

        let (x, y) = split_ec_point(&point);
        assert_eq!(x.as_deref(), Some(BASE64_STANDARD.encode([0xaa; 32]).as_str()));
        assert_eq!(y.as_deref(), Some(BASE64_STANDARD.encode([0xbb; 32]).as_str()));
    }

    #[test]
    fn test_split_ec_point_compressed_keeps_whole_point() {
        let point = [0x02, 0x01, 0x02, 0x03];
        let (x, y) = split_ec_point(&point);
        assert!(x.is_some());
        assert!(y.is_none());
    }

    #[test]
    fn test_format_ip_address() {
        assert_eq!(format_ip_address(&[192, 0, 2, 10]), "192.0.2.10");
        assert_eq!(format_ip_address(&[0xde, 0xad]), "dead");
    }

    #[test]
    fn test_encode_pem_wraps_at_64_columns() {
        let pem = encode_pem(&[0u8; 96]);

        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(pem.ends_with("-----END CERTIFICATE-----\n"));
        let body: Vec<&str> = pem
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect();
        assert_eq!(body[0].len(), 64);
        assert!(body.iter().all(|l| l.len() <= 64));
    }

    #[test]
    fn test_encode_pem_is_deterministic() {
        let der = [0x30, 0x03, 0x02, 0x01, 0x05];
        assert_eq!(encode_pem(&der), encode_pem(&der));
    }
}
