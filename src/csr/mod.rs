//! Decoding of PKCS#10 certification requests into [`CsrDetailsModel`].
//!
//! Two independent backends implement [`CsrBackend`]: a DER pipeline written
//! here ([`CustomBackend`]) and an adapter over `x509-parser`
//! ([`LibraryBackend`]). For any valid request both produce the same model.

mod assembler;
mod attributes;
mod custom;
mod decoder;
mod der;
mod key_facts;
mod library;
pub mod oid;
mod pem;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::models::CsrDetailsModel;

pub use custom::CustomBackend;
pub use library::LibraryBackend;

pub const INVALID_CSR_MESSAGE: &str = "File is not a valid Certificate Signing Request";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("input of {len} bytes exceeds the {max} byte limit")]
    TooLarge { len: usize, max: usize },
    #[error("input is neither PEM nor DER")]
    NotPemOrDer,
    #[error("structurally invalid request: {0}")]
    StructurallyInvalid(String),
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),
}

impl ParseError {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::TooLarge { .. } => "too_large",
            ParseError::NotPemOrDer => "not_pem_or_der",
            ParseError::StructurallyInvalid(_) => "structurally_invalid",
            ParseError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
        }
    }
}

impl From<der::DerError> for ParseError {
    fn from(err: der::DerError) -> Self {
        ParseError::StructurallyInvalid(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Custom,
    Library,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Custom => "custom",
            Backend::Library => "library",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parser backend '{0}', expected 'custom' or 'library'")]
pub struct UnknownBackend(pub String);

impl FromStr for Backend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "custom" => Ok(Backend::Custom),
            "library" => Ok(Backend::Library),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// One complete implementation of raw bytes → [`CsrDetailsModel`].
pub trait CsrBackend: Send + Sync {
    fn decode(&self, input: &[u8]) -> Result<CsrDetailsModel, ParseError>;
}

pub fn backend(kind: Backend) -> &'static dyn CsrBackend {
    match kind {
        Backend::Custom => &CustomBackend,
        Backend::Library => &LibraryBackend,
    }
}

/// Decodes `input` with the selected backend after enforcing the size cap.
pub fn decode(
    input: &[u8],
    kind: Backend,
    max_input_bytes: usize,
) -> Result<CsrDetailsModel, ParseError> {
    let result = if input.len() > max_input_bytes {
        Err(ParseError::TooLarge {
            len: input.len(),
            max: max_input_bytes,
        })
    } else {
        metrics::histogram!("csr_parser_input_bytes", "backend" => kind.as_str())
            .record(input.len() as f64);
        backend(kind).decode(input)
    };

    match &result {
        Ok(_) => {
            metrics::counter!("csr_parser_requests_total", "backend" => kind.as_str(), "outcome" => "ok")
                .increment(1);
            debug!(backend = %kind, len = input.len(), "decoded certification request");
        }
        Err(e) => {
            metrics::counter!("csr_parser_requests_total", "backend" => kind.as_str(), "outcome" => e.kind())
                .increment(1);
            debug!(backend = %kind, len = input.len(), error = %e, "rejected input");
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_PEM: &[u8] = include_bytes!("../../testdata/rsa-csr.pem");
    const RSA_DER: &[u8] = include_bytes!("../../testdata/rsa-csr.der");
    const SAN_PEM: &[u8] = include_bytes!("../../testdata/rsa-csr-san.pem");
    const ECDSA_PEM: &[u8] = include_bytes!("../../testdata/ecdsa-csr.pem");
    const P384_PEM: &[u8] = include_bytes!("../../testdata/ecdsa-p384-csr.pem");
    const ED25519_PEM: &[u8] = include_bytes!("../../testdata/ed25519-csr.pem");
    const RSA_KEY_PEM: &[u8] = include_bytes!("../../testdata/private-key.pem");
    const EC_KEY_PEM: &[u8] = include_bytes!("../../testdata/ec-private-key.pem");
    const PLAIN_TEXT: &[u8] = include_bytes!("../../testdata/some-file");

    const VALID: [&[u8]; 6] = [RSA_PEM, RSA_DER, SAN_PEM, ECDSA_PEM, P384_PEM, ED25519_PEM];
    const BACKENDS: [Backend; 2] = [Backend::Custom, Backend::Library];
    const LIMIT: usize = 64 * 1024;

    fn rcgen_csr(key_pair: &rcgen::KeyPair, sans: Vec<String>, pem: bool) -> Vec<u8> {
        let mut params = rcgen::CertificateParams::new(sans).unwrap();
        params.distinguished_name = rcgen::DistinguishedName::new();
        params.distinguished_name.push(rcgen::DnType::CommonName, "generated.example");
        params.distinguished_name.push(rcgen::DnType::OrganizationName, "Test Org");
        params.distinguished_name.push(rcgen::DnType::CountryName, "US");
        params.distinguished_name.push(rcgen::DnType::LocalityName, "San Francisco");
        params.distinguished_name.push(rcgen::DnType::StateOrProvinceName, "California");
        let csr = params.serialize_request(key_pair).unwrap();
        if pem {
            csr.pem().unwrap().into_bytes()
        } else {
            csr.der().to_vec()
        }
    }

    /// Minimal TLV writer for hand-built requests.
    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = content.len();
        if len < 0x80 {
            out.push(len as u8);
        } else if len < 0x100 {
            out.extend_from_slice(&[0x81, len as u8]);
        } else {
            out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
        }
        out.extend_from_slice(content);
        out
    }

    fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
        tlv(0x30, &parts.concat())
    }

    const OID_RSA_ENCRYPTION: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
    const OID_SHA256_WITH_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b];
    const OID_EXTENSION_REQUEST: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x0e];
    const OID_COMMON_NAME: &[u8] = &[0x55, 0x04, 0x03];
    const OID_SUBJECT_ALT_NAME: &[u8] = &[0x55, 0x1d, 0x11];

    fn common_name(value: &[u8]) -> Vec<u8> {
        seq(&[tlv(0x06, OID_COMMON_NAME), tlv(0x0c, value)])
    }

    fn rsa_spki(key: &[u8]) -> Vec<u8> {
        let mut bits = vec![0x00];
        bits.extend_from_slice(key);
        seq(&[
            seq(&[tlv(0x06, OID_RSA_ENCRYPTION), tlv(0x05, &[])]),
            tlv(0x03, &bits),
        ])
    }

    /// `[0] { extensionRequest { SEQUENCE { subjectAltName } } }` around a
    /// GeneralNames value.
    fn san_attributes(general_names: &[u8]) -> Vec<u8> {
        let extension = seq(&[tlv(0x06, OID_SUBJECT_ALT_NAME), tlv(0x04, general_names)]);
        let request = seq(&[tlv(0x06, OID_EXTENSION_REQUEST), tlv(0x31, &seq(&[extension]))]);
        tlv(0xa0, &request)
    }

    fn dns_names() -> Vec<u8> {
        seq(&[tlv(0x82, b"www.example.com")])
    }

    /// Hand-built request pieces. The signature is never verified, so it is a
    /// fixed placeholder.
    struct Parts {
        version: Vec<u8>,
        subject: Vec<u8>,
        spki: Vec<u8>,
        attributes: Vec<u8>,
        info_extra: Vec<u8>,
        signature_algorithm: Vec<u8>,
        outer_extra: Vec<u8>,
    }

    impl Parts {
        /// A well-formed RSA request for www.example.com, with the fixture's key.
        fn valid() -> Self {
            let fixture = decoder::decode(RSA_DER).unwrap();
            Parts {
                version: tlv(0x02, &[0x00]),
                subject: seq(&[tlv(0x31, &common_name(b"www.example.com"))]),
                spki: rsa_spki(fixture.info.subject_public_key_info.public_key.data),
                attributes: san_attributes(&dns_names()),
                info_extra: Vec::new(),
                signature_algorithm: seq(&[tlv(0x06, OID_SHA256_WITH_RSA), tlv(0x05, &[])]),
                outer_extra: Vec::new(),
            }
        }

        fn encode(&self) -> Vec<u8> {
            let info = seq(&[
                self.version.clone(),
                self.subject.clone(),
                self.spki.clone(),
                self.attributes.clone(),
                self.info_extra.clone(),
            ]);
            seq(&[
                info,
                self.signature_algorithm.clone(),
                tlv(0x03, &[0x00, 0xde, 0xad, 0xbe, 0xef]),
                self.outer_extra.clone(),
            ])
        }
    }

    fn variant(change: impl FnOnce(&mut Parts)) -> Vec<u8> {
        let mut parts = Parts::valid();
        change(&mut parts);
        parts.encode()
    }

    /// A request whose signature algorithm is the private-arc OID 1.3.6.1.4.1.55555.1
    /// and whose key is an RSA key copied from the fixture.
    fn request_with_unknown_signature_oid() -> Vec<u8> {
        variant(|p| {
            p.subject = seq(&[tlv(0x31, &common_name(b"unknown-sig.example"))]);
            p.attributes = tlv(0xa0, &[]);
            p.signature_algorithm =
                seq(&[tlv(0x06, &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x83, 0xb2, 0x03, 0x01])]);
        })
    }

    fn rsa_key(modulus: &[u8], trailing: &[u8]) -> Vec<u8> {
        let mut key = seq(&[tlv(0x02, modulus), tlv(0x02, &[0x01, 0x00, 0x01])]);
        key.extend_from_slice(trailing);
        key
    }

    fn pem_body(der: &[u8]) -> Vec<String> {
        use base64::{engine::general_purpose::STANDARD, Engine};
        let encoded = STANDARD.encode(der);
        encoded
            .as_bytes()
            .chunks(64)
            .map(|c| String::from_utf8(c.to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_rsa_request_fields() {
        for kind in BACKENDS {
            let model = decode(RSA_PEM, kind, LIMIT).unwrap();
            assert_eq!(model.common_name.as_deref(), Some("www.example.com"), "{}", kind);
            assert_eq!(model.country.as_deref(), Some("AU"));
            assert_eq!(model.locality.as_deref(), Some("Some-City"));
            assert_eq!(model.state_or_province.as_deref(), Some("Some-State"));
            assert_eq!(model.organization_name.as_deref(), Some("Internet Widgits Pty Ltd"));
            assert_eq!(model.organization_unit.as_deref(), Some("Company-Section"));
            assert_eq!(model.email_address.as_deref(), Some("some@company.com"));
            assert_eq!(model.rsa_key_length, Some(2048));
            assert_eq!(model.signature_algorithm, "sha256WithRSAEncryption");
            assert_eq!(model.signature_algorithm_id, "1.2.840.113549.1.1.11");
            // Display names are the OpenSSL long names, which spell the digest in lower case.
            assert!(model.signature_algorithm.to_uppercase().contains("SHA256"));
            assert!(model.signature_algorithm.contains("RSA"));
            assert_eq!(model.public_key_algorithm, "rsaEncryption");
            assert_eq!(model.public_key_algorithm_id, "1.2.840.113549.1.1.1");
            assert_eq!(model.ec_curve, None);
            assert_eq!(model.subject_alternative_name, None);

            let json = serde_json::to_value(&model).unwrap();
            assert!(json.get("ecCurve").is_none());
            assert!(json.get("subjectAlternativeName").is_none());
        }
    }

    #[test]
    fn test_san_request_omits_absent_fields() {
        for kind in BACKENDS {
            let model = decode(SAN_PEM, kind, LIMIT).unwrap();
            assert_eq!(model.common_name.as_deref(), Some("example.com"));
            assert_eq!(model.country.as_deref(), Some("DE"));
            assert_eq!(model.state_or_province.as_deref(), Some("NRW"));
            assert_eq!(model.organization_name.as_deref(), Some("Internet Widgits Pty Ltd"));
            assert_eq!(model.rsa_key_length, Some(4096));
            assert_eq!(
                model.subject_alternative_name.as_deref(),
                Some("DNS: test.com, DNS: test.de")
            );

            let json = serde_json::to_value(&model).unwrap();
            let obj = json.as_object().unwrap();
            assert!(!obj.contains_key("locality"));
            assert!(!obj.contains_key("organizationUnit"));
            assert!(!obj.contains_key("emailAddress"));
        }
    }

    #[test]
    fn test_ecdsa_request() {
        for kind in BACKENDS {
            let model = decode(ECDSA_PEM, kind, LIMIT).unwrap();
            assert_eq!(model.common_name, None);
            assert_eq!(model.country.as_deref(), Some("AU"));
            assert_eq!(model.public_key_algorithm, "id-ecPublicKey");
            assert_eq!(model.signature_algorithm, "ecdsa-with-SHA256");
            assert_eq!(model.ec_curve.as_deref(), Some("secp256r1"));
            assert_eq!(model.rsa_key_length, None);
        }
    }

    #[test]
    fn test_duplicate_attribute_first_wins() {
        for kind in BACKENDS {
            let model = decode(P384_PEM, kind, LIMIT).unwrap();
            assert_eq!(model.organization_name.as_deref(), Some("Example"));
            assert_eq!(model.ec_curve.as_deref(), Some("secp384r1"));
            assert_eq!(model.signature_algorithm, "ecdsa-with-SHA384");
        }
    }

    #[test]
    fn test_other_key_family_yields_fewer_facts() {
        for kind in BACKENDS {
            let model = decode(ED25519_PEM, kind, LIMIT).unwrap();
            assert_eq!(model.public_key_algorithm, "Ed25519");
            assert_eq!(model.public_key_algorithm_id, "1.3.101.112");
            assert_eq!(model.rsa_key_length, None);
            assert_eq!(model.ec_curve, None);
            assert_eq!(
                model.subject_alternative_name.as_deref(),
                Some("DNS: ed.example.org, IP: 192.0.2.7, email: admin@example.org, URI: https://example.org/")
            );
        }
    }

    #[test]
    fn test_invalid_inputs_rejected_by_both() {
        let mut truncated = RSA_DER.to_vec();
        truncated.truncate(RSA_DER.len() - 10);
        let mut trailing = RSA_DER.to_vec();
        trailing.extend_from_slice(&[0, 0]);

        let inputs: [&[u8]; 7] = [
            PLAIN_TEXT,
            RSA_KEY_PEM,
            EC_KEY_PEM,
            b"",
            &[0xde, 0xad, 0xbe, 0xef],
            &truncated,
            &trailing,
        ];
        for kind in BACKENDS {
            for input in inputs {
                assert!(decode(input, kind, LIMIT).is_err(), "{} accepted {:?}", kind, input.get(..8));
            }
        }
    }

    #[test]
    fn test_hand_built_request_decodes() {
        let bytes = Parts::valid().encode();
        for kind in BACKENDS {
            let model = decode(&bytes, kind, LIMIT).unwrap();
            assert_eq!(model.common_name.as_deref(), Some("www.example.com"), "{}", kind);
            assert_eq!(model.subject_alternative_name.as_deref(), Some("DNS: www.example.com"));
            assert_eq!(model.rsa_key_length, Some(2048));
        }
    }

    #[test]
    fn test_malformed_structures_rejected_by_both() {
        let cn = common_name(b"a");
        let extension = |critical: &[u8]| {
            let ext = seq(&[
                tlv(0x06, OID_SUBJECT_ALT_NAME),
                tlv(0x01, critical),
                tlv(0x04, &dns_names()),
            ]);
            let request = seq(&[tlv(0x06, OID_EXTENSION_REQUEST), tlv(0x31, &seq(&[ext]))]);
            tlv(0xa0, &request)
        };

        let variants: Vec<(&str, Vec<u8>)> = vec![
            ("extra element in outer sequence", variant(|p| p.outer_extra = tlv(0x04, b"junk"))),
            ("extra element in request info", variant(|p| p.info_extra = tlv(0x05, &[]))),
            ("version 1", variant(|p| p.version = tlv(0x02, &[0x01]))),
            (
                "signature algorithm with three elements",
                variant(|p| {
                    p.signature_algorithm =
                        seq(&[tlv(0x06, OID_SHA256_WITH_RSA), tlv(0x05, &[]), tlv(0x05, &[])])
                }),
            ),
            (
                "non-empty NULL parameters",
                variant(|p| {
                    p.signature_algorithm = seq(&[tlv(0x06, OID_SHA256_WITH_RSA), tlv(0x05, &[0x00])])
                }),
            ),
            (
                "spki with three elements",
                variant(|p| {
                    let fixture = decoder::decode(RSA_DER).unwrap();
                    let mut bits = vec![0x00];
                    bits.extend_from_slice(fixture.info.subject_public_key_info.public_key.data);
                    p.spki = seq(&[
                        seq(&[tlv(0x06, OID_RSA_ENCRYPTION), tlv(0x05, &[])]),
                        tlv(0x03, &bits),
                        tlv(0x05, &[]),
                    ]);
                }),
            ),
            (
                "spki algorithm without an OID",
                variant(|p| p.spki = seq(&[seq(&[tlv(0x05, &[])]), tlv(0x03, &[0x00, 0x01])])),
            ),
            (
                "empty relative distinguished name",
                variant(|p| p.subject = seq(&[tlv(0x31, &cn), tlv(0x31, &[])])),
            ),
            (
                "attribute type and value with three elements",
                variant(|p| {
                    let atv = seq(&[tlv(0x06, OID_COMMON_NAME), tlv(0x0c, b"a"), tlv(0x0c, b"b")]);
                    p.subject = seq(&[tlv(0x31, &atv)]);
                }),
            ),
            (
                "subject built from SEQUENCEs instead of SETs",
                variant(|p| p.subject = seq(&[tlv(0x30, &cn)])),
            ),
            ("critical flag that is not a DER BOOLEAN", variant(|p| p.attributes = extension(&[0x01]))),
            (
                "extensionRequest without a value",
                variant(|p| {
                    p.attributes = tlv(0xa0, &seq(&[tlv(0x06, OID_EXTENSION_REQUEST), tlv(0x31, &[])]))
                }),
            ),
            (
                "RSA key with trailing bytes",
                variant(|p| {
                    let mut modulus = vec![0x00];
                    modulus.extend_from_slice(&[0xc5; 256]);
                    p.spki = rsa_spki(&rsa_key(&modulus, &[0x00]));
                }),
            ),
            (
                "negative RSA modulus",
                variant(|p| p.spki = rsa_spki(&rsa_key(&[0x80; 128], &[]))),
            ),
        ];

        for (name, bytes) in &variants {
            for kind in BACKENDS {
                let err = decode(bytes, kind, LIMIT).unwrap_err();
                assert!(
                    matches!(err, ParseError::StructurallyInvalid(_)),
                    "{} backend: {}: {:?}",
                    kind,
                    name,
                    err
                );
            }
        }

        let critical = variant(|p| p.attributes = extension(&[0xff]));
        let custom = decode(&critical, Backend::Custom, LIMIT).unwrap();
        assert_eq!(custom, decode(&critical, Backend::Library, LIMIT).unwrap());
        assert_eq!(custom.subject_alternative_name.as_deref(), Some("DNS: www.example.com"));
    }

    #[test]
    fn test_san_framing_agrees_across_backends() {
        let dns = tlv(0x82, b"www.example.com");
        let name = seq(&[tlv(0x31, &common_name(b"dir"))]);
        let empty_rdn = seq(&[tlv(0x31, &[])]);
        let other_name = tlv(0xa0, &[tlv(0x06, &[0x2a, 0x03]), tlv(0xa0, &tlv(0x0c, b"v"))].concat());

        let cases: [(&str, Vec<u8>, Option<&str>); 4] = [
            ("valid directoryName", seq(&[dns.clone(), tlv(0xa4, &name)]), Some("DNS: www.example.com")),
            ("directoryName with an empty RDN", seq(&[dns.clone(), tlv(0xa4, &empty_rdn)]), None),
            ("valid otherName", seq(&[other_name, dns.clone()]), Some("DNS: www.example.com")),
            ("otherName without a type-id", seq(&[tlv(0xa0, &tlv(0x02, &[0x01])), dns]), None),
        ];

        for (name, general_names, expected) in cases {
            let bytes = variant(|p| p.attributes = san_attributes(&general_names));
            let custom = decode(&bytes, Backend::Custom, LIMIT).unwrap();
            let library = decode(&bytes, Backend::Library, LIMIT).unwrap();
            assert_eq!(custom, library, "{}", name);
            assert_eq!(custom.subject_alternative_name.as_deref(), expected, "{}", name);
            assert_eq!(custom.common_name.as_deref(), Some("www.example.com"));
        }
    }

    #[test]
    fn test_pem_layouts_agree_across_backends() {
        let body = pem_body(RSA_DER);
        let block = |indent: &str, eol: &str| {
            let mut out = format!("{}-----BEGIN CERTIFICATE REQUEST-----{}", indent, eol);
            for line in &body {
                out.push_str(&format!("{}{}{}", indent, line, eol));
            }
            out.push_str(&format!("{}-----END CERTIFICATE REQUEST-----{}", indent, eol));
            out
        };
        let broken_certificate = "-----BEGIN CERTIFICATE-----\n!!not base64!!\n-----END CERTIFICATE-----\n";

        let layouts = [
            ("indented", block("    ", "\n")),
            ("tab indented with CRLF", block("\t", "\r\n")),
            ("CR only", block("", "\r")),
            ("broken block before the request", format!("{}{}", broken_certificate, block("", "\n"))),
            ("unterminated block before the request", format!("-----BEGIN CERTIFICATE-----\nAAAA\n{}", block("", "\n"))),
        ];

        let expected = decode(RSA_DER, Backend::Custom, LIMIT).unwrap();
        for (name, text) in &layouts {
            for kind in BACKENDS {
                let model = decode(text.as_bytes(), kind, LIMIT)
                    .unwrap_or_else(|e| panic!("{} backend rejected {} PEM: {}", kind, name, e));
                assert_eq!(model, expected, "{} backend, {} PEM", kind, name);
            }
        }

        let bad_request = format!(
            "-----BEGIN CERTIFICATE REQUEST-----\n!!\n-----END CERTIFICATE REQUEST-----\n{}",
            block("", "\n")
        );
        for kind in BACKENDS {
            assert!(matches!(
                decode(bad_request.as_bytes(), kind, LIMIT),
                Err(ParseError::StructurallyInvalid(_))
            ));
        }
    }

    #[test]
    fn test_non_der_bytes_are_not_pem_or_der() {
        for kind in BACKENDS {
            assert_eq!(decode(PLAIN_TEXT, kind, LIMIT).unwrap_err(), ParseError::NotPemOrDer);
            assert_eq!(decode(b"", kind, LIMIT).unwrap_err(), ParseError::NotPemOrDer);
        }
    }

    #[test]
    fn test_oversized_input_rejected_before_decoding() {
        let err = decode(RSA_DER, Backend::Custom, 16).unwrap_err();
        assert_eq!(
            err,
            ParseError::TooLarge {
                len: RSA_DER.len(),
                max: 16
            }
        );
    }

    #[test]
    fn test_backends_agree_on_fixtures() {
        for input in VALID {
            let custom = decode(input, Backend::Custom, LIMIT).unwrap();
            let library = decode(input, Backend::Library, LIMIT).unwrap();
            assert_eq!(custom, library);
        }
    }

    #[test]
    fn test_backends_agree_on_generated_requests() {
        let keys = [
            rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256).unwrap(),
            rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384).unwrap(),
            rcgen::KeyPair::generate_for(&rcgen::PKCS_ED25519).unwrap(),
        ];
        for key in &keys {
            for pem in [false, true] {
                let sans = vec!["a.example".to_string(), "10.1.2.3".to_string(), "b.example".to_string()];
                let bytes = rcgen_csr(key, sans, pem);
                let custom = decode(&bytes, Backend::Custom, LIMIT).unwrap();
                let library = decode(&bytes, Backend::Library, LIMIT).unwrap();
                assert_eq!(custom, library);
                assert_eq!(custom.common_name.as_deref(), Some("generated.example"));
                assert_eq!(
                    custom.subject_alternative_name.as_deref(),
                    Some("DNS: a.example, IP: 10.1.2.3, DNS: b.example")
                );
            }
        }
    }

    #[test]
    fn test_unknown_signature_oid_falls_back_to_oid() {
        let bytes = request_with_unknown_signature_oid();
        for kind in BACKENDS {
            let model = decode(&bytes, kind, LIMIT).unwrap();
            assert_eq!(model.signature_algorithm_id, "1.3.6.1.4.1.55555.1");
            assert_eq!(model.signature_algorithm, model.signature_algorithm_id);
            assert_eq!(model.common_name.as_deref(), Some("unknown-sig.example"));
            assert_eq!(model.rsa_key_length, Some(2048));
        }
    }

    #[test]
    fn test_decoding_is_idempotent() {
        for kind in BACKENDS {
            for input in VALID {
                let first = serde_json::to_vec(&decode(input, kind, LIMIT).unwrap()).unwrap();
                let second = serde_json::to_vec(&decode(input, kind, LIMIT).unwrap()).unwrap();
                assert_eq!(first, second);
            }
        }
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("custom".parse::<Backend>().unwrap(), Backend::Custom);
        assert_eq!(" Library ".parse::<Backend>().unwrap(), Backend::Library);
        assert!("bouncycastle".parse::<Backend>().is_err());
        assert_eq!(Backend::default(), Backend::Custom);
    }
}
