//! Adapter over `x509-parser`. Only the structural decoding comes from the
//! library; display names, subject flattening and SAN formatting go through
//! the same helpers as [`CustomBackend`](super::CustomBackend).

use std::borrow::Cow;
use std::io::Cursor;
use tracing::debug;
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::der_parser::asn1_rs::{Any, Class, Tag};
use x509_parser::extensions::{GeneralName, ParsedExtension, X509Extension};
use x509_parser::pem::Pem;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

use super::assembler::{self, Assembly};
use super::attributes::{self, SanEntry, SubjectFields};
use super::der::{self, Kind, StringKind};
use super::key_facts::{self, KeyFacts};
use super::oid::{self, KeyFamily};
use super::{pem, CsrBackend, ParseError};
use crate::models::CsrDetailsModel;

const PEM_LABELS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

pub struct LibraryBackend;

impl CsrBackend for LibraryBackend {
    fn decode(&self, input: &[u8]) -> Result<CsrDetailsModel, ParseError> {
        let der = read_der(input)?;
        if !pem::looks_like_der(&der) {
            return Err(ParseError::NotPemOrDer);
        }

        let (rem, csr) = X509CertificationRequest::from_der(&der)
            .map_err(|e| ParseError::StructurallyInvalid(e.to_string()))?;
        if !rem.is_empty() {
            return Err(ParseError::StructurallyInvalid(format!(
                "{} trailing bytes after the request",
                rem.len()
            )));
        }
        shape::request(&der)?;

        let info = &csr.certification_request_info;
        if info.version.0 != 0 {
            return Err(ParseError::StructurallyInvalid(format!(
                "unsupported request version {}",
                info.version.0
            )));
        }

        let key_facts = assembler::absorb_unsupported(extract_key_facts(&info.subject_pki))?;

        Ok(assembler::assemble(Assembly {
            signature_algorithm_oid: csr.signature_algorithm.algorithm.to_id_string(),
            public_key_algorithm_oid: info.subject_pki.algorithm.algorithm.to_id_string(),
            subject: subject_fields(&info.subject),
            key_facts,
            subject_alternative_name: subject_alternative_name(&csr),
        }))
    }
}

/// DER of the first CSR block when the input carries CSR armour, otherwise
/// the input itself.
///
/// `Pem::read` only splits on LF and wants the BEGIN line at column 0, so it
/// is fed the block as normalised by [`pem::normalized_block`]. Anything
/// before the first CSR BEGIN line, other PEM blocks included, is skipped.
fn read_der(input: &[u8]) -> Result<Cow<'_, [u8]>, ParseError> {
    let Some(block) = pem::normalized_block(input) else {
        return Ok(Cow::Borrowed(input));
    };

    let (block, _) = Pem::read(Cursor::new(block?))
        .map_err(|e| ParseError::StructurallyInvalid(format!("PEM block: {}", e)))?;
    if !PEM_LABELS.contains(&block.label.as_str()) {
        return Err(ParseError::StructurallyInvalid(format!(
            "unexpected PEM label {}",
            block.label
        )));
    }
    debug!(label = %block.label, "using PEM block");
    Ok(Cow::Owned(block.contents))
}

fn subject_fields(name: &X509Name<'_>) -> SubjectFields {
    let mut fields = SubjectFields::default();
    for rdn in name.iter() {
        for atv in rdn.iter() {
            let value = atv.attr_value();
            let text = if value.header.is_universal() {
                StringKind::from_universal_tag(value.tag().0)
                    .and_then(|kind| attributes::directory_string(Kind::String(kind), value.data))
            } else {
                None
            };
            fields.offer(&atv.attr_type().to_id_string(), text);
        }
    }
    fields
}

fn requested_extensions<'a>(csr: &'a X509CertificationRequest<'_>) -> Option<&'a [X509Extension<'a>]> {
    csr.certification_request_info
        .iter_attributes()
        .find_map(|attr| match attr.parsed_attribute() {
            ParsedCriAttribute::ExtensionRequest(request) => Some(request.extensions.as_slice()),
            _ => None,
        })
}

fn subject_alternative_name(csr: &X509CertificationRequest<'_>) -> Option<String> {
    let san = requested_extensions(csr)?
        .iter()
        .find(|ext| ext.oid.to_id_string() == oid::SUBJECT_ALT_NAME)?;

    let ParsedExtension::SubjectAlternativeName(san) = san.parsed_extension() else {
        debug!("subjectAltName extension could not be decoded, omitting it");
        return None;
    };

    let mut entries = Vec::with_capacity(san.general_names.len());
    for name in &san.general_names {
        match name {
            GeneralName::DNSName(dns) => entries.push(SanEntry::Dns(*dns)),
            GeneralName::RFC822Name(email) => entries.push(SanEntry::Email(*email)),
            GeneralName::URI(uri) => entries.push(SanEntry::Uri(*uri)),
            GeneralName::IPAddress(ip) => entries.push(SanEntry::Ip(*ip)),
            GeneralName::DirectoryName(dir) => {
                if let Err(e) = shape::directory_name(dir.as_raw()) {
                    debug!(error = %e, "subjectAltName directoryName is malformed, omitting it");
                    return None;
                }
            }
            _ => {}
        }
    }
    attributes::format_san(entries)
}

fn extract_key_facts(spki: &SubjectPublicKeyInfo<'_>) -> Result<KeyFacts, ParseError> {
    let algorithm = spki.algorithm.algorithm.to_id_string();
    match oid::key_family(&algorithm) {
        KeyFamily::Rsa => {
            shape::rsa_public_key(&spki.subject_public_key.data)?;
            match spki.parsed() {
                Ok(PublicKey::RSA(rsa)) => Ok(KeyFacts {
                    rsa_key_length: Some(key_facts::modulus_bits(rsa.modulus)),
                    ec_curve: None,
                }),
                Ok(_) => Err(ParseError::StructurallyInvalid(
                    "rsaEncryption key is not an RSAPublicKey".to_string(),
                )),
                Err(e) => Err(ParseError::StructurallyInvalid(e.to_string())),
            }
        }
        KeyFamily::Ec => {
            let ec_curve = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.as_oid().ok())
                .map(|curve| key_facts::curve_name(&curve.to_id_string()));
            Ok(KeyFacts {
                rsa_key_length: None,
                ec_curve,
            })
        }
        KeyFamily::Other => Err(ParseError::UnsupportedAlgorithm(algorithm)),
    }
}

/// Framing rules `x509-parser` does not enforce on its own: exact element
/// counts inside every SEQUENCE, non-empty RDNs, DER BOOLEANs, well-formed
/// BIT STRINGs and unsigned RSA integers. Checked over the same DER the
/// parser accepted.
mod shape {
    use super::*;

    fn invalid(reason: impl Into<String>) -> ParseError {
        ParseError::StructurallyInvalid(reason.into())
    }

    fn is_universal(any: &Any<'_>, tag: Tag) -> bool {
        any.class() == Class::Universal && any.tag() == tag
    }

    fn expect(any: &Any<'_>, tag: Tag, what: &str) -> Result<(), ParseError> {
        if is_universal(any, tag) {
            Ok(())
        } else {
            Err(invalid(format!("{} must be {}, found tag {}", what, tag, any.tag())))
        }
    }

    fn object_identifier(any: &Any<'_>, what: &str) -> Result<(), ParseError> {
        expect(any, Tag::Oid, what)?;
        der::decode_oid(any.data)?;
        Ok(())
    }

    /// One element spanning all of `bytes`.
    fn single<'a>(bytes: &'a [u8], what: &str) -> Result<Any<'a>, ParseError> {
        let (rest, any) = Any::from_der(bytes).map_err(|e| invalid(format!("{}: {}", what, e)))?;
        if !rest.is_empty() {
            return Err(invalid(format!("{} has {} trailing bytes", what, rest.len())));
        }
        Ok(any)
    }

    /// Elements of a constructed value; its content must be consumed exactly.
    fn elements<'a>(any: &Any<'a>, what: &str) -> Result<Vec<Any<'a>>, ParseError> {
        let mut rest = any.data;
        let mut out = Vec::new();
        while !rest.is_empty() {
            let (next, element) =
                Any::from_der(rest).map_err(|e| invalid(format!("{}: {}", what, e)))?;
            out.push(element);
            rest = next;
        }
        Ok(out)
    }

    fn sequence<'a, const N: usize>(any: &Any<'a>, what: &str) -> Result<[Any<'a>; N], ParseError> {
        expect(any, Tag::Sequence, what)?;
        let items = elements(any, what)?;
        let found = items.len();
        items
            .try_into()
            .map_err(|_| invalid(format!("{} has {} elements, expected {}", what, found, N)))
    }

    pub fn request(der: &[u8]) -> Result<(), ParseError> {
        let request = single(der, "CertificationRequest")?;
        let [info, signature_algorithm, signature] = sequence::<3>(&request, "CertificationRequest")?;
        let [_version, subject, spki, attributes] = sequence::<4>(&info, "CertificationRequestInfo")?;

        name(&subject)?;
        let [key_algorithm, key] = sequence::<2>(&spki, "SubjectPublicKeyInfo")?;
        algorithm_identifier(&key_algorithm, "subjectPublicKeyInfo.algorithm")?;
        bit_string(&key, "subjectPublicKey")?;
        request_attributes(&attributes)?;
        algorithm_identifier(&signature_algorithm, "signatureAlgorithm")?;
        bit_string(&signature, "signature")
    }

    pub fn directory_name(raw: &[u8]) -> Result<(), ParseError> {
        name(&single(raw, "directoryName")?)
    }

    pub fn rsa_public_key(key: &[u8]) -> Result<(), ParseError> {
        let [modulus, exponent] = sequence::<2>(&single(key, "RSAPublicKey")?, "RSAPublicKey")?;
        for (part, what) in [(&modulus, "modulus"), (&exponent, "publicExponent")] {
            expect(part, Tag::Integer, what)?;
            der::unsigned_integer(part.data)?;
        }
        Ok(())
    }

    fn name(name: &Any<'_>) -> Result<(), ParseError> {
        expect(name, Tag::Sequence, "subject")?;
        for rdn in elements(name, "subject")? {
            expect(&rdn, Tag::Set, "RelativeDistinguishedName")?;
            let members = elements(&rdn, "RelativeDistinguishedName")?;
            if members.is_empty() {
                return Err(invalid("empty RelativeDistinguishedName"));
            }
            for atv in &members {
                let [attr_type, _] = sequence::<2>(atv, "AttributeTypeAndValue")?;
                object_identifier(&attr_type, "attribute type")?;
            }
        }
        Ok(())
    }

    fn algorithm_identifier(algorithm: &Any<'_>, what: &str) -> Result<(), ParseError> {
        expect(algorithm, Tag::Sequence, what)?;
        let parts = elements(algorithm, what)?;
        if let Some(algorithm_oid) = parts.first() {
            object_identifier(algorithm_oid, what)?;
        }
        match parts.as_slice() {
            [_] => Ok(()),
            [_, params] if is_universal(params, Tag::Null) && !params.data.is_empty() => {
                Err(invalid(format!("{} has a non-empty NULL", what)))
            }
            [_, params] if is_universal(params, Tag::Oid) => {
                der::decode_oid(params.data)?;
                Ok(())
            }
            [_, _] => Ok(()),
            parts => Err(invalid(format!("{} has {} elements, expected 1..=2", what, parts.len()))),
        }
    }

    fn bit_string(bits: &Any<'_>, what: &str) -> Result<(), ParseError> {
        expect(bits, Tag::BitString, what)?;
        match bits.data {
            [] => Err(invalid(format!("{} is missing the unused-bits octet", what))),
            [unused, ..] if *unused > 7 => Err(invalid(format!("{} declares {} unused bits", what, unused))),
            [unused] if *unused != 0 => Err(invalid(format!("{} is empty but declares unused bits", what))),
            _ => Ok(()),
        }
    }

    fn request_attributes(attributes: &Any<'_>) -> Result<(), ParseError> {
        for attribute in elements(attributes, "attributes")? {
            let [attr_type, values] = sequence::<2>(&attribute, "Attribute")?;
            object_identifier(&attr_type, "attribute type")?;
            expect(&values, Tag::Set, "attribute values")?;
            let values = elements(&values, "attribute values")?;
            let attr_oid = attr_type
                .as_oid()
                .map_err(|e| invalid(format!("attribute type: {}", e)))?
                .to_id_string();

            match attr_oid.as_str() {
                oid::EXTENSION_REQUEST => {
                    let first = values
                        .first()
                        .ok_or_else(|| invalid("extensionRequest without a value"))?;
                    extensions(first)?;
                }
                oid::CHALLENGE_PASSWORD => {
                    let first = values
                        .first()
                        .ok_or_else(|| invalid("challengePassword without a value"))?;
                    challenge_password(first)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn extensions(extensions: &Any<'_>) -> Result<(), ParseError> {
        expect(extensions, Tag::Sequence, "Extensions")?;
        for extension in elements(extensions, "Extensions")? {
            expect(&extension, Tag::Sequence, "Extension")?;
            let parts = elements(&extension, "Extension")?;
            if let Some(extn_id) = parts.first() {
                object_identifier(extn_id, "extnID")?;
            }
            let value = match parts.as_slice() {
                [_, value] => value,
                [_, critical, value] => {
                    expect(critical, Tag::Boolean, "critical")?;
                    if !matches!(critical.data, [0x00] | [0xff]) {
                        return Err(invalid("critical is not a DER BOOLEAN"));
                    }
                    value
                }
                _ => {
                    return Err(invalid(format!(
                        "Extension has {} elements, expected 2..=3",
                        parts.len()
                    )))
                }
            };
            expect(value, Tag::OctetString, "extnValue")?;
        }
        Ok(())
    }

    fn challenge_password(value: &Any<'_>) -> Result<(), ParseError> {
        let text = match StringKind::from_universal_tag(value.tag().0) {
            Some(
                kind @ (StringKind::Utf8
                | StringKind::Printable
                | StringKind::Universal
                | StringKind::Bmp
                | StringKind::Teletex),
            ) if value.class() == Class::Universal => {
                attributes::directory_string(Kind::String(kind), value.data)
            }
            _ => None,
        };
        match text {
            Some(_) => Ok(()),
            None => Err(invalid("challengePassword is not a DirectoryString")),
        }
    }
}
