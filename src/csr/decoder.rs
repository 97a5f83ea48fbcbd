//! PKCS#10 schema over the DER arena.
//!
//! ```text
//! CertificationRequest ::= SEQUENCE {
//!     certificationRequestInfo  SEQUENCE {
//!         version       INTEGER,
//!         subject       Name,
//!         subjectPKInfo SubjectPublicKeyInfo,
//!         attributes    [0] IMPLICIT SET OF Attribute },
//!     signatureAlgorithm AlgorithmIdentifier,
//!     signature          BIT STRING }
//! ```
//!
//! Every deviation is reported as [`ParseError::StructurallyInvalid`]. The
//! tree returned here is what the rest of the pipeline trusts.

use super::der::{self, DerArena, Kind, NodeId, StringKind};
use super::oid;
use super::ParseError;

#[derive(Debug, Clone)]
pub struct CertificationRequest<'a> {
    pub info: CertificationRequestInfo<'a>,
    pub signature_algorithm: AlgorithmIdentifier<'a>,
}

#[derive(Debug, Clone)]
pub struct CertificationRequestInfo<'a> {
    pub subject: Vec<RelativeDistinguishedName<'a>>,
    pub subject_public_key_info: SubjectPublicKeyInfo<'a>,
    pub attributes: Vec<Attribute<'a>>,
}

#[derive(Debug, Clone)]
pub struct RelativeDistinguishedName<'a> {
    pub entries: Vec<AttributeTypeAndValue<'a>>,
}

#[derive(Debug, Clone)]
pub struct AttributeTypeAndValue<'a> {
    pub oid: String,
    pub kind: Kind,
    pub value: &'a [u8],
}

#[derive(Debug, Clone)]
pub struct AlgorithmIdentifier<'a> {
    pub oid: String,
    pub parameters: Option<AlgorithmParameters<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmParameters<'a> {
    Null,
    Oid(String),
    /// Any other encoding, kept as the full TLV.
    Other(&'a [u8]),
}

#[derive(Debug, Clone)]
pub struct SubjectPublicKeyInfo<'a> {
    pub algorithm: AlgorithmIdentifier<'a>,
    pub public_key: BitString<'a>,
}

#[derive(Debug, Clone, Copy)]
pub struct BitString<'a> {
    /// Payload after the unused-bits octet.
    pub data: &'a [u8],
}

/// A request attribute. Only extensionRequest carries content the rest of
/// the pipeline reads; challengePassword is validated and then dropped.
#[derive(Debug, Clone)]
pub enum Attribute<'a> {
    ExtensionRequest(Vec<Extension<'a>>),
    Other,
}

#[derive(Debug, Clone)]
pub struct Extension<'a> {
    pub oid: String,
    pub value: &'a [u8],
}

impl<'a> CertificationRequest<'a> {
    pub fn extension_requests(&self) -> impl Iterator<Item = &[Extension<'a>]> {
        self.info.attributes.iter().filter_map(|attr| match attr {
            Attribute::ExtensionRequest(exts) => Some(exts.as_slice()),
            Attribute::Other => None,
        })
    }
}

fn invalid(reason: impl Into<String>) -> ParseError {
    ParseError::StructurallyInvalid(reason.into())
}

struct Walker<'r, 'a> {
    arena: &'r DerArena<'a>,
}

impl<'r, 'a> Walker<'r, 'a> {
    fn expect(&self, id: NodeId, kind: Kind, what: &str) -> Result<NodeId, ParseError> {
        if self.arena.kind(id) == kind {
            Ok(id)
        } else {
            Err(invalid(format!(
                "{} must be {:?}, found {:?}",
                what,
                kind,
                self.arena.kind(id)
            )))
        }
    }

    /// Children of `id`, requiring a count within `min..=max`.
    fn children(
        &self,
        id: NodeId,
        min: usize,
        max: usize,
        what: &str,
    ) -> Result<Vec<NodeId>, ParseError> {
        let kids: Vec<NodeId> = self.arena.children(id).collect();
        if kids.len() < min || kids.len() > max {
            return Err(invalid(format!(
                "{} has {} elements, expected {}..={}",
                what,
                kids.len(),
                min,
                max
            )));
        }
        Ok(kids)
    }

    fn oid(&self, id: NodeId, what: &str) -> Result<String, ParseError> {
        self.expect(id, Kind::Oid, what)?;
        Ok(der::decode_oid(self.arena.content(id))?)
    }

    fn certification_request(&self, root: NodeId) -> Result<CertificationRequest<'a>, ParseError> {
        self.expect(root, Kind::Sequence, "CertificationRequest")?;
        let parts = self.children(root, 3, 3, "CertificationRequest")?;

        let info = self.request_info(parts[0])?;
        let signature_algorithm = self.algorithm_identifier(parts[1], "signatureAlgorithm")?;
        self.bit_string(parts[2], "signature")?;
        Ok(CertificationRequest {
            info,
            signature_algorithm,
        })
    }

    fn request_info(&self, id: NodeId) -> Result<CertificationRequestInfo<'a>, ParseError> {
        self.expect(id, Kind::Sequence, "CertificationRequestInfo")?;
        let parts = self.children(id, 4, 4, "CertificationRequestInfo")?;

        self.expect(parts[0], Kind::Integer, "version")?;
        let version = der::small_unsigned(self.arena.content(parts[0]))?;
        if version != 0 {
            return Err(invalid(format!("unsupported request version {}", version)));
        }

        Ok(CertificationRequestInfo {
            subject: self.name(parts[1])?,
            subject_public_key_info: self.subject_public_key_info(parts[2])?,
            attributes: self.attributes(parts[3])?,
        })
    }

    fn name(&self, id: NodeId) -> Result<Vec<RelativeDistinguishedName<'a>>, ParseError> {
        self.expect(id, Kind::Sequence, "subject")?;

        let mut rdns = Vec::new();
        for set in self.arena.children(id) {
            self.expect(set, Kind::Set, "RelativeDistinguishedName")?;
            let members = self.children(set, 1, usize::MAX, "RelativeDistinguishedName")?;

            let mut entries = Vec::with_capacity(members.len());
            for atv in members {
                self.expect(atv, Kind::Sequence, "AttributeTypeAndValue")?;
                let pair = self.children(atv, 2, 2, "AttributeTypeAndValue")?;
                entries.push(AttributeTypeAndValue {
                    oid: self.oid(pair[0], "attribute type")?,
                    kind: self.arena.kind(pair[1]),
                    value: self.arena.content(pair[1]),
                });
            }
            rdns.push(RelativeDistinguishedName { entries });
        }
        Ok(rdns)
    }

    fn subject_public_key_info(&self, id: NodeId) -> Result<SubjectPublicKeyInfo<'a>, ParseError> {
        self.expect(id, Kind::Sequence, "SubjectPublicKeyInfo")?;
        let parts = self.children(id, 2, 2, "SubjectPublicKeyInfo")?;
        Ok(SubjectPublicKeyInfo {
            algorithm: self.algorithm_identifier(parts[0], "subjectPublicKeyInfo.algorithm")?,
            public_key: self.bit_string(parts[1], "subjectPublicKey")?,
        })
    }

    fn algorithm_identifier(&self, id: NodeId, what: &str) -> Result<AlgorithmIdentifier<'a>, ParseError> {
        self.expect(id, Kind::Sequence, what)?;
        let parts = self.children(id, 1, 2, what)?;
        let oid = self.oid(parts[0], what)?;

        let parameters = match parts.get(1) {
            None => None,
            Some(&p) => Some(match self.arena.kind(p) {
                Kind::Null if self.arena.content(p).is_empty() => AlgorithmParameters::Null,
                Kind::Null => return Err(invalid(format!("{} has a non-empty NULL", what))),
                Kind::Oid => AlgorithmParameters::Oid(der::decode_oid(self.arena.content(p))?),
                _ => AlgorithmParameters::Other(self.arena.raw(p)),
            }),
        };

        Ok(AlgorithmIdentifier { oid, parameters })
    }

    fn bit_string(&self, id: NodeId, what: &str) -> Result<BitString<'a>, ParseError> {
        self.expect(id, Kind::BitString, what)?;
        match self.arena.content(id) {
            [] => Err(invalid(format!("{} is missing the unused-bits octet", what))),
            [unused, ..] if *unused > 7 => Err(invalid(format!("{} declares {} unused bits", what, unused))),
            [unused] if *unused != 0 => Err(invalid(format!("{} is empty but declares unused bits", what))),
            [_, data @ ..] => Ok(BitString { data }),
        }
    }

    fn attributes(&self, id: NodeId) -> Result<Vec<Attribute<'a>>, ParseError> {
        if self.arena.kind(id) != Kind::Context(0) || !self.arena.node(id).constructed {
            return Err(invalid("attributes must be a constructed [0]"));
        }

        let mut attributes = Vec::new();
        for attr in self.arena.children(id) {
            self.expect(attr, Kind::Sequence, "Attribute")?;
            let pair = self.children(attr, 2, 2, "Attribute")?;
            let attr_oid = self.oid(pair[0], "attribute type")?;
            self.expect(pair[1], Kind::Set, "attribute values")?;
            let values: Vec<NodeId> = self.arena.children(pair[1]).collect();

            let attribute = match attr_oid.as_str() {
                oid::EXTENSION_REQUEST => {
                    let first = values
                        .first()
                        .copied()
                        .ok_or_else(|| invalid("extensionRequest without a value"))?;
                    Attribute::ExtensionRequest(self.extensions(first)?)
                }
                oid::CHALLENGE_PASSWORD => {
                    let first = values
                        .first()
                        .copied()
                        .ok_or_else(|| invalid("challengePassword without a value"))?;
                    self.challenge_password(first)?;
                    Attribute::Other
                }
                _ => Attribute::Other,
            };
            attributes.push(attribute);
        }
        Ok(attributes)
    }

    fn challenge_password(&self, id: NodeId) -> Result<(), ParseError> {
        let kind = self.arena.kind(id);
        let allowed = matches!(
            kind,
            Kind::String(StringKind::Utf8)
                | Kind::String(StringKind::Printable)
                | Kind::String(StringKind::Universal)
                | Kind::String(StringKind::Bmp)
                | Kind::String(StringKind::Teletex)
        );
        if !allowed || super::attributes::directory_string(kind, self.arena.content(id)).is_none() {
            return Err(invalid("challengePassword is not a DirectoryString"));
        }
        Ok(())
    }

    fn extensions(&self, id: NodeId) -> Result<Vec<Extension<'a>>, ParseError> {
        self.expect(id, Kind::Sequence, "Extensions")?;

        let mut extensions = Vec::new();
        for ext in self.arena.children(id) {
            self.expect(ext, Kind::Sequence, "Extension")?;
            let parts = self.children(ext, 2, 3, "Extension")?;
            let ext_oid = self.oid(parts[0], "extnID")?;

            let value_node = if parts.len() == 3 {
                self.expect(parts[1], Kind::Boolean, "critical")?;
                if !matches!(self.arena.content(parts[1]), [0x00] | [0xff]) {
                    return Err(invalid("critical is not a DER BOOLEAN"));
                }
                parts[2]
            } else {
                parts[1]
            };
            self.expect(value_node, Kind::OctetString, "extnValue")?;

            extensions.push(Extension {
                oid: ext_oid,
                value: self.arena.content(value_node),
            });
        }
        Ok(extensions)
    }
}

/// Walks `id` as a Name (SEQUENCE OF SET OF AttributeTypeAndValue).
pub fn name<'a>(arena: &DerArena<'a>, id: NodeId) -> Result<Vec<RelativeDistinguishedName<'a>>, ParseError> {
    Walker { arena }.name(id)
}

/// Decodes `der` as a CertificationRequest.
///
/// The arena is built over the caller's buffer, so the returned tree borrows it.
pub fn decode(der: &[u8]) -> Result<CertificationRequest<'_>, ParseError> {
    let arena = DerArena::parse(der)?;
    Walker { arena: &arena }.certification_request(arena.root())
}
