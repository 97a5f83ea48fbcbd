//! Flattening of the Subject name and the requested SubjectAltName into
//! display strings. Both backends feed their own decoded values through
//! these helpers so that text conversion and formatting cannot drift.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;

use super::decoder::{self, Extension, RelativeDistinguishedName};
use super::der::{DerArena, Kind, NodeId, StringKind};
use super::oid;

/// Subject fields surfaced in the result.
///
/// Each slot keeps the first non-empty value found while walking the name in
/// encoded order (RDN by RDN, then member by member within an RDN).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectFields {
    pub common_name: Option<String>,
    pub country: Option<String>,
    pub locality: Option<String>,
    pub state_or_province: Option<String>,
    pub organization_name: Option<String>,
    pub organization_unit: Option<String>,
    pub dn_qualifier: Option<String>,
    pub email_address: Option<String>,
}

impl SubjectFields {
    fn slot(&mut self, attr_oid: &str) -> Option<&mut Option<String>> {
        let slot = match attr_oid {
            oid::COMMON_NAME => &mut self.common_name,
            oid::COUNTRY => &mut self.country,
            oid::LOCALITY => &mut self.locality,
            oid::STATE_OR_PROVINCE => &mut self.state_or_province,
            oid::ORGANIZATION_NAME => &mut self.organization_name,
            oid::ORGANIZATION_UNIT => &mut self.organization_unit,
            oid::DN_QUALIFIER => &mut self.dn_qualifier,
            oid::EMAIL_ADDRESS => &mut self.email_address,
            _ => return None,
        };
        Some(slot)
    }

    /// Offers one name component. Unknown types and values that are not
    /// decodable text are ignored.
    pub fn offer(&mut self, attr_oid: &str, value: Option<String>) {
        let Some(slot) = self.slot(attr_oid) else {
            debug!(
                attribute = %oid::resolve_attribute_type(attr_oid).display_name,
                "ignoring subject attribute"
            );
            return;
        };
        if slot.is_some() {
            return;
        }
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            *slot = Some(value);
        }
    }
}

pub fn subject_fields(rdns: &[RelativeDistinguishedName<'_>]) -> SubjectFields {
    let mut fields = SubjectFields::default();
    for rdn in rdns {
        for atv in &rdn.entries {
            fields.offer(&atv.oid, directory_string(atv.kind, atv.value));
        }
    }
    fields
}

/// Text of an ASN.1 character string, or `None` for non-string types and
/// content that is not valid in its declared encoding.
pub fn directory_string(kind: Kind, bytes: &[u8]) -> Option<String> {
    let Kind::String(string_kind) = kind else {
        return None;
    };
    match string_kind {
        StringKind::Utf8
        | StringKind::Printable
        | StringKind::Ia5
        | StringKind::Numeric
        | StringKind::Visible
        | StringKind::Teletex => std::str::from_utf8(bytes).ok().map(str::to_string),
        StringKind::Bmp => {
            if bytes.len() % 2 != 0 {
                return None;
            }
            let units = bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
            char::decode_utf16(units).collect::<Result<String, _>>().ok()
        }
        StringKind::Universal => {
            if bytes.len() % 4 != 0 {
                return None;
            }
            bytes
                .chunks_exact(4)
                .map(|c| char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
                .collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanEntry<'a> {
    Dns(&'a str),
    Email(&'a str),
    Uri(&'a str),
    Ip(&'a [u8]),
}

impl SanEntry<'_> {
    fn render(&self) -> Option<String> {
        match self {
            SanEntry::Dns(name) => Some(format!("DNS: {}", name)),
            SanEntry::Email(addr) => Some(format!("email: {}", addr)),
            SanEntry::Uri(uri) => Some(format!("URI: {}", uri)),
            SanEntry::Ip(bytes) => parse_ip_address(bytes).map(|ip| format!("IP: {}", ip)),
        }
    }
}

/// `"<type>: <value>"` pairs joined by `", "` in encounter order, or `None`
/// when nothing renderable is left.
pub fn format_san<'a>(entries: impl IntoIterator<Item = SanEntry<'a>>) -> Option<String> {
    let parts: Vec<String> = entries.into_iter().filter_map(|e| e.render()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

pub fn parse_ip_address(bytes: &[u8]) -> Option<IpAddr> {
    match bytes.len() {
        4 => {
            let arr: [u8; 4] = bytes.try_into().ok()?;
            Some(Ipv4Addr::from(arr).into())
        }
        16 => {
            let arr: [u8; 16] = bytes.try_into().ok()?;
            Some(Ipv6Addr::from(arr).into())
        }
        _ => None,
    }
}

/// otherName must open with its type-id OID.
fn other_name_is_valid(arena: &DerArena<'_>, id: NodeId) -> bool {
    arena.node(id).constructed
        && arena
            .children(id)
            .next()
            .is_some_and(|first| arena.kind(first) == Kind::Oid)
}

/// directoryName wraps exactly one well-formed Name.
fn directory_name_is_valid(arena: &DerArena<'_>, id: NodeId) -> bool {
    let mut kids = arena.children(id);
    match (kids.next(), kids.next()) {
        (Some(name), None) => decoder::name(arena, name).is_ok(),
        _ => false,
    }
}

/// Decodes a GeneralNames extension value. A malformed value yields `None`,
/// choices other than rfc822Name, dNSName, URI and iPAddress are skipped
/// once their framing has been checked.
pub fn general_names(value: &[u8]) -> Option<Vec<SanEntry<'_>>> {
    let arena = DerArena::parse(value).ok()?;
    let root = arena.root();
    if arena.kind(root) != Kind::Sequence {
        return None;
    }

    let mut entries = Vec::new();
    for id in arena.children(root) {
        let Kind::Context(choice) = arena.kind(id) else {
            return None;
        };
        let content = arena.content(id);
        let text = || std::str::from_utf8(content).ok();
        match choice {
            1 => entries.push(SanEntry::Email(text()?)),
            2 => entries.push(SanEntry::Dns(text()?)),
            6 => entries.push(SanEntry::Uri(text()?)),
            7 => entries.push(SanEntry::Ip(content)),
            0 if !other_name_is_valid(&arena, id) => return None,
            4 if !directory_name_is_valid(&arena, id) => return None,
            0 | 3 | 4 | 5 | 8 => {}
            _ => return None,
        }
    }
    Some(entries)
}

/// SubjectAltName of the first SAN extension in an extension request.
pub fn subject_alternative_name(extensions: &[Extension<'_>]) -> Option<String> {
    let san = extensions.iter().find(|e| e.oid == oid::SUBJECT_ALT_NAME)?;
    match general_names(san.value) {
        Some(entries) => format_san(entries),
        None => {
            debug!("subjectAltName extension could not be decoded, omitting it");
            None
        }
    }
}
