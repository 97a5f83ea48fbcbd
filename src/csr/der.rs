//! Strict DER reader.
//!
//! The whole input is decoded up front into a flat arena of [`Node`]s linked
//! by first-child / next-sibling indices. Lookups borrow from the original
//! buffer, so nothing is copied out of the input while walking the tree.

use std::ops::Range;
use thiserror::Error;

pub type NodeId = usize;

const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerError {
    #[error("empty input")]
    Empty,
    #[error("truncated element at offset {0}")]
    Truncated(usize),
    #[error("indefinite length at offset {0}")]
    IndefiniteLength(usize),
    #[error("length field too large at offset {0}")]
    LengthTooLarge(usize),
    #[error("non-minimal length encoding at offset {0}")]
    NonMinimalLength(usize),
    #[error("malformed tag at offset {0}")]
    BadTag(usize),
    #[error("constructed encoding of a primitive type at offset {0}")]
    UnexpectedConstructed(usize),
    #[error("primitive encoding of a constructed type at offset {0}")]
    UnexpectedPrimitive(usize),
    #[error("{0} trailing bytes after the outer element")]
    TrailingData(usize),
    #[error("nesting deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("malformed object identifier")]
    BadOid,
    #[error("malformed integer")]
    BadInteger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    Utf8,
    Numeric,
    Printable,
    Teletex,
    Ia5,
    Visible,
    Universal,
    Bmp,
}

impl StringKind {
    pub fn from_universal_tag(number: u32) -> Option<Self> {
        let kind = match number {
            12 => StringKind::Utf8,
            18 => StringKind::Numeric,
            19 => StringKind::Printable,
            20 => StringKind::Teletex,
            22 => StringKind::Ia5,
            26 => StringKind::Visible,
            28 => StringKind::Universal,
            30 => StringKind::Bmp,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Boolean,
    Integer,
    BitString,
    OctetString,
    Null,
    Oid,
    String(StringKind),
    Sequence,
    Set,
    Context(u32),
    Other { class: Class, number: u32 },
}

impl Kind {
    fn from_tag(class: Class, number: u32) -> Self {
        match class {
            Class::Universal => {}
            Class::ContextSpecific => return Kind::Context(number),
            _ => return Kind::Other { class, number },
        }
        match number {
            1 => Kind::Boolean,
            2 => Kind::Integer,
            3 => Kind::BitString,
            4 => Kind::OctetString,
            5 => Kind::Null,
            6 => Kind::Oid,
            16 => Kind::Sequence,
            17 => Kind::Set,
            n => StringKind::from_universal_tag(n).map_or(Kind::Other { class, number }, Kind::String),
        }
    }

    /// Universal types whose DER form is always primitive.
    fn must_be_primitive(self) -> bool {
        matches!(
            self,
            Kind::Boolean
                | Kind::Integer
                | Kind::BitString
                | Kind::OctetString
                | Kind::Null
                | Kind::Oid
                | Kind::String(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: Kind,
    pub constructed: bool,
    /// Offset of the identifier octet.
    pub start: usize,
    pub content: Range<usize>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

#[derive(Debug)]
pub struct DerArena<'a> {
    input: &'a [u8],
    nodes: Vec<Node>,
}

impl<'a> DerArena<'a> {
    /// Decodes exactly one top-level element spanning all of `input`.
    pub fn parse(input: &'a [u8]) -> Result<Self, DerError> {
        if input.is_empty() {
            return Err(DerError::Empty);
        }
        let mut arena = Self {
            input,
            nodes: Vec::with_capacity(64),
        };
        let (_, end) = arena.parse_element(0, input.len(), 0)?;
        if end != input.len() {
            return Err(DerError::TrailingData(input.len() - end));
        }
        Ok(arena)
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> Kind {
        self.nodes[id].kind
    }

    pub fn content(&self, id: NodeId) -> &'a [u8] {
        &self.input[self.nodes[id].content.clone()]
    }

    /// Header and content of the element.
    pub fn raw(&self, id: NodeId) -> &'a [u8] {
        let node = &self.nodes[id];
        &self.input[node.start..node.content.end]
    }

    pub fn children(&self, id: NodeId) -> Children<'_, 'a> {
        Children {
            arena: self,
            next: self.nodes[id].first_child,
        }
    }

    fn parse_element(
        &mut self,
        pos: usize,
        end: usize,
        depth: usize,
    ) -> Result<(NodeId, usize), DerError> {
        if depth > MAX_DEPTH {
            return Err(DerError::TooDeep);
        }

        let (class, constructed, number, after_tag) = read_tag(self.input, pos, end)?;
        let (len, content_start) = read_length(self.input, after_tag, end)?;
        let content_end = content_start
            .checked_add(len)
            .filter(|&e| e <= end)
            .ok_or(DerError::Truncated(pos))?;

        let kind = Kind::from_tag(class, number);
        if constructed && kind.must_be_primitive() {
            return Err(DerError::UnexpectedConstructed(pos));
        }
        if !constructed && matches!(kind, Kind::Sequence | Kind::Set) {
            return Err(DerError::UnexpectedPrimitive(pos));
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            constructed,
            start: pos,
            content: content_start..content_end,
            first_child: None,
            next_sibling: None,
        });

        if constructed {
            let mut cursor = content_start;
            let mut prev: Option<NodeId> = None;
            while cursor < content_end {
                let (child, next) = self.parse_element(cursor, content_end, depth + 1)?;
                match prev {
                    None => self.nodes[id].first_child = Some(child),
                    Some(p) => self.nodes[p].next_sibling = Some(child),
                }
                prev = Some(child);
                cursor = next;
            }
        }

        Ok((id, content_end))
    }
}

pub struct Children<'r, 'a> {
    arena: &'r DerArena<'a>,
    next: Option<NodeId>,
}

impl Iterator for Children<'_, '_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.nodes[current].next_sibling;
        Some(current)
    }
}

fn read_tag(input: &[u8], pos: usize, end: usize) -> Result<(Class, bool, u32, usize), DerError> {
    let first = *input.get(pos).filter(|_| pos < end).ok_or(DerError::Truncated(pos))?;
    let class = match first >> 6 {
        0 => Class::Universal,
        1 => Class::Application,
        2 => Class::ContextSpecific,
        _ => Class::Private,
    };
    let constructed = first & 0x20 != 0;
    let low = u32::from(first & 0x1f);
    if low != 0x1f {
        return Ok((class, constructed, low, pos + 1));
    }

    // High tag number form: base-128, at most four continuation octets.
    let mut number: u32 = 0;
    let mut cursor = pos + 1;
    for i in 0..4 {
        let b = *input.get(cursor).filter(|_| cursor < end).ok_or(DerError::Truncated(pos))?;
        if i == 0 && b == 0x80 {
            return Err(DerError::BadTag(pos));
        }
        number = (number << 7) | u32::from(b & 0x7f);
        cursor += 1;
        if b & 0x80 == 0 {
            if number < 0x1f {
                return Err(DerError::BadTag(pos));
            }
            return Ok((class, constructed, number, cursor));
        }
    }
    Err(DerError::BadTag(pos))
}

fn read_length(input: &[u8], pos: usize, end: usize) -> Result<(usize, usize), DerError> {
    let first = *input.get(pos).filter(|_| pos < end).ok_or(DerError::Truncated(pos))?;
    if first < 0x80 {
        return Ok((usize::from(first), pos + 1));
    }
    if first == 0x80 {
        return Err(DerError::IndefiniteLength(pos));
    }

    let count = usize::from(first & 0x7f);
    if count > 4 {
        return Err(DerError::LengthTooLarge(pos));
    }
    let bytes = input
        .get(pos + 1..pos + 1 + count)
        .filter(|_| pos + 1 + count <= end)
        .ok_or(DerError::Truncated(pos))?;
    if bytes[0] == 0 {
        return Err(DerError::NonMinimalLength(pos));
    }
    let len = bytes.iter().fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
    if len < 0x80 {
        return Err(DerError::NonMinimalLength(pos));
    }
    Ok((len, pos + 1 + count))
}

/// Renders the content octets of an OBJECT IDENTIFIER in dotted form.
pub fn decode_oid(content: &[u8]) -> Result<String, DerError> {
    if content.is_empty() || content[content.len() - 1] & 0x80 != 0 {
        return Err(DerError::BadOid);
    }

    let mut arcs: Vec<u64> = Vec::with_capacity(content.len());
    let mut value: u64 = 0;
    let mut fresh = true;
    for &b in content {
        if fresh && b == 0x80 {
            return Err(DerError::BadOid);
        }
        if value > (u64::MAX >> 7) {
            return Err(DerError::BadOid);
        }
        value = (value << 7) | u64::from(b & 0x7f);
        fresh = b & 0x80 == 0;
        if fresh {
            arcs.push(value);
            value = 0;
        }
    }

    let first = arcs[0];
    let (a, b) = match first {
        0..=39 => (0, first),
        40..=79 => (1, first - 40),
        _ => (2, first - 80),
    };

    let mut out = format!("{}.{}", a, b);
    for arc in &arcs[1..] {
        out.push('.');
        out.push_str(&arc.to_string());
    }
    Ok(out)
}

/// Magnitude bytes of a non-negative INTEGER with sign padding removed.
pub fn unsigned_integer(content: &[u8]) -> Result<&[u8], DerError> {
    match content {
        [] => Err(DerError::BadInteger),
        [first, ..] if first & 0x80 != 0 => Err(DerError::BadInteger),
        [0, next, ..] if next & 0x80 == 0 => Err(DerError::BadInteger),
        _ => {
            let start = content.iter().position(|&b| b != 0).unwrap_or(content.len());
            Ok(&content[start..])
        }
    }
}

pub fn small_unsigned(content: &[u8]) -> Result<u64, DerError> {
    let magnitude = unsigned_integer(content)?;
    if magnitude.len() > 8 {
        return Err(DerError::BadInteger);
    }
    Ok(magnitude.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}
