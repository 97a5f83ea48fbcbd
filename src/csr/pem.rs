use base64::{engine::general_purpose::STANDARD, Engine};
use std::borrow::Cow;

use super::ParseError;

const LABELS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Pem,
    Der,
}

/// Request body as received, with the encoding it was detected as.
#[derive(Debug, Clone, Copy)]
pub struct RawInput<'a> {
    pub bytes: &'a [u8],
    pub encoding: Encoding,
}

impl<'a> RawInput<'a> {
    pub fn detect(bytes: &'a [u8]) -> Self {
        let encoding = if find_begin(bytes).is_some() {
            Encoding::Pem
        } else {
            Encoding::Der
        };
        Self { bytes, encoding }
    }
}

/// Whether a non-PEM body could be a DER request at all: it must start with a
/// constructed SEQUENCE tag.
pub fn looks_like_der(bytes: &[u8]) -> bool {
    bytes.first() == Some(&0x30)
}

/// Strips trailing whitespace, which also drops the `\r` of CRLF files.
fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |p| p + 1);
    let start = line[..end]
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(end);
    &line[start..end]
}

fn boundary_label<'l>(line: &'l [u8], kind: &str) -> Option<&'l [u8]> {
    let line = trim_line(line);
    let prefix = format!("-----{} ", kind);
    line.strip_prefix(prefix.as_bytes())?
        .strip_suffix(b"-----")
}

fn is_csr_label(label: &[u8]) -> bool {
    LABELS.iter().any(|l| l.as_bytes() == label)
}

fn lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes.split(|&b| b == b'\n' || b == b'\r')
}

/// Index (in line terms) of the first CSR BEGIN line and its label.
fn find_begin(bytes: &[u8]) -> Option<(usize, &[u8])> {
    lines(bytes).enumerate().find_map(|(i, line)| {
        boundary_label(line, "BEGIN")
            .filter(|label| is_csr_label(label))
            .map(|label| (i, label))
    })
}

/// Label and trimmed body lines of the first CSR block, or `None` when the
/// input has no CSR BEGIN line.
fn request_block(bytes: &[u8]) -> Option<Result<(&[u8], Vec<&[u8]>), ParseError>> {
    let (begin, label) = find_begin(bytes)?;

    let mut body = Vec::new();
    for line in lines(bytes).skip(begin + 1) {
        if let Some(end_label) = boundary_label(line, "END") {
            if end_label != label {
                return Some(Err(ParseError::StructurallyInvalid(
                    "PEM END label does not match BEGIN".to_string(),
                )));
            }
            return Some(Ok((label, body)));
        }
        let line = trim_line(line);
        if line.starts_with(b"-----") {
            return Some(Err(ParseError::StructurallyInvalid(
                "unexpected boundary inside PEM block".to_string(),
            )));
        }
        if !line.is_empty() {
            body.push(line);
        }
    }

    Some(Err(ParseError::StructurallyInvalid(
        "PEM block has no END line".to_string(),
    )))
}

/// Canonical DER for a request body: the base64 payload of the first CSR PEM
/// block if there is one, otherwise the bytes unchanged.
pub fn to_der(bytes: &[u8]) -> Result<Cow<'_, [u8]>, ParseError> {
    let Some(block) = request_block(bytes) else {
        return Ok(Cow::Borrowed(bytes));
    };
    let (_, body) = block?;

    STANDARD
        .decode(body.concat())
        .map(Cow::Owned)
        .map_err(|e| ParseError::StructurallyInvalid(format!("PEM body is not base64: {}", e)))
}

/// The first CSR block re-armoured with trimmed, LF-terminated lines and
/// nothing before its BEGIN line. `None` when the input has no CSR block.
pub fn normalized_block(bytes: &[u8]) -> Option<Result<Vec<u8>, ParseError>> {
    request_block(bytes).map(|block| {
        let (label, body) = block?;
        let mut out = Vec::with_capacity(bytes.len());
        out.extend_from_slice(b"-----BEGIN ");
        out.extend_from_slice(label);
        out.extend_from_slice(b"-----\n");
        for line in body {
            out.extend_from_slice(line);
            out.push(b'\n');
        }
        out.extend_from_slice(b"-----END ");
        out.extend_from_slice(label);
        out.extend_from_slice(b"-----\n");
        Ok(out)
    })
}
