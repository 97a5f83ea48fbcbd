use super::decoder::{AlgorithmParameters, SubjectPublicKeyInfo};
use super::der::{self, DerArena, Kind};
use super::oid::{self, KeyFamily};
use super::ParseError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFacts {
    pub rsa_key_length: Option<u32>,
    pub ec_curve: Option<String>,
}

/// Bit length of an unsigned big-endian integer, ignoring leading zero octets.
pub fn modulus_bits(modulus: &[u8]) -> u32 {
    let Some(first) = modulus.iter().position(|&b| b != 0) else {
        return 0;
    };
    let significant = &modulus[first..];
    (significant.len() as u32 - 1) * 8 + (8 - significant[0].leading_zeros())
}

/// Display name for an EC `namedCurve` parameter; unknown curves come back as
/// the dotted OID.
pub fn curve_name(curve_oid: &str) -> String {
    oid::resolve_named_curve(curve_oid).display_name
}

/// Modulus octets of a PKCS#1 RSAPublicKey.
fn rsa_modulus(key: &[u8]) -> Result<&[u8], ParseError> {
    let arena = DerArena::parse(key)?;
    let root = arena.root();
    let parts: Vec<_> = arena.children(root).collect();
    if arena.kind(root) != Kind::Sequence
        || parts.len() != 2
        || parts.iter().any(|&p| arena.kind(p) != Kind::Integer)
    {
        return Err(ParseError::StructurallyInvalid(
            "RSAPublicKey must be SEQUENCE { INTEGER, INTEGER }".to_string(),
        ));
    }
    der::unsigned_integer(arena.content(parts[1]))?;
    Ok(der::unsigned_integer(arena.content(parts[0]))?)
}

/// Algorithm-specific facts for the request's public key.
///
/// Families other than RSA and EC produce [`ParseError::UnsupportedAlgorithm`],
/// which callers treat as "no extra facts" rather than a failed request.
pub fn extract(spki: &SubjectPublicKeyInfo<'_>) -> Result<KeyFacts, ParseError> {
    let algorithm = &spki.algorithm;
    match oid::key_family(&algorithm.oid) {
        KeyFamily::Rsa => {
            let modulus = rsa_modulus(spki.public_key.data)?;
            Ok(KeyFacts {
                rsa_key_length: Some(modulus_bits(modulus)),
                ec_curve: None,
            })
        }
        KeyFamily::Ec => {
            let ec_curve = match &algorithm.parameters {
                Some(AlgorithmParameters::Oid(curve)) => Some(curve_name(curve)),
                _ => None,
            };
            Ok(KeyFacts {
                rsa_key_length: None,
                ec_curve,
            })
        }
        KeyFamily::Other => Err(ParseError::UnsupportedAlgorithm(algorithm.oid.clone())),
    }
}
