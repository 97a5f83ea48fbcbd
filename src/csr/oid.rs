//! Static OID → display name tables.
//!
//! All lookups are exact matches on the dotted form. An OID with no entry
//! resolves to itself, which callers read as "no friendly name known".

use serde::Serialize;

pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
pub const EXTENSION_REQUEST: &str = "1.2.840.113549.1.9.14";
pub const CHALLENGE_PASSWORD: &str = "1.2.840.113549.1.9.7";
pub const SUBJECT_ALT_NAME: &str = "2.5.29.17";

pub const COMMON_NAME: &str = "2.5.4.3";
pub const COUNTRY: &str = "2.5.4.6";
pub const LOCALITY: &str = "2.5.4.7";
pub const STATE_OR_PROVINCE: &str = "2.5.4.8";
pub const ORGANIZATION_NAME: &str = "2.5.4.10";
pub const ORGANIZATION_UNIT: &str = "2.5.4.11";
pub const DN_QUALIFIER: &str = "2.5.4.46";
pub const EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedIdentifier {
    pub oid: String,
    pub display_name: String,
}

impl ResolvedIdentifier {
    pub fn is_known(&self) -> bool {
        self.oid != self.display_name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Ec,
    Other,
}

pub fn key_family(oid: &str) -> KeyFamily {
    match oid {
        RSA_ENCRYPTION => KeyFamily::Rsa,
        EC_PUBLIC_KEY => KeyFamily::Ec,
        _ => KeyFamily::Other,
    }
}

pub fn resolve_signature_algorithm(oid: &str) -> ResolvedIdentifier {
    resolve(oid, signature_algorithm_name)
}

pub fn resolve_public_key_algorithm(oid: &str) -> ResolvedIdentifier {
    resolve(oid, public_key_algorithm_name)
}

pub fn resolve_named_curve(oid: &str) -> ResolvedIdentifier {
    resolve(oid, named_curve_name)
}

pub fn resolve_attribute_type(oid: &str) -> ResolvedIdentifier {
    resolve(oid, attribute_type_name)
}

fn resolve(oid: &str, table: fn(&str) -> Option<&'static str>) -> ResolvedIdentifier {
    ResolvedIdentifier {
        oid: oid.to_string(),
        display_name: table(oid).unwrap_or(oid).to_string(),
    }
}

fn signature_algorithm_name(oid: &str) -> Option<&'static str> {
    let name = match oid {
        "1.2.840.113549.1.1.2" => "md2WithRSAEncryption",
        "1.2.840.113549.1.1.3" => "md4WithRSAEncryption",
        "1.2.840.113549.1.1.4" => "md5WithRSAEncryption",
        "1.2.840.113549.1.1.5" => "sha1WithRSAEncryption",
        "1.2.840.113549.1.1.10" => "rsassa-pss",
        "1.2.840.113549.1.1.11" => "sha256WithRSAEncryption",
        "1.2.840.113549.1.1.12" => "sha384WithRSAEncryption",
        "1.2.840.113549.1.1.13" => "sha512WithRSAEncryption",
        "1.2.840.113549.1.1.14" => "sha224WithRSAEncryption",
        "1.2.840.113549.1.1.15" => "sha512-224WithRSAEncryption",
        "1.2.840.113549.1.1.16" => "sha512-256WithRSAEncryption",
        "1.2.840.10040.4.3" => "dsa-with-sha1",
        "2.16.840.1.101.3.4.3.1" => "dsa-with-sha224",
        "2.16.840.1.101.3.4.3.2" => "dsa-with-sha256",
        "1.2.840.10045.4.1" => "ecdsa-with-SHA1",
        "1.2.840.10045.4.3.1" => "ecdsa-with-SHA224",
        "1.2.840.10045.4.3.2" => "ecdsa-with-SHA256",
        "1.2.840.10045.4.3.3" => "ecdsa-with-SHA384",
        "1.2.840.10045.4.3.4" => "ecdsa-with-SHA512",
        "1.3.101.112" => "Ed25519",
        "1.3.101.113" => "Ed448",
        _ => return None,
    };
    Some(name)
}

fn public_key_algorithm_name(oid: &str) -> Option<&'static str> {
    let name = match oid {
        RSA_ENCRYPTION => "rsaEncryption",
        "1.2.840.113549.1.1.10" => "rsassa-pss",
        "1.2.840.10040.4.1" => "dsa",
        "1.2.840.10046.2.1" => "dhpublicnumber",
        "2.16.840.1.101.2.1.1.22" => "keyExchangeAlgorithm",
        EC_PUBLIC_KEY => "id-ecPublicKey",
        "1.3.132.1.12" => "id-ecDH",
        "1.3.101.110" => "X25519",
        "1.3.101.111" => "X448",
        "1.3.101.112" => "Ed25519",
        "1.3.101.113" => "Ed448",
        _ => return None,
    };
    Some(name)
}

fn named_curve_name(oid: &str) -> Option<&'static str> {
    let name = match oid {
        "1.2.840.10045.3.1.1" => "prime192v1",
        "1.3.132.0.33" => "secp224r1",
        "1.2.840.10045.3.1.7" => "secp256r1",
        "1.3.132.0.10" => "secp256k1",
        "1.3.132.0.34" => "secp384r1",
        "1.3.132.0.35" => "secp521r1",
        "1.3.36.3.3.2.8.1.1.7" => "brainpoolP256r1",
        "1.3.36.3.3.2.8.1.1.11" => "brainpoolP384r1",
        "1.3.36.3.3.2.8.1.1.13" => "brainpoolP512r1",
        _ => return None,
    };
    Some(name)
}

fn attribute_type_name(oid: &str) -> Option<&'static str> {
    let name = match oid {
        COMMON_NAME => "commonName",
        "2.5.4.4" => "surname",
        "2.5.4.5" => "serialNumber",
        COUNTRY => "countryName",
        LOCALITY => "localityName",
        STATE_OR_PROVINCE => "stateOrProvinceName",
        "2.5.4.9" => "streetAddress",
        ORGANIZATION_NAME => "organizationName",
        ORGANIZATION_UNIT => "organizationalUnitName",
        "2.5.4.12" => "title",
        "2.5.4.42" => "givenName",
        DN_QUALIFIER => "dnQualifier",
        "0.9.2342.19200300.100.1.25" => "domainComponent",
        EMAIL_ADDRESS => "emailAddress",
        "1.2.840.113549.1.9.2" => "unstructuredName",
        _ => return None,
    };
    Some(name)
}
