use tracing::debug;

use super::attributes::SubjectFields;
use super::key_facts::KeyFacts;
use super::oid;
use super::ParseError;
use crate::models::CsrDetailsModel;

/// Backend-neutral facts gathered from one decoded request.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub signature_algorithm_oid: String,
    pub public_key_algorithm_oid: String,
    pub subject: SubjectFields,
    pub key_facts: KeyFacts,
    pub subject_alternative_name: Option<String>,
}

/// Turns an unsupported key family into "no key facts"; every other error
/// still fails the request.
pub fn absorb_unsupported(result: Result<KeyFacts, ParseError>) -> Result<KeyFacts, ParseError> {
    match result {
        Err(ParseError::UnsupportedAlgorithm(algorithm)) => {
            debug!(algorithm = %algorithm, "no key facts for this public key algorithm");
            metrics::counter!("csr_parser_unsupported_key_algorithms_total").increment(1);
            Ok(KeyFacts::default())
        }
        other => other,
    }
}

pub fn assemble(parts: Assembly) -> CsrDetailsModel {
    let signature = oid::resolve_signature_algorithm(&parts.signature_algorithm_oid);
    let public_key = oid::resolve_public_key_algorithm(&parts.public_key_algorithm_oid);
    if !signature.is_known() || !public_key.is_known() {
        debug!(
            signature = %signature.oid,
            public_key = %public_key.oid,
            "algorithm without a display name, falling back to the OID"
        );
    }
    let subject = parts.subject;

    CsrDetailsModel {
        signature_algorithm: signature.display_name,
        signature_algorithm_id: signature.oid,
        public_key_algorithm: public_key.display_name,
        public_key_algorithm_id: public_key.oid,
        rsa_key_length: parts.key_facts.rsa_key_length,
        ec_curve: parts.key_facts.ec_curve,
        common_name: subject.common_name,
        country: subject.country,
        locality: subject.locality,
        state_or_province: subject.state_or_province,
        organization_name: subject.organization_name,
        organization_unit: subject.organization_unit,
        dn_qualifier: subject.dn_qualifier,
        email_address: subject.email_address,
        subject_alternative_name: parts.subject_alternative_name,
    }
}
