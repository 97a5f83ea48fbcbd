use tracing::debug;

use super::assembler::{self, Assembly};
use super::pem::{self, Encoding, RawInput};
use super::{attributes, decoder, key_facts};
use super::{CsrBackend, ParseError};
use crate::models::CsrDetailsModel;

/// The in-crate pipeline: PEM normalisation, DER arena, PKCS#10 walker.
pub struct CustomBackend;

impl CsrBackend for CustomBackend {
    fn decode(&self, input: &[u8]) -> Result<CsrDetailsModel, ParseError> {
        let raw = RawInput::detect(input);
        if raw.encoding == Encoding::Der && !pem::looks_like_der(raw.bytes) {
            return Err(ParseError::NotPemOrDer);
        }

        let der = pem::to_der(raw.bytes)?;
        debug!(encoding = ?raw.encoding, der_len = der.len(), "normalized input");

        let request = decoder::decode(&der)?;
        let info = &request.info;

        let key_facts = assembler::absorb_unsupported(key_facts::extract(&info.subject_public_key_info))?;
        let subject_alternative_name = request
            .extension_requests()
            .next()
            .and_then(attributes::subject_alternative_name);

        Ok(assembler::assemble(Assembly {
            signature_algorithm_oid: request.signature_algorithm.oid.clone(),
            public_key_algorithm_oid: info.subject_public_key_info.algorithm.oid.clone(),
            subject: attributes::subject_fields(&info.subject),
            key_facts,
            subject_alternative_name,
        }))
    }
}
