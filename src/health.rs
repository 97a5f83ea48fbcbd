use axum::Json;

use crate::csr::oid;
use crate::models::CsrDetailsModel;

pub async fn health() -> &'static str {
    "OK"
}

/// Returns an example decode result for API documentation.
pub async fn example_json() -> Json<CsrDetailsModel> {
    Json(CsrDetailsModel {
        signature_algorithm: "sha256WithRSAEncryption".to_string(),
        signature_algorithm_id: "1.2.840.113549.1.1.11".to_string(),
        public_key_algorithm: "rsaEncryption".to_string(),
        public_key_algorithm_id: oid::RSA_ENCRYPTION.to_string(),
        rsa_key_length: Some(2048),
        ec_curve: None,
        common_name: Some("example.com".to_string()),
        country: Some("US".to_string()),
        locality: Some("San Francisco".to_string()),
        state_or_province: Some("California".to_string()),
        organization_name: Some("Example Organization".to_string()),
        organization_unit: Some("Engineering".to_string()),
        dn_qualifier: None,
        email_address: Some("admin@example.com".to_string()),
        subject_alternative_name: Some("DNS: example.com, DNS: www.example.com".to_string()),
    })
}
