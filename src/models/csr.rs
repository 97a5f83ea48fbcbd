use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::csr::INVALID_CSR_MESSAGE;

/// Decoded view of a certification request as returned to clients.
///
/// Every optional field is omitted from the JSON when the request does not
/// carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrDetailsModel {
    pub signature_algorithm: String,
    pub signature_algorithm_id: String,
    pub public_key_algorithm: String,
    pub public_key_algorithm_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rsa_key_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ec_curve: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub common_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub state_or_province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub organization_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub organization_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dn_qualifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subject_alternative_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub timestamp: DateTime<Utc>,
    pub error: String,
}

impl ErrorMessage {
    pub fn invalid_csr() -> Self {
        Self {
            timestamp: Utc::now(),
            error: INVALID_CSR_MESSAGE.to_string(),
        }
    }
}
