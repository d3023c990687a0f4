// src/models/certificate.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::organization::{CertificateTemplate, Organization};

/// Everything needed to print a certificate. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateData {
    pub certificate_number: String,
    pub candidate_name: String,
    pub final_score: f64,
    /// e.g. "March 5, 2025".
    pub date: String,
    pub total_questions: u32,
    pub organization: Organization,
    pub template: CertificateTemplate,
    /// Template body with the score filled in, sanitized.
    #[serde(default)]
    pub body: String,
}
