// src/models/user.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Identity of the signed-in WordPress user, as carried in the session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// WordPress user ID (always a string on the wire).
    pub id: String,

    /// Full name printed on certificates.
    pub name: String,

    pub email: String,

    /// WordPress administrators may preview any certificate.
    #[serde(default)]
    pub is_admin: bool,
}

/// DTO for changing the candidate name.
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNameRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Full name length must be between 1 and 100 characters."
    ))]
    pub full_name: String,
}

/// Reply of the WordPress `/update-name` endpoint.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateNameResponse {
    pub success: bool,
    pub message: String,
}
