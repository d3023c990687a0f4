// src/models/session.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::user::User;

/// Synced WooCommerce price of one exam product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExamPrice {
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regular_price: Option<f64>,
}

/// Claims carried by the WordPress session token.
///
/// `user` and `paidExamIds` are mandatory: a payload without them does not
/// deserialize, which is how a malformed token is rejected.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Issued-at, Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub user: User,
    pub paid_exam_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_prices: Option<BTreeMap<String, ExamPrice>>,
}

/// In-memory view of an authenticated session.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    #[schema(value_type = Vec<String>)]
    pub paid_exam_ids: BTreeSet<String>,
    pub exam_prices: BTreeMap<String, ExamPrice>,
    pub issued_at: Option<i64>,
    pub expires_at: Option<i64>,
}

impl Session {
    pub fn from_payload(payload: TokenPayload) -> Self {
        Self {
            user: payload.user,
            paid_exam_ids: payload.paid_exam_ids.into_iter().collect(),
            exam_prices: payload.exam_prices.unwrap_or_default(),
            issued_at: payload.iat,
            expires_at: payload.exp,
        }
    }

    /// A session without an expiry claim counts as expired.
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        match self.expires_at {
            Some(exp) => exp <= now_secs,
            None => true,
        }
    }
}

/// DTO for exchanging an SSO token for a session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 16384))]
    pub token: String,
}
