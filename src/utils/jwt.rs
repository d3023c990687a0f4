// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use crate::{
    error::AppError,
    models::session::TokenPayload,
    services::session_manager::ActiveSession,
    state::AppState,
};

/// Current wall clock as Unix seconds.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Decodes WordPress session tokens (`header.payload.signature`, base64url).
///
/// Without a secret the payload is read unverified, the way the browser
/// client reads it; WordPress still verifies the signature on every API call.
#[derive(Debug, Clone, Default)]
pub struct TokenDecoder {
    secret: Option<String>,
}

impl TokenDecoder {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Parses and schema-checks the payload. Expiry is not looked at here.
    pub fn decode(&self, token: &str) -> Result<TokenPayload, AppError> {
        let token = token.trim();
        if token.split('.').count() != 3 {
            return Err(AppError::InvalidToken("Invalid JWT format.".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let key = match &self.secret {
            Some(secret) => DecodingKey::from_secret(secret.as_bytes()),
            None => {
                validation.insecure_disable_signature_validation();
                DecodingKey::from_secret(&[])
            }
        };

        let data = decode::<TokenPayload>(token, &key, &validation).map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            AppError::InvalidToken("Invalid authentication token.".to_string())
        })?;

        Ok(data.claims)
    }

    /// Like [`decode`](Self::decode) but also refuses a token whose `exp` has passed.
    pub fn decode_unexpired(&self, token: &str, now_secs: i64) -> Result<TokenPayload, AppError> {
        let payload = self.decode(token)?;
        if let Some(exp) = payload.exp {
            if exp <= now_secs {
                return Err(AppError::InvalidToken("Session token has expired.".to_string()));
            }
        }
        Ok(payload)
    }

    /// Reads the `exp` claim. A token without one is treated as undecodable.
    pub fn expiry(&self, token: &str) -> Result<i64, AppError> {
        self.decode(token)?
            .exp
            .ok_or_else(|| AppError::InvalidToken("Token has no expiry claim.".to_string()))
    }
}

/// Signs a payload the way the WordPress plugin does (HS256).
///
/// Used by local tooling and tests; production tokens come from WordPress.
pub fn sign_token(payload: &TokenPayload, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Axum Middleware: Session guard.
///
/// Rejects the request when nobody is logged in. A session whose token expired
/// since the last background check is logged out here as well.
/// On success injects the `ActiveSession` into the request extensions.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let active = state
        .sessions
        .current()
        .await
        .ok_or_else(|| AppError::AuthError("Please log in first.".to_string()))?;

    if active.session.is_expired_at(now_secs()) {
        tracing::info!("Session of user {} expired, logging out", active.session.user.id);
        state.logout().await;
        return Err(AppError::InvalidToken(
            "Your session has expired. Please log in again.".to_string(),
        ));
    }

    req.extensions_mut().insert::<ActiveSession>(active);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;

    const SECRET: &str = "a-very-long-test-secret-of-at-least-32-bytes";

    fn payload(exp: Option<i64>) -> TokenPayload {
        TokenPayload {
            iss: Some("https://example.com".to_string()),
            iat: Some(1_000),
            exp,
            user: User {
                id: "12".to_string(),
                name: "Sam Coder".to_string(),
                email: "sam@example.com".to_string(),
                is_admin: false,
            },
            paid_exam_ids: vec!["CPC-CERT-EXAM".to_string()],
            exam_prices: None,
        }
    }

    #[test]
    fn decodes_unverified_payload() {
        let token = sign_token(&payload(Some(5_000)), SECRET).unwrap();
        let decoded = TokenDecoder::default().decode(&token).unwrap();
        assert_eq!(decoded.user.id, "12");
        assert_eq!(decoded.paid_exam_ids, vec!["CPC-CERT-EXAM"]);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let decoder = TokenDecoder::default();
        assert!(matches!(decoder.decode("abc.def"), Err(AppError::InvalidToken(_))));
        assert!(matches!(decoder.decode("a.b.c.d"), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn rejects_garbage_segments() {
        let result = TokenDecoder::default().decode("not.base64!.json");
        assert!(matches!(result, Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn verifies_signature_when_secret_is_configured() {
        let token = sign_token(&payload(Some(5_000)), SECRET).unwrap();
        assert!(TokenDecoder::new(Some(SECRET.to_string())).decode(&token).is_ok());

        let other = TokenDecoder::new(Some("another-secret-entirely-different-value".to_string()));
        assert!(matches!(other.decode(&token), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_refused() {
        let token = sign_token(&payload(Some(5_000)), SECRET).unwrap();
        let decoder = TokenDecoder::default();
        assert!(decoder.decode_unexpired(&token, 4_999).is_ok());
        assert!(decoder.decode_unexpired(&token, 5_000).is_err());
    }

    #[test]
    fn missing_expiry_fails_closed() {
        let token = sign_token(&payload(None), SECRET).unwrap();
        assert!(TokenDecoder::default().expiry(&token).is_err());
    }
}
