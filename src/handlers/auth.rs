// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError, models::session::LoginRequest, services::session_manager::ActiveSession,
    state::AppState,
};

/// Exchanges a WordPress SSO token for a portal session.
///
/// The token arrives from the `#token=` fragment WordPress redirects to.
/// A token that fails to decode, lacks `user`/`paidExamIds` or has expired is
/// rejected with 401 and leaves nobody logged in.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    match state.sessions.login_with_token(&payload.token).await {
        Ok(session) => Ok(Json(session)),
        Err(e) => {
            state.attempts.clear();
            state.sync_tracker.clear();
            Err(e)
        }
    }
}

/// Ends the session and wipes everything the portal stored. Idempotent.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    state.logout().await;
    Json(json!({ "message": "Logged out" }))
}

/// The current session: user, entitlements, synced prices.
pub async fn current_session(
    Extension(active): Extension<ActiveSession>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(active.session))
}

/// Re-reads identity and purchases from WordPress, e.g. after checkout.
pub async fn refresh(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let session = state.refresh_from_remote().await?;
    tracing::info!(
        "Refreshed session of user {}: {} entitlement(s)",
        session.user.id,
        session.paid_exam_ids.len()
    );
    Ok(Json(session))
}
