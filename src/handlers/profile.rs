use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError, models::user::UpdateNameRequest, services::session_manager::ActiveSession,
    state::AppState,
};

/// Changes the name printed on certificates.
///
/// WordPress is the owner of the profile: the local copy is only updated once
/// the remote `/update-name` call succeeded.
pub async fn update_name(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
    Json(payload): Json<UpdateNameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let full_name = payload.full_name.trim().to_string();
    let payload = UpdateNameRequest { full_name };
    payload.validate()?;

    let reply = state
        .remote
        .update_name(&active.token, &payload.full_name)
        .await?;
    if !reply.success {
        return Err(AppError::BadRequest(reply.message));
    }

    let user = state.sessions.update_user_name(&payload.full_name).await?;
    tracing::info!("User {} changed their display name", user.id);

    Ok(Json(json!({
        "success": true,
        "message": reply.message,
        "user": user,
    })))
}
