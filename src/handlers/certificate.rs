// src/handlers/certificate.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    services::{
        catalog::find_org,
        certificate::{get_certificate, sample_certificate},
        session_manager::ActiveSession,
    },
    state::AppState,
};

/// Certificate for a stored result.
///
/// 403 `not_earned` when the result is a practice attempt or below the pass
/// mark (administrators bypass the mark).
pub async fn get_org_certificate(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
    Path((org_id, test_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let orgs = state.catalog.get().await?;
    let org = find_org(&orgs, &org_id)?;
    let user = &active.session.user;
    let result = state.results.get_test_result(&user.id, &test_id).await;

    let certificate = get_certificate(user, &test_id, org, result.as_ref(), chrono::Utc::now())?;
    Ok(Json(certificate))
}

/// Preview certificate, served with or without a session.
pub async fn get_sample_certificate(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let orgs = state.catalog.get().await?;
    let org = find_org(&orgs, &org_id)?;
    let active = state.sessions.current().await;

    let certificate = sample_certificate(
        active.as_ref().map(|a| &a.session.user),
        org,
        chrono::Utc::now(),
    )?;
    Ok(Json(certificate))
}

/// Certificate as WordPress issues it, passed through unchanged.
pub async fn get_remote_certificate(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
    Path(test_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let certificate = state
        .remote
        .get_certificate_data(&active.token, &test_id)
        .await?;
    Ok(Json(certificate))
}
