// src/handlers/attempts.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::test_result::SubmitAttemptRequest,
    services::{
        attempts::{start_attempt, submit_attempt},
        session_manager::ActiveSession,
    },
    state::AppState,
};

/// Starts an exam attempt.
///
/// * Checks that the exam is practice or purchased.
/// * Draws the questions (answer keys stay on the server).
/// * Returns 201 Created with the attempt id and deadline.
pub async fn start(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
    Path((org_id, exam_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let orgs = state.catalog.get().await?;
    let attempt = start_attempt(
        &active,
        &orgs,
        &org_id,
        &exam_id,
        &state.remote,
        &state.attempts,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Submits the answers of an attempt.
///
/// The result is scored and saved locally before this returns; mirroring it
/// to WordPress happens in the background and never fails the request.
pub async fn submit(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
    Path(attempt_id): Path<String>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let response = submit_attempt(
        &active,
        &attempt_id,
        &payload.answers,
        &state.attempts,
        &state.results,
        &state.sync_tracker,
        &state.remote,
    )
    .await?;

    Ok(Json(response))
}
