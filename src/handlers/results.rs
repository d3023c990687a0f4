// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::test_result::{PullSummary, SyncStatus},
    services::{
        results::{sync_result, sync_results},
        session_manager::ActiveSession,
    },
    state::AppState,
};

/// Every cached result of the signed-in user.
pub async fn list_results(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
) -> impl IntoResponse {
    Json(state.results.results_for_user(&active.session.user.id).await)
}

/// Most recent attempt per exam, for the dashboard.
pub async fn latest_results(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
) -> impl IntoResponse {
    Json(state.results.latest_attempts(&active.session.user.id).await)
}

/// One result, from the cache or else from WordPress.
///
/// A result fetched remotely is cached for later certificate requests, unless
/// the user logged out while WordPress was answering.
pub async fn get_result(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
    Path(test_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = &active.session.user.id;
    if let Some(result) = state.results.get_test_result(user_id, &test_id).await {
        return Ok(Json(result));
    }

    match state.remote.get_result(&active.token, &test_id).await {
        Ok(result) if &result.user_id == user_id => {
            state
                .sessions
                .while_signed_in(user_id, || state.results.save_result(user_id, &result))
                .await
                .ok_or_else(|| AppError::AuthError("Please log in first.".to_string()))?;
            Ok(Json(result))
        }
        Ok(_) => Err(AppError::NotFound(format!("Test result '{}' not found", test_id))),
        Err(e) => {
            tracing::debug!("Remote lookup of {} failed: {}", test_id, e.message());
            Err(AppError::NotFound(format!("Test result '{}' not found", test_id)))
        }
    }
}

/// Where the remote mirror of a result stands.
pub async fn sync_status(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let status = state
        .sync_tracker
        .status(&test_id)
        .ok_or_else(|| AppError::NotFound(format!("No sync recorded for '{}'", test_id)))?;
    Ok(Json(json!({ "testId": test_id, "sync": status })))
}

/// Pushes a cached result to WordPress again and waits for the outcome.
pub async fn retry_sync(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
    Path(test_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = state
        .results
        .get_test_result(&active.session.user.id, &test_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Test result '{}' not found", test_id)))?;

    let generation = state.sync_tracker.begin(&test_id);
    match sync_result(&state.remote, &active.token, &result).await {
        Ok(()) => {
            state
                .sync_tracker
                .finish(generation, &test_id, SyncStatus::Synced);
            Ok(Json(json!({ "testId": test_id, "sync": SyncStatus::Synced })))
        }
        Err(e) => {
            state.sync_tracker.finish(
                generation,
                &test_id,
                SyncStatus::Failed {
                    message: e.message().to_string(),
                },
            );
            Err(AppError::SyncError(format!(
                "Result {} is saved locally but could not be synced: {}",
                test_id,
                e.message()
            )))
        }
    }
}

/// Pulls the user's results from WordPress into the cache.
pub async fn pull_results(
    State(state): State<AppState>,
    Extension(active): Extension<ActiveSession>,
) -> Result<impl IntoResponse, AppError> {
    let (fetched, total) = sync_results(
        &state.remote,
        &state.sessions,
        &state.results,
        &active.token,
        &active.session.user.id,
    )
    .await?;

    Ok(Json(PullSummary { fetched, total }))
}
