// src/handlers/catalog.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{error::AppError, services::catalog::resolve_catalog, state::AppState};

/// Organizations and exams, with the signed-in user's synced prices applied.
///
/// Public: without a session the static catalog prices are shown.
pub async fn get_catalog(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let orgs = state.catalog.get().await?;
    let active = state.sessions.current().await;
    let resolved = resolve_catalog(&orgs, active.as_ref().map(|a| &a.session));
    Ok(Json(resolved))
}

/// Loads the catalog again from the configured source.
pub async fn reload_catalog(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let exams = state
        .catalog
        .load(state.config.catalog_source, &state.remote)
        .await?;
    Ok(Json(json!({
        "message": "Catalog reloaded",
        "exams": exams,
    })))
}
