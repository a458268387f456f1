//! `GET /api/sources` (§6).

use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::state::AppState;

/// List every registered source, JSON-encoded.
pub async fn list_sources(State(state): State<AppState>) -> Result<Json<Vec<specfusion_core::types::Source>>, ApiError> {
    Ok(Json(state.store.get_sources()?))
}
