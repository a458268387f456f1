//! `GET /api/health` (§6).

use axum::Json;
use serde_json::json;

/// Liveness probe; never touches the store.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
