//! `GET /api/recent` (§6): most recently synced documents, optionally
//! scoped to one source.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    source: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecentEntry {
    id: String,
    source_id: String,
    title: String,
    synced_at: chrono::DateTime<chrono::Utc>,
}

/// Handle `GET /api/recent`.
pub async fn recent(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Result<Json<Vec<RecentEntry>>, ApiError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let entries = state.store.with_connection(|conn| {
        let sql = if params.source.is_some() {
            "SELECT id, source_id, title, synced_at FROM documents WHERE source_id = ?1 ORDER BY synced_at DESC LIMIT ?2"
        } else {
            "SELECT id, source_id, title, synced_at FROM documents ORDER BY synced_at DESC LIMIT ?1"
        };
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| {
            let synced_raw: String = row.get(3)?;
            Ok(RecentEntry {
                id: row.get(0)?,
                source_id: row.get(1)?,
                title: row.get(2)?,
                synced_at: chrono::DateTime::parse_from_rfc3339(&synced_raw)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .unwrap_or_else(|_| chrono::Utc::now()),
            })
        };
        let rows = if let Some(source) = &params.source {
            stmt.query_map(rusqlite::params![source, limit as i64], map_row)?.collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(rusqlite::params![limit as i64], map_row)?.collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(rows)
    })?;
    Ok(Json(entries))
}
