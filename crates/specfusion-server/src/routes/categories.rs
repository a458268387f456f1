//! `GET /api/categories` and `GET /api/categories/:source/:category` (§6):
//! documents grouped by the first segment of their path, e.g. `guide/x` and
//! `guide/y` both fall under category `guide`.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use specfusion_core::types::DevMode;

use crate::error::ApiError;
use crate::state::AppState;

const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

#[derive(Debug, Deserialize)]
pub struct CategoriesParams {
    source: Option<String>,
}

/// First `/`-delimited segment of a document path, or the whole path when
/// it has no separator.
fn category_of(path: &str) -> &str {
    path.split('/').next().unwrap_or(path)
}

/// Handle `GET /api/categories?source=...`: category name -> document count.
pub async fn categories(
    State(state): State<AppState>,
    Query(params): Query<CategoriesParams>,
) -> Result<Response, ApiError> {
    let paths = state.store.with_connection(|conn| {
        let (sql, filtered) = if params.source.is_some() {
            ("SELECT path FROM documents WHERE source_id = ?1", true)
        } else {
            ("SELECT path FROM documents", false)
        };
        let mut stmt = conn.prepare(sql)?;
        let rows = if filtered {
            stmt.query_map(rusqlite::params![params.source.as_deref().unwrap_or_default()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        } else {
            stmt.query_map([], |row| row.get::<_, String>(0))?.collect::<std::result::Result<Vec<_>, _>>()?
        };
        Ok(rows)
    })?;

    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for path in &paths {
        *counts.entry(category_of(path).to_string()).or_insert(0) += 1;
    }

    let mut body = String::from("## 分类\n\n");
    if counts.is_empty() {
        body.push_str("暂无分类。\n");
    } else {
        for (category, count) in &counts {
            body.push_str(&format!("- **{category}**：{count} 篇\n"));
        }
    }
    Ok(([(axum::http::header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CategoryDocumentsParams {
    mode: Option<String>,
    limit: Option<usize>,
}

/// Handle `GET /api/categories/:source/:category?mode=...&limit=...`:
/// documents in that source whose path's first segment is `category`.
pub async fn category_documents(
    State(state): State<AppState>,
    Path((source, category)): Path<(String, String)>,
    Query(params): Query<CategoryDocumentsParams>,
) -> Result<Response, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let dev_mode = params.mode.as_deref().and_then(DevMode::parse);

    let prefix = format!("{category}/%");
    let rows = state.store.with_connection(|conn| {
        let sql = "SELECT id, title, path, api_path FROM documents \
                    WHERE source_id = ?1 AND (path = ?2 OR path LIKE ?3) \
                    AND (?4 IS NULL OR dev_mode = ?4) \
                    ORDER BY path LIMIT ?5";
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(
                rusqlite::params![source, category, prefix, dev_mode.map(DevMode::as_str), limit as i64],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;

    let mut body = format!("## {source} / {category}\n\n共 {} 篇\n\n", rows.len());
    for (id, title, path, api_path) in &rows {
        body.push_str(&format!("### {title}\n\n- id：`{id}`\n- path：`{path}`\n"));
        if let Some(api_path) = api_path {
            body.push_str(&format!("- api_path：`{api_path}`\n"));
        }
        body.push('\n');
    }
    Ok(([(axum::http::header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], body).into_response())
}
