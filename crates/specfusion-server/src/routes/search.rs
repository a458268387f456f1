//! `GET /api/search` (§4.3, §6): the main keyword/API-path/error-code entry
//! point. Responds with a Markdown body so a human or an LLM agent can read
//! it directly without a JSON-parsing round-trip.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use specfusion_core::search::{format_markdown, SearchEngine, SearchQuery};
use specfusion_core::types::{DevMode, DocType};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
    source: Option<String>,
    doc_type: Option<String>,
    mode: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
}

/// Handle `GET /api/search?q=...&source=...&mode=...&limit=...`.
pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Response, ApiError> {
    let engine = SearchEngine::new(&state.store);
    let query = SearchQuery {
        query: params.q.clone(),
        source: params.source.clone(),
        doc_type: params.doc_type.as_deref().and_then(DocType::parse),
        dev_mode: params.mode.as_deref().and_then(DevMode::parse),
        offset: params.offset.unwrap_or(0),
        limit: params.limit.unwrap_or(5),
    };
    let result = engine.search(&query)?;
    let body = format_markdown(&params.q, params.source.as_deref(), &result);
    Ok(([(axum::http::header::CONTENT_TYPE, "text/markdown; charset=utf-8")], body).into_response())
}
