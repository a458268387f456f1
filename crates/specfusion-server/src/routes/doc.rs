//! `GET /api/doc/:id` (§4.4, §6): full document body by default, or a
//! compact summary when `?summary=true` is given. Both paths always answer
//! in Markdown, including the not-found case — callers treat this endpoint
//! as "get me something human/LLM readable for this doc id", never JSON.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use specfusion_core::summarizer;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DocParams {
    #[serde(default)]
    summary: bool,
}

const MARKDOWN_CONTENT_TYPE: &str = "text/markdown; charset=utf-8";

fn not_found_markdown(id: &str) -> Response {
    let body = format!("## 文档未找到\n\n未找到 id 为 `{id}` 的文档。\n");
    (StatusCode::NOT_FOUND, [(axum::http::header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], body).into_response()
}

/// Prepend the document's `source`/`path`/`source_url`/`last_updated` as a
/// leading HTML comment, the same shape adapters attach on ingest.
fn metadata_comment(doc: &specfusion_core::types::Document) -> String {
    let mut lines = vec![format!("source: {}", doc.source_id), format!("path: {}", doc.path)];
    if let Some(url) = &doc.source_url {
        lines.push(format!("source_url: {url}"));
    }
    if let Some(updated) = &doc.last_updated {
        lines.push(format!("last_updated: {}", updated.to_rfc3339()));
    }
    format!("<!--\n{}\n-->\n\n", lines.join("\n"))
}

/// Handle `GET /api/doc/:id?summary=true|false`.
pub async fn get_doc(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DocParams>,
) -> Result<Response, ApiError> {
    let Some(doc) = state.store.get_document(&id)? else {
        return Ok(not_found_markdown(&id));
    };

    if params.summary {
        let summary = summarizer::summarize(&doc.content, &doc.id);
        let body = summarizer::format_markdown(&summary, &doc.id);
        return Ok(([(axum::http::header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], body).into_response());
    }

    let body = format!("{}{}", metadata_comment(&doc), doc.content);
    Ok(([(axum::http::header::CONTENT_TYPE, MARKDOWN_CONTENT_TYPE)], body).into_response())
}
