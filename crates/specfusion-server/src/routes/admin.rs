//! `/api/admin/*` (§4.6, §6): the write routes, gated behind
//! [`crate::auth::require_admin_token`].

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use specfusion_core::store::{UpsertDocumentInput, UpsertOutcome};
use specfusion_core::types::{DevMode, DocType};

use crate::error::ApiError;
use crate::state::AppState;

/// Fields shared by `POST /api/admin/upsert` and each entry of
/// `POST /api/admin/bulk-upsert`'s `documents[]`.
#[derive(Debug, Deserialize)]
pub struct AdminDocument {
    pub path: String,
    pub title: String,
    pub api_path: Option<String>,
    pub dev_mode: Option<String>,
    pub doc_type: Option<String>,
    pub content: String,
    pub source_url: Option<String>,
    pub metadata: Option<String>,
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<AdminDocument> for UpsertDocumentInput {
    fn from(d: AdminDocument) -> Self {
        Self {
            path: d.path,
            title: d.title,
            api_path: d.api_path,
            dev_mode: d.dev_mode.as_deref().and_then(DevMode::parse),
            doc_type: d.doc_type.as_deref().and_then(DocType::parse).unwrap_or_default(),
            content: d.content,
            source_url: d.source_url,
            metadata: d.metadata,
            last_updated: d.last_updated,
        }
    }
}

fn outcome_label(outcome: UpsertOutcome) -> &'static str {
    match outcome {
        UpsertOutcome::Created => "created",
        UpsertOutcome::Updated => "updated",
        UpsertOutcome::Unchanged => "unchanged",
    }
}

/// Request body for `POST /api/admin/upsert`: a single document plus the
/// source it belongs to.
#[derive(Debug, Deserialize)]
pub struct UpsertRequest {
    pub source: String,
    #[serde(flatten)]
    pub document: AdminDocument,
}

#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    pub doc_id: String,
    pub action: &'static str,
}

/// Handle `POST /api/admin/upsert`. The owning [`Source`](specfusion_core::types::Source)
/// row is auto-created on first reference, matching bulk-upsert's lifecycle.
pub async fn upsert(State(state): State<AppState>, Json(req): Json<UpsertRequest>) -> Result<Json<UpsertResponse>, ApiError> {
    if state.store.get_source(&req.source)?.is_none() {
        state.store.upsert_source(&req.source, &req.source, None)?;
    }
    let (doc_id, outcome) = state.store.upsert_document(&req.source, &req.document.into())?;
    Ok(Json(UpsertResponse { doc_id, action: outcome_label(outcome) }))
}

/// Request body for `POST /api/admin/bulk-upsert`: one source's worth of
/// already-normalized documents (the ingestion CLI does the adapter work
/// and posts the result here).
#[derive(Debug, Deserialize)]
pub struct BulkUpsertRequest {
    pub source: String,
    pub source_name: Option<String>,
    pub documents: Vec<AdminDocument>,
}

#[derive(Debug, Serialize)]
pub struct BulkUpsertResponse {
    pub created: i64,
    pub updated: i64,
    pub unchanged: i64,
}

/// Handle `POST /api/admin/bulk-upsert`. Per §3's lifecycle note, the
/// `Source` row is created on first bulk-upsert referencing it, so this
/// never fails on the foreign key into `sources`.
pub async fn bulk_upsert(
    State(state): State<AppState>,
    Json(req): Json<BulkUpsertRequest>,
) -> Result<Json<BulkUpsertResponse>, ApiError> {
    match (state.store.get_source(&req.source)?, req.source_name.as_deref()) {
        (None, name) => {
            state.store.upsert_source(&req.source, name.unwrap_or(&req.source), None)?;
        }
        (Some(_), Some(name)) => {
            state.store.upsert_source(&req.source, name, None)?;
        }
        (Some(_), None) => {}
    }

    let inputs: Vec<UpsertDocumentInput> = req.documents.into_iter().map(Into::into).collect();
    let result = state.store.bulk_upsert(&req.source, &inputs)?;
    Ok(Json(BulkUpsertResponse { created: result.created, updated: result.updated, unchanged: result.unchanged }))
}

#[derive(Debug, Serialize)]
pub struct DeleteDocResponse {
    pub deleted: bool,
}

/// Handle `DELETE /api/admin/doc/:id`.
pub async fn delete_doc(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<DeleteDocResponse>, ApiError> {
    let deleted = state.store.delete_document(&id)?;
    Ok(Json(DeleteDocResponse { deleted }))
}

#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub reindexed: i64,
}

/// Handle `POST /api/admin/reindex`: force an FTS rebuild.
pub async fn reindex(State(state): State<AppState>) -> Result<Json<ReindexResponse>, ApiError> {
    let count = state.store.reindex()?;
    Ok(Json(ReindexResponse { reindexed: count }))
}
