//! `SyncRunner`: drives one source's catalog → quality-gate → content-fetch
//! → bulk-upsert pipeline (§4.6).
//!
//! Phase order is fixed: `CatalogFetch` → `QualityGate` → `ContentFetch`
//! (bounded concurrency) → `BatchUpsert` (chunked transactions) → `Finish`.
//! The quality gate is owned by the runner, not by individual adapters (§9
//! Open Questions) — centralizing it here means every adapter gets the same
//! protection against a catalog page quietly returning a truncated list,
//! without having to reimplement the check nine times.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::adapters::{Adapter, DocEntry};
use crate::store::{BulkUpsertResult, DocStore, SyncLogCounts, UpsertDocumentInput};
use crate::types::SyncStatus;
use crate::{Error, Result};

const CONTENT_FETCH_CONCURRENCY: usize = 6;
const BATCH_SIZE: usize = 50;

/// Quality gate thresholds (§4.6): reject a sync whose catalog looks like
/// silent data loss, warn (but proceed) when it looks suspiciously large.
const QUALITY_GATE_MIN_RATIO: f64 = 0.8;
const QUALITY_GATE_WARN_RATIO: f64 = 1.5;

/// Outcome of one `SyncRunner::run` call.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The sync-log row id this run wrote to.
    pub sync_log_id: i64,
    /// Final status: `Success` or `Failed`.
    pub status: SyncStatus,
    /// Per-document outcome counts.
    pub counts: SyncLogCounts,
}

/// Runs one source's sync pipeline against a [`DocStore`].
pub struct SyncRunner<'a> {
    store: &'a DocStore,
}

impl<'a> SyncRunner<'a> {
    /// Wrap a store reference.
    #[must_use]
    pub fn new(store: &'a DocStore) -> Self {
        Self { store }
    }

    /// Run the full pipeline for `adapter` against `limit` (if set, caps the
    /// number of catalog entries fetched — used by `--limit` in the CLI).
    pub async fn run(&self, adapter: Arc<dyn Adapter>, limit: Option<usize>) -> Result<SyncReport> {
        let source_id = adapter.source_id().to_string();
        let sync_log_id = self.store.create_sync_log(&source_id)?;

        match self.run_inner(&source_id, adapter, limit).await {
            Ok((counts, )) => {
                self.store.update_sync_log(sync_log_id, SyncStatus::Success, counts, None)?;
                self.store.update_source_sync_time(&source_id)?;
                Ok(SyncReport { sync_log_id, status: SyncStatus::Success, counts })
            },
            Err(err) => {
                let counts = SyncLogCounts::default();
                self.store.update_sync_log(sync_log_id, SyncStatus::Failed, counts, Some(&err.to_string()))?;
                Err(err)
            },
        }
    }

    async fn run_inner(&self, source_id: &str, adapter: Arc<dyn Adapter>, limit: Option<usize>) -> Result<(SyncLogCounts,)> {
        tracing::info!(source_id, "sync phase: catalog_fetch");
        let mut catalog = adapter.fetch_catalog().await?;
        if let Some(limit) = limit {
            catalog.truncate(limit);
        }

        tracing::info!(source_id, count = catalog.len(), "sync phase: quality_gate");
        self.enforce_quality_gate(source_id, catalog.len())?;

        tracing::info!(source_id, "sync phase: content_fetch");
        let contents = fetch_contents_bounded(adapter.as_ref(), &catalog).await;

        tracing::info!(source_id, "sync phase: batch_upsert");
        let mut counts = SyncLogCounts::default();
        let mut batch: Vec<UpsertDocumentInput> = Vec::new();
        for (entry, content) in catalog.iter().zip(contents.into_iter()) {
            match content {
                Ok(content) => {
                    batch.push(UpsertDocumentInput {
                        path: entry.path.clone(),
                        title: entry.title.clone(),
                        api_path: content.api_path,
                        dev_mode: entry.dev_mode,
                        doc_type: entry.doc_type,
                        content: content.content,
                        source_url: entry.source_url.clone(),
                        metadata: content.metadata,
                        last_updated: content.last_updated,
                    });
                    if !content.error_codes.is_empty() {
                        self.store.upsert_error_codes(source_id, &content.error_codes)?;
                    }
                },
                Err(err) => {
                    tracing::warn!(source_id, path = %entry.path, error = %err, "content fetch failed for one entry");
                    counts.errors += 1;
                },
            }
            if batch.len() >= BATCH_SIZE {
                let result = self.store.bulk_upsert(source_id, &batch)?;
                accumulate(&mut counts, result);
                batch.clear();
            }
        }
        if !batch.is_empty() {
            let result = self.store.bulk_upsert(source_id, &batch)?;
            accumulate(&mut counts, result);
        }

        tracing::info!(source_id, ?counts, "sync phase: finish");
        Ok((counts,))
    }

    fn enforce_quality_gate(&self, source_id: &str, current: usize) -> Result<()> {
        let Some(source) = self.store.get_source(source_id)? else { return Ok(()) };
        let Some(last) = last_successful_doc_count(self.store, source_id)? else { return Ok(()) };
        if last == 0 {
            return Ok(());
        }
        let ratio = current as f64 / last as f64;
        if ratio < QUALITY_GATE_MIN_RATIO {
            return Err(Error::QualityGate { source_id: source_id.to_string(), current, last });
        }
        if ratio > QUALITY_GATE_WARN_RATIO {
            tracing::warn!(source_id, current, last, base_url = ?source.base_url, "catalog grew suspiciously large; proceeding");
        }
        Ok(())
    }
}

fn last_successful_doc_count(store: &DocStore, source_id: &str) -> Result<Option<usize>> {
    let docs = store.get_documents_by_source(source_id)?;
    if docs.is_empty() {
        Ok(None)
    } else {
        Ok(Some(docs.len()))
    }
}

fn accumulate(counts: &mut SyncLogCounts, result: BulkUpsertResult) {
    counts.created += result.created;
    counts.updated += result.updated;
    counts.unchanged += result.unchanged;
}

async fn fetch_contents_bounded(adapter: &dyn Adapter, catalog: &[DocEntry]) -> Vec<Result<crate::adapters::DocContent>> {
    let mut results: Vec<Option<Result<crate::adapters::DocContent>>> = (0..catalog.len()).map(|_| None).collect();
    let mut futures: FuturesUnordered<
        Pin<Box<dyn Future<Output = (usize, Result<crate::adapters::DocContent>)> + Send + '_>>,
    > = FuturesUnordered::new();
    let mut next_index = 0usize;

    while next_index < catalog.len() && futures.len() < CONTENT_FETCH_CONCURRENCY {
        let idx = next_index;
        futures.push(Box::pin(async move { (idx, adapter.fetch_content(&catalog[idx]).await) }));
        next_index += 1;
    }

    while let Some((idx, result)) = futures.next().await {
        results[idx] = Some(result);
        if next_index < catalog.len() {
            let idx = next_index;
            futures.push(Box::pin(async move { (idx, adapter.fetch_content(&catalog[idx]).await) }));
            next_index += 1;
        }
    }

    results.into_iter().map(|r| r.unwrap_or_else(|| Err(Error::Fatal("content fetch slot never completed".to_string())))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DocContent;
    use crate::types::DocType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeAdapter {
        docs: Vec<(&'static str, &'static str)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Adapter for FakeAdapter {
        fn source_id(&self) -> &str {
            "fake"
        }

        async fn fetch_catalog(&self) -> Result<Vec<DocEntry>> {
            Ok(self
                .docs
                .iter()
                .map(|(path, title)| DocEntry { path: (*path).to_string(), title: (*title).to_string(), doc_type: DocType::ApiReference, dev_mode: None, source_url: None })
                .collect())
        }

        async fn fetch_content(&self, entry: &DocEntry) -> Result<DocContent> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DocContent { content: format!("content for {}", entry.path), api_path: None, last_updated: None, metadata: None, error_codes: Vec::new() })
        }
    }

    #[tokio::test]
    async fn run_creates_documents_and_marks_success() {
        let store = DocStore::open_in_memory().unwrap();
        store.upsert_source("fake", "Fake", None).unwrap();
        let adapter: Arc<dyn Adapter> = Arc::new(FakeAdapter { docs: vec![("a", "A"), ("b", "B")], calls: AtomicUsize::new(0) });
        let runner = SyncRunner::new(&store);
        let report = runner.run(adapter, None).await.unwrap();
        assert_eq!(report.status, SyncStatus::Success);
        assert_eq!(report.counts.created, 2);
        assert_eq!(store.get_documents_by_source("fake").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn quality_gate_rejects_a_shrunk_catalog() {
        let store = DocStore::open_in_memory().unwrap();
        store.upsert_source("fake", "Fake", None).unwrap();
        let full_adapter: Arc<dyn Adapter> =
            Arc::new(FakeAdapter { docs: (0..10).map(|i| (Box::leak(i.to_string().into_boxed_str()) as &str, "T")).collect(), calls: AtomicUsize::new(0) });
        let runner = SyncRunner::new(&store);
        runner.run(full_adapter, None).await.unwrap();

        let shrunk_adapter: Arc<dyn Adapter> = Arc::new(FakeAdapter { docs: vec![("0", "T")], calls: AtomicUsize::new(0) });
        let err = runner.run(shrunk_adapter, None).await.unwrap_err();
        assert!(matches!(err, Error::QualityGate { .. }));
    }

    #[tokio::test]
    async fn limit_truncates_catalog_before_fetching() {
        let store = DocStore::open_in_memory().unwrap();
        store.upsert_source("fake", "Fake", None).unwrap();
        let adapter: Arc<dyn Adapter> = Arc::new(FakeAdapter { docs: vec![("a", "A"), ("b", "B"), ("c", "C")], calls: AtomicUsize::new(0) });
        let runner = SyncRunner::new(&store);
        let report = runner.run(adapter, Some(1)).await.unwrap();
        assert_eq!(report.counts.created, 1);
    }
}
