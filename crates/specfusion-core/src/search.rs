//! Query classification, execution and composite scoring (§4.3).
//!
//! Three query shapes share one entry point: a bare or `errcode`-prefixed
//! numeric error code, an API path (`/...`, `/cgi-bin/...`, `/open-apis/...`),
//! and everything else (keyword, routed through FTS5's `bm25()`).

use std::collections::HashMap;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::store::DocStore;
use crate::tokenizer::{self, Mode};
use crate::types::{compute_path_depth, DevMode, DocType, Document};
use crate::Result;

static ERROR_CODE_PATTERN: OnceCell<Regex> = OnceCell::new();

fn error_code_pattern() -> &'static Regex {
    ERROR_CODE_PATTERN.get_or_init(|| Regex::new(r"(?i)^\d+$|^errcode\s*\d+$").expect("fixed pattern"))
}

/// How a raw query string was classified (§4.3 "Query classification").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// A bare digit string or `errcode <digits>`: looked up in `error_codes` first.
    ErrorCode,
    /// Starts with `/`, or contains `/cgi-bin/` or `/open-apis/`: matched against `documents.api_path`.
    ApiPath,
    /// Everything else: routed through FTS5 keyword search.
    Keyword,
}

/// Classify a raw query string per §4.3.
#[must_use]
pub fn classify(query: &str) -> QueryKind {
    let trimmed = query.trim();
    if error_code_pattern().is_match(trimmed) {
        QueryKind::ErrorCode
    } else if trimmed.starts_with('/') || trimmed.contains("/cgi-bin/") || trimmed.contains("/open-apis/") {
        QueryKind::ApiPath
    } else {
        QueryKind::Keyword
    }
}

/// Strip a leading `errcode` token (any case, optional whitespace) and return
/// the bare digit string the code is looked up and matched by.
fn strip_errcode_prefix(query: &str) -> String {
    let trimmed = query.trim();
    let lower = trimmed.to_lowercase();
    if let Some(rest) = lower.strip_prefix("errcode") {
        rest.trim_start().to_string()
    } else {
        trimmed.to_string()
    }
}

/// One parameters bundle for [`SearchEngine::search`].
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Raw, untrimmed query string as received from the caller.
    pub query: String,
    /// Optional `source_id` filter.
    pub source: Option<String>,
    /// Optional `doc_type` filter.
    pub doc_type: Option<DocType>,
    /// Optional `dev_mode` filter (wecom only).
    pub dev_mode: Option<DevMode>,
    /// Zero-based result offset for pagination.
    pub offset: usize,
    /// Maximum results to return, clamped to `[1, 20]` (§4.3 "Pagination").
    pub limit: usize,
}

impl SearchQuery {
    /// Build a query with only the required `query` field set and the
    /// documented defaults (`offset = 0`, `limit = 5`) applied elsewhere.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), source: None, doc_type: None, dev_mode: None, offset: 0, limit: 5 }
    }

    fn clamped_limit(&self) -> usize {
        self.limit.clamp(1, 20)
    }
}

/// One scored hit, plus the alternate `dev_mode`s the same `(title, api_path)`
/// pair also appears under (§4.3 "Deduplication").
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Document id of the representative row (first `dev_mode` encountered).
    pub doc_id: String,
    /// Owning source id.
    pub source_id: String,
    /// Document title.
    pub title: String,
    /// API path, if any.
    pub api_path: Option<String>,
    /// Document type.
    pub doc_type: DocType,
    /// Representative `dev_mode`.
    pub dev_mode: Option<DevMode>,
    /// Other `dev_mode`s the same logical document also exists under.
    pub other_modes: Vec<DevMode>,
    /// A ≤200-char snippet around the best match.
    pub snippet: String,
    /// Composite score (§4.3 formula); higher is better.
    pub score: f64,
    /// Canonical URL on the source platform, if known.
    pub source_url: Option<String>,
    /// Platform's own revision date, if known.
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

/// Result of a `search` call, ready for Markdown/JSON rendering.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// How the query was classified.
    pub kind: QueryKind,
    /// Hits, already sorted and paginated.
    pub hits: Vec<SearchHit>,
    /// Total matches before pagination (after dedup).
    pub total: usize,
    /// Wall-clock time spent executing the query, in milliseconds.
    pub took_ms: i64,
}

/// Executes classified queries against a [`DocStore`] and scores keyword hits.
pub struct SearchEngine<'a> {
    store: &'a DocStore,
}

impl<'a> SearchEngine<'a> {
    /// Wrap a store reference.
    #[must_use]
    pub fn new(store: &'a DocStore) -> Self {
        Self { store }
    }

    /// Execute `q`, logging the query (including zero-result queries) and
    /// returning the classified, scored, paginated result.
    pub fn search(&self, q: &SearchQuery) -> Result<SearchResult> {
        let started = std::time::Instant::now();
        let kind = classify(&q.query);

        let mut result = match kind {
            QueryKind::ErrorCode => self.search_error_code(q)?,
            QueryKind::ApiPath => self.search_api_path(q)?,
            QueryKind::Keyword => self.search_keyword(q)?,
        };

        let took_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        result.took_ms = took_ms;
        let top_score = result.hits.first().map(|h| h.score);
        self.store.log_search(&q.query, q.source.as_deref(), result.hits.len() as i64, top_score, took_ms)?;

        Ok(result)
    }

    /// §4.3 "Error-code path": strip any `errcode ` prefix, look the code up
    /// in `error_codes`. A linked `doc_id` short-circuits to that document at
    /// score 50; otherwise fall back to a filtered content-LIKE scan for the
    /// literal code, each hit also scored 50.
    fn search_error_code(&self, q: &SearchQuery) -> Result<SearchResult> {
        let code = strip_errcode_prefix(&q.query);
        if let Some(entry) = self.store.find_error_code(&code)? {
            if let Some(doc_id) = entry.doc_id.as_deref() {
                if let Some(doc) = self.store.get_document(doc_id)? {
                    let hit = hit_from_document(&doc, 50.0);
                    return Ok(SearchResult { kind: QueryKind::ErrorCode, hits: vec![hit], total: 1, took_ms: 0 });
                }
            }
        }

        let rows = self.store.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, source_id, path, title, api_path, doc_type, dev_mode, content, source_url, last_updated
                 FROM documents WHERE content LIKE '%' || ?1 || '%'",
            )?;
            let rows = stmt.query_map(rusqlite::params![code], row_to_candidate)?.collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        self.finish(q, rows, QueryKind::ErrorCode, 50.0)
    }

    /// §4.3 "API-path path": `api_path LIKE '%{q}%'`, filtered by `source`/`mode`, each hit scored 50.
    fn search_api_path(&self, q: &SearchQuery) -> Result<SearchResult> {
        let needle = q.query.trim();
        let rows = self.store.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, source_id, path, title, api_path, doc_type, dev_mode, content, source_url, last_updated
                 FROM documents WHERE api_path LIKE '%' || ?1 || '%'",
            )?;
            let rows = stmt.query_map(rusqlite::params![needle], row_to_candidate)?.collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        self.finish(q, rows, QueryKind::ApiPath, 50.0)
    }

    /// §4.3 "Keyword path": implicit-AND FTS match, falling back to a
    /// per-token double-LIKE conjunction if the FTS engine rejects the
    /// expression (syntax error on rare token characters).
    fn search_keyword(&self, q: &SearchQuery) -> Result<SearchResult> {
        let tok = tokenizer::shared();
        let tokens = tok.tokenize(&q.query, Mode::Query);
        if tokens.is_empty() {
            return Ok(SearchResult { kind: QueryKind::Keyword, hits: Vec::new(), total: 0, took_ms: 0 });
        }
        let match_expr = tokens.join(" ");

        let fts_sql = "SELECT d.id, d.source_id, d.path, d.title, d.api_path, d.doc_type, d.dev_mode, d.content,
                    d.source_url, d.last_updated, bm25(documents_fts) AS rank
             FROM documents_fts
             JOIN documents d ON d.rowid = documents_fts.rowid
             WHERE documents_fts MATCH ?1
             ORDER BY rank LIMIT 200";

        let rows = self.store.with_connection(|conn| {
            let mut stmt = conn.prepare(fts_sql)?;
            let rows = stmt.query_map(rusqlite::params![match_expr], row_to_ranked)?.collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        });

        let rows = match rows {
            Ok(rows) => rows,
            Err(_) => self.keyword_like_fallback(&tokens)?,
        };

        let scored: Vec<(Candidate, f64)> = rows
            .into_iter()
            .map(|(candidate, bm25_rank)| {
                let score = composite_score(&q.query, &tokens, &candidate, bm25_rank);
                (candidate, score)
            })
            .collect();

        self.finish_scored(q, scored, QueryKind::Keyword)
    }

    /// Per-token `content`/`title` double-LIKE conjoined with AND, used when
    /// the FTS `MATCH` expression is rejected for containing rare token
    /// characters (§4.3 "Keyword path").
    fn keyword_like_fallback(&self, tokens: &[String]) -> Result<Vec<(Candidate, f64)>> {
        let clauses: Vec<String> = (1..=tokens.len())
            .map(|i| format!("(content LIKE '%' || ?{i} || '%' OR title LIKE '%' || ?{i} || '%')"))
            .collect();
        let sql = format!(
            "SELECT id, source_id, path, title, api_path, doc_type, dev_mode, content, source_url, last_updated
             FROM documents WHERE {} LIMIT 200",
            clauses.join(" AND ")
        );
        let rows = self.store.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let params = rusqlite::params_from_iter(tokens.iter());
            let rows = stmt.query_map(params, row_to_candidate)?.collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        Ok(rows.into_iter().map(|c| (c, 0.0)).collect())
    }

    fn finish(&self, q: &SearchQuery, rows: Vec<Candidate>, kind: QueryKind, flat_score: f64) -> Result<SearchResult> {
        let scored = rows.into_iter().map(|c| (c, flat_score)).collect();
        self.finish_scored(q, scored, kind)
    }

    fn finish_scored(
        &self,
        q: &SearchQuery,
        mut scored: Vec<(Candidate, f64)>,
        kind: QueryKind,
    ) -> Result<SearchResult> {
        scored.retain(|(c, _)| {
            q.source.as_deref().map_or(true, |s| c.source_id == s)
                && q.doc_type.map_or(true, |dt| c.doc_type == dt)
                && q.dev_mode.map_or(true, |dm| c.dev_mode == Some(dm))
        });
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let dedup = q.dev_mode.is_none();
        let deduped = if dedup { dedup_by_title_api_path(scored) } else { scored.into_iter().map(|(c, s)| hit_from_candidate(c, s, Vec::new())).collect() };
        let total = deduped.len();
        let page: Vec<SearchHit> = deduped.into_iter().skip(q.offset).take(q.clamped_limit()).collect();
        Ok(SearchResult { kind, hits: page, total, took_ms: 0 })
    }
}

struct Candidate {
    id: String,
    source_id: String,
    path: String,
    title: String,
    api_path: Option<String>,
    doc_type: DocType,
    dev_mode: Option<DevMode>,
    content: String,
    source_url: Option<String>,
    last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

fn row_to_candidate(row: &rusqlite::Row<'_>) -> rusqlite::Result<Candidate> {
    let doc_type_str: String = row.get(5)?;
    let dev_mode_str: Option<String> = row.get(6)?;
    Ok(Candidate {
        id: row.get(0)?,
        source_id: row.get(1)?,
        path: row.get(2)?,
        title: row.get(3)?,
        api_path: row.get(4)?,
        doc_type: DocType::parse(&doc_type_str).unwrap_or_default(),
        dev_mode: dev_mode_str.as_deref().and_then(DevMode::parse),
        content: row.get(7)?,
        source_url: row.get(8)?,
        last_updated: row.get::<_, Option<String>>(9)?.and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok()).map(|dt| dt.with_timezone(&chrono::Utc)),
    })
}

fn row_to_ranked(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Candidate, f64)> {
    let candidate = row_to_candidate(row)?;
    let rank: f64 = row.get(10)?;
    Ok((candidate, rank))
}

fn hit_from_document(doc: &Document, score: f64) -> SearchHit {
    SearchHit {
        doc_id: doc.id.clone(),
        source_id: doc.source_id.clone(),
        title: doc.title.clone(),
        api_path: doc.api_path.clone(),
        doc_type: doc.doc_type,
        dev_mode: doc.dev_mode,
        other_modes: Vec::new(),
        snippet: make_snippet(&doc.content),
        score,
        source_url: doc.source_url.clone(),
        last_updated: doc.last_updated,
    }
}

fn hit_from_candidate(candidate: Candidate, score: f64, other_modes: Vec<DevMode>) -> SearchHit {
    SearchHit {
        doc_id: candidate.id,
        source_id: candidate.source_id,
        title: candidate.title,
        api_path: candidate.api_path,
        doc_type: candidate.doc_type,
        dev_mode: candidate.dev_mode,
        other_modes,
        snippet: make_snippet(&candidate.content),
        score,
        source_url: candidate.source_url,
        last_updated: candidate.last_updated,
    }
}

/// Composite score per §4.3: title-contains bonus, title-token-overlap
/// fraction, absolute BM25 rank, doc-type bonus, stepped recency bonus,
/// path-depth penalty. Rounded to two decimals on output.
fn composite_score(raw_query: &str, tokens: &[String], candidate: &Candidate, bm25_rank: f64) -> f64 {
    let mut score = 0.0;

    let title_lower = candidate.title.to_lowercase();
    if title_lower.contains(&raw_query.trim().to_lowercase()) {
        score += 20.0;
    }

    if !tokens.is_empty() {
        let overlap = tokens.iter().filter(|t| title_lower.contains(&t.to_lowercase())).count();
        score += 5.0 * (overlap as f64 / tokens.len() as f64);
    }

    // bm25() returns a negative value where more-negative is a better match.
    score += bm25_rank.abs();

    if candidate.doc_type == DocType::ApiReference {
        score += 3.0;
    }

    if let Some(last_updated) = candidate.last_updated {
        let age_days = (chrono::Utc::now() - last_updated).num_days();
        if age_days <= 30 {
            score += 3.0;
        } else if age_days <= 90 {
            score += 1.0;
        }
    }

    score -= 0.5 * compute_path_depth(&candidate.path) as f64;

    (score * 100.0).round() / 100.0
}

fn dedup_by_title_api_path(scored: Vec<(Candidate, f64)>) -> Vec<SearchHit> {
    let mut order: Vec<(String, Option<String>)> = Vec::new();
    let mut groups: HashMap<(String, Option<String>), Vec<(Candidate, f64)>> = HashMap::new();

    for (candidate, score) in scored {
        let key = (candidate.title.clone(), candidate.api_path.clone());
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push((candidate, score));
    }

    order
        .into_iter()
        .map(|key| {
            let mut group = groups.remove(&key).unwrap_or_default();
            group.sort_by(|a, b| b.1.total_cmp(&a.1));
            let (representative, score) = group.remove(0);
            let other_modes: Vec<DevMode> = group.iter().filter_map(|(c, _)| c.dev_mode).collect();
            hit_from_candidate(representative, score, other_modes)
        })
        .collect()
}

/// Extract a rune-safe snippet of at most 200 chars, centered loosely on the
/// document start since keyword position varies with tokenization (§4.3).
fn make_snippet(content: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = content.trim();
    let mut out: String = trimmed.chars().take(MAX_CHARS).collect();
    if trimmed.chars().count() > MAX_CHARS {
        out.push('…');
    }
    out
}

/// Render a [`SearchResult`] as the Markdown body the HTTP API returns,
/// including the zero-result diagnostic (§4.3 "Markdown formatting").
#[must_use]
pub fn format_markdown(query: &str, source: Option<&str>, result: &SearchResult) -> String {
    let source_label = source.unwrap_or("全部");
    let header = format!(
        "## 搜索结果：{query}（来源：{source_label}，共 {} 条，耗时 {}ms）",
        result.total, result.took_ms
    );

    if result.hits.is_empty() {
        return format!(
            "{header}\n\n没有找到匹配的结果。建议：尝试去掉 `source` 筛选、缩短查询关键词，或查看 `/sources`、`/categories` 了解当前可用的文档范围。"
        );
    }

    let mut out = String::new();
    out.push_str(&header);
    out.push_str("\n\n");
    for (i, hit) in result.hits.iter().enumerate() {
        out.push_str(&format!("### {}. {}（score: {:.2}）\n\n", i + 1, hit.title, hit.score));

        let mut meta = format!("来源：{}", hit.source_id);
        if let Some(mode) = hit.dev_mode {
            meta.push_str(&format!(" · {mode}"));
        }
        if !hit.other_modes.is_empty() {
            let others: Vec<String> = hit.other_modes.iter().map(ToString::to_string).collect();
            meta.push_str(&format!(" · 其他模式：{}", others.join(", ")));
        }
        out.push_str(&meta);
        out.push_str("\n\n");

        if let Some(api_path) = &hit.api_path {
            out.push_str(&format!("`{api_path}`\n\n"));
        }

        out.push_str(&format!("{}\n\n", hit.snippet));

        out.push_str(&format!("doc: `{}`", hit.doc_id));
        if let Some(url) = &hit.source_url {
            out.push_str(&format!(" · {url}"));
        }
        if let Some(last_updated) = &hit.last_updated {
            out.push_str(&format!(" · {}", last_updated.format("%Y-%m-%d")));
        }
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UpsertDocumentInput;

    fn seeded_store() -> DocStore {
        let store = DocStore::open_in_memory().unwrap();
        store.upsert_source("wecom", "企业微信", None).unwrap();
        store
            .upsert_document(
                "wecom",
                &UpsertDocumentInput {
                    path: "guide/send-message".to_string(),
                    title: "发送应用消息".to_string(),
                    api_path: Some("POST /cgi-bin/message/send".to_string()),
                    dev_mode: Some(DevMode::Internal),
                    doc_type: DocType::ApiReference,
                    content: "调用本接口向成员发送消息，支持文本、图片、图文等多种消息类型。access_token 需通过 /cgi-bin/gettoken 获取。包含错误码 40001 的处理说明。".to_string(),
                    source_url: Some("https://developer.work.weixin.qq.com/document/path/90236".to_string()),
                    metadata: None,
                    last_updated: Some(chrono::Utc::now()),
                },
            )
            .unwrap();
        let doc_id = crate::types::compute_doc_id("wecom", "guide/send-message");
        store
            .upsert_error_codes(
                "wecom",
                &[
                    crate::types::ErrorCodeEntry {
                        source_id: "wecom".to_string(),
                        code: "40014".to_string(),
                        message: "invalid access_token".to_string(),
                        description: "access_token 无效或已过期".to_string(),
                        doc_id: Some(doc_id),
                    },
                    crate::types::ErrorCodeEntry {
                        source_id: "wecom".to_string(),
                        code: "40001".to_string(),
                        message: "invalid credential".to_string(),
                        description: "access_token 无效或已过期".to_string(),
                        doc_id: None,
                    },
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn classifies_error_code_api_path_and_keyword() {
        assert_eq!(classify("40014"), QueryKind::ErrorCode);
        assert_eq!(classify("errcode 60011"), QueryKind::ErrorCode);
        assert_eq!(classify("ErrCode60011"), QueryKind::ErrorCode);
        assert_eq!(classify("99999999"), QueryKind::ErrorCode);
        assert_eq!(classify("/cgi-bin/message/send"), QueryKind::ApiPath);
        assert_eq!(classify("/open-apis/im/v1/messages"), QueryKind::ApiPath);
        assert_eq!(classify("发送消息"), QueryKind::Keyword);
    }

    #[test]
    fn error_code_with_linked_doc_returns_that_document_at_score_fifty() {
        let store = seeded_store();
        let engine = SearchEngine::new(&store);
        let result = engine.search(&SearchQuery::new("errcode 40014")).unwrap();
        assert_eq!(result.kind, QueryKind::ErrorCode);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].title, "发送应用消息");
        assert!((result.hits[0].score - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn error_code_without_linked_doc_falls_back_to_content_like() {
        let store = seeded_store();
        let engine = SearchEngine::new(&store);
        let result = engine.search(&SearchQuery::new("40001")).unwrap();
        assert_eq!(result.kind, QueryKind::ErrorCode);
        assert_eq!(result.hits.len(), 1, "falls back to scanning content for the literal code");
        assert!((result.hits[0].score - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unregistered_error_code_with_no_matching_content_is_zero_results() {
        let store = seeded_store();
        let engine = SearchEngine::new(&store);
        let result = engine.search(&SearchQuery::new("99999999")).unwrap();
        assert_eq!(result.kind, QueryKind::ErrorCode);
        assert!(result.hits.is_empty());
    }

    #[test]
    fn api_path_query_matches_partial_route() {
        let store = seeded_store();
        let engine = SearchEngine::new(&store);
        let result = engine.search(&SearchQuery::new("/cgi-bin/message/send")).unwrap();
        assert_eq!(result.kind, QueryKind::ApiPath);
        assert_eq!(result.hits.len(), 1);
        assert!((result.hits[0].score - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn keyword_query_ranks_matching_document() {
        let store = seeded_store();
        let engine = SearchEngine::new(&store);
        let result = engine.search(&SearchQuery::new("发送消息")).unwrap();
        assert_eq!(result.kind, QueryKind::Keyword);
        assert_eq!(result.hits.len(), 1);
        assert!(result.hits[0].score > 0.0);
    }

    #[test]
    fn keyword_query_requires_every_token_implicit_and() {
        let store = seeded_store();
        let engine = SearchEngine::new(&store);
        let result = engine.search(&SearchQuery::new("发送 不存在的词语xyz")).unwrap();
        assert!(result.hits.is_empty(), "implicit AND must reject a query where only one token matches");
    }

    #[test]
    fn limit_is_clamped_to_one_and_twenty() {
        let mut q = SearchQuery::new("发送消息");
        q.limit = 0;
        assert_eq!(q.clamped_limit(), 1);
        q.limit = 999;
        assert_eq!(q.clamped_limit(), 20);
    }

    #[test]
    fn zero_results_still_logged_and_formatted() {
        let store = seeded_store();
        let engine = SearchEngine::new(&store);
        let result = engine.search(&SearchQuery::new("不存在的词语xyz")).unwrap();
        assert!(result.hits.is_empty());
        let md = format_markdown("不存在的词语xyz", None, &result);
        assert!(md.contains("建议"));
    }
}
