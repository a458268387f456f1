//! End-to-end scenarios spanning store, search and summarizer together —
//! the kind of thing a single unit test can't exercise because it crosses
//! module boundaries.

use specfusion_core::search::{SearchEngine, SearchQuery};
use specfusion_core::store::{DocStore, UpsertDocumentInput};
use specfusion_core::summarizer;
use specfusion_core::types::{DevMode, DocType};

fn doc(path: &str, title: &str, content: &str) -> UpsertDocumentInput {
    UpsertDocumentInput {
        path: path.to_string(),
        title: title.to_string(),
        api_path: None,
        dev_mode: None,
        doc_type: DocType::ApiReference,
        content: content.to_string(),
        source_url: None,
        metadata: None,
        last_updated: None,
    }
}

#[test]
fn keyword_search_ranks_title_match_above_body_only_match() {
    let store = DocStore::open_in_memory().unwrap();
    store.upsert_source("feishu", "Feishu", None).unwrap();

    store
        .upsert_document(
            "feishu",
            &doc(
                "docs/message-card",
                "消息卡片发送指南",
                "介绍如何通过机器人发送消息卡片，包含请求示例和参数说明。",
            ),
        )
        .unwrap();
    store
        .upsert_document(
            "feishu",
            &doc(
                "docs/unrelated",
                "自建应用概述",
                "本文提到了消息卡片一次，但主要讲自建应用的权限模型。",
            ),
        )
        .unwrap();

    let engine = SearchEngine::new(&store);
    let result = engine.search(&SearchQuery::new("消息卡片")).unwrap();

    assert!(!result.hits.is_empty());
    assert_eq!(result.hits[0].title, "消息卡片发送指南");
}

#[test]
fn error_code_query_finds_registered_code_regardless_of_source() {
    let store = DocStore::open_in_memory().unwrap();
    store.upsert_source("wecom", "企业微信", None).unwrap();

    let (doc_id, _) = store
        .upsert_document(
            "wecom",
            &doc(
                "errors/40014",
                "access_token 失效说明",
                "当 access_token 过期或失效时会返回错误码 40014，请重新获取 access_token。",
            ),
        )
        .unwrap();

    store
        .upsert_error_codes(
            "wecom",
            &[specfusion_core::types::ErrorCodeEntry {
                source_id: "wecom".to_string(),
                code: "40014".to_string(),
                message: "不合法的 access_token".to_string(),
                description: "检查 token 是否过期并重新获取".to_string(),
                doc_id: Some(doc_id),
            }],
        )
        .unwrap();

    let engine = SearchEngine::new(&store);
    let result = engine.search(&SearchQuery::new("40014")).unwrap();
    assert_eq!(result.kind, specfusion_core::search::QueryKind::ErrorCode);
    assert!(specfusion_core::search::format_markdown("40014", None, &result).contains("access_token"));
}

#[test]
fn api_path_query_matches_extracted_route() {
    let store = DocStore::open_in_memory().unwrap();
    store.upsert_source("openapi-demo", "Demo API", None).unwrap();

    let mut input = doc(
        "paths/list-orders",
        "查询订单列表",
        "GET /v1/orders\n\n返回订单列表，支持分页。",
    );
    input.api_path = Some("GET /v1/orders".to_string());
    store.upsert_document("openapi-demo", &input).unwrap();

    let engine = SearchEngine::new(&store);
    let result = engine.search(&SearchQuery::new("/v1/orders")).unwrap();
    assert_eq!(result.kind, specfusion_core::search::QueryKind::ApiPath);
    assert_eq!(result.hits.len(), 1);
}

#[test]
fn dedup_collapses_dev_modes_but_keeps_them_as_other_modes() {
    let store = DocStore::open_in_memory().unwrap();
    store.upsert_source("wecom", "企业微信", None).unwrap();

    for (path, mode) in [
        ("internal/send-message", DevMode::Internal),
        ("third-party/send-message", DevMode::ThirdParty),
    ] {
        let mut input = doc(path, "发送应用消息", "本文介绍发送应用消息接口，包含 access_token 参数说明。");
        input.dev_mode = Some(mode);
        input.api_path = Some("POST /cgi-bin/message/send".to_string());
        store.upsert_document("wecom", &input).unwrap();
    }

    let engine = SearchEngine::new(&store);
    let result = engine.search(&SearchQuery::new("发送应用消息")).unwrap();

    assert_eq!(result.hits.len(), 1, "same (title, api_path) pair should collapse to one hit");
    assert_eq!(result.hits[0].other_modes.len(), 1);
}

#[test]
fn reupserting_unchanged_content_leaves_the_row_unchanged() {
    let store = DocStore::open_in_memory().unwrap();
    store.upsert_source("feishu", "Feishu", None).unwrap();

    let input = doc("docs/stable", "稳定文档", "内容没有变化。");
    let (_, first) = store.upsert_document("feishu", &input).unwrap();
    let (_, second) = store.upsert_document("feishu", &input).unwrap();

    assert_eq!(first, specfusion_core::store::UpsertOutcome::Created);
    assert_eq!(second, specfusion_core::store::UpsertOutcome::Unchanged);
}

#[test]
fn content_change_is_detected_and_previous_hash_is_recorded() {
    let store = DocStore::open_in_memory().unwrap();
    store.upsert_source("feishu", "Feishu", None).unwrap();

    let path = "docs/evolving";
    store.upsert_document("feishu", &doc(path, "演进中的文档", "版本一。")).unwrap();
    let (_, outcome) =
        store.upsert_document("feishu", &doc(path, "演进中的文档", "版本二，新增了说明。")).unwrap();

    assert_eq!(outcome, specfusion_core::store::UpsertOutcome::Updated);
    let id = specfusion_core::types::compute_doc_id("feishu", path);
    let stored = store.get_document(&id).unwrap().unwrap();
    assert!(stored.prev_content_hash.is_some());
    assert_ne!(stored.prev_content_hash.unwrap(), stored.content_hash);
}

#[test]
fn summarizer_extracts_title_method_and_first_table() {
    let content = "\
<!-- source: https://example.com/docs/send -->
# 发送消息

请求方式：POST
请求地址：https://open.example.com/api/message/send

| 参数 | 类型 | 说明 |
| --- | --- | --- |
| msgtype | string | 消息类型 |
| content | string | 消息内容 |
";

    let summary = summarizer::summarize(content, "feishu_abcdef012345");
    assert_eq!(summary.title.as_deref(), Some("发送消息"));
    assert!(summary.api_info.iter().any(|line| line.contains("POST")));
    assert!(summary.first_table.is_some());

    let rendered = summarizer::format_markdown(&summary, "feishu_abcdef012345");
    assert!(rendered.contains("feishu_abcdef012345"));
}
