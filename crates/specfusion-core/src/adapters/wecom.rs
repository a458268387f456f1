//! Wecom (企业微信) adapter (§4.8).
//!
//! The richest adapter in the framework: Wecom publishes three parallel doc
//! trees (self-built / third-party / service-provider) under the same
//! category tree, gates its catalog behind a two-phase fetch (page GET then
//! content POST), and throttles aggressively enough to need the adaptive
//! limiter plus an explicit captcha/429 backoff-and-retry loop.

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;

use super::rate_limit::AdaptiveLimiter;
use super::{extract, Adapter, DocContent, DocEntry};
use crate::types::{DevMode, DocType};
use crate::{Error, Result};

static LAST_UPDATED_LABEL: OnceCell<Regex> = OnceCell::new();
static CAPTCHA_MARKER: OnceCell<Regex> = OnceCell::new();
static DOC_ID_SUFFIX: OnceCell<Regex> = OnceCell::new();

fn last_updated_label() -> &'static Regex {
    LAST_UPDATED_LABEL.get_or_init(|| Regex::new(r"最后更新[:：]\s*(\d{4})-(\d{2})-(\d{2})").expect("fixed pattern"))
}

/// Wecom's two documented challenge markers: `errCode` 500003 in a JSON
/// response, or the `showDeveloperCaptcha` flag embedded in either a JSON
/// or HTML body.
fn captcha_marker() -> &'static Regex {
    CAPTCHA_MARKER.get_or_init(|| Regex::new(r#"(?i)"?errCode"?\s*[:=]\s*500003|showDeveloperCaptcha"#).expect("fixed pattern"))
}

fn doc_id_suffix() -> &'static Regex {
    DOC_ID_SUFFIX.get_or_init(|| Regex::new(r"(\d+)\s*$").expect("fixed pattern"))
}

const CAPTCHA_MAX_RETRIES: u32 = 3;
const CAPTCHA_BACKOFF: Duration = Duration::from_secs(3);
const THROTTLE_MAX_RETRIES: u32 = 5;
const THROTTLE_BACKOFF: Duration = Duration::from_millis(1500);

/// Fetches Wecom's developer documentation across all three dev-mode trees.
pub struct WecomAdapter {
    client: reqwest::Client,
    base_url: String,
    cookies: Option<String>,
    limiter: AdaptiveLimiter,
}

impl WecomAdapter {
    /// Build an adapter against Wecom's documentation portal.
    #[must_use]
    pub fn new(client: reqwest::Client, cookies: Option<String>) -> Self {
        Self {
            client,
            base_url: "https://developer.work.weixin.qq.com".to_string(),
            cookies,
            limiter: AdaptiveLimiter::new(Duration::from_millis(300), Duration::from_secs(8)),
        }
    }

    /// Send a request built by `build`, retrying on captcha and 429
    /// responses with the backoff schedule from §4.8's content-fetch step.
    async fn send_with_retry(&self, build: impl Fn() -> reqwest::RequestBuilder, context: &str) -> Result<String> {
        let mut captcha_attempts = 0u32;
        let mut throttle_attempts = 0u32;
        loop {
            self.limiter.wait().await;
            let resp = build().send().await?;
            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.limiter.record_throttled();
                if throttle_attempts >= THROTTLE_MAX_RETRIES {
                    return Err(Error::RateLimited(format!("wecom returned 429 for {context} after {throttle_attempts} retries")));
                }
                throttle_attempts += 1;
                tokio::time::sleep(THROTTLE_BACKOFF * throttle_attempts).await;
                continue;
            }
            let body = resp.error_for_status()?.text().await?;
            if captcha_marker().is_match(&body) {
                self.limiter.record_throttled();
                if captcha_attempts >= CAPTCHA_MAX_RETRIES {
                    return Err(Error::AntiBot(format!("anti-bot challenge at {context} after {captcha_attempts} retries")));
                }
                captcha_attempts += 1;
                tokio::time::sleep(CAPTCHA_BACKOFF * captcha_attempts).await;
                continue;
            }
            self.limiter.record_success();
            return Ok(body);
        }
    }

    async fn get(&self, url: &str) -> Result<String> {
        let url = url.to_string();
        let cookies = self.cookies.clone();
        self.send_with_retry(
            || {
                let mut req = self.client.get(&url);
                if let Some(c) = &cookies {
                    req = req.header(reqwest::header::COOKIE, c.clone());
                }
                req
            },
            &url,
        )
        .await
    }

    /// POST `/docFetch/fetchCnt` with the extracted doc id — the second leg
    /// of the two-phase content fetch.
    async fn fetch_cnt(&self, doc_id: &str) -> Result<String> {
        let url = format!("{}/docFetch/fetchCnt", self.base_url);
        let cookies = self.cookies.clone();
        let doc_id = doc_id.to_string();
        self.send_with_retry(
            || {
                let mut req = self.client.post(&url).form(&[("docid", doc_id.as_str())]);
                if let Some(c) = &cookies {
                    req = req.header(reqwest::header::COOKIE, c.clone());
                }
                req
            },
            &url,
        )
        .await
    }
}

#[async_trait]
impl Adapter for WecomAdapter {
    fn source_id(&self) -> &str {
        "wecom"
    }

    async fn fetch_catalog(&self) -> Result<Vec<DocEntry>> {
        let url = format!("{}/document/path/90664", self.base_url);
        let body = self.get(&url).await?;
        let entries = parse_category_tree(&body);
        if entries.is_empty() {
            return Err(Error::Fatal("wecom catalog fetch returned zero entries".to_string()));
        }
        Ok(entries)
    }

    async fn fetch_content(&self, entry: &DocEntry) -> Result<DocContent> {
        let url = entry.source_url.clone().unwrap_or_else(|| format!("{}/document/path/90664", self.base_url));
        let html = self.get(&url).await?;
        let fetched = match doc_id_suffix().captures(&url) {
            Some(cap) => self.fetch_cnt(&cap[1]).await?,
            None => html.clone(),
        };
        let content = extract::html_to_markdown(&fetched);
        let api_path = extract::extract_generic_api_path(&content);
        let last_updated = extract_last_updated(&html, &fetched);
        let error_codes = extract::extract_error_codes("wecom", &content, None);
        Ok(DocContent { content, api_path, last_updated, metadata: None, error_codes })
    }
}

/// Parse Wecom's category-tree JSON payload (array of nodes, or an object
/// carrying a top-level `children` array) into catalog entries.
fn parse_category_tree(body: &str) -> Vec<DocEntry> {
    let mut entries = Vec::new();
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let children = json.as_array().cloned().unwrap_or_else(|| {
            json.get("children").and_then(Value::as_array).cloned().unwrap_or_default()
        });
        walk_json_tree(&children, "", &mut entries);
    }
    entries
}

/// Depth-first walk over one level of siblings (§4.8 "Walking"): drops
/// nodes with `status != 2`, sorts by `order_id` then title, assigns each
/// surviving sibling a zero-padded ordinal slug segment, and recurses into
/// folders while emitting a [`DocEntry`] per leaf.
fn walk_json_tree(children: &[Value], prefix: &str, out: &mut Vec<DocEntry>) {
    let mut nodes: Vec<&Value> = children.iter().filter(|n| n.get("status").and_then(Value::as_i64) == Some(2)).collect();
    nodes.sort_by(|a, b| {
        let order_a = a.get("order_id").and_then(Value::as_i64).unwrap_or(0);
        let order_b = b.get("order_id").and_then(Value::as_i64).unwrap_or(0);
        order_a.cmp(&order_b).then_with(|| {
            let title_a = a.get("title").and_then(Value::as_str).unwrap_or("");
            let title_b = b.get("title").and_then(Value::as_str).unwrap_or("");
            title_a.cmp(title_b)
        })
    });

    let mut used_slugs: HashSet<String> = HashSet::new();
    for (index, node) in nodes.iter().enumerate() {
        let title = node.get("title").and_then(Value::as_str).unwrap_or("").to_string();
        let category_id = node
            .get("category_id")
            .or_else(|| node.get("doc_id"))
            .and_then(Value::as_i64)
            .unwrap_or(0);

        let mut slug = slugify(&title);
        if slug.is_empty() {
            slug = format!("cat-{category_id}");
        }
        if used_slugs.contains(&slug) {
            slug = format!("{slug}-{category_id}");
        }
        used_slugs.insert(slug.clone());

        let segment = format!("{:03}-{slug}", index + 1);
        let path = if prefix.is_empty() { segment } else { format!("{prefix}/{segment}") };

        let has_children = node.get("children").and_then(Value::as_array).is_some_and(|c| !c.is_empty());
        let is_folder = node.get("type").and_then(Value::as_i64) == Some(0) || (category_id == 0 && has_children);

        if is_folder {
            if let Some(grandchildren) = node.get("children").and_then(Value::as_array) {
                walk_json_tree(grandchildren, &path, out);
            }
            continue;
        }

        let url = node.get("url").and_then(Value::as_str).unwrap_or("");
        let doc_type = guess_doc_type(&title);
        out.push(DocEntry {
            path,
            title,
            doc_type,
            dev_mode: Some(dev_mode_from_url(url)),
            source_url: if url.is_empty() { None } else { Some(url.to_string()) },
        });
    }
}

/// `/is_third/1` and `/is_sp/1` URL fragments select the third-party and
/// service-provider trees; anything else is the self-built (internal) tree.
fn dev_mode_from_url(url: &str) -> DevMode {
    if url.contains("/is_third/1") {
        DevMode::ThirdParty
    } else if url.contains("/is_sp/1") {
        DevMode::ServiceProvider
    } else {
        DevMode::Internal
    }
}

/// ASCII-normalize a title into a path slug: keep alphanumerics, collapse
/// everything else (including Chinese characters) to single hyphens.
fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut last_was_sep = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('-');
            last_was_sep = true;
        }
    }
    slug.trim_matches('-').to_string()
}

fn guess_doc_type(title: &str) -> DocType {
    if title.contains("错误码") || title.contains("error code") {
        DocType::ErrorCode
    } else if title.contains("回调") || title.contains("事件") {
        DocType::Event
    } else if title.contains("更新日志") || title.contains("changelog") {
        DocType::Changelog
    } else if title.contains("消息卡片") || title.contains("模板") {
        DocType::CardTemplate
    } else if title.contains("指南") || title.contains("入门") {
        DocType::Guide
    } else {
        DocType::ApiReference
    }
}

/// §4.8 "Date extraction": prefer `time`, then `最后更新：YYYY-MM-DD` in the
/// rendered HTML, then `extra.update_time`/`last_update_time`/
/// `last_update_time_str`; take the most recent of whichever parse.
fn extract_last_updated(html: &str, fetch_cnt_body: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let mut candidates = Vec::new();

    if let Ok(json) = serde_json::from_str::<Value>(fetch_cnt_body) {
        for pointer in ["/time", "/extra/update_time", "/last_update_time", "/last_update_time_str"] {
            if let Some(value) = json.pointer(pointer) {
                if let Some(dt) = parse_flexible_timestamp(value) {
                    candidates.push(dt);
                }
            }
        }
    }

    if let Some(cap) = last_updated_label().captures(html) {
        if let Some(dt) = ymd_to_datetime(&cap[1], &cap[2], &cap[3]) {
            candidates.push(dt);
        }
    }

    candidates.into_iter().max()
}

fn ymd_to_datetime(y: &str, m: &str, d: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let (y, m, d) = (y.parse().ok()?, m.parse().ok()?, d.parse().ok()?);
    chrono::NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(dt, chrono::Utc))
}

/// Accepts a Unix timestamp (seconds, as number or numeric string), an
/// RFC 3339 string, or `YYYY-MM-DD`.
fn parse_flexible_timestamp(value: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    if let Some(seconds) = value.as_i64() {
        return chrono::DateTime::<chrono::Utc>::from_timestamp(seconds, 0);
    }
    let raw = value.as_str()?;
    if let Ok(seconds) = raw.parse::<i64>() {
        return chrono::DateTime::<chrono::Utc>::from_timestamp(seconds, 0);
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&chrono::Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(dt, chrono::Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_label_date_from_rendered_html() {
        let html = "<div class=\"updated\">最后更新: 2025-03-14</div>";
        let dt = extract_last_updated(html, "{}").unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2025-03-14");
    }

    #[test]
    fn prefers_time_field_over_html_label_when_more_recent() {
        let html = "最后更新：2020-01-01";
        let body = r#"{"time": 1735689600}"#; // 2025-01-01T00:00:00Z
        let dt = extract_last_updated(html, body).unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2025-01-01");
    }

    #[test]
    fn guesses_doc_type_from_title_keywords() {
        assert_eq!(guess_doc_type("全局错误码"), DocType::ErrorCode);
        assert_eq!(guess_doc_type("接收事件与回调"), DocType::Event);
        assert_eq!(guess_doc_type("发送应用消息"), DocType::ApiReference);
    }

    #[test]
    fn dev_mode_detected_from_url_fragment() {
        assert_eq!(dev_mode_from_url("/document/path/1?is_third/1"), DevMode::ThirdParty);
        assert_eq!(dev_mode_from_url("/document/path/1?is_sp/1"), DevMode::ServiceProvider);
        assert_eq!(dev_mode_from_url("/document/path/1"), DevMode::Internal);
    }

    #[test]
    fn walks_category_tree_filtering_status_and_slugifying_titles() {
        let body = r#"{
            "children": [
                {"status": 2, "order_id": 2, "title": "消息推送", "type": 0, "children": [
                    {"status": 2, "order_id": 1, "title": "发送应用消息", "doc_id": 101, "url": "/document/path/101"}
                ]},
                {"status": 2, "order_id": 1, "title": "入门指南", "doc_id": 100, "url": "/document/path/100"},
                {"status": 1, "order_id": 3, "title": "废弃条目", "doc_id": 999, "url": "/document/path/999"}
            ]
        }"#;
        let entries = parse_category_tree(body);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.path == "001-cat-100"));
        assert!(entries.iter().any(|e| e.path.starts_with("002-cat-0/001-cat-101")));
        assert!(!entries.iter().any(|e| e.title == "废弃条目"));
    }

    #[test]
    fn captcha_marker_matches_wecom_specific_fields_not_taobao() {
        assert!(captcha_marker().is_match(r#"{"errCode": 500003}"#));
        assert!(captcha_marker().is_match("window.showDeveloperCaptcha = true;"));
        assert!(!captcha_marker().is_match("RGV587_ERROR"));
    }
}
