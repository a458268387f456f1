//! Markdown summarization (§4.4): a pure function from document content to a
//! compact preview block, used by the `GET /api/doc/:id` "summary" view and
//! by adapters that need a teaser before the full body is fetched.

use once_cell::sync::OnceCell;
use regex::Regex;

const MAX_TABLE_ROWS: usize = 10;
const MAX_JSON_BLOCKS: usize = 2;
const MAX_JSON_BLOCK_CHARS: usize = 500;
const MAX_DESCRIPTION_CHARS: usize = 200;

/// Keyword set identifying a permission-statement paragraph (§4.4 step 3);
/// checked against the whole paragraph, not just headings.
const PERMISSION_KEYWORDS: [&str; 10] =
    ["权限说明", "权限要求", "使用条件", "调用权限", "接口权限", "应用权限", "通讯录权限", "数据权限", "permission", "scope"];

static METADATA_COMMENT: OnceCell<Regex> = OnceCell::new();
static TABLE_ROW: OnceCell<Regex> = OnceCell::new();
static TABLE_SEPARATOR: OnceCell<Regex> = OnceCell::new();
static JSON_FENCE: OnceCell<Regex> = OnceCell::new();
static API_INFO_LINE: OnceCell<Regex> = OnceCell::new();
static METHOD_PATH: OnceCell<Regex> = OnceCell::new();
static GENERIC_PATH: OnceCell<Regex> = OnceCell::new();
static BOLD_MARKER: OnceCell<Regex> = OnceCell::new();
static INLINE_LINK: OnceCell<Regex> = OnceCell::new();
static SOURCE_URL_COMMENT: OnceCell<Regex> = OnceCell::new();

fn metadata_comment() -> &'static Regex {
    METADATA_COMMENT.get_or_init(|| Regex::new(r"(?s)^\s*(<!--.*?-->\s*)+").expect("fixed pattern"))
}

fn table_row() -> &'static Regex {
    TABLE_ROW.get_or_init(|| Regex::new(r"^\s*\|.*\|\s*$").expect("fixed pattern"))
}

fn table_separator() -> &'static Regex {
    TABLE_SEPARATOR.get_or_init(|| Regex::new(r"^\s*\|?[\s:|-]+\|?\s*$").expect("fixed pattern"))
}

fn json_fence() -> &'static Regex {
    JSON_FENCE.get_or_init(|| Regex::new(r"(?s)```json\s*\n(.*?)```").expect("fixed pattern"))
}

fn api_info_line() -> &'static Regex {
    API_INFO_LINE.get_or_init(|| Regex::new(r"(?i)^\s*(请求方式|method|请求地址|url|endpoint)\s*[:：]").expect("fixed pattern"))
}

/// `METHOD /path`, e.g. `POST /cgi-bin/message/send`.
fn method_path() -> &'static Regex {
    METHOD_PATH.get_or_init(|| {
        Regex::new(r"(?i)\b(GET|POST|PUT|DELETE|PATCH)\s+(/\S+)").expect("fixed pattern")
    })
}

/// A bare `/cgi-bin/...` or `/open-apis/...` route with no leading method.
fn generic_path() -> &'static Regex {
    GENERIC_PATH.get_or_init(|| Regex::new(r"(/cgi-bin/\S+|/open-apis/\S+)").expect("fixed pattern"))
}

fn bold_marker() -> &'static Regex {
    BOLD_MARKER.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("fixed pattern"))
}

fn inline_link() -> &'static Regex {
    INLINE_LINK.get_or_init(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("fixed pattern"))
}

/// `source_url: ...` (or `source: ...`) inside the leading metadata comment.
fn source_url_comment() -> &'static Regex {
    SOURCE_URL_COMMENT.get_or_init(|| Regex::new(r"(?im)^\s*source(?:_url)?\s*:\s*(\S+)").expect("fixed pattern"))
}

fn is_permission_paragraph(text: &str) -> bool {
    let lower = text.to_lowercase();
    PERMISSION_KEYWORDS.iter().any(|kw| lower.contains(&kw.to_lowercase()))
}

/// Strip blockquote markers, bold and inline links, then collapse whitespace.
fn clean_paragraph(text: &str) -> String {
    let no_quote = text.trim_start_matches('>').trim();
    let no_bold = bold_marker().replace_all(no_quote, "$1");
    let no_links = inline_link().replace_all(&no_bold, "$1");
    no_links.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

/// One extracted JSON block, labeled with the nearest preceding heading.
#[derive(Debug, Clone)]
pub struct JsonBlock {
    /// Nearest preceding heading, or a short descriptor when none precedes it.
    pub label: String,
    /// Block content, truncated to [`MAX_JSON_BLOCK_CHARS`].
    pub body: String,
}

/// Extracted preview, assembled from a single pass over the document body.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    /// The leading `<!-- ... -->` metadata block, preserved verbatim.
    pub metadata_comment: Option<String>,
    /// First-level heading or fallback title line.
    pub title: Option<String>,
    /// First non-empty, non-heading, non-permission paragraph after the title.
    pub description: Option<String>,
    /// Lines beginning with "请求方式"/"method"/"请求地址"/"url"/"endpoint",
    /// plus a `METHOD /path` pair recovered from the body when no such line exists.
    pub api_info: Vec<String>,
    /// First Markdown table found, capped at [`MAX_TABLE_ROWS`] data rows
    /// (header + separator not counted against the cap).
    pub first_table: Vec<String>,
    /// Up to [`MAX_JSON_BLOCKS`] fenced ```json``` code blocks.
    pub json_blocks: Vec<JsonBlock>,
    /// Set when the first table was truncated against [`MAX_TABLE_ROWS`].
    pub table_truncated: bool,
}

/// Summarize `content` per §4.4: preserve any leading metadata HTML comment,
/// extract the title, the first non-permission paragraph, API info, the
/// first table (capped) and up to two labeled JSON blocks.
#[must_use]
pub fn summarize(content: &str, doc_id: &str) -> Summary {
    let mut summary = Summary::default();

    let comment_match = metadata_comment().find(content);
    let body = if let Some(m) = comment_match {
        summary.metadata_comment = Some(m.as_str().trim().to_string());
        &content[m.end()..]
    } else {
        content
    };

    if let Some(cap) = source_url_comment().captures(content) {
        summary.api_info.push(format!("**来源地址**：{}", &cap[1]));
    }

    let mut lines = body.lines().peekable();
    let mut table_buffer: Vec<String> = Vec::new();
    let mut table_data_rows = 0usize;
    let mut in_table = false;
    let mut in_fence = false;
    let mut title_seen = false;

    while let Some(line) = lines.next() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if !title_seen {
            if let Some(heading) = line.strip_prefix("# ") {
                summary.title = Some(heading.trim().to_string());
                title_seen = true;
                continue;
            }
        }

        if api_info_line().is_match(line) {
            summary.api_info.push(line.trim().to_string());
            continue;
        }

        if summary.description.is_none()
            && title_seen
            && !line.trim().is_empty()
            && !line.starts_with('#')
            && !table_row().is_match(line)
        {
            if !is_permission_paragraph(line) {
                summary.description = Some(truncate_with_ellipsis(&clean_paragraph(line), MAX_DESCRIPTION_CHARS));
            }
        }

        if summary.first_table.is_empty() {
            if table_row().is_match(line) {
                if !in_table {
                    in_table = true;
                    table_buffer.push(line.to_string());
                } else if table_separator().is_match(line) {
                    table_buffer.push(line.to_string());
                } else if table_data_rows < MAX_TABLE_ROWS {
                    table_buffer.push(line.to_string());
                    table_data_rows += 1;
                } else {
                    summary.table_truncated = true;
                }
                continue;
            } else if in_table {
                summary.first_table = std::mem::take(&mut table_buffer);
                in_table = false;
            }
        }
    }
    if in_table && summary.first_table.is_empty() {
        summary.first_table = table_buffer;
    }

    if !summary.api_info.iter().any(|l| api_info_line().is_match(l)) {
        if let Some(cap) = method_path().captures(body) {
            summary.api_info.push(format!("**方法**：{}", cap[1].to_uppercase()));
            summary.api_info.push(format!("**路径**：{}", &cap[2]));
        } else if let Some(cap) = generic_path().captures(body) {
            summary.api_info.push(format!("**路径**：{}", &cap[1]));
        }
    }

    let mut heading_for_pos: Vec<(usize, String)> = Vec::new();
    let mut current_heading = String::new();
    for (offset, line) in line_offsets(body) {
        if let Some(heading) = line.strip_prefix('#') {
            current_heading = heading.trim_start_matches('#').trim().to_string();
        }
        heading_for_pos.push((offset, current_heading.clone()));
    }

    for cap in json_fence().captures_iter(body) {
        if summary.json_blocks.len() >= MAX_JSON_BLOCKS {
            break;
        }
        let start = cap.get(0).map(|m| m.start()).unwrap_or(0);
        let label = heading_for_pos
            .iter()
            .rev()
            .find(|(offset, heading)| *offset <= start && !heading.is_empty())
            .map_or_else(|| format!("JSON 示例 {}", summary.json_blocks.len() + 1), |(_, heading)| heading.clone());
        let raw = cap[1].trim();
        summary.json_blocks.push(JsonBlock { label, body: truncate_with_ellipsis(raw, MAX_JSON_BLOCK_CHARS) });
    }

    if summary.title.is_none() {
        summary.title = body.lines().find(|l| !l.trim().is_empty()).map(|l| l.trim().to_string());
    }

    let _ = doc_id;
    summary
}

/// `(byte offset of line start, line)` pairs, used to locate the nearest
/// preceding heading for each JSON block by byte position.
fn line_offsets(body: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut offset = 0;
    for line in body.lines() {
        out.push((offset, line));
        offset += line.len() + 1;
    }
    out
}

/// Render a [`Summary`] as the Markdown block returned from the API, ending
/// with a pointer back to the full document (§4.4 step 7).
#[must_use]
pub fn format_markdown(summary: &Summary, doc_id: &str) -> String {
    let mut out = String::new();
    if let Some(comment) = &summary.metadata_comment {
        out.push_str(comment);
        out.push_str("\n\n");
    }
    if let Some(title) = &summary.title {
        out.push_str(&format!("## {title}\n\n"));
    }
    if let Some(description) = &summary.description {
        out.push_str(description);
        out.push_str("\n\n");
    }
    if !summary.api_info.is_empty() {
        for line in &summary.api_info {
            out.push_str(&format!("{line}\n"));
        }
        out.push('\n');
    }
    if !summary.first_table.is_empty() {
        out.push_str(&summary.first_table.join("\n"));
        out.push('\n');
        if summary.table_truncated {
            out.push_str(&format!("_(仅显示前 {MAX_TABLE_ROWS} 行)_\n"));
        }
        out.push('\n');
    }
    for block in &summary.json_blocks {
        out.push_str(&format!("**{}**\n\n```json\n", block.label));
        out.push_str(&block.body);
        out.push_str("\n```\n\n");
    }
    out.push_str(&format!("*（完整参数和代码示例请获取全文：/doc/{doc_id}）*\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_leading_metadata_comment_instead_of_stripping_it() {
        let content = "<!--\nsource: wecom\npath: guide/send\n-->\n# 发送消息\n\n正文内容";
        let summary = summarize(content, "wecom_abc123456789");
        assert_eq!(summary.title.as_deref(), Some("发送消息"));
        let comment = summary.metadata_comment.as_deref().expect("comment should be preserved");
        assert!(comment.contains("source: wecom"));
        assert!(comment.contains("path: guide/send"));
    }

    #[test]
    fn extracts_api_info_lines() {
        let content = "# 接口\n\n请求方式：POST\n请求地址：/cgi-bin/message/send\n\n正文";
        let summary = summarize(content, "id");
        assert_eq!(summary.api_info.len(), 2);
    }

    #[test]
    fn recovers_method_and_path_when_no_explicit_api_info_lines_exist() {
        let content = "# 接口\n\n调用 POST /cgi-bin/message/send 即可发送消息。\n\n正文";
        let summary = summarize(content, "id");
        assert!(summary.api_info.iter().any(|l| l.contains("POST")));
        assert!(summary.api_info.iter().any(|l| l.contains("/cgi-bin/message/send")));
    }

    #[test]
    fn description_skips_permission_paragraph_even_without_a_heading() {
        let content = "\
# 发送应用消息

权限说明：需要企业应用权限才能调用此接口。

本接口用于向指定成员发送应用消息，支持文本和卡片两种类型。
";
        let summary = summarize(content, "id");
        let description = summary.description.as_deref().expect("description should be found");
        assert!(!description.contains("权限说明"));
        assert!(description.contains("本接口用于向指定成员发送应用消息"));
    }

    #[test]
    fn description_is_cleaned_of_bold_and_link_markup_and_truncated() {
        let long_sentence = "说明内容".repeat(60);
        let content = format!("# 标题\n\n**重点**：请参阅[文档](https://example.com)。{long_sentence}\n");
        let summary = summarize(&content, "id");
        let description = summary.description.as_deref().expect("description should be found");
        assert!(!description.contains('*'));
        assert!(!description.contains('['));
        assert!(description.chars().count() <= MAX_DESCRIPTION_CHARS + 1);
        assert!(description.ends_with('…'));
    }

    #[test]
    fn caps_first_table_at_ten_rows() {
        let mut content = String::from("# 错误码\n\n| 错误码 | 含义 |\n| --- | --- |\n");
        for i in 0..15 {
            content.push_str(&format!("| {i} | desc {i} |\n"));
        }
        let summary = summarize(&content, "id");
        // header + separator + 10 data rows
        assert_eq!(summary.first_table.len(), 12);
        assert!(summary.table_truncated);
    }

    #[test]
    fn keeps_up_to_two_json_blocks_labeled_with_nearest_heading() {
        let content = "\
# t

## 请求示例

```json
{\"a\":1}
```

## 响应示例

```json
{\"b\":2}
```

```json
{\"c\":3}
```
";
        let summary = summarize(content, "id");
        assert_eq!(summary.json_blocks.len(), 2);
        assert!(summary.json_blocks[0].body.contains("\"a\":1"));
        assert_eq!(summary.json_blocks[0].label, "请求示例");
        assert_eq!(summary.json_blocks[1].label, "响应示例");
    }

    #[test]
    fn json_block_is_truncated_to_five_hundred_chars() {
        let big_json = format!("{{\"field\":\"{}\"}}", "x".repeat(600));
        let content = format!("# t\n\n```json\n{big_json}\n```\n");
        let summary = summarize(&content, "id");
        assert_eq!(summary.json_blocks.len(), 1);
        assert!(summary.json_blocks[0].body.chars().count() <= MAX_JSON_BLOCK_CHARS + 1);
        assert!(summary.json_blocks[0].body.ends_with('…'));
    }

    #[test]
    fn format_markdown_points_back_to_full_document_with_chinese_pointer() {
        let summary = summarize("# t\n\n正文", "wecom_abc123456789");
        let md = format_markdown(&summary, "wecom_abc123456789");
        assert!(md.contains("获取全文"));
        assert!(md.contains("/doc/wecom_abc123456789"));
    }
}
