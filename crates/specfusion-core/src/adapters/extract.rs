//! Shared extraction regexes (§4.5 "Extraction helpers").
//!
//! Every adapter's normalized Markdown is scanned with the same error-code
//! table pattern; API-path extraction is platform-specific because each
//! developer portal formats its "request line" differently.

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::types::ErrorCodeEntry;

static ERROR_TABLE_ROW: OnceCell<Regex> = OnceCell::new();
static GENERIC_METHOD_PATH: OnceCell<Regex> = OnceCell::new();

fn error_table_row() -> &'static Regex {
    ERROR_TABLE_ROW.get_or_init(|| {
        Regex::new(r"(?m)^\s*\|\s*(-?\d{3,6})\s*\|\s*([^|]+?)\s*\|\s*([^|]*?)\s*\|?\s*$")
            .expect("fixed pattern")
    })
}

fn generic_method_path() -> &'static Regex {
    GENERIC_METHOD_PATH.get_or_init(|| {
        Regex::new(r"(?im)\b(GET|POST|PUT|DELETE|PATCH)\s+(/[A-Za-z0-9_/\-\.{}]+)")
            .expect("fixed pattern")
    })
}

/// Scan a Markdown body for `| code | message | description |`-shaped table
/// rows and return one [`ErrorCodeEntry`] per match. Known to over-match on
/// tables that merely contain numeric-looking first columns unrelated to
/// error codes (§9 Open Questions) — accepted as the tradeoff for not
/// requiring a fixed table schema across ten independently-authored portals.
#[must_use]
pub fn extract_error_codes(source_id: &str, content: &str, doc_id: Option<&str>) -> Vec<ErrorCodeEntry> {
    error_table_row()
        .captures_iter(content)
        .filter_map(|cap| {
            let code = cap.get(1)?.as_str().to_string();
            let message = cap.get(2)?.as_str().trim().to_string();
            if message.is_empty() || message.chars().all(|c| c == '-' || c == ':') {
                return None;
            }
            let description = cap.get(3).map_or_else(String::new, |m| m.as_str().trim().to_string());
            Some(ErrorCodeEntry {
                source_id: source_id.to_string(),
                code,
                message,
                description,
                doc_id: doc_id.map(ToString::to_string),
            })
        })
        .collect()
}

/// Extract a generic `METHOD /path` line, the fallback used by adapters
/// without a more specific platform convention.
#[must_use]
pub fn extract_generic_api_path(content: &str) -> Option<String> {
    generic_method_path().captures(content).map(|cap| format!("{} {}", cap[1].to_uppercase(), &cap[2]))
}

/// Best-effort HTML→Markdown conversion shared by every HTML-scraping
/// adapter: strips `<script>`/`<style>` blocks, maps headings/breaks/table
/// cells to their Markdown equivalents, then drops any remaining tags.
#[must_use]
pub fn html_to_markdown(html: &str) -> String {
    let without_scripts = strip_tag_blocks(html, "script");
    let without_styles = strip_tag_blocks(&without_scripts, "style");
    let text = without_styles
        .replace("<h1", "\n# ").replace("<h2", "\n## ").replace("<h3", "\n### ")
        .replace("</h1>", "\n").replace("</h2>", "\n").replace("</h3>", "\n")
        .replace("<br>", "\n").replace("<br/>", "\n").replace("<br />", "\n")
        .replace("</p>", "\n").replace("</tr>", "\n").replace("</td>", " | ").replace("</th>", " | ");
    strip_remaining_tags(&text)
}

fn strip_tag_blocks(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut out = String::new();
    let mut rest = html;
    while let Some(start) = rest.find(&open) {
        out.push_str(&rest[..start]);
        if let Some(end) = rest[start..].find(&close) {
            rest = &rest[start + end + close.len()..];
        } else {
            rest = "";
            break;
        }
    }
    out.push_str(rest);
    out
}

fn strip_remaining_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {},
        }
    }
    out.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_error_code_table_rows() {
        let content = "| 错误码 | 含义 | 说明 |\n| --- | --- | --- |\n| 40001 | invalid credential | access_token 无效 |\n| 60011 | no privilege | 无权限 |\n";
        let entries = extract_error_codes("wecom", content, Some("doc1"));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].code, "40001");
        assert_eq!(entries[1].message, "no privilege");
    }

    #[test]
    fn skips_separator_rows() {
        let content = "| --- | --- | --- |\n";
        let entries = extract_error_codes("wecom", content, None);
        assert!(entries.is_empty());
    }

    #[test]
    fn extracts_generic_method_path() {
        let content = "### 请求方式\n\nPOST /cgi-bin/message/send\n\n正文";
        assert_eq!(extract_generic_api_path(content).as_deref(), Some("POST /cgi-bin/message/send"));
    }
}
