//! Chinese-aware tokenizer (§4.1).
//!
//! Produces the whitespace-separated token stream that both the write path
//! (`tokenized_title` / `tokenized_content`) and the query path (the FTS
//! `MATCH` expression) are built from. The same loaded dictionary must back
//! both call sites or indexed and queried tokens drift apart — see
//! [`init_tokenizer`] / [`shared`].

use std::collections::HashSet;
use std::path::Path;

use jieba_rs::Jieba;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::{Error, Result};

/// Stop words dropped from either tokenization mode (§4.1).
const STOP_WORDS: &[&str] = &[
    "的", "了", "是", "在", "有", "和", "与", "或", "等", "把", "被", "对", "不", "也", "都",
    "而", "及", "到", "从", "以",
];

static GUARD_PATTERN: OnceCell<Regex> = OnceCell::new();

/// The protection regex, scanned in priority order: absolute URLs, then
/// slash-delimited paths, then alphanumeric identifiers (optionally
/// containing `:`/`.`), then digit runs. Each match is emitted verbatim.
fn guard_pattern() -> &'static Regex {
    GUARD_PATTERN.get_or_init(|| {
        Regex::new(
            r"(?x)
            (https?://[^\s]+)
            |((?:/[A-Za-z0-9_\-\.]+){1,})
            |([A-Za-z_][A-Za-z0-9_]*(?:[:\.][A-Za-z0-9_]+)+)
            |(\d+)
            ",
        )
        .expect("guard pattern is a fixed, valid regex")
    })
}

/// Which cut algorithm to apply to the non-guarded text between protected
/// tokens (§4.1 "Two modes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Write-mode: the segmenter's standard cut.
    Write,
    /// Query-mode: the search-optimized cut (may emit overlapping coarse and
    /// fine granularities), deduplicated afterward preserving first-seen order.
    Query,
}

/// Chinese-aware tokenizer wrapping a `jieba-rs` segmenter plus the pattern
/// guard and stop-word filter from §4.1.
pub struct Tokenizer {
    jieba: Jieba,
}

impl Tokenizer {
    /// Build a tokenizer, optionally loading a user dictionary file of
    /// `word weight` lines (one per line, space-separated). Never panics:
    /// a missing or malformed dictionary is logged and the tokenizer falls
    /// back to jieba's built-in dictionary.
    #[must_use]
    pub fn new(dict_path: Option<&Path>) -> Self {
        let mut jieba = Jieba::new();
        if let Some(path) = dict_path {
            match std::fs::read_to_string(path) {
                Ok(contents) => {
                    for line in contents.lines() {
                        let mut parts = line.split_whitespace();
                        let Some(word) = parts.next() else { continue };
                        let freq = parts.next().and_then(|w| w.parse::<usize>().ok());
                        jieba.add_word(word, freq, None);
                    }
                },
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to load user dictionary, using built-in dictionary only");
                },
            }
        }
        Self { jieba }
    }

    /// Tokenize `text` according to `mode`, applying the pattern guard and
    /// stop-word filter. Deterministic: the same input and dictionary always
    /// produce the same output.
    #[must_use]
    pub fn tokenize(&self, text: &str, mode: Mode) -> Vec<String> {
        let mut tokens = Vec::new();
        let mut last_end = 0usize;

        for mat in guard_pattern().find_iter(text) {
            if mat.start() > last_end {
                self.segment_into(&text[last_end..mat.start()], mode, &mut tokens);
            }
            tokens.push(mat.as_str().to_string());
            last_end = mat.end();
        }
        if last_end < text.len() {
            self.segment_into(&text[last_end..], mode, &mut tokens);
        }

        if mode == Mode::Query {
            dedup_preserve_order(tokens)
        } else {
            tokens
        }
    }

    /// Tokenize and join with a single space, the form actually stored in
    /// `tokenized_title` / `tokenized_content` and passed as an FTS `MATCH` argument.
    #[must_use]
    pub fn tokenize_joined(&self, text: &str, mode: Mode) -> String {
        self.tokenize(text, mode).join(" ")
    }

    fn segment_into(&self, chunk: &str, mode: Mode, out: &mut Vec<String>) {
        let segments: Vec<&str> = match mode {
            Mode::Write => self.jieba.cut(chunk, false),
            Mode::Query => self.jieba.cut_for_search(chunk, false),
        };
        for seg in segments {
            let trimmed = seg.trim();
            if trimmed.is_empty() || is_stopword_or_punct(trimmed) {
                continue;
            }
            out.push(trimmed.to_string());
        }
    }
}

fn is_stopword_or_punct(segment: &str) -> bool {
    if STOP_WORDS.contains(&segment) {
        return true;
    }
    segment.chars().all(|c| !c.is_alphanumeric() && !is_cjk(c))
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF)
}

fn dedup_preserve_order(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

static SHARED: OnceCell<Tokenizer> = OnceCell::new();

/// Explicitly initialize the process-wide tokenizer dictionary. Should be
/// called once at process start; safe to call more than once (subsequent
/// calls are no-ops) so CLI and server startup paths can both call it
/// unconditionally.
pub fn init_tokenizer(dict_path: Option<&Path>) -> Result<()> {
    if SHARED.get().is_some() {
        return Ok(());
    }
    SHARED
        .set(Tokenizer::new(dict_path))
        .map_err(|_| Error::Config("tokenizer already initialized".to_string()))
}

/// Access the process-wide tokenizer, lazily initializing it with no
/// dictionary if [`init_tokenizer`] was never called.
#[must_use]
pub fn shared() -> &'static Tokenizer {
    SHARED.get_or_init(|| Tokenizer::new(None))
}

/// Replace invalid UTF-8 byte sequences with the replacement character
/// instead of panicking or failing, per §4.1's "never panic on malformed
/// UTF-8" contract. Used at adapter/ingest boundaries where content arrives
/// as raw bytes.
#[must_use]
pub fn sanitize_utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_url_and_path_and_identifier_and_digits() {
        let t = Tokenizer::new(None);
        let tokens = t.tokenize(
            "访问 https://example.com/a?b=1 的 /cgi-bin/message/send 或 access_token 还有 12345",
            Mode::Write,
        );
        assert!(tokens.contains(&"https://example.com/a?b=1".to_string()));
        assert!(tokens.contains(&"/cgi-bin/message/send".to_string()));
        assert!(tokens.contains(&"access_token".to_string()));
        assert!(tokens.contains(&"12345".to_string()));
        assert!(!tokens.contains(&"的".to_string()));
        assert!(!tokens.contains(&"或".to_string()));
    }

    #[test]
    fn identifier_guard_keeps_colon_and_dot_forms() {
        let t = Tokenizer::new(None);
        let tokens = t.tokenize("scope contact:user.base:readonly here", Mode::Write);
        assert!(tokens.contains(&"contact:user.base:readonly".to_string()));
    }

    #[test]
    fn deterministic_across_calls() {
        let t = Tokenizer::new(None);
        let a = t.tokenize_joined("发送应用消息给用户", Mode::Write);
        let b = t.tokenize_joined("发送应用消息给用户", Mode::Write);
        assert_eq!(a, b);
    }

    #[test]
    fn query_mode_dedups_preserving_first_seen_order() {
        let t = Tokenizer::new(None);
        let tokens = t.tokenize("消息消息", Mode::Query);
        let mut seen = HashSet::new();
        for tok in &tokens {
            assert!(seen.insert(tok.clone()), "token {tok} repeated");
        }
    }

    #[test]
    fn stop_words_and_punctuation_are_dropped() {
        let t = Tokenizer::new(None);
        let tokens = t.tokenize("，。、", Mode::Write);
        assert!(tokens.is_empty());
    }

    #[test]
    fn sanitize_utf8_never_panics_on_invalid_bytes() {
        let bytes = [0xff, 0xfe, b'h', b'i'];
        let s = sanitize_utf8(&bytes);
        assert!(s.contains("hi"));
    }
}
