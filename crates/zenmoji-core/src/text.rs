//! Article text normalization: Markdown condensing, length limiting and
//! quality checks applied before anything is sent to a provider.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;
use crate::traits::TextExtractor;

/// Marker inserted where the middle of a long article was cut.
pub const ELISION_MARKER: &str = "\n\n[...中略...]\n\n";

const MAX_HEADINGS: usize = 5;
const MAX_BODY_LINES: usize = 10;
const MAX_CODE_LINES: usize = 3;
const CODE_PREVIEW_CHARS: usize = 50;

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,3}\s+").expect("valid heading regex"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*+]|\d+\.)\s+").expect("valid list regex"));
static QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^>\s*").expect("valid quote regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid inline code regex"));
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+)\*").expect("valid italic regex"));

/// Limits applied to extracted article text.
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Texts longer than this (in characters) are cut to head + tail.
    pub max_length: usize,
    pub head_length: usize,
    pub tail_length: usize,
    /// Minimum characters for a usable article.
    pub min_length: usize,
    /// Reject text without any Japanese script.
    pub require_japanese: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            max_length: 2000,
            head_length: 800,
            tail_length: 400,
            min_length: 50,
            require_japanese: true,
        }
    }
}

/// Condense a Markdown article to the parts that say most about its topic:
/// headings first, then body lines, then a short preview of code lines.
pub fn optimize_markdown(content: &str, config: &TextConfig) -> String {
    let mut headings = Vec::new();
    let mut body = Vec::new();
    let mut code = Vec::new();
    let mut in_code_block = false;

    for line in content.lines() {
        let line = line.trim();

        if line.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            if !line.is_empty() {
                code.push(line);
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }

        if HEADING.is_match(line) {
            headings.push(line.trim_start_matches('#').trim().to_string());
        } else if LIST_ITEM.is_match(line) {
            body.push(LIST_ITEM.replace(line, "").into_owned());
        } else if line.starts_with('>') {
            body.push(QUOTE.replace(line, "").into_owned());
        } else {
            let cleaned = unwrap_inline_markup(line);
            if !cleaned.is_empty() {
                body.push(cleaned);
            }
        }
    }

    let prioritized: Vec<String> = headings
        .into_iter()
        .take(MAX_HEADINGS)
        .chain(body.into_iter().take(MAX_BODY_LINES))
        .chain(code.into_iter().take(MAX_CODE_LINES).map(|line| {
            let preview: String = line.chars().take(CODE_PREVIEW_CHARS).collect();
            format!("[コード: {preview}...]")
        }))
        .collect();

    limit_text_length(&prioritized.join("\n"), config)
}

/// Keep the first `head_length` and last `tail_length` characters of text
/// longer than `max_length`, joined by [`ELISION_MARKER`].
pub fn limit_text_length(text: &str, config: &TextConfig) -> String {
    let total = text.chars().count();
    if total <= config.max_length {
        return text.to_string();
    }

    let head: String = text.chars().take(config.head_length).collect();
    let tail: String = text
        .chars()
        .skip(total.saturating_sub(config.tail_length))
        .collect();
    format!("{head}{ELISION_MARKER}{tail}")
}

/// Reject text that is empty, too short, or (optionally) has no Japanese.
pub fn validate_text_quality(text: &str, config: &TextConfig) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::ExtractionError("テキストが空です".into()));
    }
    if text.chars().count() < config.min_length {
        return Err(AppError::ExtractionError(format!(
            "テキストが短すぎます（最低{}文字必要）",
            config.min_length
        )));
    }
    if config.require_japanese && !contains_japanese(text) {
        return Err(AppError::ExtractionError(
            "日本語のテキストが検出されませんでした".into(),
        ));
    }
    Ok(())
}

/// Hiragana, katakana or CJK unified ideographs.
pub fn contains_japanese(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{4E00}'..='\u{9FAF}')
    })
}

fn unwrap_inline_markup(line: &str) -> String {
    let line = LINK.replace_all(line, "$1");
    let line = INLINE_CODE.replace_all(&line, "$1");
    let line = BOLD.replace_all(&line, "$1");
    ITALIC.replace_all(&line, "$1").trim().to_string()
}

/// Extracts article text from raw Markdown (a file or an editor's value).
#[derive(Debug, Clone)]
pub struct MarkdownExtractor {
    content: String,
    config: TextConfig,
}

impl MarkdownExtractor {
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_config(content, TextConfig::default())
    }

    pub fn with_config(content: impl Into<String>, config: TextConfig) -> Self {
        Self {
            content: content.into(),
            config,
        }
    }
}

impl TextExtractor for MarkdownExtractor {
    fn extract_text(&self) -> Result<String, AppError> {
        if self.content.trim().is_empty() {
            return Err(AppError::ExtractionError(
                "記事の内容が取得できませんでした".into(),
            ));
        }
        let text = optimize_markdown(&self.content, &self.config);
        validate_text_quality(&text, &self.config)?;
        tracing::debug!(chars = text.chars().count(), "Extracted article text");
        Ok(text)
    }
}
