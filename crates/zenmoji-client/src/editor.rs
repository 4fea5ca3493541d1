use std::sync::{Arc, LazyLock};

use htmd::HtmlToMarkdown;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use url::Url;
use zenmoji_core::error::AppError;
use zenmoji_core::text::{MarkdownExtractor, TextConfig};
use zenmoji_core::traits::TextExtractor;

/// Editor locations, most specific first.
const EDITOR_SELECTORS: [&str; 7] = [
    ".editor-wrapper .CodeMirror",
    ".CodeMirror",
    r#"textarea[data-testid="editor"]"#,
    "textarea.editor",
    ".editor textarea",
    "[data-editor] textarea",
    ".markdown-editor textarea",
];

/// A bare textarea only counts as the editor past this many characters.
const MIN_TEXTAREA_CHARS: usize = 50;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css}: {e}"))
}

static EDITORS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| EDITOR_SELECTORS.iter().map(|css| selector(css)).collect());
static TEXTAREA: LazyLock<Selector> = LazyLock::new(|| selector("textarea"));
static CODEMIRROR_LINE: LazyLock<Selector> = LazyLock::new(|| selector(".CodeMirror-line"));
static TITLE_INPUT: LazyLock<Selector> = LazyLock::new(|| {
    selector(r#"input[placeholder*="タイトル"], input[placeholder*="title"]"#)
});

/// What the editor page says about the article being written.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub title: String,
    /// 12-hex-digit article slug from the page path.
    pub article_id: Option<String>,
    pub url: Option<String>,
    /// Edit pages contain `/edit` in their URL.
    pub is_published: bool,
}

/// Extracts article text from an HTML snapshot of the blog editor page.
///
/// The editor is located through a prioritized selector list; its content
/// then goes through the same Markdown pipeline as a plain file.
pub struct HtmlEditorExtractor {
    html: String,
    page_url: Option<String>,
    config: TextConfig,
    converter: Arc<HtmlToMarkdown>,
}

impl HtmlEditorExtractor {
    pub fn new(html: impl Into<String>) -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(vec!["script", "style", "noscript", "iframe", "svg"])
            .build();

        Self {
            html: html.into(),
            page_url: None,
            config: TextConfig::default(),
            converter: Arc::new(converter),
        }
    }

    /// URL the snapshot was taken from, used by [`page_info`](Self::page_info).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn with_config(mut self, config: TextConfig) -> Self {
        self.config = config;
        self
    }

    /// Raw editor content, or `None` when no editor element is present.
    pub fn editor_content(&self) -> Result<Option<String>, AppError> {
        let document = Html::parse_document(&self.html);

        for (css, sel) in EDITOR_SELECTORS.iter().zip(EDITORS.iter()) {
            if let Some(element) = document.select(sel).next() {
                tracing::debug!(selector = *css, "Found editor element");
                return self.element_content(element).map(Some);
            }
        }

        let long_textarea = document
            .select(&TEXTAREA)
            .map(|t| t.text().collect::<String>())
            .find(|value| value.chars().count() > MIN_TEXTAREA_CHARS);
        if long_textarea.is_some() {
            tracing::debug!("Using first long textarea as editor");
        }
        Ok(long_textarea)
    }

    fn element_content(&self, element: ElementRef<'_>) -> Result<String, AppError> {
        if element.value().name() == "textarea" {
            return Ok(element.text().collect());
        }

        let lines: Vec<String> = element
            .select(&CODEMIRROR_LINE)
            .map(|line| line.text().collect())
            .collect();
        if !lines.is_empty() {
            return Ok(lines.join("\n"));
        }

        self.converter
            .convert(&element.html())
            .map_err(|e| AppError::ExtractionError(e.to_string()))
    }

    pub fn page_info(&self) -> PageInfo {
        let document = Html::parse_document(&self.html);
        let title = document
            .select(&TITLE_INPUT)
            .next()
            .and_then(|input| input.value().attr("value"))
            .unwrap_or_default()
            .to_string();

        let parsed = self.page_url.as_deref().and_then(|u| Url::parse(u).ok());
        let article_id = parsed.as_ref().and_then(|u| {
            u.path_segments()?
                .find(|s| s.len() == 12 && s.chars().all(|c| matches!(c, 'a'..='f' | '0'..='9')))
                .map(str::to_string)
        });
        let is_published = !self
            .page_url
            .as_deref()
            .is_some_and(|u| u.contains("/edit"));

        PageInfo {
            title,
            article_id,
            url: self.page_url.clone(),
            is_published,
        }
    }
}

impl TextExtractor for HtmlEditorExtractor {
    fn extract_text(&self) -> Result<String, AppError> {
        let content = self
            .editor_content()?
            .ok_or_else(|| AppError::ExtractionError("エディターが見つかりませんでした".into()))?;
        MarkdownExtractor::with_config(content, self.config.clone()).extract_text()
    }
}
