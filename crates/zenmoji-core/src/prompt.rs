use crate::error::AppError;

/// Placeholder replaced by the article text.
pub const TEXT_PLACEHOLDER: &str = "{{TEXT_CONTENT}}";

/// Instruction sent to every provider. The model must answer with the JSON
/// shape shown at the end and nothing else.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"あなたはZenn記事に最適な絵文字を提案するAIです。以下の記事内容を分析し、記事の雰囲気や内容に最も適した絵文字を提案してください。

記事内容:
{{TEXT_CONTENT}}

要件:
- メイン絵文字1つ：記事全体のテーマを表現
- サブ絵文字2つ：異なる視点からの提案
- 3つの絵文字はすべて異なるものにする
- 各絵文字に簡潔な理由を添付
- 必ずJSON形式のみで出力
- 説明文や余計なテキストは不要

出力は以下のJSON形式で出力してください：
{
  "main": { "emoji": "🌸", "reason": "記事のメインテーマを表現する理由" },
  "sub": [
    { "emoji": "🦋", "reason": "サブ提案の理由1" },
    { "emoji": "✨", "reason": "サブ提案の理由2" }
  ]
}"#;

/// Fills the prompt template with article text.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }

    /// Use a custom template. It must contain [`TEXT_PLACEHOLDER`].
    pub fn with_template(template: impl Into<String>) -> Result<Self, AppError> {
        let template = template.into();
        if !template.contains(TEXT_PLACEHOLDER) {
            return Err(AppError::ConfigError(format!(
                "Prompt template must contain {TEXT_PLACEHOLDER}"
            )));
        }
        Ok(Self { template })
    }

    /// Substitute the article text into the first placeholder.
    pub fn build(&self, article_text: &str) -> String {
        self.template.replacen(TEXT_PLACEHOLDER, article_text, 1)
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
