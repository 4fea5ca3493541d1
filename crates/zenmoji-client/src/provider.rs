use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;
use zenmoji_core::error::AppError;
use zenmoji_core::models::ProviderKind;
use zenmoji_core::traits::{Provider, ProviderFactory};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TEMPERATURE: f32 = 0.7;
const PROBE_MAX_TOKENS: u32 = 50;
const ANTHROPIC_VERSION: &str = "2023-06-01";
const SYSTEM_PROMPT: &str = "あなたは記事の内容に最適な絵文字を提案する専門家です。必ずJSON形式で回答してください。";

/// Default API root for each backend.
pub fn default_base_url(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "https://api.openai.com/v1",
        ProviderKind::Claude => "https://api.anthropic.com/v1",
        ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
    }
}

/// Default output-token cap for each backend.
pub fn default_max_tokens(kind: ProviderKind) -> u32 {
    match kind {
        ProviderKind::OpenAi => 500,
        ProviderKind::Claude | ProviderKind::Gemini => 300,
    }
}

/// Per-call knobs shared by every backend.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Overrides the backend's default token cap.
    pub max_tokens: Option<u32>,
    pub temperature: f32,
    /// Overrides the backend's API root (proxies, tests).
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: DEFAULT_TEMPERATURE,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// reqwest client for the three supported LLM APIs.
///
/// The [`ProviderKind`] picks endpoint, auth headers and envelope; each
/// [`complete`](Provider::complete) call makes exactly one request.
#[derive(Clone)]
pub struct HttpProvider {
    client: Client,
    kind: ProviderKind,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    timeout_secs: u64,
}

impl HttpProvider {
    pub fn new(kind: ProviderKind, api_key: &str, model: &str) -> Result<Self, AppError> {
        Self::with_options(kind, api_key, model, &ProviderOptions::default())
    }

    pub fn with_options(
        kind: ProviderKind,
        api_key: &str,
        model: &str,
        options: &ProviderOptions,
    ) -> Result<Self, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError(format!(
                "{} API key is not set",
                kind.display_name()
            )));
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        let base_url = options
            .base_url
            .as_deref()
            .unwrap_or(default_base_url(kind))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            kind,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url,
            max_tokens: options.max_tokens.unwrap_or(default_max_tokens(kind)),
            temperature: options.temperature,
            // whole seconds, rounded up
            timeout_secs: options.timeout.as_secs() + u64::from(options.timeout.subsec_nanos() > 0),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Endpoint URL. Gemini carries the API key as a query parameter.
    fn endpoint(&self) -> Result<Url, AppError> {
        let raw = match self.kind {
            ProviderKind::OpenAi => format!("{}/chat/completions", self.base_url),
            ProviderKind::Claude => format!("{}/messages", self.base_url),
            ProviderKind::Gemini => {
                format!("{}/models/{}:generateContent", self.base_url, self.model)
            }
        };
        let mut url = Url::parse(&raw)
            .map_err(|e| AppError::ConfigError(format!("Invalid base URL '{raw}': {e}")))?;
        if self.kind == ProviderKind::Gemini {
            url.query_pairs_mut().append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    fn request_body(&self, prompt: &str) -> RequestBody {
        match self.kind {
            ProviderKind::OpenAi => RequestBody::Chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: SYSTEM_PROMPT.to_string(),
                    },
                    ChatMessage {
                        role: "user",
                        content: prompt.to_string(),
                    },
                ],
                max_tokens: self.max_tokens,
                temperature: self.temperature,
            }),
            ProviderKind::Claude => RequestBody::Messages(MessagesRequest {
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt.to_string(),
                }],
            }),
            ProviderKind::Gemini => RequestBody::Generate(GenerateRequest {
                contents: vec![GeminiContent {
                    parts: vec![GeminiPart {
                        text: prompt.to_string(),
                    }],
                }],
                generation_config: GenerationConfig {
                    temperature: self.temperature,
                    max_output_tokens: self.max_tokens,
                    response_mime_type: "application/json",
                },
            }),
        }
    }
}

// ---- Wire types ----

#[derive(Serialize)]
#[serde(untagged)]
enum RequestBody {
    Chat(ChatRequest),
    Messages(MessagesRequest),
    Generate(GenerateRequest),
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Pull the model's text out of a 2xx envelope.
fn response_text(kind: ProviderKind, body: &str) -> Result<String, AppError> {
    let text = match kind {
        ProviderKind::OpenAi => serde_json::from_str::<ChatResponse>(body)?
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content),
        ProviderKind::Claude => serde_json::from_str::<MessagesResponse>(body)?
            .content
            .into_iter()
            .next()
            .and_then(|b| b.text),
        ProviderKind::Gemini => serde_json::from_str::<GenerateResponse>(body)?
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text),
    };

    text.filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::EmptyResponse(kind.display_name().to_string()))
}

/// Prefer the provider's `error.message` over the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

impl Provider for HttpProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        let url = self.endpoint()?;
        let provider = self.kind.display_name();
        tracing::debug!(provider, model = %self.model, "Sending provider request");

        let request = self.client.post(url).json(&self.request_body(prompt));
        let request = match self.kind {
            ProviderKind::OpenAi => {
                request.header("Authorization", format!("Bearer {}", self.api_key))
            }
            ProviderKind::Claude => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            ProviderKind::Gemini => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::HttpError(format!("Failed to read response body: {e}"))
            }
        })?;

        if !status.is_success() {
            return Err(AppError::ProviderError {
                provider: provider.to_string(),
                status: status.as_u16(),
                body: error_message(&body),
            });
        }

        response_text(self.kind, &body)
    }
}

/// Creates [`HttpProvider`]s sharing one API key and option set.
#[derive(Clone)]
pub struct HttpProviderFactory {
    api_key: String,
    options: ProviderOptions,
}

impl HttpProviderFactory {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            options: ProviderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProviderOptions) -> Self {
        self.options = options;
        self
    }
}

impl ProviderFactory for HttpProviderFactory {
    type Provider = HttpProvider;

    fn create(&self, kind: ProviderKind, model: &str) -> Result<HttpProvider, AppError> {
        HttpProvider::with_options(kind, &self.api_key, model, &self.options)
    }

    fn create_probe(&self, kind: ProviderKind, model: &str) -> Result<HttpProvider, AppError> {
        let options = ProviderOptions {
            max_tokens: Some(PROBE_MAX_TOKENS),
            ..self.options.clone()
        };
        HttpProvider::with_options(kind, &self.api_key, model, &options)
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, header};
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;

    fn provider(kind: ProviderKind) -> HttpProvider {
        HttpProvider::new(kind, "test-key", kind.default_model()).unwrap()
    }

    fn body_json(kind: ProviderKind) -> serde_json::Value {
        serde_json::to_value(provider(kind).request_body("PROMPT")).unwrap()
    }

    /// Serve `app` on a random local port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    /// Answer every request with one canned JSON response.
    async fn serve_canned(status: StatusCode, body: &'static str) -> String {
        serve(Router::new().fallback(move || async move {
            (status, [(header::CONTENT_TYPE, "application/json")], body)
        }))
        .await
    }

    fn local(kind: ProviderKind, base_url: String) -> HttpProvider {
        local_with_timeout(kind, base_url, Duration::from_secs(1))
    }

    fn local_with_timeout(kind: ProviderKind, base_url: String, timeout: Duration) -> HttpProvider {
        let options = ProviderOptions {
            base_url: Some(base_url),
            timeout,
            ..ProviderOptions::default()
        };
        HttpProvider::with_options(kind, "test-key", kind.default_model(), &options).unwrap()
    }

    #[test]
    fn openai_body_has_system_and_user_messages() {
        let body = body_json(ProviderKind::OpenAi);
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "PROMPT");
        assert_eq!(body["max_tokens"], 500);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn claude_body_has_single_user_message() {
        let body = body_json(ProviderKind::Claude);
        assert_eq!(body["model"], "claude-3-haiku-20240307");
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["content"], "PROMPT");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn gemini_body_requests_json_output() {
        let body = body_json(ProviderKind::Gemini);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "PROMPT");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 300);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn endpoints_follow_provider_conventions() {
        assert_eq!(
            provider(ProviderKind::OpenAi).endpoint().unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            provider(ProviderKind::Claude).endpoint().unwrap().as_str(),
            "https://api.anthropic.com/v1/messages"
        );
        assert_eq!(
            provider(ProviderKind::Gemini).endpoint().unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent?key=test-key"
        );
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let err = HttpProvider::new(ProviderKind::Claude, "  ", "m").err().unwrap();
        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("Claude"));
    }

    #[test]
    fn response_text_reads_each_envelope() {
        let openai = json!({"choices": [{"message": {"content": "A"}}]}).to_string();
        let claude = json!({"content": [{"type": "text", "text": "B"}]}).to_string();
        let gemini = json!({"candidates": [{"content": {"parts": [{"text": "C"}]}}]}).to_string();

        assert_eq!(response_text(ProviderKind::OpenAi, &openai).unwrap(), "A");
        assert_eq!(response_text(ProviderKind::Claude, &claude).unwrap(), "B");
        assert_eq!(response_text(ProviderKind::Gemini, &gemini).unwrap(), "C");
    }

    #[test]
    fn missing_text_is_empty_response() {
        let err = response_text(ProviderKind::Gemini, r#"{"candidates": []}"#).unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse(ref p) if p == "Gemini"));

        let err = response_text(ProviderKind::OpenAi, r#"{"choices": [{"message": {"content": null}}]}"#)
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse(_)));
    }

    #[test]
    fn error_message_prefers_api_detail() {
        assert_eq!(error_message(r#"{"error": {"message": "bad key"}}"#), "bad key");
        assert_eq!(error_message("gateway down"), "gateway down");
    }

    #[test]
    fn probe_caps_output_tokens() {
        let factory = HttpProviderFactory::new("k");
        let probe = factory.create_probe(ProviderKind::OpenAi, "gpt-4o-mini").unwrap();
        assert_eq!(probe.max_tokens, 50);
        assert_eq!(probe.model(), "gpt-4o-mini");
        let normal = factory.create(ProviderKind::OpenAi, "gpt-4o-mini").unwrap();
        assert_eq!(normal.max_tokens, 500);
    }

    #[tokio::test]
    async fn successful_call_returns_text() {
        let base = serve_canned(
            StatusCode::OK,
            r#"{"content": [{"type": "text", "text": "{\"main\": 1}"}]}"#,
        )
        .await;
        let text = local(ProviderKind::Claude, base).complete("hi").await.unwrap();
        assert_eq!(text, r#"{"main": 1}"#);
    }

    #[tokio::test]
    async fn non_success_status_is_provider_error() {
        let base = serve_canned(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "slow down"}}"#,
        )
        .await;
        let err = local(ProviderKind::OpenAi, base).complete("hi").await.unwrap_err();
        match err {
            AppError::ProviderError { provider, status, body } => {
                assert_eq!(provider, "OpenAI");
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn claude_request_carries_key_and_version_headers() {
        let app = Router::new().fallback(|headers: HeaderMap| async move {
            let value = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            };
            let text = format!("{}|{}", value("x-api-key"), value("anthropic-version"));
            axum::Json(json!({"content": [{"type": "text", "text": text}]}))
        });
        let base = serve(app).await;

        let text = local(ProviderKind::Claude, base).complete("hi").await.unwrap();
        assert_eq!(text, "test-key|2023-06-01");
    }

    /// Never answers within the client timeout.
    fn stalled() -> Router {
        Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        })
    }

    #[tokio::test]
    async fn unresponsive_server_times_out() {
        let base = serve(stalled()).await;

        let err = local(ProviderKind::Gemini, base).complete("hi").await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(1)));
    }

    #[tokio::test]
    async fn sub_second_timeout_reports_whole_second() {
        let base = serve(stalled()).await;

        let err = local_with_timeout(ProviderKind::OpenAi, base, Duration::from_millis(300))
            .complete("hi")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(1)), "{err}");
    }
}
