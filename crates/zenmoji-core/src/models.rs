use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A single emoji proposal with the model's justification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub emoji: String,
    pub reason: String,
}

impl Suggestion {
    pub fn new(emoji: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            emoji: emoji.into(),
            reason: reason.into(),
        }
    }
}

/// The normalized result handed back to the UI: one main emoji and two
/// alternatives.
///
/// `is_fallback` and `error_message` are only set when the set was produced
/// by the failure path, and are omitted from the JSON form otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionSet {
    pub main: Suggestion,
    pub sub: Vec<Suggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fallback: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SuggestionSet {
    pub fn new(main: Suggestion, first: Suggestion, second: Suggestion) -> Self {
        Self {
            main,
            sub: vec![first, second],
            is_fallback: None,
            error_message: None,
        }
    }

    /// Mark this set as a fallback carrying the error that caused it.
    pub fn into_fallback(mut self, error_message: impl Into<String>) -> Self {
        self.is_fallback = Some(true);
        self.error_message = Some(error_message.into());
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.is_fallback.unwrap_or(false)
    }

    /// All emoji in display order (main first).
    pub fn emojis(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.main.emoji.as_str()).chain(self.sub.iter().map(|s| s.emoji.as_str()))
    }
}

/// A cached suggestion set keyed by content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub data: SuggestionSet,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A past generation, newest first in the history list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub suggestions: SuggestionSet,
    pub text_hash: String,
    pub timestamp: DateTime<Utc>,
}

/// An emoji the user pinned for later reuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEmoji {
    pub emoji: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// Which LLM backend to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Chat-completions API.
    OpenAi,
    /// Messages API.
    Claude,
    /// Generate-content API.
    #[default]
    Gemini,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [ProviderKind::OpenAi, ProviderKind::Claude, ProviderKind::Gemini];

    /// Human-readable provider name used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Claude => "Claude",
            ProviderKind::Gemini => "Gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-3.5-turbo",
            ProviderKind::Claude => "claude-3-haiku-20240307",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Claude => write!(f, "claude"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!("Unsupported provider: {other}")),
        }
    }
}

/// User settings read from the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_type: ProviderKind,
    pub api_model: Option<String>,
    pub enable_cache: bool,
    pub enable_history: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_type: ProviderKind::Gemini,
            api_model: None,
            enable_cache: true,
            enable_history: true,
        }
    }
}

impl Settings {
    /// Configured model, or the provider's default when none is set.
    pub fn model(&self) -> &str {
        self.api_model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.api_type.default_model())
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
