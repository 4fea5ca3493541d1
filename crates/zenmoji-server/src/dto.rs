use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use zenmoji_core::cache::CacheStats;
use zenmoji_core::message::MessageResponse;
use zenmoji_core::models::{FavoriteEmoji, HistoryEntry, Suggestion, SuggestionSet};

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SuggestRequest {
    /// Cleaned article text
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SuggestionResponse {
    pub emoji: String,
    pub reason: String,
}

impl From<Suggestion> for SuggestionResponse {
    fn from(s: Suggestion) -> Self {
        Self {
            emoji: s.emoji,
            reason: s.reason,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionSetResponse {
    pub main: SuggestionResponse,
    pub sub: Vec<SuggestionResponse>,
    /// Present and true when every attempt failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fallback: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<SuggestionSet> for SuggestionSetResponse {
    fn from(set: SuggestionSet) -> Self {
        Self {
            main: set.main.into(),
            sub: set.sub.into_iter().map(Into::into).collect(),
            is_fallback: set.is_fallback,
            error_message: set.error_message,
        }
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Action-tagged message, e.g. `{"action": "getFavorites"}`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MessageBody {
    /// One of generateEmojiSuggestions, saveToFavorites, getFavorites,
    /// removeFavorite, clearFavorites, getHistory, clearHistory, clearCache,
    /// getCacheStats
    pub action: String,
    /// Article text for generateEmojiSuggestions
    pub text: Option<String>,
    /// Emoji for saveToFavorites and removeFavorite
    pub emoji: Option<String>,
    /// Reason for saveToFavorites
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteResponse {
    pub emoji: String,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

impl From<FavoriteEmoji> for FavoriteResponse {
    fn from(f: FavoriteEmoji) -> Self {
        Self {
            emoji: f.emoji,
            reason: f.reason,
            timestamp: f.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub id: Uuid,
    pub suggestions: SuggestionSetResponse,
    pub text_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl From<HistoryEntry> for HistoryResponse {
    fn from(h: HistoryEntry) -> Self {
        Self {
            id: h.id,
            suggestions: h.suggestions.into(),
            text_hash: h.text_hash,
            timestamp: h.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_size_bytes: usize,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(s: CacheStats) -> Self {
        Self {
            total_entries: s.total_entries,
            valid_entries: s.valid_entries,
            expired_entries: s.expired_entries,
            total_size_bytes: s.total_size_bytes,
            oldest_entry: s.oldest_entry,
            newest_entry: s.newest_entry,
        }
    }
}

/// `{success: true, ...payload}` or `{success: false, error}`.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<SuggestionSetResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<FavoriteResponse>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryResponse>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<CacheStatsResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<MessageResponse> for MessageReply {
    fn from(r: MessageResponse) -> Self {
        Self {
            success: r.success,
            suggestions: r.suggestions.map(Into::into),
            favorites: r
                .favorites
                .map(|list| list.into_iter().map(Into::into).collect()),
            history: r
                .history
                .map(|list| list.into_iter().map(Into::into).collect()),
            stats: r.stats.map(Into::into),
            error: r.error,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
