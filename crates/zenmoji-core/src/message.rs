//! Action-tagged request/response contract used by UI front-ends.
//!
//! Requests look like `{"action": "generateEmojiSuggestions", "text": "..."}`
//! and every response carries a `success` flag; failures carry `error`.

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;
use crate::clock::Clock;
use crate::error::AppError;
use crate::models::{FavoriteEmoji, HistoryEntry, SuggestionSet};
use crate::suggest::SuggestionService;
use crate::traits::{ProviderFactory, SuggestionStore};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum MessageRequest {
    GenerateEmojiSuggestions { text: String },
    SaveToFavorites { emoji: String, reason: String },
    GetFavorites,
    RemoveFavorite { emoji: String },
    ClearFavorites,
    GetHistory,
    ClearHistory,
    ClearCache,
    GetCacheStats,
}

impl MessageRequest {
    /// Decode a raw message, naming the action when it is not recognised.
    pub fn from_value(value: serde_json::Value) -> Result<Self, String> {
        let action = value
            .get("action")
            .and_then(|a| a.as_str())
            .map(str::to_string);
        serde_json::from_value(value).map_err(|e| match action {
            Some(action) if !KNOWN_ACTIONS.contains(&action.as_str()) => {
                format!("不明なアクション: {action}")
            }
            Some(_) => format!("invalid message: {e}"),
            None => "message has no action".to_string(),
        })
    }
}

const KNOWN_ACTIONS: [&str; 9] = [
    "generateEmojiSuggestions",
    "saveToFavorites",
    "getFavorites",
    "removeFavorite",
    "clearFavorites",
    "getHistory",
    "clearHistory",
    "clearCache",
    "getCacheStats",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<SuggestionSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorites: Option<Vec<FavoriteEmoji>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CacheStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Dispatch one request. Never fails: errors become `{success: false}`.
pub async fn handle_message<F, S, C>(
    service: &SuggestionService<F, S, C>,
    request: MessageRequest,
) -> MessageResponse
where
    F: ProviderFactory,
    S: SuggestionStore,
    C: Clock,
{
    match dispatch(service, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Message handling failed");
            MessageResponse::failure(e.to_string())
        }
    }
}

/// Decode and dispatch a raw JSON message.
pub async fn handle_json<F, S, C>(
    service: &SuggestionService<F, S, C>,
    value: serde_json::Value,
) -> MessageResponse
where
    F: ProviderFactory,
    S: SuggestionStore,
    C: Clock,
{
    match MessageRequest::from_value(value) {
        Ok(request) => handle_message(service, request).await,
        Err(error) => MessageResponse::failure(error),
    }
}

async fn dispatch<F, S, C>(
    service: &SuggestionService<F, S, C>,
    request: MessageRequest,
) -> Result<MessageResponse, AppError>
where
    F: ProviderFactory,
    S: SuggestionStore,
    C: Clock,
{
    let store = service.store();
    let response = match request {
        MessageRequest::GenerateEmojiSuggestions { text } => MessageResponse {
            suggestions: Some(service.generate(&text).await?),
            ..MessageResponse::ok()
        },
        MessageRequest::SaveToFavorites { emoji, reason } => {
            store.save_favorite(&emoji, &reason).await?;
            MessageResponse::ok()
        }
        MessageRequest::GetFavorites => MessageResponse {
            favorites: Some(store.get_favorites().await?),
            ..MessageResponse::ok()
        },
        MessageRequest::RemoveFavorite { emoji } => {
            store.remove_favorite(&emoji).await?;
            MessageResponse::ok()
        }
        MessageRequest::ClearFavorites => {
            store.clear_favorites().await?;
            MessageResponse::ok()
        }
        MessageRequest::GetHistory => MessageResponse {
            history: Some(store.get_history().await?),
            ..MessageResponse::ok()
        },
        MessageRequest::ClearHistory => {
            store.clear_history().await?;
            MessageResponse::ok()
        }
        MessageRequest::ClearCache => {
            service.clear_cache().await?;
            MessageResponse::ok()
        }
        MessageRequest::GetCacheStats => MessageResponse {
            stats: Some(service.cache_stats()),
            ..MessageResponse::ok()
        },
    };
    Ok(response)
}
