use std::future::Future;

use crate::error::AppError;
use crate::models::{
    CacheEntry, FavoriteEmoji, HistoryEntry, ProviderKind, Settings, SuggestionSet,
};

/// Produces the article text to analyse (editor page, Markdown file, ...).
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self) -> Result<String, AppError>;
}

/// Sends a prompt to an LLM and returns its raw text output.
///
/// Implementations perform exactly one outbound call per invocation and
/// never retry internally.
pub trait Provider: Send + Sync + Clone {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Factory for creating Provider instances for a given backend and model.
///
/// Settings are re-read on every request, so the backend may change
/// between two generations.
pub trait ProviderFactory: Send + Sync + Clone {
    type Provider: Provider;

    fn create(&self, kind: ProviderKind, model: &str) -> Result<Self::Provider, AppError>;

    /// Provider used for a connectivity check. Implementations may cap
    /// output tokens since the answer is discarded.
    fn create_probe(&self, kind: ProviderKind, model: &str) -> Result<Self::Provider, AppError> {
        self.create(kind, model)
    }
}

/// Persists settings, history, favorites and cache entries.
pub trait SuggestionStore: Send + Sync + Clone {
    fn get_settings(&self) -> impl Future<Output = Result<Settings, AppError>> + Send;

    fn save_settings(
        &self,
        settings: &Settings,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Prepend a generation to the history list (capped).
    fn save_history(
        &self,
        suggestions: &SuggestionSet,
        text_hash: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// History entries, newest first.
    fn get_history(&self) -> impl Future<Output = Result<Vec<HistoryEntry>, AppError>> + Send;

    fn clear_history(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Prepend a favorite unless the emoji is already saved (capped).
    fn save_favorite(
        &self,
        emoji: &str,
        reason: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn get_favorites(&self) -> impl Future<Output = Result<Vec<FavoriteEmoji>, AppError>> + Send;

    fn remove_favorite(&self, emoji: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    fn clear_favorites(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    fn load_cache(&self) -> impl Future<Output = Result<Vec<CacheEntry>, AppError>> + Send;

    fn save_cache(
        &self,
        entries: &[CacheEntry],
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A no-op SuggestionStore for use when persistence is not needed.
#[derive(Debug, Clone)]
pub struct NullStore;

impl SuggestionStore for NullStore {
    async fn get_settings(&self) -> Result<Settings, AppError> {
        Ok(Settings::default())
    }

    async fn save_settings(&self, _settings: &Settings) -> Result<(), AppError> {
        Ok(())
    }

    async fn save_history(&self, _suggestions: &SuggestionSet, _text_hash: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn get_history(&self) -> Result<Vec<HistoryEntry>, AppError> {
        Ok(vec![])
    }

    async fn clear_history(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn save_favorite(&self, _emoji: &str, _reason: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn get_favorites(&self) -> Result<Vec<FavoriteEmoji>, AppError> {
        Ok(vec![])
    }

    async fn remove_favorite(&self, _emoji: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn clear_favorites(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn load_cache(&self) -> Result<Vec<CacheEntry>, AppError> {
        Ok(vec![])
    }

    async fn save_cache(&self, _entries: &[CacheEntry]) -> Result<(), AppError> {
        Ok(())
    }
}
