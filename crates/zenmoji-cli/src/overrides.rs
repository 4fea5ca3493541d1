use zenmoji_core::error::AppError;
use zenmoji_core::models::{
    CacheEntry, FavoriteEmoji, HistoryEntry, ProviderKind, Settings, SuggestionSet,
};
use zenmoji_core::traits::SuggestionStore;

/// Store wrapper that applies command-line provider/model flags on top of
/// the saved settings without persisting them.
#[derive(Clone)]
pub struct SettingsOverride<S> {
    inner: S,
    provider: Option<ProviderKind>,
    model: Option<String>,
}

impl<S: SuggestionStore> SettingsOverride<S> {
    pub fn new(inner: S, provider: Option<ProviderKind>, model: Option<String>) -> Self {
        Self {
            inner,
            provider,
            model,
        }
    }

    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(kind) = self.provider {
            if kind != settings.api_type {
                // a saved model belongs to the saved provider
                settings.api_model = None;
            }
            settings.api_type = kind;
        }
        if let Some(model) = &self.model {
            settings.api_model = Some(model.clone());
        }
        settings
    }
}

impl<S: SuggestionStore> SuggestionStore for SettingsOverride<S> {
    async fn get_settings(&self) -> Result<Settings, AppError> {
        Ok(self.apply(self.inner.get_settings().await?))
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), AppError> {
        self.inner.save_settings(settings).await
    }

    async fn save_history(&self, suggestions: &SuggestionSet, text_hash: &str) -> Result<(), AppError> {
        self.inner.save_history(suggestions, text_hash).await
    }

    async fn get_history(&self) -> Result<Vec<HistoryEntry>, AppError> {
        self.inner.get_history().await
    }

    async fn clear_history(&self) -> Result<(), AppError> {
        self.inner.clear_history().await
    }

    async fn save_favorite(&self, emoji: &str, reason: &str) -> Result<(), AppError> {
        self.inner.save_favorite(emoji, reason).await
    }

    async fn get_favorites(&self) -> Result<Vec<FavoriteEmoji>, AppError> {
        self.inner.get_favorites().await
    }

    async fn remove_favorite(&self, emoji: &str) -> Result<(), AppError> {
        self.inner.remove_favorite(emoji).await
    }

    async fn clear_favorites(&self) -> Result<(), AppError> {
        self.inner.clear_favorites().await
    }

    async fn load_cache(&self) -> Result<Vec<CacheEntry>, AppError> {
        self.inner.load_cache().await
    }

    async fn save_cache(&self, entries: &[CacheEntry]) -> Result<(), AppError> {
        self.inner.save_cache(entries).await
    }
}
