//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CacheEntry, FavoriteEmoji, HistoryEntry, ProviderKind, Settings, SuggestionSet};
use crate::traits::{Provider, ProviderFactory, SuggestionStore};

const HISTORY_LIMIT: usize = 20;
const FAVORITES_LIMIT: usize = 30;

type Responder = Arc<dyn Fn() -> Result<String, AppError> + Send + Sync>;

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

/// Mock provider that replays queued responses and records every call.
#[derive(Clone)]
pub struct MockProvider {
    /// Queue of responses. Each call pops the first element.
    /// When empty, `otherwise` answers.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    otherwise: Responder,
    prompts: Arc<Mutex<Vec<String>>>,
    call_times: Arc<Mutex<Vec<Instant>>>,
}

impl MockProvider {
    /// Provider that answers every call with `raw`.
    pub fn new(raw: &str) -> Self {
        let raw = raw.to_string();
        Self::build(Vec::new(), Arc::new(move || Ok(raw.clone())))
    }

    /// Provider that fails every call with a fresh error from `error`.
    pub fn always_failing(error: impl Fn() -> AppError + Send + Sync + 'static) -> Self {
        Self::build(Vec::new(), Arc::new(move || Err(error())))
    }

    /// Provider that replays `responses` in order, then reports an empty response.
    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self::build(
            responses,
            Arc::new(|| Err(AppError::EmptyResponse("no more mock responses".into()))),
        )
    }

    fn build(responses: Vec<Result<String, AppError>>, otherwise: Responder) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            otherwise,
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Tokio instants of each call (advanced deterministically under paused time).
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }
}

impl Provider for MockProvider {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.call_times.lock().unwrap().push(Instant::now());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            (self.otherwise)()
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockProviderFactory
// ---------------------------------------------------------------------------

/// Mock factory that hands out clones of one [`MockProvider`].
#[derive(Clone)]
pub struct MockProviderFactory {
    provider: MockProvider,
    create_error: Arc<Mutex<Option<AppError>>>,
    created: Arc<Mutex<Vec<(ProviderKind, String)>>>,
}

impl MockProviderFactory {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider,
            create_error: Arc::new(Mutex::new(None)),
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Factory whose next `create` call fails.
    pub fn with_create_error(error: AppError) -> Self {
        Self {
            provider: MockProvider::new("{}"),
            create_error: Arc::new(Mutex::new(Some(error))),
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every `(kind, model)` pair a provider was created for.
    pub fn created(&self) -> Vec<(ProviderKind, String)> {
        self.created.lock().unwrap().clone()
    }
}

impl ProviderFactory for MockProviderFactory {
    type Provider = MockProvider;

    fn create(&self, kind: ProviderKind, model: &str) -> Result<MockProvider, AppError> {
        let mut err = self.create_error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        self.created.lock().unwrap().push((kind, model.to_string()));
        Ok(self.provider.clone())
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory store with public state for assertions.
#[derive(Clone)]
pub struct MockStore {
    pub settings: Arc<Mutex<Settings>>,
    pub history: Arc<Mutex<Vec<HistoryEntry>>>,
    pub favorites: Arc<Mutex<Vec<FavoriteEmoji>>>,
    pub cache: Arc<Mutex<Vec<CacheEntry>>>,
    history_error: Arc<Mutex<Option<AppError>>>,
}

impl MockStore {
    /// Store with default settings and nothing saved.
    pub fn empty() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: Arc::new(Mutex::new(settings)),
            history: Arc::new(Mutex::new(Vec::new())),
            favorites: Arc::new(Mutex::new(Vec::new())),
            cache: Arc::new(Mutex::new(Vec::new())),
            history_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Store whose next `save_history` call fails.
    pub fn with_history_error(error: AppError) -> Self {
        let store = Self::empty();
        *store.history_error.lock().unwrap() = Some(error);
        store
    }
}

impl SuggestionStore for MockStore {
    async fn get_settings(&self) -> Result<Settings, AppError> {
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), AppError> {
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }

    async fn save_history(&self, suggestions: &SuggestionSet, text_hash: &str) -> Result<(), AppError> {
        if let Some(e) = self.history_error.lock().unwrap().take() {
            return Err(e);
        }
        let mut history = self.history.lock().unwrap();
        history.insert(
            0,
            HistoryEntry {
                id: Uuid::new_v4(),
                suggestions: suggestions.clone(),
                text_hash: text_hash.to_string(),
                timestamp: Utc::now(),
            },
        );
        history.truncate(HISTORY_LIMIT);
        Ok(())
    }

    async fn get_history(&self) -> Result<Vec<HistoryEntry>, AppError> {
        Ok(self.history.lock().unwrap().clone())
    }

    async fn clear_history(&self) -> Result<(), AppError> {
        self.history.lock().unwrap().clear();
        Ok(())
    }

    async fn save_favorite(&self, emoji: &str, reason: &str) -> Result<(), AppError> {
        let mut favorites = self.favorites.lock().unwrap();
        if favorites.iter().any(|f| f.emoji == emoji) {
            return Ok(());
        }
        favorites.insert(
            0,
            FavoriteEmoji {
                emoji: emoji.to_string(),
                reason: reason.to_string(),
                timestamp: Utc::now(),
            },
        );
        favorites.truncate(FAVORITES_LIMIT);
        Ok(())
    }

    async fn get_favorites(&self) -> Result<Vec<FavoriteEmoji>, AppError> {
        Ok(self.favorites.lock().unwrap().clone())
    }

    async fn remove_favorite(&self, emoji: &str) -> Result<(), AppError> {
        self.favorites.lock().unwrap().retain(|f| f.emoji != emoji);
        Ok(())
    }

    async fn clear_favorites(&self) -> Result<(), AppError> {
        self.favorites.lock().unwrap().clear();
        Ok(())
    }

    async fn load_cache(&self) -> Result<Vec<CacheEntry>, AppError> {
        Ok(self.cache.lock().unwrap().clone())
    }

    async fn save_cache(&self, entries: &[CacheEntry]) -> Result<(), AppError> {
        *self.cache.lock().unwrap() = entries.to_vec();
        Ok(())
    }
}
