use rand::seq::SliceRandom;
use serde::Serialize;

use crate::cache::{CacheStats, SuggestionCache};
use crate::clock::{Clock, SystemClock};
use crate::config::SuggestConfig;
use crate::error::AppError;
use crate::models::{ProviderKind, Settings, Suggestion, SuggestionSet, compute_hash};
use crate::parser;
use crate::prompt::PromptBuilder;
use crate::rate_limiter::RateLimiter;
use crate::traits::{Provider, ProviderFactory, SuggestionStore};
use crate::validator;

/// Article used by [`SuggestionService::test_connection`].
pub const CONNECTION_TEST_TEXT: &str = "これはテスト記事です。技術について書いています。";

/// Orchestrates one suggestion request:
/// rate limit → cache lookup → provider attempts with backoff → cache + history.
///
/// Generic over the provider factory, store and clock so tests can run the
/// whole pipeline without HTTP or wall-clock time.
#[derive(Clone)]
pub struct SuggestionService<F, S, C = SystemClock>
where
    F: ProviderFactory,
    S: SuggestionStore,
    C: Clock,
{
    factory: F,
    store: S,
    prompt: PromptBuilder,
    rate_limiter: RateLimiter<C>,
    cache: SuggestionCache<C>,
    config: SuggestConfig,
}

/// Result of a provider connectivity check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
}

impl<F, S> SuggestionService<F, S, SystemClock>
where
    F: ProviderFactory,
    S: SuggestionStore,
{
    pub fn new(factory: F, store: S, config: SuggestConfig) -> Self {
        Self::with_clock(factory, store, config, SystemClock)
    }
}

impl<F, S, C> SuggestionService<F, S, C>
where
    F: ProviderFactory,
    S: SuggestionStore,
    C: Clock,
{
    pub fn with_clock(factory: F, store: S, config: SuggestConfig, clock: C) -> Self {
        Self {
            factory,
            store,
            prompt: PromptBuilder::new(),
            rate_limiter: RateLimiter::new(config.rate_limit.clone(), clock.clone()),
            cache: SuggestionCache::new(config.cache.clone(), clock),
            config,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &SuggestionCache<C> {
        &self.cache
    }

    /// Load cache entries persisted by the store. Returns how many are live.
    pub async fn restore_cache(&self) -> Result<usize, AppError> {
        let entries = self.store.load_cache().await?;
        self.cache.restore(entries);
        let live = self.cache.stats().valid_entries;
        tracing::debug!(live, "Restored cache entries");
        Ok(live)
    }

    /// Generate suggestions for an article.
    ///
    /// Fails only when the request is rate limited or the provider cannot be
    /// configured. Provider, parse and validation failures are retried and
    /// end in a fallback set with `is_fallback` set.
    pub async fn generate(&self, article_text: &str) -> Result<SuggestionSet, AppError> {
        if !self.rate_limiter.try_acquire() {
            tracing::warn!("Suggestion request rejected by rate limiter");
            return Err(AppError::RateLimitExceeded);
        }

        let settings = self.settings().await;
        let text_hash = compute_hash(article_text);

        if settings.enable_cache {
            if let Some(hit) = self.cache.get(&text_hash) {
                tracing::info!(hash = %&text_hash[..8], "Using cached suggestions");
                return Ok(hit);
            }
        }

        let provider = self.factory.create(settings.api_type, settings.model())?;
        let suggestions = self
            .generate_with_retry(&provider, settings.api_type, article_text)
            .await;

        if suggestions.is_fallback() {
            return Ok(suggestions);
        }

        if settings.enable_cache {
            self.cache.set(&text_hash, suggestions.clone());
            self.persist_cache().await;
        }
        if settings.enable_history {
            if let Err(e) = self.store.save_history(&suggestions, &text_hash).await {
                tracing::warn!(error = %e, "Failed to save history");
            }
        }

        Ok(suggestions)
    }

    /// Run up to `max_retries` attempts, sleeping `base_delay * n` after
    /// failed attempt `n`. Never fails.
    async fn generate_with_retry(
        &self,
        provider: &F::Provider,
        kind: ProviderKind,
        article_text: &str,
    ) -> SuggestionSet {
        let max_attempts = self.config.max_retries.max(1);
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=max_attempts {
            tracing::info!(attempt, max_attempts, provider = %kind, "Calling provider");

            match self.attempt(provider, article_text).await {
                Ok(suggestions) => {
                    tracing::info!(attempt, "Provider call succeeded");
                    return suggestions;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Provider attempt failed");
                    let retryable = e.is_retryable();
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                    if attempt < max_attempts {
                        tokio::time::sleep(self.config.delay_after(attempt)).await;
                    }
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        tracing::warn!(error = %message, "All provider attempts failed, using fallback");
        fallback_suggestions(message)
    }

    /// One provider call followed by parsing and validation.
    async fn attempt(&self, provider: &F::Provider, article_text: &str) -> Result<SuggestionSet, AppError> {
        let prompt = self.prompt.build(article_text);
        let raw = provider.complete(&prompt).await?;

        match parser::parse_value(&raw) {
            Some(candidate) => validator::validate(&candidate).or_else(|e| {
                tracing::debug!(error = %e, "Parsed object rejected, trying field scrape");
                match validate_scraped(&raw) {
                    Some(Ok(suggestions)) => Ok(suggestions),
                    _ => Err(e),
                }
            }),
            None => validate_scraped(&raw).unwrap_or_else(|| {
                Err(AppError::ValidationError(
                    "no JSON object found in model output".into(),
                ))
            }),
        }
    }

    /// Send a short fixed article to a provider and report whether it answered.
    pub async fn test_connection(&self, kind: ProviderKind, model: &str) -> ConnectionReport {
        let result = match self.factory.create_probe(kind, model) {
            Ok(provider) => provider
                .complete(&self.prompt.build(CONNECTION_TEST_TEXT))
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => ConnectionReport {
                success: true,
                message: format!("{} connection test succeeded", kind.display_name()),
            },
            Err(e) => ConnectionReport {
                success: false,
                message: format!("{} connection test failed: {e}", kind.display_name()),
            },
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drop every cache entry, in memory and in the store.
    pub async fn clear_cache(&self) -> Result<usize, AppError> {
        let cleared = self.cache.clear();
        self.store.save_cache(&[]).await?;
        tracing::info!(cleared, "Cleared cache");
        Ok(cleared)
    }

    async fn settings(&self) -> Settings {
        self.store.get_settings().await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read settings, using defaults");
            Settings::default()
        })
    }

    async fn persist_cache(&self) {
        if let Err(e) = self.store.save_cache(&self.cache.entries()).await {
            tracing::warn!(error = %e, "Failed to persist cache");
        }
    }
}

const FALLBACK_POOL: [(&str, &str); 6] = [
    ("📝", "記事作成を表現"),
    ("💡", "アイデアや学びを象徴"),
    ("🚀", "新しい挑戦を表現"),
    ("🔧", "技術的な内容を表現"),
    ("🌟", "特別な内容を強調"),
    ("🎯", "目標達成を表現"),
];

/// Canned suggestions used once every attempt has failed, drawn from a
/// fixed pool in shuffled order and flagged as a fallback.
pub fn fallback_suggestions(error_message: impl Into<String>) -> SuggestionSet {
    let mut pool: Vec<Suggestion> = FALLBACK_POOL
        .iter()
        .map(|(emoji, reason)| Suggestion::new(*emoji, *reason))
        .collect();
    pool.shuffle(&mut rand::rng());

    let mut picked = pool.into_iter();
    match (picked.next(), picked.next(), picked.next()) {
        (Some(main), Some(first), Some(second)) => {
            SuggestionSet::new(main, first, second).into_fallback(error_message)
        }
        _ => parser::parse_failed_set().into_fallback(error_message),
    }
}

/// Validate the regex field scrape of `raw`, if it found any emoji.
fn validate_scraped(raw: &str) -> Option<Result<SuggestionSet, AppError>> {
    let scraped = parser::scrape_fields(raw)?;
    Some(
        serde_json::to_value(&scraped)
            .map_err(AppError::from)
            .and_then(|value| validator::validate(&value)),
    )
}
