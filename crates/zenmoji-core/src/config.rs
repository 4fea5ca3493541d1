use std::time::Duration;

use crate::cache::CacheConfig;
use crate::error::AppError;
use crate::rate_limiter::RateLimitConfig;

/// Tuning for [`SuggestionService`](crate::suggest::SuggestionService).
#[derive(Debug, Clone)]
pub struct SuggestConfig {
    /// Total provider attempts per request (not additional retries).
    pub max_retries: u32,
    /// Delay before attempt `n + 1` is `base_delay * n`.
    pub base_delay: Duration,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl SuggestConfig {
    /// Read overrides from environment variables, falling back to defaults.
    ///
    /// - `ZENMOJI_MAX_RETRIES`
    /// - `ZENMOJI_RETRY_BASE_MS`
    /// - `ZENMOJI_RATE_LIMIT`
    /// - `ZENMOJI_RATE_WINDOW_MS`
    /// - `ZENMOJI_CACHE_TTL_SECS`
    /// - `ZENMOJI_CACHE_MAX_ENTRIES`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let get = |name: &str| -> Result<Option<u64>, AppError> {
            match lookup(name) {
                None => Ok(None),
                Some(raw) => {
                    let parsed: u64 = raw.trim().parse().map_err(|_| {
                        AppError::ConfigError(format!(
                            "Invalid {name} '{raw}': must be a positive integer"
                        ))
                    })?;
                    if parsed == 0 {
                        return Err(AppError::ConfigError(format!("{name} must be at least 1")));
                    }
                    Ok(Some(parsed))
                }
            }
        };

        Ok(Self {
            max_retries: get("ZENMOJI_MAX_RETRIES")?
                .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
                .unwrap_or(defaults.max_retries),
            base_delay: get("ZENMOJI_RETRY_BASE_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            rate_limit: RateLimitConfig {
                max_requests: get("ZENMOJI_RATE_LIMIT")?
                    .map(|v| v as usize)
                    .unwrap_or(defaults.rate_limit.max_requests),
                window: get("ZENMOJI_RATE_WINDOW_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.rate_limit.window),
            },
            cache: CacheConfig {
                ttl: get("ZENMOJI_CACHE_TTL_SECS")?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.cache.ttl),
                max_entries: get("ZENMOJI_CACHE_MAX_ENTRIES")?
                    .map(|v| v as usize)
                    .unwrap_or(defaults.cache.max_entries),
            },
        })
    }

    /// Backoff before the attempt following attempt `n` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}
