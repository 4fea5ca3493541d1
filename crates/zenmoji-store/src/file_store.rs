use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;
use zenmoji_core::error::AppError;
use zenmoji_core::models::{CacheEntry, FavoriteEmoji, HistoryEntry, Settings, SuggestionSet};
use zenmoji_core::traits::SuggestionStore;

use crate::config::StoreConfig;

/// Most recent generations kept in history.
pub const HISTORY_LIMIT: usize = 20;

/// Most favorites kept.
pub const FAVORITES_LIMIT: usize = 30;

/// The whole store as it is laid out on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoreDocument {
    settings: Settings,
    history: Vec<HistoryEntry>,
    favorites: Vec<FavoriteEmoji>,
    cache: Vec<CacheEntry>,
}

/// Key-value store backed by a single JSON file.
///
/// Every mutation is a read-modify-write of the whole document under one
/// async lock, written to a sibling temp file and renamed into place.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreDocument, AppError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(StoreDocument::default()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                AppError::StorageError(format!(
                    "Corrupt store file {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(AppError::StorageError(format!(
                "Failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write(&self, document: &StoreDocument) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::StorageError(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            AppError::StorageError(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::StorageError(format!(
                "Failed to replace {}: {e}",
                self.path.display()
            ))
        })?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Wrote store file");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "zenmoji-store.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read the document under the lock, apply `change`, write it back.
    async fn update<T>(
        &self,
        change: impl FnOnce(&mut StoreDocument) -> T,
    ) -> Result<T, AppError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read().await?;
        let result = change(&mut document);
        self.write(&document).await?;
        Ok(result)
    }

    async fn snapshot(&self) -> Result<StoreDocument, AppError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }
}

impl SuggestionStore for JsonFileStore {
    async fn get_settings(&self) -> Result<Settings, AppError> {
        Ok(self.snapshot().await?.settings)
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), AppError> {
        let settings = settings.clone();
        self.update(|doc| doc.settings = settings).await
    }

    async fn save_history(&self, suggestions: &SuggestionSet, text_hash: &str) -> Result<(), AppError> {
        let entry = HistoryEntry {
            id: Uuid::new_v4(),
            suggestions: suggestions.clone(),
            text_hash: text_hash.to_string(),
            timestamp: Utc::now(),
        };
        self.update(|doc| {
            doc.history.insert(0, entry);
            doc.history.truncate(HISTORY_LIMIT);
        })
        .await
    }

    async fn get_history(&self) -> Result<Vec<HistoryEntry>, AppError> {
        Ok(self.snapshot().await?.history)
    }

    async fn clear_history(&self) -> Result<(), AppError> {
        self.update(|doc| doc.history.clear()).await
    }

    async fn save_favorite(&self, emoji: &str, reason: &str) -> Result<(), AppError> {
        let favorite = FavoriteEmoji {
            emoji: emoji.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        };
        let added = self
            .update(|doc| {
                if doc.favorites.iter().any(|f| f.emoji == favorite.emoji) {
                    return false;
                }
                doc.favorites.insert(0, favorite);
                doc.favorites.truncate(FAVORITES_LIMIT);
                true
            })
            .await?;
        if !added {
            tracing::debug!(emoji, "Favorite already saved");
        }
        Ok(())
    }

    async fn get_favorites(&self) -> Result<Vec<FavoriteEmoji>, AppError> {
        Ok(self.snapshot().await?.favorites)
    }

    async fn remove_favorite(&self, emoji: &str) -> Result<(), AppError> {
        self.update(|doc| doc.favorites.retain(|f| f.emoji != emoji))
            .await
    }

    async fn clear_favorites(&self) -> Result<(), AppError> {
        self.update(|doc| doc.favorites.clear()).await
    }

    async fn load_cache(&self) -> Result<Vec<CacheEntry>, AppError> {
        Ok(self.snapshot().await?.cache)
    }

    async fn save_cache(&self, entries: &[CacheEntry]) -> Result<(), AppError> {
        let entries = entries.to_vec();
        self.update(|doc| doc.cache = entries).await
    }
}
