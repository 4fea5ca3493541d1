use chrono::{Duration, Utc};
use zenmoji_core::models::{CacheEntry, ProviderKind, Settings};
use zenmoji_core::traits::SuggestionStore;
use zenmoji_store::{FAVORITES_LIMIT, HISTORY_LIMIT, JsonFileStore};

use crate::integration::common::{setup_test_store, suggestion_set};

#[tokio::test]
async fn settings_round_trip_and_survive_reopen() {
    let (store, _dir) = setup_test_store();
    let settings = Settings {
        api_type: ProviderKind::Claude,
        api_model: Some("claude-3-5-sonnet-latest".into()),
        enable_cache: false,
        enable_history: true,
    };

    store.save_settings(&settings).await.unwrap();

    let reopened = JsonFileStore::new(store.path());
    assert_eq!(reopened.get_settings().await.unwrap(), settings);
}

#[tokio::test]
async fn history_is_newest_first_and_capped() {
    let (store, _dir) = setup_test_store();

    for i in 0..HISTORY_LIMIT + 5 {
        store
            .save_history(&suggestion_set("🔦"), &format!("hash-{i}"))
            .await
            .unwrap();
    }

    let history = store.get_history().await.unwrap();
    assert_eq!(history.len(), HISTORY_LIMIT);
    assert_eq!(history[0].text_hash, format!("hash-{}", HISTORY_LIMIT + 4));
    assert_eq!(history.last().unwrap().text_hash, "hash-5");

    store.clear_history().await.unwrap();
    assert!(store.get_history().await.unwrap().is_empty());
}

#[tokio::test]
async fn favorites_are_deduplicated_by_emoji() {
    let (store, _dir) = setup_test_store();

    store.save_favorite("🔥", "熱い").await.unwrap();
    store.save_favorite("🌋", "噴火").await.unwrap();
    store.save_favorite("🔥", "別の理由").await.unwrap();

    let favorites = store.get_favorites().await.unwrap();
    assert_eq!(favorites.len(), 2);
    assert_eq!(favorites[0].emoji, "🌋");
    assert_eq!(favorites[1].reason, "熱い");

    store.remove_favorite("🌋").await.unwrap();
    let favorites = store.get_favorites().await.unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].emoji, "🔥");

    store.clear_favorites().await.unwrap();
    assert!(store.get_favorites().await.unwrap().is_empty());
}

#[tokio::test]
async fn favorites_are_capped() {
    let (store, _dir) = setup_test_store();
    let emojis: Vec<char> = ('\u{1F600}'..='\u{1F64F}').take(FAVORITES_LIMIT + 3).collect();

    for emoji in &emojis {
        store.save_favorite(&emoji.to_string(), "理由").await.unwrap();
    }

    let favorites = store.get_favorites().await.unwrap();
    assert_eq!(favorites.len(), FAVORITES_LIMIT);
    assert_eq!(favorites[0].emoji, emojis.last().unwrap().to_string());
}

#[tokio::test]
async fn cache_entries_are_replaced_wholesale() {
    let (store, _dir) = setup_test_store();
    let now = Utc::now();
    let entry = |key: &str| CacheEntry {
        key: key.into(),
        data: suggestion_set("🔦"),
        created_at: now,
        expires_at: now + Duration::hours(24),
    };

    store.save_cache(&[entry("a"), entry("b")]).await.unwrap();
    assert_eq!(store.load_cache().await.unwrap().len(), 2);

    store.save_cache(&[entry("c")]).await.unwrap();
    let cached = store.load_cache().await.unwrap();
    assert_eq!(cached, vec![entry("c")]);
}

#[tokio::test]
async fn sections_do_not_clobber_each_other() {
    let (store, _dir) = setup_test_store();

    store.save_favorite("🔥", "熱い").await.unwrap();
    store.save_history(&suggestion_set("🔦"), "h").await.unwrap();
    store.clear_history().await.unwrap();

    assert_eq!(store.get_favorites().await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_writers_keep_every_entry() {
    let (store, _dir) = setup_test_store();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .save_history(&suggestion_set("🔦"), &format!("h{i}"))
                    .await
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.get_history().await.unwrap().len(), 10);
    assert!(!store.path().with_file_name("zenmoji-store.json.tmp").exists());
}
