use tempfile::TempDir;
use zenmoji_core::models::{Suggestion, SuggestionSet};
use zenmoji_store::JsonFileStore;

/// Creates a store inside a fresh temp directory.
///
/// The `TempDir` must be kept in scope for the test duration;
/// dropping it deletes the directory.
pub fn setup_test_store() -> (JsonFileStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = JsonFileStore::new(dir.path().join("nested").join("zenmoji-store.json"));
    (store, dir)
}

pub fn suggestion_set(main: &str) -> SuggestionSet {
    SuggestionSet::new(
        Suggestion::new(main, "メイン"),
        Suggestion::new("🌋", "サブ1"),
        Suggestion::new("🦉", "サブ2"),
    )
}
