pub mod config;
pub mod file_store;

pub use config::StoreConfig;
pub use file_store::{FAVORITES_LIMIT, HISTORY_LIMIT, JsonFileStore};
