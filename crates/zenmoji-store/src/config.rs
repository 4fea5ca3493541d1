use std::path::PathBuf;

use zenmoji_core::AppError;

const DEFAULT_STORE_PATH: &str = "./zenmoji-store.json";

/// Where the JSON store lives on disk.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl StoreConfig {
    /// Read configuration from environment variables.
    ///
    /// - `ZENMOJI_STORE_PATH` (optional, defaults to `./zenmoji-store.json`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_value(std::env::var("ZENMOJI_STORE_PATH").ok())
    }

    fn from_value(raw: Option<String>) -> Result<Self, AppError> {
        match raw {
            None => Ok(Self::default()),
            Some(raw) if raw.trim().is_empty() => Err(AppError::ConfigError(
                "ZENMOJI_STORE_PATH is set but empty".into(),
            )),
            Some(raw) => Ok(Self {
                path: PathBuf::from(raw.trim()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_uses_default_path() {
        let config = StoreConfig::from_value(None).unwrap();
        assert_eq!(config.path, PathBuf::from("./zenmoji-store.json"));
    }

    #[test]
    fn explicit_path_is_used() {
        let config = StoreConfig::from_value(Some(" /tmp/emoji.json ".into())).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/emoji.json"));
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = StoreConfig::from_value(Some("  ".into())).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
