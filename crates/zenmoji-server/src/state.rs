use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use zenmoji_core::clock::Clock;
use zenmoji_core::error::AppError;
use zenmoji_core::message::{MessageResponse, handle_json};
use zenmoji_core::models::SuggestionSet;
use zenmoji_core::suggest::SuggestionService;
use zenmoji_core::traits::{ProviderFactory, SuggestionStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe view of a [`SuggestionService`], so handlers do not carry
/// the provider, store and clock type parameters.
pub trait SuggestionBackend: Send + Sync {
    fn suggest<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<SuggestionSet, AppError>>;

    fn handle(&self, message: Value) -> BoxFuture<'_, MessageResponse>;

    /// Succeeds when the backing store can be read.
    fn check_store(&self) -> BoxFuture<'_, Result<(), AppError>>;
}

impl<F, S, C> SuggestionBackend for SuggestionService<F, S, C>
where
    F: ProviderFactory + 'static,
    S: SuggestionStore + 'static,
    C: Clock + 'static,
{
    fn suggest<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<SuggestionSet, AppError>> {
        Box::pin(self.generate(text))
    }

    fn handle(&self, message: Value) -> BoxFuture<'_, MessageResponse> {
        Box::pin(handle_json(self, message))
    }

    fn check_store(&self) -> BoxFuture<'_, Result<(), AppError>> {
        Box::pin(async move { self.store().get_settings().await.map(|_| ()) })
    }
}

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub backend: Arc<dyn SuggestionBackend>,
    /// Bearer token required on `/v1` routes (None = open access).
    pub server_token: Option<String>,
}

/// Server settings read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub server_token: Option<String>,
}

impl ServerConfig {
    /// - `ZENMOJI_SERVER_PORT` (optional, defaults to 3000)
    /// - `ZENMOJI_SERVER_TOKEN` (optional; when set, `/v1` routes require it)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let port = match lookup("ZENMOJI_SERVER_PORT") {
            None => 3000,
            Some(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid ZENMOJI_SERVER_PORT '{raw}': must be a port number"
                ))
            })?,
        };
        let server_token = lookup("ZENMOJI_SERVER_TOKEN").filter(|t| !t.trim().is_empty());

        Ok(Self { port, server_token })
    }
}
