use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use zenmoji_client::{HttpProviderFactory, ProviderOptions};
use zenmoji_core::SuggestConfig;
use zenmoji_core::suggest::SuggestionService;
use zenmoji_server::routes;
use zenmoji_server::state::{AppState, ServerConfig};
use zenmoji_store::{JsonFileStore, StoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("zenmoji=info".parse()?))
        .with_target(false)
        .init();

    let server = ServerConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let config = SuggestConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let store = JsonFileStore::from_config(&StoreConfig::from_env().map_err(|e| anyhow::anyhow!(e))?);

    let timeout_secs = match std::env::var("ZENMOJI_TIMEOUT_SECS") {
        Ok(raw) => raw.trim().parse()?,
        Err(_) => 10,
    };
    let options = ProviderOptions {
        base_url: std::env::var("ZENMOJI_BASE_URL").ok(),
        timeout: Duration::from_secs(timeout_secs),
        ..ProviderOptions::default()
    };
    let api_key = std::env::var("ZENMOJI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!("ZENMOJI_API_KEY is not set; generation requests will fail");
    }
    let factory = HttpProviderFactory::new(api_key).with_options(options);

    let service = SuggestionService::new(factory, store.clone(), config);
    match service.restore_cache().await {
        Ok(restored) => tracing::info!(restored, "Restored suggestion cache"),
        Err(e) => tracing::warn!(error = %e, "Could not restore suggestion cache"),
    }

    tracing::info!(
        store = %store.path().display(),
        auth = server.server_token.is_some(),
        "Store ready"
    );

    let state = Arc::new(AppState {
        backend: Arc::new(service),
        server_token: server.server_token,
    });

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", server.port);
    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
