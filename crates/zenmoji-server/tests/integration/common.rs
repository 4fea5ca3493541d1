use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use tower::ServiceExt;

use zenmoji_core::SuggestConfig;
use zenmoji_core::suggest::SuggestionService;
use zenmoji_core::testutil::{MockProvider, MockProviderFactory, MockStore};
use zenmoji_server::routes;
use zenmoji_server::state::{AppState, SuggestionBackend};

pub const TEST_TOKEN: &str = "test-server-token";

pub const STUB_RESPONSE: &str = r#"{"main":{"emoji":"🔦","reason":"記事の核心を照らす"},"sub":[{"emoji":"🌋","reason":"熱量のある技術解説"},{"emoji":"🦉","reason":"知見の共有"}]}"#;

pub const ARTICLE: &str = "これはテスト記事です。技術について書いています。";

pub struct TestApp {
    pub router: Router,
    pub provider: MockProvider,
    pub store: MockStore,
}

fn build(provider: MockProvider, config: SuggestConfig, token: Option<&str>) -> TestApp {
    let store = MockStore::empty();
    let service = SuggestionService::new(
        MockProviderFactory::new(provider.clone()),
        store.clone(),
        config,
    );
    let state = Arc::new(AppState {
        backend: Arc::new(service),
        server_token: token.map(str::to_string),
    });

    TestApp {
        router: routes::router(state),
        provider,
        store,
    }
}

/// Router backed by a stub provider, open access.
pub fn setup_test_app() -> TestApp {
    build(MockProvider::new(STUB_RESPONSE), SuggestConfig::default(), None)
}

/// Router that requires `TEST_TOKEN`.
pub fn setup_test_app_with_token() -> TestApp {
    build(
        MockProvider::new(STUB_RESPONSE),
        SuggestConfig::default(),
        Some(TEST_TOKEN),
    )
}

pub fn setup_test_app_with(provider: MockProvider, config: SuggestConfig) -> TestApp {
    build(provider, config, None)
}

/// Router over an arbitrary backend, open access.
pub fn router_for(backend: Arc<dyn SuggestionBackend>) -> Router {
    routes::router(Arc::new(AppState {
        backend,
        server_token: None,
    }))
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Send one request through a clone of the router.
pub async fn send(router: &Router, request: Request<Body>) -> axum::response::Response {
    router.clone().oneshot(request).await.unwrap()
}
