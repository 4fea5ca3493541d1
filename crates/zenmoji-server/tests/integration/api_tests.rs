use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use zenmoji_core::error::AppError;
use zenmoji_core::rate_limiter::RateLimitConfig;
use zenmoji_core::suggest::SuggestionService;
use zenmoji_core::testutil::{MockProvider, MockProviderFactory};
use zenmoji_core::SuggestConfig;
use zenmoji_store::JsonFileStore;

use crate::integration::common::{
    ARTICLE, STUB_RESPONSE, TEST_TOKEN, json_body, post_json, router_for, send, setup_test_app,
    setup_test_app_with, setup_test_app_with_token,
};

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app();

    let response = send(&app.router, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["store"], "ok");
}

#[tokio::test]
async fn corrupt_store_reports_unhealthy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{broken").unwrap();

    let service = SuggestionService::new(
        MockProviderFactory::new(MockProvider::new(STUB_RESPONSE)),
        JsonFileStore::new(&path),
        SuggestConfig::default(),
    );
    let router = router_for(Arc::new(service));

    let response = send(&router, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["status"], "unhealthy");
}

#[tokio::test]
async fn openapi_document_is_public() {
    let app = setup_test_app_with_token();

    let response = send(
        &app.router,
        Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["paths"]["/v1/messages"].is_object());
    assert!(json["paths"]["/v1/suggestions"].is_object());
}

#[tokio::test]
async fn generate_message_returns_suggestions() {
    let app = setup_test_app();

    let response = send(
        &app.router,
        post_json(
            "/v1/messages",
            json!({"action": "generateEmojiSuggestions", "text": ARTICLE}),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["suggestions"]["main"]["emoji"], "🔦");
    assert_eq!(json["suggestions"]["sub"][0]["emoji"], "🌋");
    assert_eq!(json["suggestions"]["sub"][1]["emoji"], "🦉");
    assert!(json["suggestions"].get("isFallback").is_none());
    assert!(json.get("error").is_none());
    assert_eq!(app.provider.call_count(), 1);
    assert_eq!(app.store.history.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_action_is_failure_not_http_error() {
    let app = setup_test_app();

    let response = send(&app.router, post_json("/v1/messages", json!({"action": "explode"}))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "不明なアクション: explode");
}

#[tokio::test]
async fn favorites_round_trip_through_messages() {
    let app = setup_test_app();

    let saved = send(
        &app.router,
        post_json(
            "/v1/messages",
            json!({"action": "saveToFavorites", "emoji": "🦀", "reason": "Rust"}),
        ),
    )
    .await;
    assert_eq!(json_body(saved).await["success"], true);

    let listed = send(&app.router, post_json("/v1/messages", json!({"action": "getFavorites"}))).await;
    let json = json_body(listed).await;
    assert_eq!(json["favorites"][0]["emoji"], "🦀");
    assert_eq!(json["favorites"][0]["reason"], "Rust");

    send(
        &app.router,
        post_json("/v1/messages", json!({"action": "removeFavorite", "emoji": "🦀"})),
    )
    .await;
    let listed = send(&app.router, post_json("/v1/messages", json!({"action": "getFavorites"}))).await;
    assert_eq!(json_body(listed).await["favorites"], json!([]));
}

#[tokio::test]
async fn cache_stats_follow_generation() {
    let app = setup_test_app();

    send(&app.router, post_json("/v1/suggestions", json!({"text": ARTICLE}))).await;

    let response = send(&app.router, post_json("/v1/messages", json!({"action": "getCacheStats"}))).await;
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["stats"]["totalEntries"], 1);
    assert_eq!(json["stats"]["validEntries"], 1);
}

#[tokio::test]
async fn suggestions_endpoint_returns_set() {
    let app = setup_test_app();

    let response = send(&app.router, post_json("/v1/suggestions", json!({"text": ARTICLE}))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["main"]["emoji"], "🔦");
    assert_eq!(json["sub"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rate_limit_maps_to_429() {
    let config = SuggestConfig {
        rate_limit: RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
        },
        ..SuggestConfig::default()
    };
    let app = setup_test_app_with(MockProvider::new(STUB_RESPONSE), config);

    for i in 0..2 {
        let response = send(
            &app.router,
            post_json("/v1/suggestions", json!({"text": format!("{ARTICLE}{i}")})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = send(&app.router, post_json("/v1/suggestions", json!({"text": ARTICLE}))).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"], "rate_limit_exceeded");
    assert_eq!(app.provider.call_count(), 2);
}

#[tokio::test]
async fn provider_failures_become_flagged_fallback() {
    let config = SuggestConfig {
        max_retries: 1,
        ..SuggestConfig::default()
    };
    let provider = MockProvider::always_failing(|| AppError::ProviderError {
        provider: "OpenAI".into(),
        status: 500,
        body: "upstream down".into(),
    });
    let app = setup_test_app_with(provider, config);

    let response = send(&app.router, post_json("/v1/suggestions", json!({"text": ARTICLE}))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["isFallback"], true);
    assert!(json["errorMessage"].as_str().unwrap().contains("upstream down"));
}

#[tokio::test]
async fn missing_token_returns_401() {
    let app = setup_test_app_with_token();

    let response = send(&app.router, post_json("/v1/messages", json!({"action": "getHistory"}))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], "unauthorized");
}

#[tokio::test]
async fn wrong_token_returns_401() {
    let app = setup_test_app_with_token();

    let mut request = post_json("/v1/messages", json!({"action": "getHistory"}));
    request
        .headers_mut()
        .insert("authorization", "Bearer wrong-token".parse().unwrap());

    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_token_is_accepted() {
    let app = setup_test_app_with_token();

    let mut request = post_json("/v1/messages", json!({"action": "getHistory"}));
    request
        .headers_mut()
        .insert("authorization", format!("Bearer {TEST_TOKEN}").parse().unwrap());

    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["history"], json!([]));
}
