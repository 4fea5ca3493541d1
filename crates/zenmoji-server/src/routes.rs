use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_token;
use crate::dto::{
    HealthResponse, MessageBody, MessageReply, SuggestRequest, SuggestionSetResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Largest accepted request body. Articles are capped well below this.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/v1/messages", post(message))
        .route("/v1/suggestions", post(suggest))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(state.clone(), require_token));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/messages",
    request_body = MessageBody,
    responses(
        (status = 200, description = "Action result; failures carry success = false", body = MessageReply),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "messages"
)]
pub async fn message(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> axum::Json<MessageReply> {
    let response = state.backend.handle(body).await;
    axum::Json(response.into())
}

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/v1/suggestions",
    request_body = SuggestRequest,
    responses(
        (status = 200, description = "Suggestions, possibly a flagged fallback", body = SuggestionSetResponse),
        (status = 401, description = "Unauthorized", body = crate::dto::ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::dto::ErrorResponse),
        (status = 500, description = "Provider not configured", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "suggestions"
)]
pub async fn suggest(
    State(state): State<Arc<AppState>>,
    axum::Json(body): axum::Json<SuggestRequest>,
) -> Result<axum::Json<SuggestionSetResponse>, ApiError> {
    let suggestions = state.backend.suggest(&body.text).await?;
    Ok(axum::Json(suggestions.into()))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_status = match state.backend.check_store().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            "error"
        }
    };

    let status = if store_status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if store_status == "ok" {
            "healthy"
        } else {
            "unhealthy"
        },
        store: store_status,
        version: env!("CARGO_PKG_VERSION"),
    };

    (status, axum::Json(response))
}
