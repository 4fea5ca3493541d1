use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use zenmoji_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            AppError::ExtractionError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "extraction_error"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::SerializationError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::StorageError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            AppError::ProviderError { .. }
            | AppError::EmptyResponse(_)
            | AppError::HttpError(_)
            | AppError::NetworkError(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.0.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_maps_to_429() {
        let (status, kind) = ApiError(AppError::RateLimitExceeded).status_and_kind();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(kind, "rate_limit_exceeded");
    }

    #[test]
    fn upstream_failures_map_to_502() {
        let err = ApiError(AppError::ProviderError {
            provider: "OpenAI".into(),
            status: 500,
            body: "oops".into(),
        });
        assert_eq!(err.status_and_kind().0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn missing_key_is_server_side() {
        let err = ApiError(AppError::ConfigError("API key is not set".into()));
        assert_eq!(err.status_and_kind().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
