use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "zenmoji API",
        version = "0.1.0",
        description = "LLM-backed emoji suggestions for technical blog articles."
    ),
    paths(
        crate::routes::message,
        crate::routes::suggest,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::MessageBody,
        crate::dto::MessageReply,
        crate::dto::SuggestRequest,
        crate::dto::SuggestionResponse,
        crate::dto::SuggestionSetResponse,
        crate::dto::FavoriteResponse,
        crate::dto::HistoryResponse,
        crate::dto::CacheStatsResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "messages", description = "Action-tagged message contract"),
        (name = "suggestions", description = "Emoji generation"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some(
                            "Server token. Set via ZENMOJI_SERVER_TOKEN; routes are open when unset.",
                        ))
                        .build(),
                ),
            );
        }
    }
}
