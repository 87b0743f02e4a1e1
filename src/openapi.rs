/// OpenAPI documentation for the chat board service
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ChatBoard Service API",
        version = "1.0.0",
        description = "Web chat backend: accounts, direct and group conversations, \
            message ingestion with file attachments, and WebSocket delivery \
            notification. All endpoints except auth, downloads and the WebSocket \
            upgrade require a JWT bearer token."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development server"),
    ),
    tags(
        (name = "auth", description = "Account signup and login"),
        (name = "users", description = "Contact listing"),
        (name = "conversations", description = "History, info lookup, groups and membership"),
        (name = "messages", description = "Multipart send, listings and delete"),
        (name = "files", description = "Attachment and avatar downloads"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token from the login endpoint"))
                        .build(),
                ),
            )
        }
    }
}
