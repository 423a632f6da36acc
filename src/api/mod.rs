//! HTTP layer: route handlers, OpenAPI document, and router composition.

pub mod handlers;

use std::path::Path;

use axum::Router;
use axum::routing::get;
use tower_http::services::ServeDir;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::domain::{Action, Envelope};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::PublishReport;
use crate::ws::handler::subscribe_handler;

/// OpenAPI description of the HTTP endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(handlers::publish::publish_handler, handlers::system::health_handler),
    components(schemas(
        Envelope,
        Action,
        PublishReport,
        ErrorResponse,
        ErrorBody,
        handlers::system::HealthResponse
    )),
    tags(
        (name = "PubSub", description = "Broadcast to WebSocket subscribers"),
        (name = "System", description = "Service status"),
    )
)]
pub struct ApiDoc;

/// Builds the hub router: `/subscribe`, `/publish`, `/health`, and every
/// other path served from `static_dir`.
pub fn build_router(static_dir: impl AsRef<Path>) -> Router<AppState> {
    let router = Router::new()
        .merge(handlers::routes())
        .route("/subscribe", get(subscribe_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router.fallback_service(ServeDir::new(static_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_endpoints() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/publish"));
        assert!(doc.paths.paths.contains_key("/health"));
    }
}
