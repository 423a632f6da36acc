//! Publish endpoint handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::Envelope;
use crate::error::{ErrorResponse, HubError};
use crate::service::PublishReport;

/// `POST /publish` — Broadcast a message to every subscriber.
///
/// The body is decoded by hand rather than through the `Json` extractor so
/// that any malformed payload, whatever its content type, is a plain 400.
///
/// # Errors
///
/// Returns [`HubError::MalformedBody`] if the body is not an envelope
/// and [`HubError::InvalidAction`] if its action is not `publish`.
#[utoipa::path(
    post,
    path = "/publish",
    tag = "PubSub",
    summary = "Publish a message",
    description = "Sends `message` to every connected subscriber as a JSON string. Delivery is best-effort; subscribers whose write fails are disconnected.",
    request_body = Envelope,
    responses(
        (status = 200, description = "Fan-out completed", body = PublishReport),
        (status = 400, description = "Malformed body or action other than publish", body = ErrorResponse),
        (status = 405, description = "Method other than POST"),
    )
)]
pub async fn publish_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, HubError> {
    let envelope = Envelope::from_slice(&body).inspect_err(|e| {
        tracing::warn!(error = %e, "error decoding request body");
    })?;

    let report = state.pubsub_service.publish(&envelope).await?;
    Ok(Json(report))
}

/// Publish routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/publish", post(publish_handler))
}
