//! Pub/sub service: subscribe handshake and publish fan-out.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Action, Connection, ConnectionRegistry, Envelope, Removal};
use crate::error::HubError;

/// In-band reply sent to a subscriber whose control message is not
/// `subscribe` or `unsubscribe`.
pub const INVALID_MESSAGE: &str = "invalid message";

/// Result of the single control read performed after an upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRead {
    /// A decoded envelope.
    Envelope(Envelope),
    /// The peer sent a close frame or the stream ended.
    Closing,
    /// The read failed or the payload was not an envelope.
    Failed(String),
}

/// How a subscribe handshake ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The connection stays registered.
    Subscribed,
    /// The client asked to leave; the connection was removed and closed.
    Unsubscribed,
    /// The client sent an unsupported action. It was told so and stays
    /// registered.
    Invalid,
    /// The read failed; the connection was removed and closed.
    Dropped,
}

/// Per-publish delivery summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PublishReport {
    /// Members in the snapshot the fan-out iterated.
    pub recipients: usize,
    /// Members the message was written to.
    pub delivered: usize,
    /// Members this publish evicted after a failed write. Members already
    /// removed elsewhere by the time their write failed are not counted.
    pub evicted: usize,
}

/// Broadcast hub over a [`ConnectionRegistry`].
///
/// Cheap to clone; all clones share the same registry. Handshakes and
/// publishes may run concurrently from any number of tasks.
#[derive(Debug, Clone)]
pub struct PubSubService {
    registry: Arc<ConnectionRegistry>,
}

impl PubSubService {
    /// Creates a new `PubSubService`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Returns a reference to the inner [`ConnectionRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Registers a freshly upgraded connection.
    ///
    /// Membership starts before the first control message is read, so a
    /// connection receives broadcasts while its handshake is pending.
    pub fn accept(&self, conn: Arc<Connection>) -> usize {
        self.registry.add(conn)
    }

    /// Applies the one control message read from `conn`.
    ///
    /// No further reads follow on the handshake path whatever the outcome.
    pub async fn handle_control(&self, conn: &Connection, read: ControlRead) -> HandshakeOutcome {
        let conn_id = conn.id();
        let envelope = match read {
            ControlRead::Envelope(envelope) => envelope,
            ControlRead::Closing => {
                tracing::info!(%conn_id, "connection is closing");
                self.registry.remove(conn_id).await;
                return HandshakeOutcome::Dropped;
            }
            ControlRead::Failed(reason) => {
                tracing::warn!(%conn_id, error = %reason, "websocket connection error");
                self.registry.remove(conn_id).await;
                return HandshakeOutcome::Dropped;
            }
        };

        match envelope.action {
            // Already registered on accept.
            Action::Subscribe => {
                tracing::debug!(%conn_id, "subscribe acknowledged");
                HandshakeOutcome::Subscribed
            }
            Action::Unsubscribe => {
                tracing::debug!(%conn_id, "unsubscribe requested");
                self.registry.remove(conn_id).await;
                HandshakeOutcome::Unsubscribed
            }
            // The connection deliberately stays registered here.
            Action::Publish | Action::Unknown => {
                tracing::debug!(%conn_id, action = ?envelope.action, "invalid control message");
                if let Err(e) = conn.send_text(INVALID_MESSAGE).await {
                    tracing::warn!(%conn_id, error = %e, "failed to send invalid message reply");
                }
                HandshakeOutcome::Invalid
            }
        }
    }

    /// Validates a publish envelope and fans its message out.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidAction`] if the envelope's action is
    /// not `publish`. Per-subscriber write failures are never errors.
    pub async fn publish(&self, envelope: &Envelope) -> Result<PublishReport, HubError> {
        if envelope.action != Action::Publish {
            return Err(HubError::InvalidAction);
        }
        Ok(self.broadcast(&envelope.message).await)
    }

    /// Writes `message` (JSON-encoded as a bare string) to every current
    /// subscriber.
    ///
    /// Members whose write fails are evicted and the loop moves on; the
    /// registry lock is only held while taking the snapshot.
    pub async fn broadcast(&self, message: &str) -> PublishReport {
        let members = self.registry.snapshot();
        let mut report = PublishReport {
            recipients: members.len(),
            ..PublishReport::default()
        };

        for conn in members {
            let conn_id = conn.id();
            match conn.send_json(message).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    if e.is_closing() {
                        tracing::info!(%conn_id, "connection is closing");
                    } else {
                        tracing::warn!(%conn_id, error = %e, "error publishing message");
                    }
                    if let Removal::Removed { .. } = self.registry.remove(conn_id).await {
                        report.evicted += 1;
                    }
                }
            }
        }

        tracing::debug!(
            recipients = report.recipients,
            delivered = report.delivered,
            evicted = report.evicted,
            "broadcast complete"
        );
        report
    }
}
