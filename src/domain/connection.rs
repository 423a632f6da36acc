//! Subscriber connection handle.
//!
//! A [`Connection`] owns the write half of one WebSocket session. Writes
//! are serialized through a per-connection async mutex so that concurrent
//! publishes never interleave frames on the same socket, and never contend
//! with the registry lock.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::TransportError;

/// Boxed outgoing half of a WebSocket transport.
pub type MessageSink = Pin<Box<dyn Sink<Message, Error = axum::Error> + Send>>;

/// Unique identifier for a subscriber connection.
///
/// Wraps a UUID v4 generated when the transport is accepted. Used as the
/// key in the [`super::ConnectionRegistry`] and as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Write handle for a single subscriber.
pub struct Connection {
    id: ConnectionId,
    sink: Mutex<MessageSink>,
    closed: AtomicBool,
}

impl Connection {
    /// Wraps an outgoing sink under a fresh [`ConnectionId`].
    #[must_use]
    pub fn new<S>(sink: S) -> Self
    where
        S: Sink<Message, Error = axum::Error> + Send + 'static,
    {
        Self {
            id: ConnectionId::new(),
            sink: Mutex::new(Box::pin(sink)),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns this connection's identity.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` once [`Connection::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sends a single frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closing`] if the connection was closed or
    /// the peer went away, [`TransportError::Unexpected`] otherwise.
    pub async fn send(&self, message: Message) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closing("connection already closed".to_string()));
        }
        let mut sink = self.sink.lock().await;
        sink.send(message)
            .await
            .map_err(|e| TransportError::classify(&e))
    }

    /// Sends a raw text frame.
    ///
    /// # Errors
    ///
    /// See [`Connection::send`].
    pub async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        self.send(Message::text(text)).await
    }

    /// Sends `value` JSON-encoded as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Encode`] if serialization fails, otherwise
    /// see [`Connection::send`].
    pub async fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), TransportError> {
        let json = serde_json::to_string(value)?;
        self.send(Message::text(json)).await
    }

    /// Closes the transport. Only the first call touches the sink.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if flushing the close frame fails.
    pub async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut sink = self.sink.lock().await;
        sink.close().await.map_err(|e| TransportError::classify(&e))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
