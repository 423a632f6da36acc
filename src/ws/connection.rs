//! Subscribe handshake for a single WebSocket connection.
//!
//! The socket is split on arrival: the write half is registered for
//! broadcasts straight away, the read half is used for exactly one control
//! message and then dropped. There is no read loop; dead peers are found
//! by the publish path when a write fails.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Stream, StreamExt};

use crate::domain::{Connection, Envelope};
use crate::service::{ControlRead, PubSubService};

/// Runs the subscribe handshake for a freshly upgraded socket.
pub async fn run_connection(socket: WebSocket, service: Arc<PubSubService>) {
    let (ws_tx, mut ws_rx) = socket.split();
    let conn = Arc::new(Connection::new(ws_tx));
    let conn_id = conn.id();

    service.accept(Arc::clone(&conn));

    let read = read_control(&mut ws_rx).await;
    let outcome = service.handle_control(&conn, read).await;

    tracing::debug!(%conn_id, ?outcome, "handshake finished");
}

/// Reads the next control message from `stream`.
///
/// Ping and pong frames are skipped; the first data frame is decoded as an
/// [`Envelope`].
pub async fn read_control<S>(stream: &mut S) -> ControlRead
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return decode(text.as_str().as_bytes()),
            Some(Ok(Message::Binary(bytes))) => return decode(&bytes),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | None => return ControlRead::Closing,
            Some(Err(e)) => return ControlRead::Failed(e.to_string()),
        }
    }
}

fn decode(bytes: &[u8]) -> ControlRead {
    match Envelope::from_slice(bytes) {
        Ok(envelope) => ControlRead::Envelope(envelope),
        Err(e) => ControlRead::Failed(e.to_string()),
    }
}
