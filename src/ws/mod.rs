//! WebSocket layer: upgrade handling and the subscribe handshake.
//!
//! The endpoint at `/subscribe` upgrades to a WebSocket, registers the
//! connection for broadcasts, and reads exactly one control message.

pub mod connection;
pub mod handler;
