//! # pubsub-hub
//!
//! Minimal publish/subscribe broadcast hub over WebSocket.
//!
//! Clients connect to `/subscribe`, send one control message, and from then
//! on receive every message published through `POST /publish`. All clients
//! share a single implicit topic; delivery is best-effort.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── Publish / Health Handlers (api/)
//!     ├── Subscribe Handshake (ws/)
//!     │
//!     ├── PubSubService (service/)
//!     │
//!     └── ConnectionRegistry (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
