//! Service layer: the broadcast dispatcher.
//!
//! [`PubSubService`] drives the subscribe handshake and the publish
//! fan-out on top of the [`crate::domain::ConnectionRegistry`].

pub mod pubsub_service;

pub use pubsub_service::{
    ControlRead, HandshakeOutcome, INVALID_MESSAGE, PubSubService, PublishReport,
};
