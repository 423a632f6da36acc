//! Domain layer: connection handles, the wire envelope, and the registry.
//!
//! This module holds the server-side model of the hub: identity and write
//! access for a single subscriber, the JSON envelope exchanged with
//! clients, and the synchronized set of connections that receive
//! broadcasts.

pub mod connection;
pub mod envelope;
pub mod registry;

pub use connection::{Connection, ConnectionId};
pub use envelope::{Action, Envelope};
pub use registry::{ConnectionRegistry, LockedSubscriberSet, Removal, SubscriberSet};
