//! Registry of live subscriber connections.
//!
//! [`ConnectionRegistry`] owns the set of connections eligible for future
//! broadcasts. Set storage sits behind the [`SubscriberSet`] trait so the
//! locking strategy can change without touching the dispatcher; the
//! default [`LockedSubscriberSet`] guards a single `HashMap` with one mutex.
//!
//! # Concurrency
//!
//! - Every mutation and every snapshot takes the set lock.
//! - The lock is held only for the map operation itself, never across a
//!   transport write or close.
//! - Removal is idempotent: of two racing removals of the same connection,
//!   exactly one wins and closes the transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::connection::{Connection, ConnectionId};

/// Storage capability behind the registry.
pub trait SubscriberSet: Send + Sync + std::fmt::Debug {
    /// Inserts `conn`, returning the member count afterwards.
    fn add(&self, conn: Arc<Connection>) -> usize;

    /// Detaches the member with `id`, returning it with the remaining
    /// count, or `None` if it was not a member.
    fn take(&self, id: ConnectionId) -> Option<(Arc<Connection>, usize)>;

    /// Returns the current members.
    fn snapshot(&self) -> Vec<Arc<Connection>>;

    /// Returns `true` if `id` is a member.
    fn contains(&self, id: ConnectionId) -> bool;

    /// Returns the member count.
    fn len(&self) -> usize;

    /// Returns `true` if there are no members.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Single-mutex [`SubscriberSet`].
#[derive(Debug, Default)]
pub struct LockedSubscriberSet {
    members: Mutex<HashMap<ConnectionId, Arc<Connection>>>,
}

impl LockedSubscriberSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<Connection>>> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SubscriberSet for LockedSubscriberSet {
    fn add(&self, conn: Arc<Connection>) -> usize {
        let mut members = self.lock();
        members.insert(conn.id(), conn);
        members.len()
    }

    fn take(&self, id: ConnectionId) -> Option<(Arc<Connection>, usize)> {
        let mut members = self.lock();
        let conn = members.remove(&id)?;
        Some((conn, members.len()))
    }

    fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.lock().values().cloned().collect()
    }

    fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Outcome of [`ConnectionRegistry::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The connection was a member; it has been detached and closed.
    Removed {
        /// Members left after the removal.
        remaining: usize,
    },
    /// The connection was not a member; nothing happened.
    NotMember,
}

/// Set of subscribed connections.
#[derive(Debug)]
pub struct ConnectionRegistry {
    set: Box<dyn SubscriberSet>,
}

impl ConnectionRegistry {
    /// Creates an empty registry backed by a [`LockedSubscriberSet`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_set(Box::new(LockedSubscriberSet::new()))
    }

    /// Creates a registry over a custom [`SubscriberSet`].
    #[must_use]
    pub fn with_set(set: Box<dyn SubscriberSet>) -> Self {
        Self { set }
    }

    /// Registers `conn` for future broadcasts and returns the member count.
    pub fn add(&self, conn: Arc<Connection>) -> usize {
        let conn_id = conn.id();
        let total = self.set.add(conn);
        tracing::info!(%conn_id, total, "client connected");
        total
    }

    /// Removes `id` and closes its transport.
    ///
    /// Calling this for a connection that is not (or no longer) a member
    /// is a no-op, so read-failure and write-failure paths may both call
    /// it for the same connection.
    pub async fn remove(&self, id: ConnectionId) -> Removal {
        let Some((conn, remaining)) = self.set.take(id) else {
            tracing::debug!(conn_id = %id, "remove skipped: not a member");
            return Removal::NotMember;
        };
        if let Err(e) = conn.close().await {
            tracing::debug!(conn_id = %id, error = %e, "error closing connection");
        }
        tracing::info!(conn_id = %id, total = remaining, "client disconnected");
        Removal::Removed { remaining }
    }

    /// Returns the current members for a fan-out pass.
    ///
    /// Connections added after this call are not part of the snapshot;
    /// members removed meanwhile stay in it and fail their next write.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Connection>> {
        self.set.snapshot()
    }

    /// Returns `true` if `id` is currently subscribed.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.set.contains(id)
    }

    /// Returns the number of subscribed connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Returns `true` if no connection is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
