use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::protocol_constants::HANDOFF_SLOT_CAPACITY;
use crate::stream::ClientConnection;

/// Identity of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Outcome of a single [`ConnectionRegistry::broadcast`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members whose slot accepted the chunk.
    pub delivered: usize,
    /// Members whose slot was still occupied; the chunk was dropped for them.
    pub dropped: usize,
}

impl BroadcastReport {
    /// Number of members enumerated by the broadcast.
    #[must_use]
    pub fn members(&self) -> usize {
        self.delivered + self.dropped
    }
}

/// Per-member delivery state, only touched under the registry lock.
struct Member {
    slot: mpsc::Sender<Bytes>,
    /// Private copy target so no two members share the broadcaster's buffer.
    scratch: BytesMut,
}

/// Shared directory of every live listener.
///
/// All three operations (`register`, `unregister`, `broadcast`) go through one
/// exclusive lock, so a broadcast always fans out to a consistent snapshot of
/// the membership: a member joining or leaving concurrently either sees the
/// whole chunk or none of it.
///
/// `broadcast` never waits on a listener. Each member has a one-chunk slot; if
/// the slot is still full from the previous tick, the new chunk is dropped for
/// that member only.
pub struct ConnectionRegistry {
    members: Mutex<HashMap<ConnectionId, Member>>,
    /// Counter for generating unique connection IDs.
    next_id: AtomicU64,
    /// Initial capacity of each member's scratch buffer.
    chunk_size: usize,
}

impl ConnectionRegistry {
    /// Creates an empty registry sized for `chunk_size` byte chunks.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            chunk_size,
        }
    }

    /// Creates a new connection for `peer` and registers it.
    ///
    /// The connection unregisters itself when dropped.
    pub fn connect(self: &Arc<Self>, peer: impl Into<String>) -> ClientConnection {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (slot_tx, slot_rx) = mpsc::channel(HANDOFF_SLOT_CAPACITY);

        let mut connection =
            ClientConnection::new(id, peer.into(), slot_tx, slot_rx, Arc::clone(self));
        self.register(&mut connection);
        connection
    }

    /// Adds `connection` to the fan-out set.
    ///
    /// Registering an already-registered connection is a no-op. When a
    /// connection re-joins after being unregistered, any chunk still waiting
    /// in its slot from before is discarded.
    ///
    /// Returns `true` if the connection was added.
    pub fn register(&self, connection: &mut ClientConnection) -> bool {
        if !std::ptr::eq(Arc::as_ptr(connection.registry()), self) {
            log::warn!(
                "[Registry] Refusing to register {} minted by another registry",
                connection.id()
            );
            return false;
        }

        let mut members = self.members.lock();
        if members.contains_key(&connection.id()) {
            return false;
        }

        let stale = connection.discard_pending();
        if stale > 0 {
            log::debug!(
                "[Registry] Discarded {} stale chunk(s) for {}",
                stale,
                connection.id()
            );
        }

        members.insert(
            connection.id(),
            Member {
                slot: connection.slot_sender(),
                scratch: BytesMut::with_capacity(self.chunk_size),
            },
        );
        log::info!(
            "[Registry] Registered {} ({}) (total: {})",
            connection.id(),
            connection.peer(),
            members.len()
        );
        true
    }

    /// Removes a member. Safe to call for unknown or already removed IDs.
    ///
    /// Returns `true` if a member was removed.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let mut members = self.members.lock();
        let removed = members.remove(&id).is_some();
        if removed {
            log::info!(
                "[Registry] Unregistered {} (remaining: {})",
                id,
                members.len()
            );
        }
        removed
    }

    /// Hands a private copy of `chunk` to every member whose slot is free.
    ///
    /// Members with a full slot silently miss this chunk; nothing is queued
    /// or retried.
    pub fn broadcast(&self, chunk: &[u8]) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut members = self.members.lock();

        for (id, member) in members.iter_mut() {
            match member.slot.try_reserve() {
                Ok(permit) => {
                    member.scratch.clear();
                    member.scratch.extend_from_slice(chunk);
                    permit.send(member.scratch.split().freeze());
                    report.delivered += 1;
                }
                // A connection leaves the map before its receiver is dropped,
                // so a member's slot is never closed.
                Err(_) => {
                    log::trace!("[Registry] Slot full, dropping chunk for {}", id);
                    report.dropped += 1;
                }
            }
        }

        report
    }

    /// Returns the number of registered members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.lock().len()
    }

    /// Returns whether `id` is currently registered.
    #[must_use]
    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.members.lock().contains_key(&id)
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("members", &self.member_count())
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
