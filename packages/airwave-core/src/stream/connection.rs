use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::stream::{ConnectionId, ConnectionRegistry};

/// Transport a listener's chunks are written to.
///
/// Implemented by the HTTP body adapter in the API layer; tests provide their
/// own sinks to inject failures.
#[async_trait]
pub trait ChunkSink: Send {
    /// Queues `chunk` for writing. An error means the client is gone.
    async fn write_chunk(&mut self, chunk: Bytes) -> io::Result<()>;

    /// Pushes everything written so far to the network.
    async fn flush(&mut self) -> io::Result<()>;
}

/// Summary of a finished delivery loop.
#[derive(Debug)]
pub struct DeliveryReport {
    pub chunks_delivered: u64,
    pub bytes_delivered: u64,
    /// The failure that ended the loop.
    pub error: io::Error,
}

/// One listener: its hand-off slot plus its membership in the registry.
///
/// Unregisters itself when dropped, so a handler that bails out early never
/// leaves a dead member behind.
pub struct ClientConnection {
    id: ConnectionId,
    /// Identifying token for logs (remote address).
    peer: String,
    slot: mpsc::Receiver<Bytes>,
    /// Kept so the connection can be registered again after removal.
    slot_tx: mpsc::Sender<Bytes>,
    registry: Arc<ConnectionRegistry>,
}

impl ClientConnection {
    pub(crate) fn new(
        id: ConnectionId,
        peer: String,
        slot_tx: mpsc::Sender<Bytes>,
        slot: mpsc::Receiver<Bytes>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self {
            id,
            peer,
            slot,
            slot_tx,
            registry,
        }
    }

    /// Returns the connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the peer token used in logs.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub(crate) fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub(crate) fn slot_sender(&self) -> mpsc::Sender<Bytes> {
        self.slot_tx.clone()
    }

    /// Empties the slot, returning how many chunks were thrown away.
    pub(crate) fn discard_pending(&mut self) -> usize {
        let mut discarded = 0;
        while self.slot.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    /// Waits for the next chunk handed off by the registry.
    pub async fn next_chunk(&mut self) -> Option<Bytes> {
        self.slot.recv().await
    }

    /// Takes the pending chunk without waiting, if there is one.
    pub fn try_next_chunk(&mut self) -> Option<Bytes> {
        self.slot.try_recv().ok()
    }

    /// Runs the delivery loop until the sink fails.
    ///
    /// Each chunk is written and flushed immediately. The first write or
    /// flush error unregisters the connection and ends the loop; there is no
    /// other disconnect detection, so a sink that never fails keeps the loop
    /// alive even while the connection is unregistered.
    pub async fn deliver<S>(mut self, sink: &mut S) -> DeliveryReport
    where
        S: ChunkSink + ?Sized,
    {
        let mut chunks_delivered = 0u64;
        let mut bytes_delivered = 0u64;

        let error = loop {
            // `slot_tx` keeps the channel open for as long as `self` lives.
            let Some(chunk) = self.slot.recv().await else {
                unreachable!("hand-off slot closed while its connection holds a sender");
            };

            let len = chunk.len() as u64;
            let written = match sink.write_chunk(chunk).await {
                Ok(()) => sink.flush().await,
                Err(e) => Err(e),
            };

            if let Err(e) = written {
                break e;
            }

            chunks_delivered += 1;
            bytes_delivered += len;
        };

        self.registry.unregister(self.id);
        log::info!(
            "[Stream] {} ({}) left the stream: chunks={}, bytes={}, reason={}",
            self.id,
            self.peer,
            chunks_delivered,
            bytes_delivered,
            error
        );

        DeliveryReport {
            chunks_delivered,
            bytes_delivered,
            error,
        }
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}
