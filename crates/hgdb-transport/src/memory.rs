//! In-memory transport for testing.
//!
//! A connected pair of channel-backed transports. Useful for driving a debug
//! client against a scripted engine without network I/O.
//!
//! # Example
//!
//! ```rust
//! use hgdb_transport::{MemoryTransport, Transport};
//!
//! let (client_transport, engine_transport) = MemoryTransport::pair();
//!
//! assert!(client_transport.is_connected());
//! assert!(engine_transport.is_connected());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::channel::mpsc;
use futures::future::{self, Either};
use futures::{SinkExt, StreamExt};

use crate::error::TransportError;
use crate::runtime::{AsyncMutex, Notify};
use crate::traits::{Transport, TransportMetadata};

/// State shared by both ends of a pair.
struct Link {
    connected: AtomicBool,
    closed: Notify,
}

/// An in-memory transport using channels.
pub struct MemoryTransport {
    sender: AsyncMutex<Option<mpsc::Sender<String>>>,
    receiver: AsyncMutex<mpsc::Receiver<String>>,
    link: Arc<Link>,
    metadata: TransportMetadata,
}

impl MemoryTransport {
    /// Create a connected pair of memory transports.
    ///
    /// Frames sent on the first transport are received on the second,
    /// and vice versa.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        Self::pair_with_capacity(64)
    }

    /// Create a connected pair with a specific buffer capacity.
    #[must_use]
    pub fn pair_with_capacity(capacity: usize) -> (Self, Self) {
        let (tx1, rx1) = mpsc::channel(capacity);
        let (tx2, rx2) = mpsc::channel(capacity);

        let link = Arc::new(Link {
            connected: AtomicBool::new(true),
            closed: Notify::new(),
        });

        let transport1 = Self {
            sender: AsyncMutex::new(Some(tx2)),
            receiver: AsyncMutex::new(rx1),
            link: Arc::clone(&link),
            metadata: TransportMetadata::new("memory")
                .remote_addr("peer-1")
                .local_addr("peer-0")
                .connected_now(),
        };

        let transport2 = Self {
            sender: AsyncMutex::new(Some(tx1)),
            receiver: AsyncMutex::new(rx2),
            link,
            metadata: TransportMetadata::new("memory")
                .remote_addr("peer-0")
                .local_addr("peer-1")
                .connected_now(),
        };

        (transport1, transport2)
    }
}

impl Transport for MemoryTransport {
    type Error = TransportError;

    async fn send(&self, frame: String) -> Result<(), Self::Error> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let mut sender = match self.sender.lock().await.as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(TransportError::NotConnected),
        };
        sender
            .send(frame)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn recv(&self) -> Result<Option<String>, Self::Error> {
        let mut receiver = self.receiver.lock().await;

        // Frames queued before a close are still delivered.
        if let Ok(Some(frame)) = receiver.try_next() {
            return Ok(Some(frame));
        }

        let closed = self.link.closed.listen();
        if !self.is_connected() {
            return Ok(None);
        }

        match future::select(receiver.next(), closed).await {
            Either::Left((Some(frame), _)) => Ok(Some(frame)),
            Either::Left((None, _)) | Either::Right(_) => {
                self.link.connected.store(false, Ordering::SeqCst);
                Ok(None)
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if self.link.connected.swap(false, Ordering::SeqCst) {
            tracing::debug!(local = ?self.metadata.local_addr, "memory transport closed");
        }
        self.sender.lock().await.take();
        self.link.closed.notify(usize::MAX);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.connected.load(Ordering::SeqCst)
    }

    fn metadata(&self) -> TransportMetadata {
        self.metadata.clone()
    }
}
