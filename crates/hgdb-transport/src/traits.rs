//! Transport traits.
//!
//! A transport moves whole text frames. Framing into JSON happens one layer
//! up, so a peer that sends garbage produces a frame the caller can inspect
//! and discard instead of a transport failure.
//!
//! - [`Transport`]: bidirectional frame passing over one connection
//! - [`TransportListener`]: server side, yields one transport per peer
//! - [`TransportExt`]: JSON helpers with default implementations

use std::future::Future;
use std::time::Instant;

use hgdb_core::error::HgdbError;
use hgdb_core::protocol::Message;
use serde::Serialize;

/// Metadata about a transport connection.
#[derive(Debug, Clone, Default)]
pub struct TransportMetadata {
    /// Transport type identifier (e.g., "memory", "websocket").
    pub transport_type: String,
    /// Remote address, if applicable.
    pub remote_addr: Option<String>,
    /// Local address, if applicable.
    pub local_addr: Option<String>,
    /// When the connection was established.
    pub connected_at: Option<Instant>,
}

impl TransportMetadata {
    /// Create new metadata for a transport type.
    #[must_use]
    pub fn new(transport_type: impl Into<String>) -> Self {
        Self {
            transport_type: transport_type.into(),
            remote_addr: None,
            local_addr: None,
            connected_at: None,
        }
    }

    /// Set the remote address.
    #[must_use]
    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Set the local address.
    #[must_use]
    pub fn local_addr(mut self, addr: impl Into<String>) -> Self {
        self.local_addr = Some(addr.into());
        self
    }

    /// Mark the connection time.
    #[must_use]
    pub fn connected_now(mut self) -> Self {
        self.connected_at = Some(Instant::now());
        self
    }
}

/// Core transport trait.
///
/// Implementations must allow `send` and `recv` to run concurrently from
/// different tasks: a session keeps one task parked in `recv` while callers
/// send requests.
pub trait Transport: Send + Sync {
    /// The error type for transport operations.
    type Error: std::error::Error + Into<HgdbError> + Send + Sync + 'static;

    /// Send one text frame.
    fn send(&self, frame: String) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive one text frame.
    ///
    /// Returns `Ok(None)` when the connection is closed.
    fn recv(&self) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Close the connection. Closing twice is not an error.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Check if the transport is still connected.
    fn is_connected(&self) -> bool;

    /// Get metadata about the transport.
    fn metadata(&self) -> TransportMetadata;
}

/// Listener trait for server-side transports.
pub trait TransportListener: Send + Sync {
    /// The type of transport produced by this listener.
    type Transport: Transport + 'static;

    /// The error type for listener operations.
    type Error: std::error::Error + Into<HgdbError> + Send + Sync + 'static;

    /// Accept the next connection.
    fn accept(&self) -> impl Future<Output = Result<Self::Transport, Self::Error>> + Send;

    /// Get the local address the listener is bound to, if available.
    fn local_addr(&self) -> Option<String>;
}

/// JSON helpers for any transport.
pub trait TransportExt: Transport {
    /// Serialize `value` and send it as one frame.
    fn send_json<V: Serialize + Sync>(
        &self,
        value: &V,
    ) -> impl Future<Output = Result<(), HgdbError>> + Send {
        async move {
            let frame = serde_json::to_string(value)?;
            self.send(frame).await.map_err(Into::into)
        }
    }

    /// Send a protocol message.
    fn send_message(&self, msg: &Message) -> impl Future<Output = Result<(), HgdbError>> + Send {
        self.send_json(msg)
    }

    /// Receive the next frame and parse it as a protocol message.
    ///
    /// The outer `Option` is `None` once the connection is closed; a frame
    /// that is not a valid message yields `Some(Err(..))`.
    fn recv_message(
        &self,
    ) -> impl Future<Output = Result<Option<Result<Message, HgdbError>>, HgdbError>> + Send {
        async move {
            let frame = self.recv().await.map_err(Into::into)?;
            Ok(frame.map(|text| Message::from_json(&text)))
        }
    }
}

impl<T: Transport> TransportExt for T {}
