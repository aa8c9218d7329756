//! Transport abstractions for hgdb.
//!
//! Transports move text frames between a debug client and an engine, or
//! between an engine and a symbol provider. They know nothing about the
//! JSON inside a frame.
//!
//! # Available Transports
//!
//! | Transport | Use Case | Feature Flag |
//! |-----------|----------|--------------|
//! | [`memory::MemoryTransport`] | Testing and in-process sessions | Always available |
//! | [`websocket::WebSocketTransport`] | Client connection to an engine or provider | `websocket` |
//! | [`websocket::WebSocketListener`] | Server side of a provider or engine | `websocket` |
//!
//! # Example
//!
//! ```no_run
//! use hgdb_transport::{Transport, WebSocketConfig, WebSocketTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hgdb_transport::TransportError> {
//!     let transport = WebSocketTransport::connect(WebSocketConfig::new("ws://localhost:8888")).await?;
//!     transport.send(r#"{"request": true, "type": "debugger-info", "payload": {"command": "status"}}"#.to_string()).await?;
//!     let reply = transport.recv().await?;
//!     println!("{reply:?}");
//!     transport.close().await
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::unwrap_used)]

pub mod error;
pub mod memory;
pub mod runtime;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::TransportError;
pub use memory::MemoryTransport;
pub use traits::{Transport, TransportExt, TransportListener, TransportMetadata};

#[cfg(feature = "websocket")]
pub use websocket::{
    ExponentialBackoff, ServerConnection, WebSocketConfig, WebSocketListener,
    WebSocketServerConfig, WebSocketTransport,
};
