//! WebSocket transport.
//!
//! Each WebSocket text frame carries exactly one protocol frame.
//!
//! - [`WebSocketTransport`]: client side, with bounded connect retry
//! - [`WebSocketListener`]: server side, one transport per accepted peer

mod client;
mod config;
mod server;

pub use client::WebSocketTransport;
pub use config::{ExponentialBackoff, WebSocketConfig, WebSocketServerConfig};
pub use server::{ServerConnection, WebSocketListener};
