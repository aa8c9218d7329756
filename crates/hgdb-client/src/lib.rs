//! Debug session client for hgdb.
//!
//! A [`DebugClient`] drives one RTL simulation engine: it sets breakpoints,
//! controls execution, inspects values and receives breakpoint hits.
//!
//! # Overview
//!
//! - Every request carries a client-chosen token; the reply with the same
//!   token is routed back to the caller.
//! - Breakpoint hits arrive unsolicited and are queued separately, so
//!   [`DebugClient::recv_bp`] never sees replies and [`DebugClient::recv`]
//!   never sees hits.
//! - Flow-control commands are fire-and-forget; the engine answers them with
//!   breakpoint events, not replies.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use hgdb_client::ClientBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), hgdb_core::HgdbError> {
//!     let client = ClientBuilder::new()
//!         .symbol_table("design.db")
//!         .connect("ws://localhost:8888")
//!         .await?;
//!
//!     for bp in client.request_breakpoint_location("top.sv", None, None).await? {
//!         println!("{}:{}", bp.filename, bp.line_num);
//!     }
//!
//!     client.set_breakpoint("top.sv", 12, 0, Some("a == 1")).await?;
//!     client.continue_().await?;
//!
//!     while let Some(hit) = client.recv_bp_event(Some(Duration::from_secs(5))).await? {
//!         println!("hit {:?} at {}", hit.breakpoint_ids(), hit.time);
//!         client.step_over().await?;
//!     }
//!
//!     client.close().await
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod client;
pub mod config;

pub use builder::ClientBuilder;
pub use client::DebugClient;
pub use config::{CallOptions, ClientConfig};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::ClientBuilder;
    pub use crate::client::DebugClient;
    pub use crate::config::{CallOptions, ClientConfig};
    pub use hgdb_core::types::{
        BreakpointEvent, BreakpointInfo, Command, InfoCommand, MonitorTarget, MonitorType,
        OptionChangePayload,
    };
}
