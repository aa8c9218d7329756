//! # hgdb - a debugger for RTL simulations
//!
//! hgdb brings source-level debugging to hardware designs: breakpoints on
//! generator source lines, stepping forwards and backwards through a
//! simulation, and inspection of the signals behind source-level names.
//!
//! ## Crate Organization
//!
//! - [`hgdb_core`] - message envelope, request and event payloads, symbol
//!   entities and the unified error type
//! - [`hgdb_transport`] - text-frame transports (WebSocket, in-memory)
//! - [`hgdb_client`] - the debug session client
//! - [`hgdb_symbols`] - SQLite symbol tables, the hierarchical JSON
//!   symbol document and the in-memory index lowered from it
//! - [`hgdb_provider`] - live symbol providers and their server shell
//!
//! ## Quick Start
//!
//! ```no_run
//! use hgdb::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), HgdbError> {
//!     let client = ClientBuilder::new()
//!         .symbol_table("design.db")
//!         .connect("ws://localhost:8888")
//!         .await?;
//!
//!     client.set_breakpoint("top.sv", 12, 0, None).await?;
//!     client.continue_().await?;
//!     if let Some(hit) = client.recv_bp_event(Some(Duration::from_secs(10))).await? {
//!         println!("stopped at {}:{} (t={})", hit.filename.unwrap_or_default(), hit.line_num, hit.time);
//!     }
//!     client.close().await
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public items from core
pub use hgdb_core::*;

pub use hgdb_client::{CallOptions, ClientBuilder, ClientConfig, DebugClient};
pub use hgdb_provider::{ProviderClient, ProviderConfig, ProviderServer, RunMode, SymbolProvider};
pub use hgdb_symbols::{DebugSymbolTable, SymbolDocument, SymbolIndex, SymbolTableError};
pub use hgdb_transport::{Transport, TransportListener, TransportMetadata};

pub mod prelude;

/// Client module re-exports
pub mod client {
    //! Debug session client types.
    pub use hgdb_client::*;
}

/// Symbol table module re-exports
pub mod symbols {
    //! Symbol table backends.
    pub use hgdb_symbols::*;
}

/// Provider module re-exports
pub mod provider {
    //! Live symbol provider types.
    pub use hgdb_provider::*;
}

/// Transport module re-exports
pub mod transport {
    //! Transport layer types.
    pub use hgdb_transport::*;
}
