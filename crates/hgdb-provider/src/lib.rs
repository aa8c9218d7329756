//! Live symbol table providers for hgdb.
//!
//! Instead of writing a symbol table ahead of time, a debug-info producer
//! can answer the engine's lookups while the session runs. This crate
//! provides:
//!
//! - [`SymbolProvider`]: the lookups an engine needs, eight required and
//!   the rest optional with empty defaults
//! - [`ProviderQuery`] and [`route_query`]: the query catalogue and its
//!   dispatch onto a provider
//! - [`ProviderServer`]: the server shell, with a
//!   `Created -> Serving -> Stopping -> Stopped` lifecycle
//! - [`ProviderClient`]: the querying side, itself a provider
//!
//! A bad query never breaks a connection: unknown and malformed queries are
//! answered with `{}` and the next query is served normally.
//!
//! # Example
//!
//! ```no_run
//! use hgdb_provider::{ProviderClient, ProviderConfig, ProviderServer, RunMode, SymbolProvider};
//! use hgdb_symbols::{SymbolDocument, SymbolIndex};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = SymbolDocument::from_json(&std::fs::read_to_string("design.json")?)?;
//! let index = SymbolIndex::from_document(&doc)?;
//!
//! let handle = ProviderServer::new(index, ProviderConfig::new("127.0.0.1:0"))
//!     .run(RunMode::Background)
//!     .await?;
//!
//! let client = ProviderClient::connect(handle.url()).await?;
//! println!("{:?}", client.get_instance_names().await?);
//!
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

mod backend;
pub mod client;
pub mod provider;
pub mod query;
pub mod server;

pub use client::ProviderClient;
pub use provider::{StaticValues, SymbolProvider, static_values};
pub use query::{ProviderQuery, parse_query, route_query};
pub use server::{
    ProviderConfig, ProviderHandle, ProviderServer, ProviderState, ProviderStopper, RunMode,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::ProviderClient;
    pub use crate::provider::SymbolProvider;
    pub use crate::query::ProviderQuery;
    pub use crate::server::{ProviderConfig, ProviderHandle, ProviderServer, RunMode};
}
