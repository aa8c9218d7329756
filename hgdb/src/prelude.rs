//! Prelude module for convenient imports.
//!
//! ```rust
//! use hgdb::prelude::*;
//!
//! let request = Message::request(RequestType::Command, serde_json::json!({"command": "continue"}));
//! assert!(request.request);
//! ```
//!
//! Brings in the envelope and error types, the client and its builder, the
//! symbol backends, the provider trait and server, and the transport traits.

pub use hgdb_core::types::{
    BreakpointEvent, BreakpointInfo, BreakpointKind, BreakpointSymbol, ContextVariable,
    GeneratorVariable, InfoCommand, Instance, MonitorTarget, MonitorType, OptionChangePayload,
    Variable,
};
pub use hgdb_core::{HgdbError, Message, RequestType, Token};

pub use hgdb_client::{CallOptions, ClientBuilder, ClientConfig, DebugClient};

pub use hgdb_symbols::document::{DocVariable, ScopeContainer};
pub use hgdb_symbols::{DebugSymbolTable, SymbolDocument, SymbolIndex};

pub use hgdb_provider::{
    ProviderClient, ProviderConfig, ProviderHandle, ProviderServer, RunMode, SymbolProvider,
};

pub use hgdb_transport::{MemoryTransport, Transport, TransportExt, TransportListener};
