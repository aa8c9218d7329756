//! Testing utilities for hgdb.
//!
//! This crate provides doubles and fixtures for testing debug clients and
//! symbol providers without a simulator:
//!
//! - [`MockEngine`]: an engine replaying a recorded [`Timeline`]
//! - [`StubProvider`]: a symbol provider with fixed answers
//! - [`fixtures`]: a small two-module design with its timeline
//! - [`async_helpers`] and [`init_tracing`] for test plumbing
//!
//! # Mock Engine
//!
//! ```rust
//! use hgdb_testing::{MockEngine, fixtures};
//! use hgdb_transport::MemoryTransport;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = MockEngine::new(fixtures::sample_index(), fixtures::sample_timeline());
//! let (client_side, engine_side) = MemoryTransport::pair();
//! let session = engine.spawn(engine_side);
//! // Drive `client_side` with a debug client, then disconnect.
//! # drop(client_side);
//! # session.abort();
//! # }
//! ```

#![deny(missing_docs)]

pub mod async_helpers;
pub mod fixtures;
pub mod logging;
pub mod mock;
pub mod stub;
pub mod timeline;

pub use async_helpers::{DEFAULT_TIMEOUT, with_default_timeout, with_timeout};
pub use fixtures::{sample_document, sample_index, sample_timeline};
pub use logging::init_tracing;
pub use mock::MockEngine;
pub use stub::StubProvider;
pub use timeline::{EvalPoint, Timeline};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::async_helpers::{with_default_timeout, with_timeout};
    pub use crate::fixtures::{sample_document, sample_index, sample_timeline};
    pub use crate::logging::init_tracing;
    pub use crate::mock::MockEngine;
    pub use crate::stub::StubProvider;
    pub use crate::timeline::Timeline;
}
