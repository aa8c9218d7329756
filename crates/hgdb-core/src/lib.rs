//! # hgdb-core
//!
//! Core types for the hgdb RTL debugger.
//!
//! This crate provides the building blocks shared by every participant in a
//! debug session:
//!
//! - **Message envelope**: the single JSON object exchanged between the
//!   debug client, the simulation engine and symbol providers
//! - **Request payloads**: one typed payload per request `type`
//! - **Events**: unsolicited breakpoint hits and monitor updates
//! - **Symbol model**: instances, variables, breakpoints and the
//!   context/generator bindings that tie them together
//! - **Error handling**: a unified [`HgdbError`] type with rich diagnostics
//!
//! This crate is runtime-agnostic and does not depend on any async runtime.
//!
//! # Example
//!
//! ```rust
//! use hgdb_core::protocol::{Message, RequestType};
//! use hgdb_core::types::{BreakpointAction, BreakpointPayload, ClientRequest};
//!
//! let request = ClientRequest::Breakpoint(BreakpointPayload::new(
//!     "/src/top.sv",
//!     42,
//!     BreakpointAction::Add,
//! ));
//! let message = request.into_message("hgdb-1").unwrap();
//!
//! assert!(message.request);
//! assert_eq!(message.request_type(), Some(RequestType::Breakpoint));
//! assert_eq!(message.payload["line_num"], 42);
//! ```

#![deny(missing_docs)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod protocol;
pub mod types;

pub use error::{HgdbError, HgdbResultExt, TransportDetails, TransportErrorKind};
pub use protocol::{Message, RequestType, Status, Token, TokenGenerator};
