//! Unified error handling for hgdb.
//!
//! Every fallible operation in the workspace eventually reports an
//! [`HgdbError`]. The variants follow the failure taxonomy of a debug
//! session:
//!
//! - **Transport**: connection refused, closed or timed out
//! - **Protocol**: malformed JSON or an unexpected message shape
//! - **Engine**: the engine answered `status = "error"`; carries its reason
//! - **Integrity**: a symbol-table write referenced an unknown id
//! - **Storage** and **Document**: backend failures
//!
//! None of these are fatal to the process. A failed operation ends only
//! that operation.
//!
//! # Example
//!
//! ```rust
//! use hgdb_core::error::{HgdbError, HgdbResultExt};
//!
//! fn load() -> Result<(), HgdbError> {
//!     let result: Result<(), HgdbError> = Err(HgdbError::integrity("unknown instance id 4"));
//!     result.context("loading symbol table")?;
//!     Ok(())
//! }
//!
//! let err = load().unwrap_err();
//! assert!(err.to_string().contains("loading symbol table"));
//! ```

mod context;
mod transport;
mod types;

pub use context::HgdbResultExt;
pub use transport::{TransportDetails, TransportErrorKind};
pub use types::{BoxError, HgdbError};
