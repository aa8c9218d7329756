//! Symbol table error types.

use hgdb_core::error::HgdbError;
use thiserror::Error;

/// Errors raised by symbol table backends.
#[derive(Error, Debug)]
pub enum SymbolTableError {
    /// A write referenced an instance that was never stored.
    #[error("unknown instance id {0}")]
    UnknownInstance(u64),

    /// A write referenced a breakpoint that was never stored.
    #[error("unknown breakpoint id {0}")]
    UnknownBreakpoint(u64),

    /// A write referenced a variable that was never stored.
    #[error("unknown variable id {0}")]
    UnknownVariable(u64),

    /// An id was stored twice.
    #[error("duplicate {entity} id {id}")]
    DuplicateId {
        /// Entity table.
        entity: &'static str,
        /// The reused id.
        id: u64,
    },

    /// Transaction bracketing was misused.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The storage engine failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A hierarchical document is invalid.
    #[error("{0}")]
    Document(String),

    /// Stored data could not be decoded.
    #[error("corrupt {table} entry: {message}")]
    Corrupt {
        /// Table holding the entry.
        table: &'static str,
        /// What was wrong.
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SymbolTableError {
    /// Create a document error.
    pub fn document(message: impl Into<String>) -> Self {
        Self::Document(message.into())
    }

    /// Whether this is a referential-integrity rejection.
    #[must_use]
    pub const fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::UnknownInstance(_)
                | Self::UnknownBreakpoint(_)
                | Self::UnknownVariable(_)
                | Self::DuplicateId { .. }
        )
    }
}

impl From<SymbolTableError> for HgdbError {
    fn from(err: SymbolTableError) -> Self {
        match err {
            e if e.is_integrity() => Self::integrity(e.to_string()),
            SymbolTableError::Document(message) => Self::document(message),
            SymbolTableError::Json(e) => Self::document(e.to_string()),
            other => Self::Storage {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

/// Result alias for symbol table operations.
pub type Result<T, E = SymbolTableError> = std::result::Result<T, E>;
