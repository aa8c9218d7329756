//! The primary error type for hgdb.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use super::transport::{TransportDetails, TransportErrorKind};

/// Type alias for boxed errors that are Send + Sync.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The primary error type for hgdb.
///
/// Large variants are boxed to keep `Result<T, HgdbError>` small.
#[derive(Error, Diagnostic, Debug)]
pub enum HgdbError {
    // ========================================================================
    // Session Errors
    // ========================================================================
    /// The engine answered a request with `status = "error"`.
    #[error("Engine rejected '{request_type}': {reason}")]
    #[diagnostic(code(hgdb::engine::rejected))]
    Engine {
        /// Type of the rejected request.
        request_type: String,
        /// The `payload.reason` supplied by the engine.
        reason: String,
    },

    /// A frame was malformed or had an unexpected shape.
    #[error("Protocol error: {message}")]
    #[diagnostic(
        code(hgdb::protocol::malformed),
        help("Frames must be JSON objects with 'request', 'type' and 'payload'")
    )]
    Protocol {
        /// Human-readable error message.
        message: String,
    },

    /// Transport-level error (details boxed to reduce enum size).
    #[error("{0}")]
    #[diagnostic(code(hgdb::transport::error))]
    Transport(#[source] Box<TransportDetails>),

    /// The session has been closed.
    #[error("Not connected")]
    #[diagnostic(code(hgdb::session::not_connected))]
    NotConnected,

    /// An operation timed out.
    #[error("Timeout after {duration:?}: {operation}")]
    #[diagnostic(
        code(hgdb::timeout),
        help("Consider increasing the timeout or checking that the engine is running")
    )]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long we waited before timing out.
        duration: Duration,
    },

    // ========================================================================
    // Symbol Table Errors
    // ========================================================================
    /// A write referenced an id that does not exist, or reused one that does.
    #[error("Integrity violation: {message}")]
    #[diagnostic(
        code(hgdb::symbols::integrity),
        help("Store instances and variables before anything that references them")
    )]
    Integrity {
        /// Human-readable error message.
        message: String,
    },

    /// The storage backend failed.
    #[error("Storage error: {message}")]
    #[diagnostic(code(hgdb::symbols::storage))]
    Storage {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// A hierarchical symbol document is invalid.
    #[error("Invalid symbol document: {message}")]
    #[diagnostic(code(hgdb::symbols::document))]
    Document {
        /// Human-readable error message.
        message: String,
    },

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Serialization failed.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(hgdb::serialization))]
    Json(#[from] serde_json::Error),

    /// Unexpected internal state.
    #[error("Internal error: {message}")]
    #[diagnostic(code(hgdb::internal), severity(error))]
    Internal {
        /// Human-readable error message.
        message: String,
    },

    /// An error with additional context.
    #[error("{context}: {source}")]
    #[diagnostic(code(hgdb::context))]
    WithContext {
        /// What was being attempted.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<HgdbError>,
    },
}

impl HgdbError {
    /// Create an engine rejection.
    pub fn engine(request_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Engine {
            request_type: request_type.into(),
            reason: reason.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a transport error of the given kind.
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport(Box::new(TransportDetails::new(kind, message)))
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an integrity error.
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Create a document error.
    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The engine-supplied reason, if this is (or wraps) an engine rejection.
    #[must_use]
    pub fn engine_reason(&self) -> Option<&str> {
        match self {
            Self::Engine { reason, .. } => Some(reason),
            Self::WithContext { source, .. } => source.engine_reason(),
            _ => None,
        }
    }

    /// The transport classification, if this is a transport error.
    #[must_use]
    pub fn transport_kind(&self) -> Option<TransportErrorKind> {
        match self {
            Self::Transport(details) => Some(details.kind),
            Self::WithContext { source, .. } => source.transport_kind(),
            _ => None,
        }
    }

    /// Whether the error means the connection is gone.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::NotConnected)
            || self.transport_kind() == Some(TransportErrorKind::ConnectionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HgdbResultExt;

    #[test]
    fn test_engine_reason_through_context() {
        let err: Result<(), HgdbError> = Err(HgdbError::engine("breakpoint", "no such location"));
        let err = err.context("setting breakpoint").unwrap_err();
        assert_eq!(err.engine_reason(), Some("no such location"));
        assert_eq!(
            err.to_string(),
            "setting breakpoint: Engine rejected 'breakpoint': no such location"
        );
    }

    #[test]
    fn test_transport_classification() {
        let err = HgdbError::transport(TransportErrorKind::ConnectionClosed, "peer went away");
        assert!(err.is_disconnect());
        assert_eq!(err.transport_kind(), Some(TransportErrorKind::ConnectionClosed));
        assert!(!HgdbError::protocol("bad").is_disconnect());
        assert!(TransportErrorKind::ConnectionFailed.is_retryable());
        assert!(!TransportErrorKind::ConnectionClosed.is_retryable());
    }

    #[test]
    fn test_result_size() {
        assert!(std::mem::size_of::<HgdbError>() <= 72);
    }
}
