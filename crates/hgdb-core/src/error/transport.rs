//! Transport error classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::BoxError;

/// Classification of transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Connection could not be established.
    ConnectionFailed,
    /// Connection was closed unexpectedly.
    ConnectionClosed,
    /// Read operation failed.
    ReadFailed,
    /// Write operation failed.
    WriteFailed,
    /// Operation timed out.
    Timeout,
    /// Frame was not valid text or exceeded the size limit.
    InvalidMessage,
    /// Listener could not bind its address.
    BindFailed,
}

impl TransportErrorKind {
    /// Whether a connect attempt that failed this way may be retried.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ConnectionFailed | Self::Timeout)
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed => write!(f, "connection failed"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::InvalidMessage => write!(f, "invalid message"),
            Self::BindFailed => write!(f, "bind failed"),
        }
    }
}

/// Details for transport errors (boxed to reduce enum size).
#[derive(Debug)]
pub struct TransportDetails {
    /// Classification of the transport error.
    pub kind: TransportErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Remote endpoint, when known.
    pub remote_addr: Option<String>,
    /// The underlying error, if available.
    pub source: Option<BoxError>,
}

impl TransportDetails {
    /// Create details without an endpoint or source.
    #[must_use]
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            remote_addr: None,
            source: None,
        }
    }
}

impl fmt::Display for TransportDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport error ({}): {}", self.kind, self.message)?;
        if let Some(addr) = &self.remote_addr {
            write!(f, " [{addr}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for TransportDetails {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
