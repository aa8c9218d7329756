//! Transport error types.

use hgdb_core::error::{HgdbError, TransportDetails, TransportErrorKind};
use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// I/O error from `std::io::Error`.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Connection error.
    #[error("Connection error: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport is not connected.
    #[error("Not connected")]
    NotConnected,

    /// Message was too large.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Frame was not valid text.
    #[error("Invalid message: {message}")]
    InvalidMessage {
        /// Description of the problem.
        message: String,
    },

    /// Timeout occurred.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long the operation waited.
        duration: std::time::Duration,
    },

    /// Listener could not bind.
    #[error("Failed to bind {addr}: {message}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Create an invalid message error.
    pub fn invalid_message(message: impl Into<String>) -> Self {
        Self::InvalidMessage {
            message: message.into(),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Get the transport error kind.
    #[must_use]
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::IoError(e) => match e.kind() {
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotConnected
                | std::io::ErrorKind::AddrNotAvailable => TransportErrorKind::ConnectionFailed,
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe => {
                    TransportErrorKind::ConnectionClosed
                }
                std::io::ErrorKind::TimedOut => TransportErrorKind::Timeout,
                std::io::ErrorKind::WriteZero => TransportErrorKind::WriteFailed,
                _ => TransportErrorKind::ReadFailed,
            },
            Self::Connection { .. } | Self::NotConnected => TransportErrorKind::ConnectionFailed,
            Self::ConnectionClosed => TransportErrorKind::ConnectionClosed,
            Self::MessageTooLarge { .. } | Self::InvalidMessage { .. } => {
                TransportErrorKind::InvalidMessage
            }
            Self::Timeout { .. } => TransportErrorKind::Timeout,
            Self::Bind { .. } => TransportErrorKind::BindFailed,
        }
    }

    /// Whether a connect attempt that failed this way should be retried.
    ///
    /// Only refusals and OS-level socket errors qualify; handshake or
    /// protocol failures are final.
    #[must_use]
    pub fn is_retryable_connect(&self) -> bool {
        matches!(self, Self::IoError(_)) && self.kind() != TransportErrorKind::ConnectionClosed
    }
}

impl From<TransportError> for HgdbError {
    fn from(err: TransportError) -> Self {
        if let TransportError::Timeout {
            operation,
            duration,
        } = err
        {
            return Self::timeout(operation, duration);
        }
        let kind = err.kind();
        let message = err.to_string();
        Self::Transport(Box::new(TransportDetails {
            kind,
            message,
            remote_addr: None,
            source: Some(Box::new(err)),
        }))
    }
}

#[cfg(feature = "websocket")]
impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => Self::ConnectionClosed,
            WsError::Io(e) => Self::IoError(e),
            WsError::Capacity(e) => Self::invalid_message(e.to_string()),
            WsError::Utf8 => Self::invalid_message("frame is not valid UTF-8"),
            other => Self::connection(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_is_retryable() {
        let refused = TransportError::from(std::io::Error::from(
            std::io::ErrorKind::ConnectionRefused,
        ));
        assert!(refused.is_retryable_connect());
        assert_eq!(refused.kind(), TransportErrorKind::ConnectionFailed);

        let reset = TransportError::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert!(!reset.is_retryable_connect());
        assert!(!TransportError::connection("bad handshake").is_retryable_connect());
    }

    #[test]
    fn test_into_hgdb_error() {
        let err: HgdbError = TransportError::ConnectionClosed.into();
        assert!(err.is_disconnect());

        let err: HgdbError = TransportError::Timeout {
            operation: "connect".to_string(),
            duration: std::time::Duration::from_secs(1),
        }
        .into();
        assert!(matches!(err, HgdbError::Timeout { .. }));
    }
}
