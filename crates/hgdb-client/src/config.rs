//! Client configuration.

use std::time::Duration;

use hgdb_core::Token;
use hgdb_core::types::PathMapping;

/// Default wait for a correlated reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default prefix of client-chosen tokens.
pub const DEFAULT_TOKEN_PREFIX: &str = "hgdb-";

/// Session configuration, usually assembled with
/// [`ClientBuilder`](crate::ClientBuilder).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Symbol table locator sent in the `connection` request. No
    /// `connection` request is sent when unset.
    pub symbol_table: Option<String>,
    /// Source-root substitutions sent with the `connection` request.
    pub path_mapping: PathMapping,
    /// Wait for each correlated reply. `None` waits forever.
    pub request_timeout: Option<Duration>,
    /// Prefix of generated tokens.
    pub token_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            symbol_table: None,
            path_mapping: PathMapping::new(),
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
            token_prefix: DEFAULT_TOKEN_PREFIX.to_string(),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone)]
pub struct CallOptions {
    /// Use this token instead of a generated one.
    pub token: Option<Token>,
    /// Turn `status="error"` replies into [`HgdbError::Engine`](hgdb_core::HgdbError::Engine).
    /// When disabled the error reply is returned as is.
    pub check_error: bool,
    /// Override the configured reply timeout.
    pub timeout: Option<Duration>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            token: None,
            check_error: true,
            timeout: None,
        }
    }
}

impl CallOptions {
    /// Return error replies instead of raising them.
    #[must_use]
    pub fn unchecked() -> Self {
        Self {
            check_error: false,
            ..Self::default()
        }
    }

    /// Use a caller-chosen token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<Token>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Wait at most `timeout` for the reply.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert!(config.symbol_table.is_none());
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.token_prefix, "hgdb-");

        let options = CallOptions::default();
        assert!(options.check_error);
        assert!(!CallOptions::unchecked().check_error);
    }
}
