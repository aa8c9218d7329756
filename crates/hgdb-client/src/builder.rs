//! Client builder for fluent construction.
//!
//! The [`ClientBuilder`] collects session options, opens the connection and
//! attaches the symbol table in one step.

use std::time::Duration;

use hgdb_core::error::HgdbError;
use hgdb_transport::{Transport, WebSocketConfig, WebSocketTransport};
use tracing::{debug, info};

use crate::client::DebugClient;
use crate::config::ClientConfig;

/// Builder for debug sessions.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use hgdb_client::ClientBuilder;
///
/// # async fn example() -> Result<(), hgdb_core::HgdbError> {
/// let client = ClientBuilder::new()
///     .symbol_table("/work/design.db")
///     .path_mapping("/build/src", "/home/me/src")
///     .request_timeout(Duration::from_secs(5))
///     .connect("ws://localhost:8888")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ClientConfig,
    connect_timeout: Option<Duration>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a builder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            connect_timeout: None,
        }
    }

    /// Attach this symbol table with a `connection` request once connected.
    #[must_use]
    pub fn symbol_table(mut self, locator: impl Into<String>) -> Self {
        self.config.symbol_table = Some(locator.into());
        self
    }

    /// Add one source-root substitution sent with the `connection` request.
    #[must_use]
    pub fn path_mapping(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.config.path_mapping.insert(from.into(), to.into());
        self
    }

    /// Wait at most `timeout` for each reply.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Wait for replies without limit.
    #[must_use]
    pub const fn no_request_timeout(mut self) -> Self {
        self.config.request_timeout = None;
        self
    }

    /// Prefix of generated tokens.
    #[must_use]
    pub fn token_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.token_prefix = prefix.into();
        self
    }

    /// Ceiling for the WebSocket connect phase, retries included.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Connect to an engine over WebSocket.
    pub async fn connect(
        self,
        url: impl Into<String>,
    ) -> Result<DebugClient<WebSocketTransport>, HgdbError> {
        let url = url.into();
        let mut ws_config = WebSocketConfig::new(url.clone());
        if let Some(timeout) = self.connect_timeout {
            ws_config = ws_config.with_connect_timeout(timeout);
        }

        info!(url = %url, "connecting to debug engine");
        let transport = WebSocketTransport::connect(ws_config)
            .await
            .map_err(HgdbError::from)?;
        self.build(transport).await
    }

    /// Start a session over an existing transport.
    ///
    /// Fails with the engine's reason when the symbol table is rejected.
    pub async fn build<T: Transport + 'static>(
        self,
        transport: T,
    ) -> Result<DebugClient<T>, HgdbError> {
        let client = DebugClient::new(transport, self.config);
        if let Err(e) = client.handshake().await {
            if let Err(close_err) = client.close().await {
                debug!(error = %close_err, "closing after a failed handshake failed");
            }
            return Err(e);
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hgdb_core::protocol::Message;
    use hgdb_transport::MemoryTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_builder_options() {
        let builder = ClientBuilder::new()
            .symbol_table("a.db")
            .path_mapping("/old", "/new")
            .token_prefix("t-")
            .no_request_timeout();

        assert_eq!(builder.config.symbol_table.as_deref(), Some("a.db"));
        assert_eq!(builder.config.path_mapping["/old"], "/new");
        assert_eq!(builder.config.token_prefix, "t-");
        assert!(builder.config.request_timeout.is_none());
    }

    #[tokio::test]
    async fn test_build_sends_connection_request() {
        let (client_side, engine) = MemoryTransport::pair();

        let engine_task = tokio::spawn(async move {
            let frame = engine.recv().await.unwrap().unwrap();
            let request = Message::from_json(&frame).unwrap();
            let reply = Message::reply_success("connection", json!({}))
                .with_token(request.token.clone().unwrap());
            engine.send(reply.to_json().unwrap()).await.unwrap();
            request
        });

        let client = ClientBuilder::new()
            .symbol_table("design.db")
            .path_mapping("/a", "/b")
            .build(client_side)
            .await
            .unwrap();

        let request = engine_task.await.unwrap();
        assert_eq!(request.kind, "connection");
        assert_eq!(
            request.payload,
            json!({"db_filename": "design.db", "path-mapping": {"/a": "/b"}})
        );
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_build_fails_on_rejected_symbol_table() {
        let (client_side, engine) = MemoryTransport::pair();

        tokio::spawn(async move {
            let frame = engine.recv().await.unwrap().unwrap();
            let request = Message::from_json(&frame).unwrap();
            let reply = Message::reply_error("connection", "cannot open missing.db")
                .with_token(request.token.unwrap());
            engine.send(reply.to_json().unwrap()).await.unwrap();
        });

        let err = ClientBuilder::new()
            .symbol_table("missing.db")
            .build(client_side)
            .await
            .err()
            .unwrap();
        assert_eq!(err.engine_reason(), Some("cannot open missing.db"));
    }

    #[tokio::test]
    async fn test_rejected_handshake_closes_transport() {
        let (client_side, engine) = MemoryTransport::pair();
        let engine = std::sync::Arc::new(engine);

        let responder = {
            let engine = std::sync::Arc::clone(&engine);
            tokio::spawn(async move {
                let frame = engine.recv().await.unwrap().unwrap();
                let request = Message::from_json(&frame).unwrap();
                let reply = Message::reply_error("connection", "bad locator")
                    .with_token(request.token.unwrap());
                engine.send(reply.to_json().unwrap()).await.unwrap();
            })
        };

        let err = ClientBuilder::new()
            .symbol_table("bad.db")
            .build(client_side)
            .await
            .err()
            .unwrap();
        responder.await.unwrap();
        assert_eq!(err.engine_reason(), Some("bad locator"));
        assert!(engine.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_build_without_symbol_table_sends_nothing() {
        let (client_side, engine) = MemoryTransport::pair();
        let client = ClientBuilder::new().build(client_side).await.unwrap();
        client.close().await.unwrap();
        assert!(engine.recv().await.unwrap().is_none());
    }
}
