//! WebSocket transport server implementation.
//!
//! ```ignore
//! let listener = WebSocketListener::bind("127.0.0.1:8889").await?;
//!
//! while let Ok(transport) = listener.accept().await {
//!     tokio::spawn(async move {
//!         while let Some(frame) = transport.recv().await? {
//!             // answer the frame
//!         }
//!     });
//! }
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpStream};

use super::client::WebSocketTransport;
use super::config::WebSocketServerConfig;
use crate::error::TransportError;
use crate::traits::{TransportListener, TransportMetadata};

/// A transport accepted by [`WebSocketListener`].
pub type ServerConnection = WebSocketTransport<TcpStream>;

/// WebSocket listener for server-side connections.
pub struct WebSocketListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: WebSocketServerConfig,
    next_connection_id: AtomicU64,
}

impl WebSocketListener {
    /// Bind with the default configuration.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with_config(addr, WebSocketServerConfig::default()).await
    }

    /// Bind with an explicit configuration.
    pub async fn bind_with_config(
        addr: &str,
        config: WebSocketServerConfig,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::Bind {
                addr: addr.to_string(),
                message: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(addr = %local_addr, "WebSocket listener started");

        Ok(Self {
            listener,
            local_addr,
            config,
            next_connection_id: AtomicU64::new(0),
        })
    }

    /// The bound socket address. Useful after binding port 0.
    #[must_use]
    pub const fn local_socket_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get the server configuration.
    #[must_use]
    pub const fn config(&self) -> &WebSocketServerConfig {
        &self.config
    }

    /// Accept the next peer and complete its upgrade handshake.
    pub async fn accept(&self) -> Result<ServerConnection, TransportError> {
        let (stream, peer) = self.listener.accept().await?;
        tracing::debug!(peer = %peer, "Accepting WebSocket connection");

        let handshake = tokio_tungstenite::accept_async(stream);
        let ws_stream = tokio::time::timeout(self.config.handshake_timeout, handshake)
            .await
            .map_err(|_| TransportError::Timeout {
                operation: format!("WebSocket handshake with {peer}"),
                duration: self.config.handshake_timeout,
            })?
            .map_err(TransportError::from)?;

        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(peer = %peer, connection_id, "WebSocket connection established");

        let metadata = TransportMetadata::new("websocket")
            .remote_addr(peer.to_string())
            .local_addr(self.local_addr.to_string())
            .connected_now();
        Ok(WebSocketTransport::from_stream(
            ws_stream,
            metadata,
            self.config.max_message_size,
        ))
    }
}

impl TransportListener for WebSocketListener {
    type Transport = ServerConnection;
    type Error = TransportError;

    async fn accept(&self) -> Result<Self::Transport, Self::Error> {
        Self::accept(self).await
    }

    fn local_addr(&self) -> Option<String> {
        Some(self.local_addr.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Transport;
    use crate::websocket::{ExponentialBackoff, WebSocketConfig};
    use std::time::Duration;

    #[tokio::test]
    async fn test_round_trip_over_socket() {
        let listener = WebSocketListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_socket_addr());

        let server = tokio::spawn(async move {
            let conn = listener.accept().await.unwrap();
            let frame = conn.recv().await.unwrap().unwrap();
            conn.send(format!("echo:{frame}")).await.unwrap();
            conn
        });

        let client = WebSocketTransport::connect(WebSocketConfig::new(url)).await.unwrap();
        client.send("hello".to_string()).await.unwrap();
        assert_eq!(client.recv().await.unwrap().as_deref(), Some("echo:hello"));
        assert_eq!(client.messages_sent(), 1);
        assert_eq!(client.messages_received(), 1);

        let conn = server.await.unwrap();
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert!(conn.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connect_retries_until_listener_appears() {
        // Reserve a port, release it, then bind it again after a delay.
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let server = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let listener = WebSocketListener::bind(&addr.to_string()).await.unwrap();
            listener.accept().await.unwrap()
        });

        let config = WebSocketConfig::new(format!("ws://{addr}"))
            .with_connect_timeout(Duration::from_secs(5))
            .with_backoff(ExponentialBackoff::new(
                Duration::from_millis(50),
                Duration::from_millis(100),
                2.0,
            ));
        let client = WebSocketTransport::connect(config).await.unwrap();
        assert!(client.is_connected());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_ceiling() {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let config = WebSocketConfig::new(format!("ws://{addr}"))
            .with_connect_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();
        let result = WebSocketTransport::connect(config).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_retried() {
        let result = WebSocketTransport::connect(WebSocketConfig::new("not a url")).await;
        assert!(matches!(result, Err(TransportError::Connection { .. })));
    }
}
