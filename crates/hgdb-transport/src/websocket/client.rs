//! WebSocket transport client implementation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::config::WebSocketConfig;
use crate::error::TransportError;
use crate::runtime::AsyncMutex;
use crate::traits::{Transport, TransportMetadata};

/// WebSocket transport.
///
/// The stream is split so that a task parked in [`recv`](Transport::recv)
/// never blocks a concurrent [`send`](Transport::send).
pub struct WebSocketTransport<S = MaybeTlsStream<TcpStream>> {
    sink: AsyncMutex<SplitSink<WebSocketStream<S>, WsMessage>>,
    stream: AsyncMutex<SplitStream<WebSocketStream<S>>>,
    connected: AtomicBool,
    max_message_size: usize,
    metadata: TransportMetadata,
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
}

impl WebSocketTransport {
    /// Connect to a WebSocket server.
    ///
    /// Refused connections and other OS-level socket errors are retried
    /// with the configured backoff until `connect_timeout` has elapsed.
    /// Any other failure (bad URL, failed upgrade) is returned at once.
    pub async fn connect(config: WebSocketConfig) -> Result<Self, TransportError> {
        let url = url::Url::parse(&config.url)
            .map_err(|e| TransportError::connection(format!("Invalid WebSocket URL: {e}")))?;

        let deadline = Instant::now() + config.connect_timeout;
        let mut attempt = 0u32;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let err = match tokio::time::timeout(remaining, connect_async(url.as_str())).await {
                Ok(Ok((ws_stream, _response))) => {
                    tracing::info!(url = %config.url, attempts = attempt + 1, "WebSocket connected");
                    let metadata = TransportMetadata::new("websocket")
                        .remote_addr(config.url.clone())
                        .connected_now();
                    return Ok(Self::from_stream(
                        ws_stream,
                        metadata,
                        config.max_message_size,
                    ));
                }
                Ok(Err(e)) => TransportError::from(e),
                Err(_) => {
                    return Err(TransportError::Timeout {
                        operation: format!("WebSocket connect to {}", config.url),
                        duration: config.connect_timeout,
                    });
                }
            };

            let delay = config.reconnect_backoff.delay_for_attempt(attempt);
            if !err.is_retryable_connect() {
                return Err(err);
            }
            if Instant::now() + delay >= deadline {
                tracing::warn!(url = %config.url, attempts = attempt + 1, error = %err, "Giving up on WebSocket connect");
                return Err(err);
            }

            tracing::debug!(
                url = %config.url,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "WebSocket connect failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an established WebSocket stream.
    #[must_use]
    pub fn from_stream(
        ws_stream: WebSocketStream<S>,
        metadata: TransportMetadata,
        max_message_size: usize,
    ) -> Self {
        let (sink, stream) = ws_stream.split();
        Self {
            sink: AsyncMutex::new(sink),
            stream: AsyncMutex::new(stream),
            connected: AtomicBool::new(true),
            max_message_size,
            metadata,
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
        }
    }

    /// Get the number of frames sent.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Get the number of frames received.
    #[must_use]
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    fn check_size(&self, size: usize) -> Result<(), TransportError> {
        if size > self.max_message_size {
            return Err(TransportError::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }
        Ok(())
    }
}

impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Error = TransportError;

    async fn send(&self, frame: String) -> Result<(), Self::Error> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.check_size(frame.len())?;

        tracing::trace!(frame = %frame, "WebSocket send");
        self.sink
            .lock()
            .await
            .send(WsMessage::Text(frame))
            .await
            .map_err(TransportError::from)?;

        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn recv(&self) -> Result<Option<String>, Self::Error> {
        loop {
            let next = {
                let mut stream = self.stream.lock().await;
                stream.next().await
            };

            let text = match next {
                Some(Ok(WsMessage::Text(text))) => text,
                Some(Ok(WsMessage::Binary(bytes))) => String::from_utf8(bytes)
                    .map_err(|_| TransportError::invalid_message("binary frame is not UTF-8"))?,
                Some(Ok(WsMessage::Close(_))) | None => {
                    self.connected.store(false, Ordering::Release);
                    return Ok(None);
                }
                // Ping/pong are answered by tungstenite itself.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.connected.store(false, Ordering::Release);
                    return match TransportError::from(e) {
                        TransportError::ConnectionClosed => Ok(None),
                        other => Err(other),
                    };
                }
            };

            self.check_size(text.len())?;
            self.messages_received.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(frame = %text, "WebSocket recv");
            return Ok(Some(text));
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        tracing::debug!(remote = ?self.metadata.remote_addr, "Closing WebSocket");
        match self.sink.lock().await.close().await.map_err(TransportError::from) {
            Ok(()) | Err(TransportError::ConnectionClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn metadata(&self) -> TransportMetadata {
        self.metadata.clone()
    }
}
