//! WebSocket transport configuration types.

use std::time::Duration;

/// Configuration for the WebSocket client transport.
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// WebSocket URL (ws:// or wss://).
    pub url: String,
    /// Ceiling for the whole connect phase, retries included.
    pub connect_timeout: Duration,
    /// Delay schedule between connect attempts.
    pub reconnect_backoff: ExponentialBackoff,
    /// Maximum frame size in bytes.
    pub max_message_size: usize,
}

impl WebSocketConfig {
    /// Create a new WebSocket configuration.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            reconnect_backoff: ExponentialBackoff::default(),
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }

    /// Set the connect ceiling.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the backoff between connect attempts.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Set the maximum frame size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self::new("ws://localhost:8888")
    }
}

/// Exponential backoff configuration for connect retries.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Initial delay.
    pub initial_delay: Duration,
    /// Maximum delay.
    pub max_delay: Duration,
    /// Multiplier for each attempt.
    pub multiplier: f64,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff configuration.
    #[must_use]
    pub const fn new(initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// Calculate the delay for a given attempt number.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let delay = Duration::from_millis(delay_ms as u64);
        std::cmp::min(delay, self.max_delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
        }
    }
}

/// Server-side configuration for WebSocket listeners.
#[derive(Debug, Clone)]
pub struct WebSocketServerConfig {
    /// Maximum frame size in bytes.
    pub max_message_size: usize,
    /// How long a peer may take to complete the upgrade handshake.
    pub handshake_timeout: Duration,
}

impl WebSocketServerConfig {
    /// Create a new server configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_message_size: 16 * 1024 * 1024, // 16 MB
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Set maximum frame size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the handshake timeout.
    #[must_use]
    pub const fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Default for WebSocketServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
