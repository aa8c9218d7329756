//! Provider server shell.
//!
//! [`ProviderServer`] accepts peer connections and answers every query on
//! them against one shared [`SymbolProvider`].
//!
//! # Lifecycle
//!
//! ```text
//! Created -> Serving -> Stopping -> Stopped
//! ```
//!
//! While stopping, no new connection is accepted and queries already being
//! answered finish before their connection closes.
//!
//! # Example
//!
//! ```no_run
//! use hgdb_provider::{ProviderConfig, ProviderServer, RunMode};
//! use hgdb_symbols::SymbolIndex;
//!
//! # async fn example() -> Result<(), hgdb_core::HgdbError> {
//! let server = ProviderServer::new(SymbolIndex::default(), ProviderConfig::default());
//! let handle = server.run(RunMode::Background).await?;
//! println!("serving symbols on {}", handle.local_addr());
//! handle.stop();
//! handle.join().await;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use event_listener::Event;
use hgdb_core::error::HgdbError;
use hgdb_transport::{Transport, WebSocketListener};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::provider::SymbolProvider;
use crate::query::{parse_query, route_query};

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8889";

/// Provider server configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Address to listen on. Port 0 picks a free port.
    pub bind_addr: String,
    /// Maximum simultaneous peer connections.
    pub max_connections: usize,
    /// How long open connections may take to finish after a stop.
    pub drain_timeout: Duration,
}

impl ProviderConfig {
    /// Create a configuration listening on `bind_addr`.
    #[must_use]
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Self::default()
        }
    }

    /// Set the connection limit.
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set the drain timeout.
    #[must_use]
    pub const fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_connections: 64,
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Where [`ProviderServer::run`] serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Serve on the calling task until stopped.
    Blocking,
    /// Serve on a spawned task and return immediately.
    Background,
}

/// Provider lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProviderState {
    /// Built, not yet listening.
    Created = 0,
    /// Accepting connections and answering queries.
    Serving = 1,
    /// No new connections; open ones are finishing.
    Stopping = 2,
    /// Every connection is closed.
    Stopped = 3,
}

impl ProviderState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Serving,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// State shared by the server, its connections and its handles.
struct Lifecycle {
    state: AtomicU8,
    stop_requested: AtomicBool,
    stop: Event,
    stopped: Event,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ProviderState::Created as u8),
            stop_requested: AtomicBool::new(false),
            stop: Event::new(),
            stopped: Event::new(),
        }
    }

    fn state(&self) -> ProviderState {
        ProviderState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set(&self, state: ProviderState) {
        self.state.store(state as u8, Ordering::SeqCst);
        debug!(state = ?state, "provider state changed");
        if state == ProviderState::Stopped {
            self.stopped.notify(usize::MAX);
        }
    }

    fn request_stop(&self) {
        if !self.stop_requested.swap(true, Ordering::SeqCst) {
            info!("provider stop requested");
        }
        self.stop.notify(usize::MAX);
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Resolves once a stop has been requested.
    async fn wait_stop(&self) {
        loop {
            let listener = self.stop.listen();
            if self.stop_requested() {
                return;
            }
            listener.await;
        }
    }

    async fn wait_stopped(&self) {
        loop {
            let listener = self.stopped.listen();
            if self.state() == ProviderState::Stopped {
                return;
            }
            listener.await;
        }
    }
}

/// A symbol table provider serving queries over WebSocket.
pub struct ProviderServer<P> {
    provider: Arc<P>,
    config: ProviderConfig,
    lifecycle: Arc<Lifecycle>,
}

impl<P: SymbolProvider + 'static> ProviderServer<P> {
    /// Create a server around `provider`.
    pub fn new(provider: P, config: ProviderConfig) -> Self {
        Self::from_arc(Arc::new(provider), config)
    }

    /// Create a server around a shared provider.
    pub fn from_arc(provider: Arc<P>, config: ProviderConfig) -> Self {
        Self {
            provider,
            config,
            lifecycle: Arc::new(Lifecycle::new()),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProviderState {
        self.lifecycle.state()
    }

    /// The served provider.
    #[must_use]
    pub const fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// A stop switch usable from anywhere, e.g. while
    /// [`run`](Self::run) blocks in another task.
    #[must_use]
    pub fn stopper(&self) -> ProviderStopper {
        ProviderStopper {
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }

    /// Bind the listener and start serving.
    ///
    /// With [`RunMode::Blocking`] this returns once the server has stopped;
    /// with [`RunMode::Background`] it returns as soon as the listener is
    /// bound.
    pub async fn run(self, mode: RunMode) -> Result<ProviderHandle, HgdbError> {
        if self.state() != ProviderState::Created {
            return Err(HgdbError::internal("provider server already started"));
        }

        let listener = WebSocketListener::bind(&self.config.bind_addr)
            .await
            .map_err(HgdbError::from)?;
        let local_addr = listener.local_socket_addr();
        self.lifecycle.set(ProviderState::Serving);
        info!(addr = %local_addr, mode = ?mode, "symbol provider serving");

        let lifecycle = Arc::clone(&self.lifecycle);
        let accept = accept_loop(listener, self.provider, self.config, Arc::clone(&lifecycle));
        let task = match mode {
            RunMode::Blocking => {
                accept.await;
                None
            }
            RunMode::Background => Some(tokio::spawn(accept)),
        };

        Ok(ProviderHandle {
            local_addr,
            lifecycle,
            task,
        })
    }

    /// Answer queries on one already established connection until the peer
    /// closes it or the server is stopped.
    pub async fn serve_transport<T: Transport>(&self, transport: T) -> Result<(), HgdbError> {
        serve_connection(&transport, &*self.provider, &self.lifecycle).await
    }
}

/// Requests a stop of a running server.
#[derive(Clone)]
pub struct ProviderStopper {
    lifecycle: Arc<Lifecycle>,
}

impl ProviderStopper {
    /// Stop accepting connections and drain the open ones.
    pub fn stop(&self) {
        self.lifecycle.request_stop();
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProviderState {
        self.lifecycle.state()
    }
}

/// Control over a started provider server.
pub struct ProviderHandle {
    local_addr: SocketAddr,
    lifecycle: Arc<Lifecycle>,
    task: Option<JoinHandle<()>>,
}

impl ProviderHandle {
    /// The bound address.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// WebSocket URL of the provider, suitable as a symbol table locator.
    #[must_use]
    pub fn url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ProviderState {
        self.lifecycle.state()
    }

    /// Stop accepting connections and drain the open ones. Returns
    /// immediately; use [`join`](Self::join) to wait.
    pub fn stop(&self) {
        self.lifecycle.request_stop();
    }

    /// Wait until the server reaches [`ProviderState::Stopped`].
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "provider task failed");
            }
        }
        self.lifecycle.wait_stopped().await;
    }

    /// Stop and wait.
    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}

async fn accept_loop<P: SymbolProvider + 'static>(
    listener: WebSocketListener,
    provider: Arc<P>,
    config: ProviderConfig,
    lifecycle: Arc<Lifecycle>,
) {
    let mut connections = JoinSet::new();

    loop {
        while connections.try_join_next().is_some() {}

        tokio::select! {
            () = lifecycle.wait_stop() => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => {
                    if connections.len() >= config.max_connections {
                        warn!(limit = config.max_connections, "provider connection limit reached, refusing peer");
                        if let Err(e) = conn.close().await {
                            debug!(error = %e, "closing refused peer failed");
                        }
                        continue;
                    }
                    let provider = Arc::clone(&provider);
                    let lifecycle = Arc::clone(&lifecycle);
                    connections.spawn(async move {
                        if let Err(e) = serve_connection(&conn, &*provider, &lifecycle).await {
                            warn!(error = %e, "provider connection ended with an error");
                        }
                        if let Err(e) = conn.close().await {
                            debug!(error = %e, "closing provider connection failed");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "failed to accept provider connection"),
            },
        }
    }

    lifecycle.set(ProviderState::Stopping);
    drop(listener);

    let open = connections.len();
    if open > 0 {
        info!(connections = open, "draining provider connections");
    }
    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(config.drain_timeout, drain).await.is_err() {
        warn!(timeout = ?config.drain_timeout, "provider drain timed out, aborting connections");
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }

    lifecycle.set(ProviderState::Stopped);
    info!("symbol provider stopped");
}

/// One connection's message loop. A query in progress always completes.
async fn serve_connection<T: Transport, P: SymbolProvider>(
    transport: &T,
    provider: &P,
    lifecycle: &Lifecycle,
) -> Result<(), HgdbError> {
    debug!(peer = ?transport.metadata().remote_addr, "provider connection opened");

    loop {
        let frame = tokio::select! {
            () = lifecycle.wait_stop() => break,
            frame = transport.recv() => frame.map_err(Into::into)?,
        };
        let Some(frame) = frame else {
            debug!("provider peer closed the connection");
            break;
        };

        let query = parse_query(&frame);
        let reply = route_query(provider, &query).await;
        transport.send(reply.to_string()).await.map_err(Into::into)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hgdb_core::types::{BreakpointSymbol, ContextVariable, GeneratorVariable, Variable};
    use hgdb_transport::MemoryTransport;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    struct Fixed;

    impl SymbolProvider for Fixed {
        async fn get_breakpoint(&self, id: u64) -> Result<Option<BreakpointSymbol>, HgdbError> {
            Ok((id == 0).then(|| BreakpointSymbol::new(0, 0, "a.sv", 6)))
        }
        async fn get_breakpoints(
            &self,
            _: &str,
            _: u32,
            _: u32,
        ) -> Result<Vec<BreakpointSymbol>, HgdbError> {
            Ok(Vec::new())
        }
        async fn get_instance_name(&self, id: u64) -> Result<Option<String>, HgdbError> {
            Ok((id == 0).then(|| "child".to_string()))
        }
        async fn get_instance_id_by_name(&self, _: &str) -> Result<Option<u64>, HgdbError> {
            Ok(None)
        }
        async fn get_instance_id_by_bp(&self, _: u64) -> Result<Option<u64>, HgdbError> {
            Ok(None)
        }
        async fn get_context_variables(
            &self,
            _: u64,
        ) -> Result<Vec<(ContextVariable, Variable)>, HgdbError> {
            Ok(Vec::new())
        }
        async fn get_generator_variables(
            &self,
            _: u64,
        ) -> Result<Vec<(GeneratorVariable, Variable)>, HgdbError> {
            Ok(Vec::new())
        }
        async fn get_instance_names(&self) -> Result<Vec<String>, HgdbError> {
            Ok(vec!["child".to_string()])
        }
    }

    async fn ask(peer: &MemoryTransport, frame: &str) -> Value {
        peer.send(frame.to_string()).await.unwrap();
        serde_json::from_str(&peer.recv().await.unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8889");
        assert_eq!(config.drain_timeout, Duration::from_secs(5));
        let config = ProviderConfig::new("127.0.0.1:0").with_max_connections(2);
        assert_eq!(config.max_connections, 2);
    }

    #[tokio::test]
    async fn test_bad_queries_keep_connection_open() {
        let server = Arc::new(ProviderServer::new(Fixed, ProviderConfig::default()));
        let (peer, conn) = MemoryTransport::pair();

        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve_transport(conn).await })
        };

        assert_eq!(ask(&peer, r#"{"payload": {"type": "unknown_query"}}"#).await, json!({}));
        assert_eq!(ask(&peer, "not json at all").await, json!({}));
        assert_eq!(
            ask(&peer, r#"{"payload": {"type": "get_instance_name", "instance_id": 0}}"#).await,
            json!({"result": "child"})
        );

        peer.close().await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_lifecycle_background() {
        let server = ProviderServer::new(Fixed, ProviderConfig::new("127.0.0.1:0"));
        assert_eq!(server.state(), ProviderState::Created);

        let handle = server.run(RunMode::Background).await.unwrap();
        assert_eq!(handle.state(), ProviderState::Serving);
        assert_ne!(handle.local_addr().port(), 0);
        assert!(handle.url().starts_with("ws://127.0.0.1:"));

        handle.stop();
        let lifecycle = Arc::clone(&handle.lifecycle);
        handle.join().await;
        assert_eq!(lifecycle.state(), ProviderState::Stopped);
    }

    #[tokio::test]
    async fn test_blocking_run_returns_after_stop() {
        let server = ProviderServer::new(Fixed, ProviderConfig::new("127.0.0.1:0"));
        let stopper = server.stopper();

        let stop = tokio::spawn(async move {
            while stopper.state() != ProviderState::Serving {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            stopper.stop();
        });

        let handle = server.run(RunMode::Blocking).await.unwrap();
        assert_eq!(handle.state(), ProviderState::Stopped);
        stop.await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_ends_idle_connection() {
        let server = Arc::new(ProviderServer::new(Fixed, ProviderConfig::default()));
        let (_peer, conn) = MemoryTransport::pair();

        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve_transport(conn).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        server.stopper().stop();
        task.await.unwrap().unwrap();
    }
}
