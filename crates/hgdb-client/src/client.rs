//! Debug session client.
//!
//! The [`DebugClient`] owns one connection to an engine. It handles:
//!
//! - Token assignment and request/reply correlation
//! - Separate queues for breakpoint events and everything else
//! - One typed method per debugger operation
//! - Connection lifecycle

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_lock::{Mutex, RwLock};
use event_listener::Event;
use futures::channel::oneshot;
use hgdb_core::error::{HgdbError, TransportErrorKind};
use hgdb_core::protocol::{Message, Token, TokenGenerator};
use hgdb_core::types::{
    BpLocationPayload, BreakpointAction, BreakpointEvent, BreakpointIdPayload, BreakpointInfo,
    BreakpointKind, BreakpointPayload, ClientRequest, Command, CommandPayload, ConnectionPayload,
    DataBreakpointAction, DataBreakpointPayload, DebuggerInfoPayload, EvaluationPayload,
    InfoCommand, MonitorPayload, MonitorTarget, MonitorType, OptionChangePayload, PathMapping,
    PathMappingPayload, SetValuePayload, breakpoint_list,
};
use hgdb_transport::Transport;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::{CallOptions, ClientConfig};

/// An unbounded FIFO of inbound frames. Nothing queued is ever discarded.
struct Inbox {
    name: &'static str,
    queue: Mutex<VecDeque<Message>>,
    ready: Event,
}

impl Inbox {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            queue: Mutex::new(VecDeque::new()),
            ready: Event::new(),
        }
    }

    async fn push(&self, message: Message) {
        let mut queue = self.queue.lock().await;
        queue.push_back(message);
        trace!(queue = self.name, queued = queue.len(), "frame queued");
        drop(queue);
        self.ready.notify(usize::MAX);
    }

    async fn pop(&self, running: &AtomicBool, timeout: Option<Duration>) -> Option<Message> {
        let deadline = timeout.map(|d| tokio::time::Instant::now() + d);
        loop {
            let listener = self.ready.listen();
            if let Some(message) = self.queue.lock().await.pop_front() {
                return Some(message);
            }
            if !running.load(Ordering::SeqCst) {
                return None;
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, listener).await.is_err() {
                        return None;
                    }
                }
                None => listener.await,
            }
        }
    }

    fn wake_all(&self) {
        self.ready.notify(usize::MAX);
    }
}

/// State shared with the router task.
struct Shared {
    pending: RwLock<HashMap<Token, oneshot::Sender<Message>>>,
    replies: Inbox,
    events: Inbox,
    running: AtomicBool,
}

impl Shared {
    /// Mark the session dead and release every waiter.
    async fn shut_down(&self) {
        self.running.store(false, Ordering::SeqCst);
        // Dropping the senders fails every pending call.
        self.pending.write().await.clear();
        self.replies.wake_all();
        self.events.wake_all();
    }
}

/// A debug session connected to an engine.
///
/// Replies are matched to calls by token. Unmatched breakpoint events go to
/// a dedicated queue read by [`recv_bp`](Self::recv_bp); every other
/// unmatched frame goes to the general queue read by [`recv`](Self::recv).
///
/// # Example
///
/// ```no_run
/// use hgdb_client::ClientBuilder;
///
/// # async fn example() -> Result<(), hgdb_core::HgdbError> {
/// let client = ClientBuilder::new()
///     .symbol_table("/tmp/design.db")
///     .connect("ws://localhost:8888")
///     .await?;
///
/// client.set_breakpoint("top.sv", 42, 0, None).await?;
/// client.continue_().await?;
/// if let Some(hit) = client.recv_bp_event(None).await? {
///     println!("stopped at line {} at time {}", hit.line_num, hit.time);
/// }
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct DebugClient<T: Transport + 'static> {
    transport: Arc<T>,
    config: ClientConfig,
    tokens: TokenGenerator,
    shared: Arc<Shared>,
    closed: AtomicBool,
    router: JoinHandle<()>,
}

impl<T: Transport + 'static> DebugClient<T> {
    /// Start a session over an established transport. Must be called from
    /// within a Tokio runtime.
    pub(crate) fn new(transport: T, config: ClientConfig) -> Self {
        let transport = Arc::new(transport);
        let shared = Arc::new(Shared {
            pending: RwLock::new(HashMap::new()),
            replies: Inbox::new("replies"),
            events: Inbox::new("breakpoints"),
            running: AtomicBool::new(true),
        });

        let router = Self::spawn_message_router(Arc::clone(&transport), Arc::clone(&shared));

        Self {
            transport,
            tokens: TokenGenerator::new(config.token_prefix.clone()),
            config,
            shared,
            closed: AtomicBool::new(false),
            router,
        }
    }

    /// Spawn the task that reads and classifies every inbound frame.
    fn spawn_message_router(transport: Arc<T>, shared: Arc<Shared>) -> JoinHandle<()> {
        tokio::spawn(async move {
            debug!("starting client message router");

            loop {
                match transport.recv().await {
                    Ok(Some(frame)) => Self::route_frame(&frame, &shared).await,
                    Ok(None) => {
                        info!("connection closed by engine");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "transport error in message router");
                        break;
                    }
                }
            }

            shared.shut_down().await;
            debug!("client message router stopped");
        })
    }

    /// Hand a frame to whichever waiter it belongs to.
    async fn route_frame(frame: &str, shared: &Shared) {
        let message = match Message::from_json(frame) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                return;
            }
        };

        if let Some(token) = message.token.clone() {
            let waiter = shared.pending.write().await.remove(&token);
            if let Some(waiter) = waiter {
                trace!(token = %token, "routing reply to pending call");
                if waiter.send(message).is_err() {
                    warn!(token = %token, "caller stopped waiting before the reply arrived");
                }
                return;
            }
        }

        if message.is_breakpoint_event() {
            trace!("queueing breakpoint event");
            shared.events.push(message).await;
        } else {
            trace!(request_type = %message.kind, "queueing unsolicited frame");
            shared.replies.push(message).await;
        }
    }

    /// Send the `connection` request if a symbol table is configured.
    pub(crate) async fn handshake(&self) -> Result<(), HgdbError> {
        let Some(db_filename) = self.config.symbol_table.clone() else {
            return Ok(());
        };
        info!(symbol_table = %db_filename, "attaching symbol table");
        self.call(
            ClientRequest::Connection(ConnectionPayload {
                db_filename,
                path_mapping: self.config.path_mapping.clone(),
            }),
            CallOptions::default(),
        )
        .await?;
        Ok(())
    }

    /// The session configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether the session can still exchange frames.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
            && self.shared.running.load(Ordering::SeqCst)
            && self.transport.is_connected()
    }

    fn ensure_connected(&self) -> Result<(), HgdbError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(HgdbError::NotConnected)
        }
    }

    // ========================================================================
    // Raw traffic
    // ========================================================================

    /// Next frame that is neither a pending reply nor a breakpoint event.
    ///
    /// Returns `None` when `timeout` expires or the connection is gone.
    /// A zero timeout only checks what is already queued. Expiry never
    /// affects the connection.
    pub async fn recv(&self, timeout: Option<Duration>) -> Option<Message> {
        self.shared.replies.pop(&self.shared.running, timeout).await
    }

    /// Next breakpoint event, with the same sentinel rules as
    /// [`recv`](Self::recv).
    pub async fn recv_bp(&self, timeout: Option<Duration>) -> Option<Message> {
        self.shared.events.pop(&self.shared.running, timeout).await
    }

    /// Next breakpoint event, decoded.
    pub async fn recv_bp_event(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Option<BreakpointEvent>, HgdbError> {
        self.recv_bp(timeout)
            .await
            .map(|message| message.payload_as::<BreakpointEvent>())
            .transpose()
    }

    /// Send a request without waiting for its reply.
    ///
    /// A reply, if the engine sends one, lands in the general queue.
    pub async fn send(&self, request: ClientRequest) -> Result<Token, HgdbError> {
        self.ensure_connected()?;
        let token = self.tokens.next_token();
        let request_type = request.request_type();
        let frame = request.into_message(token.clone())?.to_json()?;

        debug!(token = %token, request_type = %request_type, "sending request without reply");
        self.transport.send(frame).await.map_err(Into::into)?;
        Ok(token)
    }

    /// Send a request and wait for its correlated reply.
    pub async fn call(
        &self,
        request: ClientRequest,
        options: CallOptions,
    ) -> Result<Message, HgdbError> {
        self.ensure_connected()?;
        let token = options.token.unwrap_or_else(|| self.tokens.next_token());
        let request_type = request.request_type();
        let frame = request.into_message(token.clone())?.to_json()?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.shared.pending.write().await;
            if pending.contains_key(&token) {
                return Err(HgdbError::protocol(format!(
                    "token '{token}' is already waiting for a reply"
                )));
            }
            pending.insert(token.clone(), tx);
        }

        debug!(token = %token, request_type = %request_type, "sending request");
        if let Err(e) = self.transport.send(frame).await {
            self.shared.pending.write().await.remove(&token);
            return Err(e.into());
        }

        let timeout = options.timeout.or(self.config.request_timeout);
        let reply = match timeout {
            Some(duration) => match tokio::time::timeout(duration, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.shared.pending.write().await.remove(&token);
                    return Err(HgdbError::timeout(format!("'{request_type}' reply"), duration));
                }
            },
            None => rx.await,
        };
        let reply = reply.map_err(|_| {
            HgdbError::transport(
                TransportErrorKind::ConnectionClosed,
                format!("connection closed before the '{request_type}' reply arrived"),
            )
        })?;

        if options.check_error {
            reply.into_result()
        } else {
            Ok(reply)
        }
    }

    async fn call_checked(&self, request: ClientRequest) -> Result<Message, HgdbError> {
        self.call(request, CallOptions::default()).await
    }

    // ========================================================================
    // Breakpoints
    // ========================================================================

    /// Replace the engine's source-root substitutions.
    pub async fn set_path_mapping(&self, path_mapping: PathMapping) -> Result<(), HgdbError> {
        self.call_checked(ClientRequest::PathMapping(PathMappingPayload { path_mapping }))
            .await?;
        Ok(())
    }

    /// Insert a breakpoint at a source location. A zero column covers the
    /// whole line.
    pub async fn set_breakpoint(
        &self,
        filename: &str,
        line_num: u32,
        column_num: u32,
        condition: Option<&str>,
    ) -> Result<Message, HgdbError> {
        let mut payload =
            BreakpointPayload::new(filename, line_num, BreakpointAction::Add).with_column(column_num);
        payload.condition = condition.map(str::to_string);
        self.call_checked(ClientRequest::Breakpoint(payload)).await
    }

    /// Remove the breakpoints at a source location.
    pub async fn remove_breakpoint(
        &self,
        filename: &str,
        line_num: u32,
        column_num: u32,
    ) -> Result<Message, HgdbError> {
        let payload = BreakpointPayload::new(filename, line_num, BreakpointAction::Remove)
            .with_column(column_num);
        self.call_checked(ClientRequest::Breakpoint(payload)).await
    }

    /// Insert one breakpoint by symbol id.
    pub async fn set_breakpoint_id(
        &self,
        id: u64,
        condition: Option<&str>,
    ) -> Result<Message, HgdbError> {
        self.call_checked(ClientRequest::BreakpointId(BreakpointIdPayload {
            id,
            action: BreakpointAction::Add,
            condition: condition.map(str::to_string),
        }))
        .await
    }

    /// Remove one breakpoint by symbol id.
    pub async fn remove_breakpoint_id(&self, id: u64) -> Result<Message, HgdbError> {
        self.call_checked(ClientRequest::BreakpointId(BreakpointIdPayload {
            id,
            action: BreakpointAction::Remove,
            condition: None,
        }))
        .await
    }

    fn data_breakpoint(
        breakpoint_id: u64,
        var_name: &str,
        action: DataBreakpointAction,
        condition: Option<&str>,
    ) -> ClientRequest {
        ClientRequest::DataBreakpoint(DataBreakpointPayload {
            var_name: var_name.to_string(),
            breakpoint_id,
            action,
            condition: condition.map(str::to_string),
        })
    }

    /// Watch writes to `var_name`, resolved in the context of `breakpoint_id`.
    pub async fn set_data_breakpoint(
        &self,
        breakpoint_id: u64,
        var_name: &str,
        condition: Option<&str>,
    ) -> Result<Message, HgdbError> {
        self.call_checked(Self::data_breakpoint(
            breakpoint_id,
            var_name,
            DataBreakpointAction::Add,
            condition,
        ))
        .await
    }

    /// Stop watching writes to `var_name`.
    pub async fn remove_data_breakpoint(
        &self,
        breakpoint_id: u64,
        var_name: &str,
    ) -> Result<Message, HgdbError> {
        self.call_checked(Self::data_breakpoint(
            breakpoint_id,
            var_name,
            DataBreakpointAction::Remove,
            None,
        ))
        .await
    }

    /// Ask whether a data breakpoint could be inserted, without inserting it.
    pub async fn validate_data_breakpoint(
        &self,
        breakpoint_id: u64,
        var_name: &str,
    ) -> Result<bool, HgdbError> {
        let reply = self
            .call(
                Self::data_breakpoint(breakpoint_id, var_name, DataBreakpointAction::Info, None),
                CallOptions::unchecked(),
            )
            .await?;
        Ok(!reply.is_error())
    }

    /// Inserted breakpoints, as reported by the engine.
    pub async fn get_breakpoints(&self) -> Result<Vec<BreakpointInfo>, HgdbError> {
        let payload = self.get_info(InfoCommand::Breakpoints).await?;
        breakpoint_list(&payload)
    }

    /// Inserted breakpoints with the data bit set.
    pub async fn get_current_data_breakpoints(&self) -> Result<Vec<BreakpointInfo>, HgdbError> {
        Ok(self
            .get_breakpoints()
            .await?
            .into_iter()
            .filter(|bp| bp.kind.contains(BreakpointKind::DATA))
            .collect())
    }

    /// Breakpoint locations the symbol table knows for a file or line.
    pub async fn request_breakpoint_location(
        &self,
        filename: &str,
        line_num: Option<u32>,
        column_num: Option<u32>,
    ) -> Result<Vec<BreakpointInfo>, HgdbError> {
        let reply = self
            .call_checked(ClientRequest::BpLocation(BpLocationPayload {
                filename: filename.to_string(),
                line_num,
                column_num,
            }))
            .await?;
        breakpoint_list(&reply.payload)
    }

    // ========================================================================
    // Flow control
    // ========================================================================

    async fn command(&self, command: Command, time: Option<u64>) -> Result<(), HgdbError> {
        self.send(ClientRequest::Command(CommandPayload { command, time }))
            .await?;
        Ok(())
    }

    /// Run until the next breakpoint.
    pub async fn continue_(&self) -> Result<(), HgdbError> {
        self.command(Command::Continue, None).await
    }

    /// Stop the simulation.
    pub async fn stop(&self) -> Result<(), HgdbError> {
        self.command(Command::Stop, None).await
    }

    /// Advance to the next evaluation point.
    pub async fn step_over(&self) -> Result<(), HgdbError> {
        self.command(Command::StepOver, None).await
    }

    /// Return to the previous evaluation point.
    pub async fn step_back(&self) -> Result<(), HgdbError> {
        self.command(Command::StepBack, None).await
    }

    /// Run backwards to the previous breakpoint.
    pub async fn reverse_continue(&self) -> Result<(), HgdbError> {
        self.command(Command::ReverseContinue, None).await
    }

    /// Go to simulation time `time`.
    pub async fn jump(&self, time: u64) -> Result<(), HgdbError> {
        self.command(Command::Jump, Some(time)).await
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Query debugger state. Returns the reply payload.
    pub async fn get_info(&self, command: InfoCommand) -> Result<Value, HgdbError> {
        let reply = self
            .call_checked(ClientRequest::DebuggerInfo(DebuggerInfoPayload { command }))
            .await?;
        Ok(reply.payload)
    }

    /// Evaluate an expression in an instance scope, or in a breakpoint
    /// context when `is_context` is set.
    pub async fn evaluate(
        &self,
        scope: &str,
        expression: &str,
        is_context: bool,
    ) -> Result<String, HgdbError> {
        let reply = self
            .call_checked(ClientRequest::Evaluation(EvaluationPayload {
                scope: scope.to_string(),
                expression: expression.to_string(),
                is_context,
            }))
            .await?;
        match reply.payload.get("result") {
            Some(Value::String(result)) => Ok(result.clone()),
            Some(other) => Ok(other.to_string()),
            None => Err(HgdbError::protocol("evaluation reply without a result")),
        }
    }

    /// Change runtime options.
    pub async fn change_option(&self, options: OptionChangePayload) -> Result<(), HgdbError> {
        self.call_checked(ClientRequest::OptionChange(options))
            .await?;
        Ok(())
    }

    /// Start watching a variable. Returns the engine-assigned track id.
    pub async fn add_monitor(
        &self,
        var_name: &str,
        monitor_type: MonitorType,
        target: MonitorTarget,
    ) -> Result<u64, HgdbError> {
        let reply = self
            .call_checked(ClientRequest::Monitor(MonitorPayload::add(
                var_name,
                monitor_type,
                target,
            )))
            .await?;
        reply
            .payload
            .get("track_id")
            .and_then(Value::as_u64)
            .ok_or_else(|| HgdbError::protocol("monitor reply without a track_id"))
    }

    /// Stop a watch.
    pub async fn remove_monitor(&self, track_id: u64) -> Result<(), HgdbError> {
        self.call_checked(ClientRequest::Monitor(MonitorPayload::remove(track_id)))
            .await?;
        Ok(())
    }

    /// Force a value onto a variable.
    pub async fn set_value(
        &self,
        var_name: &str,
        value: i64,
        instance_id: Option<u64>,
        breakpoint_id: Option<u64>,
    ) -> Result<(), HgdbError> {
        self.call_checked(ClientRequest::SetValue(SetValuePayload {
            var_name: var_name.to_string(),
            value,
            instance_id,
            breakpoint_id,
        }))
        .await?;
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Close the session. Only the first call closes the transport.
    pub async fn close(&self) -> Result<(), HgdbError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("closing debug session");

        let result = self.transport.close().await.map_err(Into::into);
        self.router.abort();
        self.shared.shut_down().await;
        result
    }
}

impl<T: Transport + 'static> Drop for DebugClient<T> {
    fn drop(&mut self) {
        self.router.abort();
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let transport = Arc::clone(&self.transport);
            runtime.spawn(async move {
                if let Err(e) = transport.close().await {
                    debug!(error = %e, "closing dropped session failed");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hgdb_core::protocol::RequestType;
    use hgdb_transport::MemoryTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn session(config: ClientConfig) -> (DebugClient<MemoryTransport>, MemoryTransport) {
        let (client_side, engine_side) = MemoryTransport::pair();
        (DebugClient::new(client_side, config), engine_side)
    }

    async fn next_request(engine: &MemoryTransport) -> Message {
        let frame = engine.recv().await.unwrap().unwrap();
        Message::from_json(&frame).unwrap()
    }

    async fn reply(engine: &MemoryTransport, request: &Message, reply: Message) {
        let reply = match &request.token {
            Some(token) => reply.with_token(token.clone()),
            None => reply,
        };
        engine.send(reply.to_json().unwrap()).await.unwrap();
    }

    fn hit(line_num: u32) -> Message {
        Message::event(
            RequestType::Breakpoint,
            json!({"time": 10, "line_num": line_num, "instances": []}),
        )
    }

    #[tokio::test]
    async fn test_tokens_are_prefixed_and_increasing() {
        let (client, engine) = session(ClientConfig::default());
        client.continue_().await.unwrap();
        client.stop().await.unwrap();

        let first = next_request(&engine).await;
        let second = next_request(&engine).await;
        assert_eq!(first.token.unwrap().as_str(), "hgdb-1");
        assert_eq!(second.token.unwrap().as_str(), "hgdb-2");
        assert_eq!(first.payload, json!({"command": "continue"}));
    }

    #[tokio::test]
    async fn test_error_reply_is_raised_or_returned() {
        let (client, engine) = session(ClientConfig::default());
        let engine = Arc::new(engine);

        let responder = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                for _ in 0..2 {
                    let request = next_request(&engine).await;
                    reply(&engine, &request, Message::reply_error("breakpoint", "no such location")).await;
                }
            })
        };

        let err = client.set_breakpoint("f.sv", 99, 0, None).await.unwrap_err();
        assert_eq!(err.engine_reason(), Some("no such location"));

        let payload = BreakpointPayload::new("f.sv", 99, BreakpointAction::Add);
        let raw = client
            .call(ClientRequest::Breakpoint(payload), CallOptions::unchecked())
            .await
            .unwrap();
        assert!(raw.is_error());
        assert_eq!(raw.reason(), Some("no such location"));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_breakpoint_events_never_reach_recv() {
        let (client, engine) = session(ClientConfig::default());

        engine.send(hit(1).to_json().unwrap()).await.unwrap();
        let other = Message::reply_success("evaluation", json!({"result": "1"}));
        engine.send(other.to_json().unwrap()).await.unwrap();
        engine.send(hit(2).to_json().unwrap()).await.unwrap();

        let general = client.recv(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(general.kind, "evaluation");
        assert!(client.recv(Some(Duration::from_millis(20))).await.is_none());

        let first = client.recv_bp(Some(Duration::from_secs(1))).await.unwrap();
        let second = client.recv_bp_event(Some(Duration::from_secs(1))).await.unwrap().unwrap();
        assert_eq!(first.payload["line_num"], 1);
        assert_eq!(second.line_num, 2);
    }

    #[tokio::test]
    async fn test_reply_to_breakpoint_request_is_not_an_event() {
        let (client, engine) = session(ClientConfig::default());
        let engine = Arc::new(engine);

        let responder = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                let request = next_request(&engine).await;
                // An event first, then the reply that shares its type.
                engine.send(hit(7).to_json().unwrap()).await.unwrap();
                reply(&engine, &request, Message::reply_success("breakpoint", json!({}))).await;
            })
        };

        let reply = client.set_breakpoint("f.sv", 1, 0, None).await.unwrap();
        assert!(reply.token.is_some());
        let event = client.recv_bp(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(event.payload["line_num"], 7);
        assert!(client.recv_bp(Some(Duration::ZERO)).await.is_none());
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_recv_timeout_keeps_connection() {
        let (client, engine) = session(ClientConfig::default());

        assert!(client.recv(Some(Duration::from_millis(20))).await.is_none());
        assert!(client.is_connected());

        engine.send(hit(3).to_json().unwrap()).await.unwrap();
        assert!(client.recv_bp(Some(Duration::from_secs(1))).await.is_some());
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let (client, engine) = session(ClientConfig::default());
        engine.send("{garbage".to_string()).await.unwrap();
        engine.send(hit(4).to_json().unwrap()).await.unwrap();

        assert!(client.recv(Some(Duration::from_millis(20))).await.is_none());
        assert!(client.recv_bp(Some(Duration::from_secs(1))).await.is_some());
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_closed_connection_yields_sentinel_and_fails_calls() {
        let (client, engine) = session(ClientConfig::default());
        engine.close().await.unwrap();

        assert!(client.recv(None).await.is_none());
        assert!(client.recv_bp(None).await.is_none());
        let err = client.stop().await.unwrap_err();
        assert!(matches!(err, HgdbError::NotConnected));
    }

    #[tokio::test]
    async fn test_call_times_out_without_reply() {
        let config = ClientConfig {
            request_timeout: Some(Duration::from_millis(50)),
            ..ClientConfig::default()
        };
        let (client, engine) = session(config);

        let err = client.get_info(InfoCommand::Status).await.unwrap_err();
        assert!(matches!(err, HgdbError::Timeout { .. }));
        assert!(client.is_connected());

        // A late reply no longer matches and goes to the general queue.
        let request = next_request(&engine).await;
        reply(&engine, &request, Message::reply_success("debugger-info", json!({}))).await;
        let late = client.recv(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(late.token, request.token);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (client, engine) = session(ClientConfig::default());
        client.close().await.unwrap();
        client.close().await.unwrap();
        assert!(!client.is_connected());
        assert!(engine.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_late_breakpoint_reply_goes_to_general_queue() {
        let (client, engine) = session(ClientConfig::default());

        let late = Message::reply_success("breakpoint", json!({})).with_token("hgdb-99");
        engine.send(late.to_json().unwrap()).await.unwrap();
        engine.send(hit(5).to_json().unwrap()).await.unwrap();

        let general = client.recv(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(general.kind, "breakpoint");
        assert_eq!(general.token.as_ref().map(Token::as_str), Some("hgdb-99"));

        let event = client.recv_bp_event(Some(Duration::from_secs(1))).await.unwrap().unwrap();
        assert_eq!(event.line_num, 5);
        assert!(client.recv_bp(Some(Duration::ZERO)).await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_pending_token_is_rejected() {
        let (client, engine) = session(ClientConfig::default());
        let client = Arc::new(client);
        let options = CallOptions::default().with_token("mine");

        let first = {
            let client = Arc::clone(&client);
            let options = options.clone();
            tokio::spawn(async move {
                client
                    .call(ClientRequest::Command(CommandPayload {
                        command: Command::Continue,
                        time: None,
                    }), options)
                    .await
            })
        };
        let request = next_request(&engine).await;
        assert_eq!(request.token.as_ref().map(Token::as_str), Some("mine"));

        let err = client
            .call(ClientRequest::Command(CommandPayload {
                    command: Command::Stop,
                    time: None,
                }), options)
            .await
            .unwrap_err();
        assert!(matches!(err, HgdbError::Protocol { .. }), "got {err:?}");

        reply(&engine, &request, Message::reply_success("command", json!({}))).await;
        let reply = first.await.unwrap().unwrap();
        assert_eq!(reply.token.as_ref().map(Token::as_str), Some("mine"));
    }

    #[tokio::test]
    async fn test_event_backlog_is_never_dropped() {
        let (client, engine) = session(ClientConfig::default());
        let engine = Arc::new(engine);
        let total: u32 = 2000;

        let sender = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                for line in 1..=total {
                    engine.send(hit(line).to_json().unwrap()).await.unwrap();
                }
            })
        };
        sender.await.unwrap();

        for line in 1..=total {
            let event = client.recv_bp(Some(Duration::from_secs(1))).await.unwrap();
            assert_eq!(event.payload["line_num"], line);
        }
        assert!(client.recv_bp(Some(Duration::ZERO)).await.is_none());
    }
}
