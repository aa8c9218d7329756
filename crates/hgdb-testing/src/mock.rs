//! A scripted debug engine.
//!
//! [`MockEngine`] speaks the engine side of the debug protocol over any
//! [`Transport`]. Symbols come from a [`SymbolIndex`]; simulation state is
//! replayed from a [`Timeline`], so flow control is deterministic:
//!
//! - `continue` stops at the next point whose breakpoint is inserted, or
//!   that writes a signal watched by a data breakpoint
//! - `step_over` moves to the next point
//! - `step_back` moves to the previous point, clamped at the first
//! - `reverse_continue` stops at the previous point `continue` would stop at
//! - `jump` moves to the first point at or after the requested time
//!
//! Each stop produces one `breakpoint` event followed by a `monitor` event
//! for every watch bound to the hit. Commands that find no point emit
//! nothing. `stop` ends the session and closes the transport.
//!
//! Path mappings are keyed by the symbol table root and map to the client
//! root. Breakpoint conditions are recorded and reported but never
//! evaluated. Values forced with `set-value` override replayed writes for
//! the rest of the session.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use hgdb_core::error::HgdbError;
use hgdb_core::protocol::{Message, RequestType, Token};
use hgdb_core::types::{
    BpLocationPayload, BreakpointAction, BreakpointEvent, BreakpointIdPayload, BreakpointInfo,
    BreakpointKind, BreakpointPayload, ClientRequest, Command, CommandPayload, ConnectionPayload,
    DataBreakpointAction, DataBreakpointPayload, EvaluationPayload, InfoCommand, InstanceHit,
    MonitorAction, MonitorEvent, MonitorPayload, MonitorTarget, MonitorType, PathMapping,
    SetValuePayload, ValueMap, Variable,
};
use hgdb_symbols::SymbolIndex;
use hgdb_transport::{Transport, TransportExt};
use serde_json::{Map, Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::timeline::Timeline;

/// An engine replaying a recorded timeline.
#[derive(Debug, Clone)]
pub struct MockEngine {
    index: Arc<SymbolIndex>,
    timeline: Arc<Timeline>,
    symbol_table: Option<String>,
}

impl MockEngine {
    /// Create an engine over a symbol index and a timeline.
    #[must_use]
    pub fn new(index: SymbolIndex, timeline: Timeline) -> Self {
        Self {
            index: Arc::new(index),
            timeline: Arc::new(timeline),
            symbol_table: None,
        }
    }

    /// Only accept `connection` requests naming this locator. Any non-empty
    /// locator is accepted otherwise.
    #[must_use]
    pub fn with_symbol_table(mut self, locator: impl Into<String>) -> Self {
        self.symbol_table = Some(locator.into());
        self
    }

    /// The symbols served.
    #[must_use]
    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    /// The timeline replayed.
    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Serve one session until the peer disconnects or sends `stop`.
    ///
    /// Every session starts from a fresh state: nothing inserted, before
    /// the first point.
    pub async fn serve<T: Transport>(&self, transport: T) -> Result<(), HgdbError> {
        let mut session = Session::new(self);
        info!(points = self.timeline.len(), "mock engine session started");

        loop {
            let Some(frame) = transport.recv().await.map_err(Into::into)? else {
                debug!("peer disconnected");
                break;
            };

            let outcome = match Message::from_json(&frame) {
                Ok(msg) => session.handle(&msg)?,
                Err(e) => {
                    warn!(error = %e, "unparsable frame");
                    Outcome::reply(Message::reply_error(
                        RequestType::Error.as_str(),
                        "unable to parse request",
                    ))
                }
            };

            for msg in &outcome.frames {
                if let Err(e) = transport.send_message(msg).await {
                    if transport.is_connected() {
                        return Err(e);
                    }
                    debug!("peer disconnected before the reply");
                    return Ok(());
                }
            }
            if outcome.stop {
                info!("stop requested");
                break;
            }
        }

        if let Err(e) = transport.close().await {
            debug!(error = %e, "close after session end failed");
        }
        info!("mock engine session ended");
        Ok(())
    }

    /// Serve one session on a background task.
    pub fn spawn<T: Transport + 'static>(&self, transport: T) -> JoinHandle<Result<(), HgdbError>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.serve(transport).await })
    }
}

/// Frames produced by one incoming message.
struct Outcome {
    frames: Vec<Message>,
    stop: bool,
}

impl Outcome {
    fn reply(msg: Message) -> Self {
        Self {
            frames: vec![msg],
            stop: false,
        }
    }

    const fn frames(frames: Vec<Message>) -> Self {
        Self {
            frames,
            stop: false,
        }
    }

    const fn stop() -> Self {
        Self {
            frames: Vec::new(),
            stop: true,
        }
    }
}

struct DataWatch {
    breakpoint_id: u64,
    var_name: String,
    signal: String,
    condition: Option<String>,
}

struct Watch {
    var_name: String,
    monitor_type: MonitorType,
    target: MonitorTarget,
}

type Reply = Result<Value, String>;

fn empty() -> Value {
    Value::Object(Map::new())
}

fn to_reply<V: serde::Serialize>(value: V) -> Reply {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

/// Per-connection engine state.
struct Session<'e> {
    index: &'e SymbolIndex,
    timeline: &'e Timeline,
    symbol_table: Option<&'e str>,
    path_mapping: PathMapping,
    inserted: BTreeMap<u64, Option<String>>,
    data: Vec<DataWatch>,
    monitors: BTreeMap<u64, Watch>,
    next_track_id: u64,
    options: Map<String, Value>,
    forced: BTreeMap<String, i64>,
    cursor: Option<usize>,
}

impl<'e> Session<'e> {
    fn new(engine: &'e MockEngine) -> Self {
        Self {
            index: &engine.index,
            timeline: &engine.timeline,
            symbol_table: engine.symbol_table.as_deref(),
            path_mapping: PathMapping::new(),
            inserted: BTreeMap::new(),
            data: Vec::new(),
            monitors: BTreeMap::new(),
            next_track_id: 1,
            options: Map::new(),
            forced: BTreeMap::new(),
            cursor: None,
        }
    }

    fn handle(&mut self, msg: &Message) -> Result<Outcome, HgdbError> {
        if !msg.request {
            warn!(kind = %msg.kind, "ignoring a non-request frame");
            return Ok(Outcome::frames(Vec::new()));
        }

        let request = match ClientRequest::from_message(msg) {
            Ok(request) => request,
            Err(e) => {
                warn!(kind = %msg.kind, error = %e, "rejecting request");
                let kind = msg
                    .request_type()
                    .map_or(RequestType::Error.as_str(), RequestType::as_str);
                return Ok(Outcome::reply(reply(kind, msg.token.as_ref(), Err(e.to_string()))));
            }
        };

        let kind = request.request_type();
        debug!(request_type = %kind, token = ?msg.token, "mock engine request");
        let result = match request {
            ClientRequest::Command(payload) => return self.command(&payload),
            ClientRequest::Connection(payload) => self.connect(payload),
            ClientRequest::PathMapping(payload) => {
                self.path_mapping = payload.path_mapping;
                Ok(empty())
            }
            ClientRequest::Breakpoint(payload) => self.breakpoint(&payload),
            ClientRequest::BreakpointId(payload) => self.breakpoint_id(&payload),
            ClientRequest::DataBreakpoint(payload) => self.data_breakpoint(&payload),
            ClientRequest::BpLocation(payload) => self.bp_location(&payload),
            ClientRequest::DebuggerInfo(payload) => self.info(payload.command),
            ClientRequest::Evaluation(payload) => self
                .evaluate(&payload)
                .map(|value| json!({ "result": value.to_string() })),
            ClientRequest::OptionChange(payload) => {
                self.options.extend(payload.0);
                Ok(empty())
            }
            ClientRequest::Monitor(payload) => self.monitor(&payload),
            ClientRequest::SetValue(payload) => self.set_value(&payload),
        };
        Ok(Outcome::reply(reply(kind.as_str(), msg.token.as_ref(), result)))
    }

    // ------------------------------------------------------------------
    // Session setup
    // ------------------------------------------------------------------

    fn connect(&mut self, payload: ConnectionPayload) -> Reply {
        if payload.db_filename.is_empty() {
            return Err("symbol table locator is empty".to_string());
        }
        if let Some(expected) = self.symbol_table {
            if expected != payload.db_filename {
                return Err(format!("unable to open symbol table {}", payload.db_filename));
            }
        }
        self.path_mapping = payload.path_mapping;
        Ok(empty())
    }

    fn to_symbol_path(&self, filename: &str) -> String {
        for (table_root, client_root) in &self.path_mapping {
            if let Some(rest) = filename.strip_prefix(client_root.as_str()) {
                return format!("{table_root}{rest}");
            }
        }
        filename.to_string()
    }

    fn to_client_path(&self, filename: &str) -> String {
        for (table_root, client_root) in &self.path_mapping {
            if let Some(rest) = filename.strip_prefix(table_root.as_str()) {
                return format!("{client_root}{rest}");
            }
        }
        filename.to_string()
    }

    // ------------------------------------------------------------------
    // Breakpoints
    // ------------------------------------------------------------------

    fn breakpoint(&mut self, payload: &BreakpointPayload) -> Reply {
        let filename = self.to_symbol_path(&payload.filename);
        let matches = self
            .index
            .get_breakpoints(&filename, payload.line_num, payload.column_num);
        match payload.action {
            BreakpointAction::Add => {
                if matches.is_empty() {
                    return Err(format!(
                        "no breakpoint at {}:{}",
                        payload.filename, payload.line_num
                    ));
                }
                for bp in matches {
                    self.inserted.insert(bp.id, payload.condition.clone());
                }
            }
            BreakpointAction::Remove => {
                for bp in matches {
                    self.inserted.remove(&bp.id);
                }
            }
        }
        Ok(empty())
    }

    fn breakpoint_id(&mut self, payload: &BreakpointIdPayload) -> Reply {
        match payload.action {
            BreakpointAction::Add => {
                if self.index.get_breakpoint(payload.id).is_none() {
                    return Err(format!("unknown breakpoint id {}", payload.id));
                }
                self.inserted.insert(payload.id, payload.condition.clone());
            }
            BreakpointAction::Remove => {
                self.inserted.remove(&payload.id);
            }
        }
        Ok(empty())
    }

    fn data_breakpoint(&mut self, payload: &DataBreakpointPayload) -> Reply {
        if payload.action == DataBreakpointAction::Remove {
            self.data.retain(|w| {
                w.breakpoint_id != payload.breakpoint_id || w.var_name != payload.var_name
            });
            return Ok(empty());
        }

        let signal = self
            .context_signal(payload.breakpoint_id, &payload.var_name)
            .ok_or_else(|| {
                format!(
                    "'{}' is not a signal in the context of breakpoint {}",
                    payload.var_name, payload.breakpoint_id
                )
            })?;
        if payload.action == DataBreakpointAction::Add {
            let exists = self.data.iter().any(|w| {
                w.breakpoint_id == payload.breakpoint_id && w.var_name == payload.var_name
            });
            if !exists {
                self.data.push(DataWatch {
                    breakpoint_id: payload.breakpoint_id,
                    var_name: payload.var_name.clone(),
                    signal,
                    condition: payload.condition.clone(),
                });
            }
        }
        Ok(empty())
    }

    fn bp_location(&self, payload: &BpLocationPayload) -> Reply {
        let filename = self.to_symbol_path(&payload.filename);
        let found = match payload.line_num {
            Some(line) => self
                .index
                .get_breakpoints(&filename, line, payload.column_num.unwrap_or(0)),
            None => self
                .index
                .breakpoints()
                .iter()
                .filter(|bp| bp.filename == filename)
                .cloned()
                .collect(),
        };
        let list: Vec<BreakpointInfo> = found
            .iter()
            .map(|bp| {
                let mut info = BreakpointInfo::from(bp);
                info.filename = self.to_client_path(&info.filename);
                info
            })
            .collect();
        to_reply(list)
    }

    // ------------------------------------------------------------------
    // Debugger info
    // ------------------------------------------------------------------

    fn info(&self, command: InfoCommand) -> Reply {
        match command {
            InfoCommand::Breakpoints => {
                let mut list = Vec::new();
                for (id, condition) in &self.inserted {
                    if let Some(bp) = self.index.get_breakpoint(*id) {
                        let mut info = BreakpointInfo::from(bp);
                        info.filename = self.to_client_path(&info.filename);
                        if condition.is_some() {
                            info.condition.clone_from(condition);
                        }
                        list.push(info);
                    }
                }
                for watch in &self.data {
                    if let Some(bp) = self.index.get_breakpoint(watch.breakpoint_id) {
                        let mut info = BreakpointInfo::from(bp);
                        info.filename = self.to_client_path(&info.filename);
                        info.kind = BreakpointKind::DATA;
                        info.condition.clone_from(&watch.condition);
                        info.var_name = Some(watch.var_name.clone());
                        list.push(info);
                    }
                }
                Ok(json!({ "breakpoints": to_reply(list)? }))
            }
            InfoCommand::Options => Ok(json!({ "options": self.options })),
            InfoCommand::Status => {
                let point = self.cursor.and_then(|i| self.timeline.get(i));
                Ok(json!({
                    "status": if point.is_some() { "paused" } else { "ready" },
                    "time": point.map_or(0, |p| p.time),
                    "breakpoints": self.inserted.len() + self.data.len(),
                }))
            }
            InfoCommand::Filename => {
                let filenames: BTreeSet<String> = self
                    .index
                    .breakpoints()
                    .iter()
                    .map(|bp| self.to_client_path(&bp.filename))
                    .collect();
                Ok(json!({ "filenames": filenames }))
            }
        }
    }

    // ------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------

    fn signal(&self, name: &str) -> i64 {
        if let Some(value) = self.forced.get(name) {
            return *value;
        }
        self.timeline
            .values_through(self.cursor)
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    fn known_signal(&self, name: &str) -> bool {
        self.index
            .variables()
            .iter()
            .any(|v| v.is_rtl && v.value == name)
    }

    fn variable_value(&self, var: &Variable) -> Option<i64> {
        if var.is_rtl {
            Some(self.signal(&var.value))
        } else {
            var.value.parse().ok()
        }
    }

    fn render(&self, var: &Variable) -> String {
        if var.is_rtl {
            self.signal(&var.value).to_string()
        } else {
            var.value.clone()
        }
    }

    fn context_signal(&self, breakpoint_id: u64, name: &str) -> Option<String> {
        self.index
            .get_context_variables(breakpoint_id)
            .into_iter()
            .find(|(binding, var)| binding.name == name && var.is_rtl)
            .map(|(_, var)| var.value)
    }

    fn instance_signal(&self, instance_id: u64, name: &str) -> Option<String> {
        if let Some((_, var)) = self
            .index
            .get_generator_variables(instance_id)
            .into_iter()
            .find(|(binding, var)| binding.name == name && var.is_rtl)
        {
            return Some(var.value);
        }
        let scoped = format!("{}.{name}", self.index.get_instance_name(instance_id)?);
        self.known_signal(&scoped).then_some(scoped)
    }

    fn global_value(&self, expression: &str) -> Option<i64> {
        expression
            .parse()
            .ok()
            .or_else(|| self.known_signal(expression).then(|| self.signal(expression)))
    }

    fn context_value(&self, breakpoint_id: u64, expression: &str) -> Option<i64> {
        match self
            .index
            .get_context_variables(breakpoint_id)
            .into_iter()
            .find(|(binding, _)| binding.name == expression)
        {
            Some((_, var)) => self.variable_value(&var),
            None => self.global_value(expression),
        }
    }

    fn instance_value(&self, instance_id: u64, expression: &str) -> Option<i64> {
        if let Some((_, var)) = self
            .index
            .get_generator_variables(instance_id)
            .into_iter()
            .find(|(binding, _)| binding.name == expression)
        {
            return self.variable_value(&var);
        }
        match self.instance_signal(instance_id, expression) {
            Some(signal) => Some(self.signal(&signal)),
            None => self.global_value(expression),
        }
    }

    fn evaluate(&self, payload: &EvaluationPayload) -> Result<i64, String> {
        let value = if payload.is_context {
            let id: u64 = payload
                .scope
                .parse()
                .map_err(|_| format!("invalid breakpoint id '{}'", payload.scope))?;
            if self.index.get_breakpoint(id).is_none() {
                return Err(format!("unknown breakpoint id {id}"));
            }
            self.context_value(id, &payload.expression)
        } else if payload.scope.is_empty() {
            self.global_value(&payload.expression)
        } else {
            let instance = self
                .index
                .get_instance_id_by_name(&payload.scope)
                .ok_or_else(|| format!("unknown instance '{}'", payload.scope))?;
            self.instance_value(instance, &payload.expression)
        };
        value.ok_or_else(|| format!("unable to evaluate '{}'", payload.expression))
    }

    fn set_value(&mut self, payload: &SetValuePayload) -> Reply {
        let signal = match (payload.breakpoint_id, payload.instance_id) {
            (Some(bp), _) => self.context_signal(bp, &payload.var_name),
            (None, Some(instance)) => self.instance_signal(instance, &payload.var_name),
            (None, None) => self
                .known_signal(&payload.var_name)
                .then(|| payload.var_name.clone()),
        }
        .ok_or_else(|| format!("'{}' is not a writable signal", payload.var_name))?;
        debug!(signal = %signal, value = payload.value, "forcing signal");
        self.forced.insert(signal, payload.value);
        Ok(empty())
    }

    // ------------------------------------------------------------------
    // Monitors
    // ------------------------------------------------------------------

    fn watch_value(&self, watch: &Watch) -> Option<i64> {
        match watch.target {
            MonitorTarget::Breakpoint(id) => self.context_value(id, &watch.var_name),
            MonitorTarget::Instance(id) => self.instance_value(id, &watch.var_name),
        }
    }

    fn monitor(&mut self, payload: &MonitorPayload) -> Reply {
        match payload.action_type {
            MonitorAction::Add => {
                let (Some(var_name), Some(monitor_type), Some(target)) = (
                    payload.var_name.clone(),
                    payload.monitor_type,
                    payload.target(),
                ) else {
                    return Err("monitor add needs var_name, monitor_type and a binding".to_string());
                };
                let watch = Watch {
                    var_name,
                    monitor_type,
                    target,
                };
                if self.watch_value(&watch).is_none() {
                    return Err(format!("unable to resolve '{}'", watch.var_name));
                }
                let track_id = self.next_track_id;
                self.next_track_id += 1;
                self.monitors.insert(track_id, watch);
                Ok(json!({ "track_id": track_id }))
            }
            MonitorAction::Remove => {
                let track_id = payload
                    .track_id
                    .ok_or_else(|| "monitor remove needs a track_id".to_string())?;
                self.monitors
                    .remove(&track_id)
                    .map(|_| empty())
                    .ok_or_else(|| format!("unknown track id {track_id}"))
            }
        }
    }

    // ------------------------------------------------------------------
    // Flow control
    // ------------------------------------------------------------------

    fn is_stop(&self, index: usize) -> bool {
        self.timeline.get(index).is_some_and(|point| {
            self.inserted.contains_key(&point.breakpoint_id)
                || self
                    .data
                    .iter()
                    .any(|w| point.writes.contains_key(&w.signal))
        })
    }

    fn next_index(&self) -> usize {
        self.cursor.map_or(0, |c| c + 1)
    }

    fn command(&mut self, payload: &CommandPayload) -> Result<Outcome, HgdbError> {
        let len = self.timeline.len();
        let target = match payload.command {
            Command::Stop => return Ok(Outcome::stop()),
            Command::Continue => (self.next_index()..len).find(|&i| self.is_stop(i)),
            Command::StepOver => Some(self.next_index()).filter(|&i| i < len),
            Command::StepBack => {
                (len > 0).then(|| self.cursor.map_or(0, |c| c.saturating_sub(1)))
            }
            Command::ReverseContinue => self
                .cursor
                .and_then(|c| (0..c).rev().find(|&i| self.is_stop(i))),
            Command::Jump => match payload.time {
                Some(time) => self.timeline.first_at_or_after(time),
                None => {
                    warn!("jump without a time");
                    None
                }
            },
        };

        let Some(index) = target else {
            debug!(command = ?payload.command, "no evaluation point to stop at");
            return Ok(Outcome::frames(Vec::new()));
        };
        self.cursor = Some(index);
        self.stop_frames(index).map(Outcome::frames)
    }

    fn stop_frames(&self, index: usize) -> Result<Vec<Message>, HgdbError> {
        let Some(point) = self.timeline.get(index) else {
            return Ok(Vec::new());
        };
        let Some(bp) = self.index.get_breakpoint(point.breakpoint_id) else {
            warn!(breakpoint_id = point.breakpoint_id, "timeline names an unknown breakpoint");
            return Ok(Vec::new());
        };

        let local: ValueMap = self
            .index
            .get_context_variables(bp.id)
            .iter()
            .map(|(binding, var)| (binding.name.clone(), self.render(var)))
            .collect();
        let generator: ValueMap = self
            .index
            .get_generator_variables(bp.instance_id)
            .iter()
            .map(|(binding, var)| (binding.name.clone(), self.render(var)))
            .collect();
        let event = BreakpointEvent {
            time: point.time,
            filename: Some(self.to_client_path(&bp.filename)),
            line_num: bp.line_num,
            column_num: (bp.column_num != 0).then_some(bp.column_num),
            instances: vec![InstanceHit {
                instance_id: bp.instance_id,
                instance_name: self.index.get_instance_name(bp.instance_id).unwrap_or_default(),
                breakpoint_id: Some(bp.id),
                local,
                generator,
            }],
        };
        debug!(time = point.time, breakpoint_id = bp.id, "emitting breakpoint hit");

        let mut frames = vec![event.into_message()?];
        for (track_id, watch) in &self.monitors {
            let bound = match (watch.monitor_type, watch.target) {
                (MonitorType::ClockEdge, _) => true,
                (MonitorType::Breakpoint, MonitorTarget::Breakpoint(id)) => id == bp.id,
                (MonitorType::Breakpoint, MonitorTarget::Instance(id)) => id == bp.instance_id,
            };
            if !bound {
                continue;
            }
            if let Some(value) = self.watch_value(watch) {
                let update = MonitorEvent {
                    track_id: *track_id,
                    value: value.to_string(),
                };
                frames.push(Message::event(
                    RequestType::Monitor,
                    serde_json::to_value(update)?,
                ));
            }
        }
        Ok(frames)
    }
}

fn reply(kind: &str, token: Option<&Token>, result: Reply) -> Message {
    let msg = match result {
        Ok(payload) => Message::reply_success(kind, payload),
        Err(reason) => Message::reply_error(kind, reason),
    };
    match token {
        Some(token) => msg.with_token(token.clone()),
        None => msg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_index, sample_timeline};
    use hgdb_transport::MemoryTransport;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn start() -> (MemoryTransport, JoinHandle<Result<(), HgdbError>>) {
        let engine = MockEngine::new(sample_index(), sample_timeline());
        let (peer, conn) = MemoryTransport::pair();
        let task = engine.spawn(conn);
        (peer, task)
    }

    async fn next(peer: &MemoryTransport) -> Message {
        peer.recv_message().await.unwrap().unwrap().unwrap()
    }

    async fn call(peer: &MemoryTransport, kind: RequestType, payload: Value) -> Message {
        peer.send_message(&Message::request(kind, payload).with_token("t-1"))
            .await
            .unwrap();
        next(peer).await
    }

    async fn command(peer: &MemoryTransport, payload: Value) {
        peer.send_message(&Message::request(RequestType::Command, payload))
            .await
            .unwrap();
    }

    async fn hit(peer: &MemoryTransport) -> BreakpointEvent {
        let msg = next(peer).await;
        assert!(msg.is_breakpoint_event(), "expected a hit, got {msg:?}");
        msg.payload_as().unwrap()
    }

    async fn finish(peer: MemoryTransport, task: JoinHandle<Result<(), HgdbError>>) {
        peer.close().await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_continue_stops_at_inserted_breakpoints() {
        let (peer, task) = start();

        let reply = call(
            &peer,
            RequestType::Breakpoint,
            json!({"filename": "child.sv", "line_num": 5, "action": "add"}),
        )
        .await;
        assert!(!reply.is_error());
        assert_eq!(reply.token.as_ref().map(Token::as_str), Some("t-1"));

        command(&peer, json!({"command": "continue"})).await;
        let event = hit(&peer).await;
        assert_eq!((event.time, event.line_num), (0, 5));
        assert_eq!(event.instances[0].instance_name, "top.child");
        assert_eq!(event.instances[0].local.get("c").map(String::as_str), Some("3"));
        assert_eq!(event.instances[0].generator.get("WIDTH").map(String::as_str), Some("8"));

        command(&peer, json!({"command": "continue"})).await;
        assert_eq!(hit(&peer).await.time, 20);

        command(&peer, json!({"command": "continue"})).await;
        let nothing = tokio::time::timeout(Duration::from_millis(50), peer.recv()).await;
        assert!(nothing.is_err());

        finish(peer, task).await;
    }

    #[tokio::test]
    async fn test_step_back_clamps_at_first_point() {
        let (peer, task) = start();

        command(&peer, json!({"command": "step_over"})).await;
        assert_eq!(hit(&peer).await.line_num, 2);
        command(&peer, json!({"command": "step_back"})).await;
        let event = hit(&peer).await;
        assert_eq!((event.time, event.line_num), (0, 2));

        command(&peer, json!({"command": "step_over"})).await;
        assert_eq!(hit(&peer).await.line_num, 5);
        command(&peer, json!({"command": "step_over"})).await;
        assert_eq!(hit(&peer).await.time, 10);
        command(&peer, json!({"command": "step_back"})).await;
        let event = hit(&peer).await;
        assert_eq!((event.time, event.line_num), (0, 5));

        finish(peer, task).await;
    }

    #[tokio::test]
    async fn test_jump_and_reverse_continue() {
        let (peer, task) = start();

        call(&peer, RequestType::BreakpointId, json!({"id": 0, "action": "add"})).await;
        command(&peer, json!({"command": "jump", "time": 25})).await;
        let event = hit(&peer).await;
        assert_eq!((event.time, event.line_num), (30, 3));

        command(&peer, json!({"command": "reverse_continue"})).await;
        assert_eq!(hit(&peer).await.time, 20);
        command(&peer, json!({"command": "reverse_continue"})).await;
        let event = hit(&peer).await;
        assert_eq!(event.time, 0);
        assert_eq!(event.instances[0].local.get("a").map(String::as_str), Some("1"));

        finish(peer, task).await;
    }

    #[tokio::test]
    async fn test_data_breakpoint_fires_on_write() {
        let (peer, task) = start();

        let reply = call(
            &peer,
            RequestType::DataBreakpoint,
            json!({"var_name": "d", "breakpoint-id": 3, "action": "add"}),
        )
        .await;
        assert!(!reply.is_error());

        command(&peer, json!({"command": "continue"})).await;
        let event = hit(&peer).await;
        assert_eq!(event.time, 10);
        assert_eq!(event.instances[0].local.get("d").map(String::as_str), Some("4"));
        command(&peer, json!({"command": "continue"})).await;
        let event = hit(&peer).await;
        assert_eq!(event.time, 30);
        assert_eq!(event.instances[0].local.get("d").map(String::as_str), Some("6"));

        let info = call(&peer, RequestType::DebuggerInfo, json!({"command": "breakpoints"})).await;
        let list = hgdb_core::types::breakpoint_list(&info.payload).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].var_name.as_deref(), Some("d"));
        assert!(list[0].kind.contains(BreakpointKind::DATA));

        let invalid = call(
            &peer,
            RequestType::DataBreakpoint,
            json!({"var_name": "nope", "breakpoint-id": 3, "action": "info"}),
        )
        .await;
        assert!(invalid.is_error());

        finish(peer, task).await;
    }

    #[tokio::test]
    async fn test_evaluate_and_set_value() {
        let (peer, task) = start();
        command(&peer, json!({"command": "step_over"})).await;
        hit(&peer).await;

        let eval = |scope: &str, expression: &str, is_context: bool| {
            json!({"scope": scope, "expression": expression, "is_context": is_context})
        };
        let reply = call(&peer, RequestType::Evaluation, eval("0", "a", true)).await;
        assert_eq!(reply.payload["result"], "1");
        let reply = call(&peer, RequestType::Evaluation, eval("top", "a", false)).await;
        assert_eq!(reply.payload["result"], "1");
        let reply = call(&peer, RequestType::Evaluation, eval("top.child", "WIDTH", false)).await;
        assert_eq!(reply.payload["result"], "8");
        let reply = call(&peer, RequestType::Evaluation, eval("top", "nope", false)).await;
        assert!(reply.is_error());

        let reply = call(
            &peer,
            RequestType::SetValue,
            json!({"var_name": "b", "value": 9, "instance_id": 0}),
        )
        .await;
        assert!(!reply.is_error());
        let reply = call(&peer, RequestType::Evaluation, eval("", "top.b", false)).await;
        assert_eq!(reply.payload["result"], "9");

        finish(peer, task).await;
    }

    #[tokio::test]
    async fn test_monitor_updates_follow_hits() {
        let (peer, task) = start();

        let reply = call(
            &peer,
            RequestType::Monitor,
            json!({"action_type": "add", "monitor_type": "breakpoint", "var_name": "a", "breakpoint_id": 1}),
        )
        .await;
        let track_id = reply.payload["track_id"].as_u64().unwrap();
        call(&peer, RequestType::BreakpointId, json!({"id": 1, "action": "add"})).await;

        command(&peer, json!({"command": "continue"})).await;
        assert_eq!(hit(&peer).await.time, 10);
        let update = next(&peer).await;
        assert_eq!(update.kind, "monitor");
        let update: MonitorEvent = update.payload_as().unwrap();
        assert_eq!(update, MonitorEvent { track_id, value: "1".to_string() });

        let reply = call(
            &peer,
            RequestType::Monitor,
            json!({"action_type": "remove", "track_id": track_id + 1}),
        )
        .await;
        assert!(reply.is_error());

        finish(peer, task).await;
    }

    #[tokio::test]
    async fn test_bad_frames_get_error_replies() {
        let (peer, task) = start();

        peer.send("not json".to_string()).await.unwrap();
        let reply = next(&peer).await;
        assert_eq!(reply.kind, "error");
        assert!(reply.is_error());

        let reply = call(&peer, RequestType::Breakpoint, json!({"filename": "top.sv"})).await;
        assert_eq!(reply.kind, "breakpoint");
        assert!(reply.is_error());

        let reply = call(
            &peer,
            RequestType::Breakpoint,
            json!({"filename": "top.sv", "line_num": 99, "action": "add"}),
        )
        .await;
        assert!(reply.reason().unwrap().contains("top.sv:99"));

        finish(peer, task).await;
    }

    #[tokio::test]
    async fn test_locations_and_path_mapping() {
        let (peer, task) = start();

        let reply = call(
            &peer,
            RequestType::Connection,
            json!({"db_filename": "design.db", "path-mapping": {"top": "/src/top"}}),
        )
        .await;
        assert!(!reply.is_error());

        let reply = call(&peer, RequestType::BpLocation, json!({"filename": "/src/top.sv"})).await;
        let list = hgdb_core::types::breakpoint_list(&reply.payload).unwrap();
        let lines: Vec<u32> = list.iter().map(|bp| bp.line_num).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(list[0].filename, "/src/top.sv");

        let reply = call(&peer, RequestType::DebuggerInfo, json!({"command": "filename"})).await;
        assert_eq!(reply.payload, json!({"filenames": ["/src/top.sv", "child.sv"]}));

        finish(peer, task).await;
    }

    #[tokio::test]
    async fn test_stop_ends_session() {
        let (peer, task) = start();
        command(&peer, json!({"command": "stop"})).await;
        task.await.unwrap().unwrap();
        assert_eq!(peer.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_other_symbol_tables() {
        let engine = MockEngine::new(sample_index(), sample_timeline()).with_symbol_table("design.db");
        let (peer, conn) = MemoryTransport::pair();
        let task = engine.spawn(conn);

        let reply = call(&peer, RequestType::Connection, json!({"db_filename": "other.db"})).await;
        assert_eq!(reply.reason(), Some("unable to open symbol table other.db"));
        let reply = call(&peer, RequestType::Connection, json!({"db_filename": "design.db"})).await;
        assert!(!reply.is_error());

        finish(peer, task).await;
    }
}
