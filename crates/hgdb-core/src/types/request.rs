//! Typed request payloads for every debug protocol `type`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HgdbError;
use crate::protocol::{Message, RequestType, Token};

/// Source-root substitutions applied by the engine when resolving filenames.
pub type PathMapping = BTreeMap<String, String>;

/// Payload of `connection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPayload {
    /// Symbol table locator: a storage path or a provider address.
    pub db_filename: String,
    /// Optional source-root substitutions.
    #[serde(
        rename = "path-mapping",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub path_mapping: PathMapping,
}

/// Payload of `path-mapping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMappingPayload {
    /// Source-root substitutions.
    #[serde(rename = "path-mapping")]
    pub path_mapping: PathMapping,
}

/// Add or remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakpointAction {
    /// Insert.
    Add,
    /// Delete.
    Remove,
}

/// Payload of `breakpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointPayload {
    /// Source file.
    pub filename: String,
    /// Source line.
    pub line_num: u32,
    /// Source column; 0 matches every column on the line.
    #[serde(default)]
    pub column_num: u32,
    /// Add or remove.
    pub action: BreakpointAction,
    /// Extra condition, conjoined with the symbol condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl BreakpointPayload {
    /// Create a payload for every column of a line.
    #[must_use]
    pub fn new(filename: impl Into<String>, line_num: u32, action: BreakpointAction) -> Self {
        Self {
            filename: filename.into(),
            line_num,
            column_num: 0,
            action,
            condition: None,
        }
    }

    /// Restrict to one column.
    #[must_use]
    pub const fn with_column(mut self, column_num: u32) -> Self {
        self.column_num = column_num;
        self
    }

    /// Attach a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// Payload of `breakpoint-id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointIdPayload {
    /// Breakpoint symbol id.
    pub id: u64,
    /// Add or remove.
    pub action: BreakpointAction,
    /// Extra condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Action of a `data-breakpoint` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBreakpointAction {
    /// Watch writes to the variable.
    Add,
    /// Stop watching.
    Remove,
    /// Validate only; nothing is inserted.
    Info,
}

/// Payload of `data-breakpoint`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBreakpointPayload {
    /// Variable name, resolved in the breakpoint's context.
    pub var_name: String,
    /// Breakpoint whose context resolves `var_name`.
    #[serde(rename = "breakpoint-id")]
    pub breakpoint_id: u64,
    /// Add, remove or validate.
    pub action: DataBreakpointAction,
    /// Extra condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// Payload of `bp-location`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BpLocationPayload {
    /// Source file.
    pub filename: String,
    /// Source line; every line when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_num: Option<u32>,
    /// Source column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_num: Option<u32>,
}

/// Flow-control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Run until the next breakpoint.
    Continue,
    /// Stop the simulation.
    Stop,
    /// Advance to the next evaluation point.
    StepOver,
    /// Return to the previous evaluation point.
    StepBack,
    /// Run backwards to the previous breakpoint.
    ReverseContinue,
    /// Go to a simulation time.
    Jump,
}

/// Payload of `command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPayload {
    /// The command.
    pub command: Command,
    /// Target time for `jump`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

/// Topics of `debugger-info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfoCommand {
    /// Inserted breakpoints.
    Breakpoints,
    /// Runtime options.
    Options,
    /// Engine status.
    Status,
    /// Source filenames known to the symbol table.
    Filename,
}

/// Payload of `debugger-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebuggerInfoPayload {
    /// Requested topic.
    pub command: InfoCommand,
}

/// Payload of `evaluation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationPayload {
    /// Instance name, or breakpoint id when `is_context` is set.
    pub scope: String,
    /// Expression text.
    pub expression: String,
    /// Evaluate in a breakpoint context instead of an instance scope.
    pub is_context: bool,
}

/// Payload of `option-change`: arbitrary option key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionChangePayload(pub Map<String, Value>);

impl OptionChangePayload {
    /// Set one option.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

/// Add or remove a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorAction {
    /// Create a watch.
    Add,
    /// Destroy a watch by track id.
    Remove,
}

/// When a monitored value is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorType {
    /// On every hit of the bound breakpoint.
    Breakpoint,
    /// On every clock edge.
    ClockEdge,
}

/// What a monitor is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorTarget {
    /// Resolve the variable in an instance scope.
    Instance(u64),
    /// Resolve the variable in a breakpoint context.
    Breakpoint(u64),
}

/// Payload of `monitor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorPayload {
    /// Add or remove.
    pub action_type: MonitorAction,
    /// Sampling trigger (add only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_type: Option<MonitorType>,
    /// Watched variable (add only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_name: Option<String>,
    /// Watch to destroy (remove only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u64>,
    /// Instance binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<u64>,
    /// Breakpoint binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoint_id: Option<u64>,
}

impl MonitorPayload {
    /// Build an add request.
    #[must_use]
    pub fn add(var_name: impl Into<String>, monitor_type: MonitorType, target: MonitorTarget) -> Self {
        let (instance_id, breakpoint_id) = match target {
            MonitorTarget::Instance(id) => (Some(id), None),
            MonitorTarget::Breakpoint(id) => (None, Some(id)),
        };
        Self {
            action_type: MonitorAction::Add,
            monitor_type: Some(monitor_type),
            var_name: Some(var_name.into()),
            track_id: None,
            instance_id,
            breakpoint_id,
        }
    }

    /// Build a remove request.
    #[must_use]
    pub const fn remove(track_id: u64) -> Self {
        Self {
            action_type: MonitorAction::Remove,
            monitor_type: None,
            var_name: None,
            track_id: Some(track_id),
            instance_id: None,
            breakpoint_id: None,
        }
    }

    /// The binding of an add request.
    #[must_use]
    pub const fn target(&self) -> Option<MonitorTarget> {
        match (self.instance_id, self.breakpoint_id) {
            (Some(id), _) => Some(MonitorTarget::Instance(id)),
            (None, Some(id)) => Some(MonitorTarget::Breakpoint(id)),
            (None, None) => None,
        }
    }
}

/// Payload of `set-value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetValuePayload {
    /// Variable to overwrite.
    pub var_name: String,
    /// New value.
    pub value: i64,
    /// Resolve in an instance scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<u64>,
    /// Resolve in a breakpoint context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoint_id: Option<u64>,
}

/// Every request a debug client can issue.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    /// `connection`
    Connection(ConnectionPayload),
    /// `path-mapping`
    PathMapping(PathMappingPayload),
    /// `breakpoint`
    Breakpoint(BreakpointPayload),
    /// `breakpoint-id`
    BreakpointId(BreakpointIdPayload),
    /// `data-breakpoint`
    DataBreakpoint(DataBreakpointPayload),
    /// `bp-location`
    BpLocation(BpLocationPayload),
    /// `command`
    Command(CommandPayload),
    /// `debugger-info`
    DebuggerInfo(DebuggerInfoPayload),
    /// `evaluation`
    Evaluation(EvaluationPayload),
    /// `option-change`
    OptionChange(OptionChangePayload),
    /// `monitor`
    Monitor(MonitorPayload),
    /// `set-value`
    SetValue(SetValuePayload),
}

impl ClientRequest {
    /// The wire type of this request.
    #[must_use]
    pub const fn request_type(&self) -> RequestType {
        match self {
            Self::Connection(_) => RequestType::Connection,
            Self::PathMapping(_) => RequestType::PathMapping,
            Self::Breakpoint(_) => RequestType::Breakpoint,
            Self::BreakpointId(_) => RequestType::BreakpointId,
            Self::DataBreakpoint(_) => RequestType::DataBreakpoint,
            Self::BpLocation(_) => RequestType::BpLocation,
            Self::Command(_) => RequestType::Command,
            Self::DebuggerInfo(_) => RequestType::DebuggerInfo,
            Self::Evaluation(_) => RequestType::Evaluation,
            Self::OptionChange(_) => RequestType::OptionChange,
            Self::Monitor(_) => RequestType::Monitor,
            Self::SetValue(_) => RequestType::SetValue,
        }
    }

    /// Serialize the payload.
    pub fn payload(&self) -> Result<Value, HgdbError> {
        let value = match self {
            Self::Connection(p) => serde_json::to_value(p),
            Self::PathMapping(p) => serde_json::to_value(p),
            Self::Breakpoint(p) => serde_json::to_value(p),
            Self::BreakpointId(p) => serde_json::to_value(p),
            Self::DataBreakpoint(p) => serde_json::to_value(p),
            Self::BpLocation(p) => serde_json::to_value(p),
            Self::Command(p) => serde_json::to_value(p),
            Self::DebuggerInfo(p) => serde_json::to_value(p),
            Self::Evaluation(p) => serde_json::to_value(p),
            Self::OptionChange(p) => serde_json::to_value(p),
            Self::Monitor(p) => serde_json::to_value(p),
            Self::SetValue(p) => serde_json::to_value(p),
        }?;
        Ok(value)
    }

    /// Build the request frame.
    pub fn into_message(self, token: impl Into<Token>) -> Result<Message, HgdbError> {
        Ok(Message::request(self.request_type(), self.payload()?).with_token(token))
    }

    /// Decode a request frame. Used by engines and test doubles.
    pub fn from_message(msg: &Message) -> Result<Self, HgdbError> {
        let ty: RequestType = msg.kind.parse()?;
        let request = match ty {
            RequestType::Connection => Self::Connection(msg.payload_as()?),
            RequestType::PathMapping => Self::PathMapping(msg.payload_as()?),
            RequestType::Breakpoint => Self::Breakpoint(msg.payload_as()?),
            RequestType::BreakpointId => Self::BreakpointId(msg.payload_as()?),
            RequestType::DataBreakpoint => Self::DataBreakpoint(msg.payload_as()?),
            RequestType::BpLocation => Self::BpLocation(msg.payload_as()?),
            RequestType::Command => Self::Command(msg.payload_as()?),
            RequestType::DebuggerInfo => Self::DebuggerInfo(msg.payload_as()?),
            RequestType::Evaluation => Self::Evaluation(msg.payload_as()?),
            RequestType::OptionChange => Self::OptionChange(msg.payload_as()?),
            RequestType::Monitor => Self::Monitor(msg.payload_as()?),
            RequestType::SetValue => Self::SetValue(msg.payload_as()?),
            RequestType::Error => {
                return Err(HgdbError::protocol("'error' is not a client request"));
            }
        };
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_connection_payload() {
        let mut mapping = PathMapping::new();
        mapping.insert("/build".to_string(), "/home/me/src".to_string());
        let req = ClientRequest::Connection(ConnectionPayload {
            db_filename: "design.db".to_string(),
            path_mapping: mapping,
        });
        assert_eq!(
            req.payload().unwrap(),
            json!({"db_filename": "design.db", "path-mapping": {"/build": "/home/me/src"}})
        );

        let bare = ClientRequest::Connection(ConnectionPayload {
            db_filename: "design.db".to_string(),
            path_mapping: PathMapping::new(),
        });
        assert_eq!(bare.payload().unwrap(), json!({"db_filename": "design.db"}));
    }

    #[test]
    fn test_data_breakpoint_wire_keys() {
        let req = ClientRequest::DataBreakpoint(DataBreakpointPayload {
            var_name: "c".to_string(),
            breakpoint_id: 3,
            action: DataBreakpointAction::Info,
            condition: None,
        });
        let msg = req.into_message("hgdb-9").unwrap();
        assert_eq!(msg.kind, "data-breakpoint");
        assert_eq!(
            msg.payload,
            json!({"var_name": "c", "breakpoint-id": 3, "action": "info"})
        );
    }

    #[test]
    fn test_command_payload() {
        let req = ClientRequest::Command(CommandPayload {
            command: Command::Jump,
            time: Some(120),
        });
        assert_eq!(req.payload().unwrap(), json!({"command": "jump", "time": 120}));

        let req = ClientRequest::Command(CommandPayload {
            command: Command::ReverseContinue,
            time: None,
        });
        assert_eq!(req.payload().unwrap(), json!({"command": "reverse_continue"}));
    }

    #[test]
    fn test_monitor_payloads() {
        let add = MonitorPayload::add("data", MonitorType::ClockEdge, MonitorTarget::Instance(2));
        assert_eq!(
            serde_json::to_value(&add).unwrap(),
            json!({"action_type": "add", "monitor_type": "clock_edge", "var_name": "data", "instance_id": 2})
        );
        assert_eq!(add.target(), Some(MonitorTarget::Instance(2)));

        let remove = MonitorPayload::remove(11);
        assert_eq!(
            serde_json::to_value(&remove).unwrap(),
            json!({"action_type": "remove", "track_id": 11})
        );
    }

    #[test]
    fn test_from_message_round_trip() {
        let req = ClientRequest::Breakpoint(
            BreakpointPayload::new("f.sv", 1, BreakpointAction::Add).with_condition("a == 1"),
        );
        let msg = req.clone().into_message("t").unwrap();
        assert_eq!(ClientRequest::from_message(&msg).unwrap(), req);

        let option = ClientRequest::OptionChange(OptionChangePayload::default().set("log_enabled", true));
        let msg = option.clone().into_message("t").unwrap();
        assert_eq!(msg.payload, json!({"log_enabled": true}));
        assert_eq!(ClientRequest::from_message(&msg).unwrap(), option);
    }
}
