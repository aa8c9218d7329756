//! Engine-to-client payloads: unsolicited events and structured replies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::symbol::{BreakpointKind, BreakpointSymbol};
use crate::error::HgdbError;
use crate::protocol::{Message, RequestType};

/// Variable name to rendered value.
pub type ValueMap = BTreeMap<String, String>;

/// Values captured for one instance at a breakpoint hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceHit {
    /// Instance id.
    pub instance_id: u64,
    /// Hierarchical instance name.
    pub instance_name: String,
    /// Breakpoint that fired in this instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakpoint_id: Option<u64>,
    /// Context variables.
    #[serde(default)]
    pub local: ValueMap,
    /// Generator variables.
    #[serde(default)]
    pub generator: ValueMap,
}

/// Payload of an unsolicited `breakpoint` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointEvent {
    /// Simulation time of the hit.
    pub time: u64,
    /// Source file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Source line.
    pub line_num: u32,
    /// Source column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_num: Option<u32>,
    /// One record per instance that hit.
    #[serde(default)]
    pub instances: Vec<InstanceHit>,
}

impl BreakpointEvent {
    /// Wrap the event in an unsolicited frame.
    pub fn into_message(self) -> Result<Message, HgdbError> {
        Ok(Message::event(
            RequestType::Breakpoint,
            serde_json::to_value(self)?,
        ))
    }

    /// Breakpoint ids that fired, in instance order.
    #[must_use]
    pub fn breakpoint_ids(&self) -> Vec<u64> {
        self.instances
            .iter()
            .filter_map(|hit| hit.breakpoint_id)
            .collect()
    }
}

/// Payload of an unsolicited `monitor` update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorEvent {
    /// Watch that produced the value.
    pub track_id: u64,
    /// Sampled value.
    pub value: String,
}

/// A breakpoint as reported by `bp-location` and `debugger-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointInfo {
    /// Breakpoint id, when the engine reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Source file.
    pub filename: String,
    /// Source line.
    pub line_num: u32,
    /// Source column.
    #[serde(default)]
    pub column_num: u32,
    /// Kind bits.
    #[serde(default)]
    pub kind: BreakpointKind,
    /// Owning instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<u64>,
    /// Inserted condition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Watched variable of a data breakpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_name: Option<String>,
}

impl From<&BreakpointSymbol> for BreakpointInfo {
    fn from(bp: &BreakpointSymbol) -> Self {
        Self {
            id: Some(bp.id),
            filename: bp.filename.clone(),
            line_num: bp.line_num,
            column_num: bp.column_num,
            kind: BreakpointKind::NORMAL,
            instance_id: Some(bp.instance_id),
            condition: (!bp.condition.is_empty()).then(|| bp.condition.clone()),
            var_name: None,
        }
    }
}

/// Decode a list of breakpoints from a reply payload.
///
/// Engines answer either with a bare array or with `{"breakpoints": [...]}`.
pub fn breakpoint_list(payload: &Value) -> Result<Vec<BreakpointInfo>, HgdbError> {
    let list = match payload {
        Value::Array(_) => payload.clone(),
        Value::Object(map) => map
            .get("breakpoints")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new())),
        _ => return Err(HgdbError::protocol("breakpoint list must be an array")),
    };
    serde_json::from_value(list)
        .map_err(|e| HgdbError::protocol(format!("malformed breakpoint list: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_parse() {
        let msg = Message::from_json(
            r#"{"request": false, "type": "breakpoint", "payload": {
                "time": 10, "filename": "f.sv", "line_num": 1,
                "instances": [{"instance_id": 0, "instance_name": "top",
                               "breakpoint_id": 2, "local": {"a": "1"}, "generator": {}}]
            }}"#,
        )
        .unwrap();
        assert!(msg.is_breakpoint_event());
        let event: BreakpointEvent = msg.payload_as().unwrap();
        assert_eq!(event.time, 10);
        assert_eq!(event.breakpoint_ids(), vec![2]);
        assert_eq!(event.instances[0].local.get("a").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_breakpoint_list_shapes() {
        let bare = json!([{"filename": "a.sv", "line_num": 1}]);
        let list = breakpoint_list(&bare).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].kind, BreakpointKind::NORMAL);

        let wrapped = json!({"breakpoints": [
            {"id": 1, "filename": "a.sv", "line_num": 1, "kind": 2, "var_name": "c"}
        ]});
        let list = breakpoint_list(&wrapped).unwrap();
        assert!(list[0].kind.contains(BreakpointKind::DATA));

        assert!(breakpoint_list(&json!({})).unwrap().is_empty());
        assert!(breakpoint_list(&json!("nope")).is_err());
    }
}
