//! Provider query catalogue and dispatch.
//!
//! A peer sends `{"payload": {"type": <query-name>, ...args}}`. The provider
//! answers `{"result": <value>}`, or `{}` when the query is unknown, fails
//! to parse, or has no answer.
//!
//! # Query Names
//!
//! | name | arguments |
//! |------|-----------|
//! | `get_breakpoint` | `breakpoint_id` |
//! | `get_breakpoints` | `filename`, `line_num`, `col_num` |
//! | `get_instance_name` | `instance_id` |
//! | `get_instance_id` | `instance_name` or `breakpoint_id` |
//! | `get_context_variables` | `breakpoint_id` |
//! | `get_generator_variables` | `instance_id` |
//! | `get_instance_names` | |
//! | `get_context_static_values` | `breakpoint_id` |
//! | `get_annotation_values` | `name` |
//! | `get_all_array_names` | |
//! | `resolve_scoped_name_breakpoint` | `name`, `breakpoint_id` |
//! | `resolve_scoped_name_instance` | `name`, `instance_id` |
//! | `execution_bp_orders` | |

use std::fmt;

use hgdb_core::HgdbError;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::provider::SymbolProvider;

/// Wire names of every query.
pub mod names {
    /// Breakpoint by id.
    pub const GET_BREAKPOINT: &str = "get_breakpoint";
    /// Breakpoints at a location.
    pub const GET_BREAKPOINTS: &str = "get_breakpoints";
    /// Instance name by id.
    pub const GET_INSTANCE_NAME: &str = "get_instance_name";
    /// Instance id by name or by breakpoint.
    pub const GET_INSTANCE_ID: &str = "get_instance_id";
    /// Context bindings of a breakpoint.
    pub const GET_CONTEXT_VARIABLES: &str = "get_context_variables";
    /// Generator bindings of an instance.
    pub const GET_GENERATOR_VARIABLES: &str = "get_generator_variables";
    /// Every instance name.
    pub const GET_INSTANCE_NAMES: &str = "get_instance_names";
    /// Integer constants in a breakpoint's context.
    pub const GET_CONTEXT_STATIC_VALUES: &str = "get_context_static_values";
    /// Annotation values.
    pub const GET_ANNOTATION_VALUES: &str = "get_annotation_values";
    /// Array signal names.
    pub const GET_ALL_ARRAY_NAMES: &str = "get_all_array_names";
    /// Name resolution in a breakpoint context.
    pub const RESOLVE_SCOPED_NAME_BREAKPOINT: &str = "resolve_scoped_name_breakpoint";
    /// Name resolution in an instance scope.
    pub const RESOLVE_SCOPED_NAME_INSTANCE: &str = "resolve_scoped_name_instance";
    /// Execution order of breakpoints.
    pub const EXECUTION_BP_ORDERS: &str = "execution_bp_orders";
}

/// A parsed provider query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderQuery {
    /// `get_breakpoint`.
    GetBreakpoint {
        /// Breakpoint id.
        breakpoint_id: u64,
    },
    /// `get_breakpoints`.
    GetBreakpoints {
        /// Source file.
        filename: String,
        /// Source line.
        line_num: u32,
        /// Source column; 0 for the whole line.
        column_num: u32,
    },
    /// `get_instance_name`.
    GetInstanceName {
        /// Instance id.
        instance_id: u64,
    },
    /// `get_instance_id` with `instance_name`.
    GetInstanceIdByName {
        /// Hierarchical instance name.
        instance_name: String,
    },
    /// `get_instance_id` with `breakpoint_id`.
    GetInstanceIdByBp {
        /// Breakpoint id.
        breakpoint_id: u64,
    },
    /// `get_context_variables`.
    GetContextVariables {
        /// Breakpoint id.
        breakpoint_id: u64,
    },
    /// `get_generator_variables`.
    GetGeneratorVariables {
        /// Instance id.
        instance_id: u64,
    },
    /// `get_instance_names`.
    GetInstanceNames,
    /// `get_context_static_values`.
    GetContextStaticValues {
        /// Breakpoint id.
        breakpoint_id: u64,
    },
    /// `get_annotation_values`.
    GetAnnotationValues {
        /// Annotation name.
        name: String,
    },
    /// `get_all_array_names`.
    GetAllArrayNames,
    /// `resolve_scoped_name_breakpoint`.
    ResolveScopedNameBreakpoint {
        /// Source-level name.
        name: String,
        /// Breakpoint whose context resolves the name.
        breakpoint_id: u64,
    },
    /// `resolve_scoped_name_instance`.
    ResolveScopedNameInstance {
        /// Source-level name.
        name: String,
        /// Instance whose scope resolves the name.
        instance_id: u64,
    },
    /// `execution_bp_orders`.
    ExecutionBpOrders,
    /// A query name this provider does not know.
    Unknown(String),
    /// A frame that could not be read as a query.
    Malformed(String),
}

impl ProviderQuery {
    /// Wire name of the query. `None` for [`Unknown`](Self::Unknown) and
    /// [`Malformed`](Self::Malformed).
    #[must_use]
    pub const fn name(&self) -> Option<&'static str> {
        Some(match self {
            Self::GetBreakpoint { .. } => names::GET_BREAKPOINT,
            Self::GetBreakpoints { .. } => names::GET_BREAKPOINTS,
            Self::GetInstanceName { .. } => names::GET_INSTANCE_NAME,
            Self::GetInstanceIdByName { .. } | Self::GetInstanceIdByBp { .. } => {
                names::GET_INSTANCE_ID
            }
            Self::GetContextVariables { .. } => names::GET_CONTEXT_VARIABLES,
            Self::GetGeneratorVariables { .. } => names::GET_GENERATOR_VARIABLES,
            Self::GetInstanceNames => names::GET_INSTANCE_NAMES,
            Self::GetContextStaticValues { .. } => names::GET_CONTEXT_STATIC_VALUES,
            Self::GetAnnotationValues { .. } => names::GET_ANNOTATION_VALUES,
            Self::GetAllArrayNames => names::GET_ALL_ARRAY_NAMES,
            Self::ResolveScopedNameBreakpoint { .. } => names::RESOLVE_SCOPED_NAME_BREAKPOINT,
            Self::ResolveScopedNameInstance { .. } => names::RESOLVE_SCOPED_NAME_INSTANCE,
            Self::ExecutionBpOrders => names::EXECUTION_BP_ORDERS,
            Self::Unknown(_) | Self::Malformed(_) => return None,
        })
    }

    /// The `payload` object sent for this query.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        match self {
            Self::GetBreakpoint { breakpoint_id }
            | Self::GetInstanceIdByBp { breakpoint_id }
            | Self::GetContextVariables { breakpoint_id }
            | Self::GetContextStaticValues { breakpoint_id } => {
                json!({"type": self.wire_name(), "breakpoint_id": breakpoint_id})
            }
            Self::GetBreakpoints {
                filename,
                line_num,
                column_num,
            } => json!({
                "type": names::GET_BREAKPOINTS,
                "filename": filename,
                "line_num": line_num,
                "col_num": column_num,
            }),
            Self::GetInstanceName { instance_id } | Self::GetGeneratorVariables { instance_id } => {
                json!({"type": self.wire_name(), "instance_id": instance_id})
            }
            Self::GetInstanceIdByName { instance_name } => {
                json!({"type": names::GET_INSTANCE_ID, "instance_name": instance_name})
            }
            Self::GetAnnotationValues { name } => {
                json!({"type": names::GET_ANNOTATION_VALUES, "name": name})
            }
            Self::ResolveScopedNameBreakpoint {
                name,
                breakpoint_id,
            } => json!({
                "type": names::RESOLVE_SCOPED_NAME_BREAKPOINT,
                "name": name,
                "breakpoint_id": breakpoint_id,
            }),
            Self::ResolveScopedNameInstance { name, instance_id } => json!({
                "type": names::RESOLVE_SCOPED_NAME_INSTANCE,
                "name": name,
                "instance_id": instance_id,
            }),
            Self::GetInstanceNames | Self::GetAllArrayNames | Self::ExecutionBpOrders => {
                json!({"type": self.wire_name()})
            }
            Self::Unknown(name) => json!({"type": name}),
            Self::Malformed(_) => json!({}),
        }
    }

    /// The whole frame sent for this query.
    #[must_use]
    pub fn to_frame(&self) -> String {
        json!({"payload": self.to_payload()}).to_string()
    }

    fn wire_name(&self) -> &'static str {
        self.name().unwrap_or_default()
    }
}

impl fmt::Display for ProviderQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "unknown query '{name}'"),
            Self::Malformed(reason) => write!(f, "malformed query: {reason}"),
            other => f.write_str(other.wire_name()),
        }
    }
}

/// Read a query frame. Never fails: bad input becomes
/// [`ProviderQuery::Unknown`] or [`ProviderQuery::Malformed`].
#[must_use]
pub fn parse_query(frame: &str) -> ProviderQuery {
    let value: Value = match serde_json::from_str(frame) {
        Ok(value) => value,
        Err(e) => return ProviderQuery::Malformed(format!("invalid JSON: {e}")),
    };
    let Some(payload) = value.get("payload").filter(|p| p.is_object()) else {
        return ProviderQuery::Malformed("missing payload object".to_string());
    };
    let Some(name) = payload.get("type").and_then(Value::as_str) else {
        return ProviderQuery::Malformed("missing query type".to_string());
    };

    parse_payload(name, payload).unwrap_or_else(ProviderQuery::Malformed)
}

fn parse_payload(name: &str, payload: &Value) -> Result<ProviderQuery, String> {
    let query = match name {
        names::GET_BREAKPOINT => ProviderQuery::GetBreakpoint {
            breakpoint_id: u64_arg(name, payload, "breakpoint_id")?,
        },
        names::GET_BREAKPOINTS => ProviderQuery::GetBreakpoints {
            filename: str_arg(name, payload, "filename")?,
            line_num: u32_arg(name, payload, "line_num")?,
            column_num: match payload.get("col_num") {
                None | Some(Value::Null) => 0,
                Some(_) => u32_arg(name, payload, "col_num")?,
            },
        },
        names::GET_INSTANCE_NAME => ProviderQuery::GetInstanceName {
            instance_id: u64_arg(name, payload, "instance_id")?,
        },
        names::GET_INSTANCE_ID => {
            if payload.get("instance_name").is_some() {
                ProviderQuery::GetInstanceIdByName {
                    instance_name: str_arg(name, payload, "instance_name")?,
                }
            } else {
                ProviderQuery::GetInstanceIdByBp {
                    breakpoint_id: u64_arg(name, payload, "breakpoint_id")?,
                }
            }
        }
        names::GET_CONTEXT_VARIABLES => ProviderQuery::GetContextVariables {
            breakpoint_id: u64_arg(name, payload, "breakpoint_id")?,
        },
        names::GET_GENERATOR_VARIABLES => ProviderQuery::GetGeneratorVariables {
            instance_id: u64_arg(name, payload, "instance_id")?,
        },
        names::GET_INSTANCE_NAMES => ProviderQuery::GetInstanceNames,
        names::GET_CONTEXT_STATIC_VALUES => ProviderQuery::GetContextStaticValues {
            breakpoint_id: u64_arg(name, payload, "breakpoint_id")?,
        },
        names::GET_ANNOTATION_VALUES => ProviderQuery::GetAnnotationValues {
            name: str_arg(name, payload, "name")?,
        },
        names::GET_ALL_ARRAY_NAMES => ProviderQuery::GetAllArrayNames,
        names::RESOLVE_SCOPED_NAME_BREAKPOINT => ProviderQuery::ResolveScopedNameBreakpoint {
            name: str_arg(name, payload, "name")?,
            breakpoint_id: u64_arg(name, payload, "breakpoint_id")?,
        },
        names::RESOLVE_SCOPED_NAME_INSTANCE => ProviderQuery::ResolveScopedNameInstance {
            name: str_arg(name, payload, "name")?,
            instance_id: u64_arg(name, payload, "instance_id")?,
        },
        names::EXECUTION_BP_ORDERS => ProviderQuery::ExecutionBpOrders,
        other => ProviderQuery::Unknown(other.to_string()),
    };
    Ok(query)
}

fn u64_arg(query: &str, payload: &Value, key: &str) -> Result<u64, String> {
    payload
        .get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| format!("{query}: '{key}' must be a non-negative integer"))
}

fn u32_arg(query: &str, payload: &Value, key: &str) -> Result<u32, String> {
    u64_arg(query, payload, key)
        .and_then(|v| u32::try_from(v).map_err(|_| format!("{query}: '{key}' out of range")))
}

fn str_arg(query: &str, payload: &Value, key: &str) -> Result<String, String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("{query}: '{key}' must be a string"))
}

/// Answer one query against `provider`.
///
/// Returns `{"result": ...}`, or `{}` when the query is unknown or
/// malformed, the lookup has no answer, or the provider failed.
pub async fn route_query<P: SymbolProvider>(provider: &P, query: &ProviderQuery) -> Value {
    let answer = match query {
        ProviderQuery::Unknown(name) => {
            warn!(query = %name, "unknown provider query");
            return empty_reply();
        }
        ProviderQuery::Malformed(reason) => {
            warn!(reason = %reason, "malformed provider query");
            return empty_reply();
        }
        ProviderQuery::GetBreakpoint { breakpoint_id } => {
            result(provider.get_breakpoint(*breakpoint_id).await)
        }
        ProviderQuery::GetBreakpoints {
            filename,
            line_num,
            column_num,
        } => result(
            provider
                .get_breakpoints(filename, *line_num, *column_num)
                .await,
        ),
        ProviderQuery::GetInstanceName { instance_id } => {
            result(provider.get_instance_name(*instance_id).await)
        }
        ProviderQuery::GetInstanceIdByName { instance_name } => {
            result(provider.get_instance_id_by_name(instance_name).await)
        }
        ProviderQuery::GetInstanceIdByBp { breakpoint_id } => {
            result(provider.get_instance_id_by_bp(*breakpoint_id).await)
        }
        ProviderQuery::GetContextVariables { breakpoint_id } => {
            result(provider.get_context_variables(*breakpoint_id).await)
        }
        ProviderQuery::GetGeneratorVariables { instance_id } => {
            result(provider.get_generator_variables(*instance_id).await)
        }
        ProviderQuery::GetInstanceNames => result(provider.get_instance_names().await),
        ProviderQuery::GetContextStaticValues { breakpoint_id } => {
            result(provider.get_context_static_values(*breakpoint_id).await)
        }
        ProviderQuery::GetAnnotationValues { name } => {
            result(provider.get_annotation_values(name).await)
        }
        ProviderQuery::GetAllArrayNames => result(provider.get_all_array_names().await),
        ProviderQuery::ResolveScopedNameBreakpoint {
            name,
            breakpoint_id,
        } => result(
            provider
                .resolve_scoped_name_breakpoint(name, *breakpoint_id)
                .await,
        ),
        ProviderQuery::ResolveScopedNameInstance { name, instance_id } => result(
            provider
                .resolve_scoped_name_instance(name, *instance_id)
                .await,
        ),
        ProviderQuery::ExecutionBpOrders => result(provider.execution_bp_orders().await),
    };

    match answer {
        Ok(Some(value)) => {
            debug!(query = %query, "provider query answered");
            json!({ "result": value })
        }
        Ok(None) => {
            debug!(query = %query, "provider query has no answer");
            empty_reply()
        }
        Err(e) => {
            warn!(query = %query, error = %e, "provider query failed");
            empty_reply()
        }
    }
}

/// The reply for a query without an answer.
#[must_use]
pub fn empty_reply() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Serialize a lookup result. `None` stays `None` so it maps to `{}`.
fn result<R: Serialize>(answer: Result<R, HgdbError>) -> Result<Option<Value>, HgdbError> {
    let value = serde_json::to_value(answer?)?;
    Ok((!value.is_null()).then_some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_known_queries() {
        assert_eq!(
            parse_query(r#"{"payload": {"type": "get_breakpoint", "breakpoint_id": 3}}"#),
            ProviderQuery::GetBreakpoint { breakpoint_id: 3 }
        );
        assert_eq!(
            parse_query(
                r#"{"payload": {"type": "get_breakpoints", "filename": "a.sv", "line_num": 6, "col_num": 0}}"#
            ),
            ProviderQuery::GetBreakpoints {
                filename: "a.sv".to_string(),
                line_num: 6,
                column_num: 0,
            }
        );
        assert_eq!(
            parse_query(r#"{"payload": {"type": "get_instance_id", "instance_name": "top"}}"#),
            ProviderQuery::GetInstanceIdByName {
                instance_name: "top".to_string()
            }
        );
        assert_eq!(
            parse_query(r#"{"payload": {"type": "get_instance_id", "breakpoint_id": 1}}"#),
            ProviderQuery::GetInstanceIdByBp { breakpoint_id: 1 }
        );
        assert_eq!(
            parse_query(r#"{"request": true, "payload": {"type": "execution_bp_orders"}}"#),
            ProviderQuery::ExecutionBpOrders
        );
    }

    #[test]
    fn test_parse_unknown_and_malformed() {
        assert_eq!(
            parse_query(r#"{"payload": {"type": "unknown_query"}}"#),
            ProviderQuery::Unknown("unknown_query".to_string())
        );
        assert!(matches!(parse_query("{oops"), ProviderQuery::Malformed(_)));
        assert!(matches!(parse_query(r#"{"payload": 3}"#), ProviderQuery::Malformed(_)));
        assert!(matches!(
            parse_query(r#"{"payload": {"type": "get_breakpoint"}}"#),
            ProviderQuery::Malformed(_)
        ));
        assert!(matches!(
            parse_query(r#"{"payload": {"type": "get_breakpoint", "breakpoint_id": -1}}"#),
            ProviderQuery::Malformed(_)
        ));
    }

    #[test]
    fn test_frames_parse_back() {
        let queries = [
            ProviderQuery::GetBreakpoints {
                filename: "a.sv".to_string(),
                line_num: 2,
                column_num: 5,
            },
            ProviderQuery::GetInstanceIdByName {
                instance_name: "top.a".to_string(),
            },
            ProviderQuery::ResolveScopedNameInstance {
                name: "x".to_string(),
                instance_id: 4,
            },
            ProviderQuery::GetAllArrayNames,
        ];
        for query in queries {
            assert_eq!(parse_query(&query.to_frame()), query);
        }
    }

    #[test]
    fn test_names_and_display() {
        assert_eq!(
            ProviderQuery::GetInstanceIdByBp { breakpoint_id: 0 }.name(),
            Some("get_instance_id")
        );
        assert_eq!(ProviderQuery::Unknown("x".to_string()).name(), None);
        assert_eq!(ProviderQuery::GetInstanceNames.to_string(), "get_instance_names");
        assert_eq!(
            ProviderQuery::Unknown("x".to_string()).to_string(),
            "unknown query 'x'"
        );
    }
}
