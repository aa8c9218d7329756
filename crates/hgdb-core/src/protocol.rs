//! The message envelope shared by every hgdb participant.
//!
//! Every frame on the wire is one JSON object:
//!
//! ```json
//! {"request": true, "type": "breakpoint", "token": "hgdb-7", "payload": {...}}
//! ```
//!
//! `request = true` marks a client-issued call. `request = false` marks either
//! a reply (which carries `status`) or an unsolicited event such as a
//! breakpoint hit. The `token` correlates a reply with the request that
//! produced it.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HgdbError;

/// Reply status carried by `request = false` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// The engine accepted the request.
    Success,
    /// The engine rejected the request; `payload.reason` explains why.
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Message types recognized by the debug protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestType {
    /// Opens a session against a symbol table.
    Connection,
    /// Replaces the source-root substitution table.
    PathMapping,
    /// Adds or removes a breakpoint by source location. Also the type of
    /// unsolicited breakpoint-hit events.
    Breakpoint,
    /// Adds or removes a breakpoint by symbol id.
    BreakpointId,
    /// Adds, removes or validates a data breakpoint.
    DataBreakpoint,
    /// Lists breakpoint locations for a file and line.
    BpLocation,
    /// Flow control: continue, stop, step, jump.
    Command,
    /// Engine status, options, breakpoints or filenames.
    DebuggerInfo,
    /// Evaluates an expression in a scope.
    Evaluation,
    /// Changes runtime options.
    OptionChange,
    /// Adds or removes a monitor. Also the type of monitor updates.
    Monitor,
    /// Forces a value onto a signal.
    SetValue,
    /// Engine reply for a frame it could not parse.
    Error,
}

impl RequestType {
    /// All request types, in wire catalogue order.
    pub const ALL: [Self; 13] = [
        Self::Connection,
        Self::PathMapping,
        Self::Breakpoint,
        Self::BreakpointId,
        Self::DataBreakpoint,
        Self::BpLocation,
        Self::Command,
        Self::DebuggerInfo,
        Self::Evaluation,
        Self::OptionChange,
        Self::Monitor,
        Self::SetValue,
        Self::Error,
    ];

    /// The wire spelling of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::PathMapping => "path-mapping",
            Self::Breakpoint => "breakpoint",
            Self::BreakpointId => "breakpoint-id",
            Self::DataBreakpoint => "data-breakpoint",
            Self::BpLocation => "bp-location",
            Self::Command => "command",
            Self::DebuggerInfo => "debugger-info",
            Self::Evaluation => "evaluation",
            Self::OptionChange => "option-change",
            Self::Monitor => "monitor",
            Self::SetValue => "set-value",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestType {
    type Err = HgdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| HgdbError::protocol(format!("unknown message type '{s}'")))
    }
}

/// A request correlation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wrap an existing token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Session-scoped token source.
///
/// Each client owns one generator, so tokens are unique per connection and
/// never shared across sessions. The prefix keeps client-chosen tokens apart
/// from any token an engine might pick on its own.
#[derive(Debug)]
pub struct TokenGenerator {
    prefix: String,
    next: AtomicU64,
}

impl TokenGenerator {
    /// Create a generator whose tokens start with `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    /// Produce the next token.
    pub fn next_token(&self) -> Token {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Token(format!("{}{n}", self.prefix))
    }

    /// The prefix this generator stamps on every token.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new("hgdb-")
    }
}

/// One frame of the debug protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// `true` for client-issued calls.
    pub request: bool,
    /// Message type; see [`RequestType`] for the known values.
    #[serde(rename = "type")]
    pub kind: String,
    /// Correlation token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    /// Present only on replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// Type-specific body. Usually an object; `bp-location` replies carry
    /// an array.
    #[serde(default = "empty_object")]
    pub payload: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Message {
    /// Create a client request.
    #[must_use]
    pub fn request(kind: RequestType, payload: Value) -> Self {
        Self {
            request: true,
            kind: kind.as_str().to_string(),
            token: None,
            status: None,
            payload,
        }
    }

    /// Create a successful reply.
    #[must_use]
    pub fn reply_success(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            request: false,
            kind: kind.into(),
            token: None,
            status: Some(Status::Success),
            payload,
        }
    }

    /// Create an error reply carrying `reason`.
    #[must_use]
    pub fn reply_error(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request: false,
            kind: kind.into(),
            token: None,
            status: Some(Status::Error),
            payload: serde_json::json!({ "reason": reason.into() }),
        }
    }

    /// Create an unsolicited event (no status, no token).
    #[must_use]
    pub fn event(kind: RequestType, payload: Value) -> Self {
        Self {
            request: false,
            kind: kind.as_str().to_string(),
            token: None,
            status: None,
            payload,
        }
    }

    /// Attach a correlation token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<Token>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Parse a frame from its JSON text.
    pub fn from_json(text: &str) -> Result<Self, HgdbError> {
        serde_json::from_str(text).map_err(|e| HgdbError::protocol(format!("malformed frame: {e}")))
    }

    /// Serialize the frame to JSON text.
    pub fn to_json(&self) -> Result<String, HgdbError> {
        serde_json::to_string(self).map_err(HgdbError::from)
    }

    /// The message type, if it is one this crate knows.
    #[must_use]
    pub fn request_type(&self) -> Option<RequestType> {
        self.kind.parse().ok()
    }

    /// Whether this frame has the shape of a breakpoint-hit event.
    ///
    /// Replies to `breakpoint` requests share the type but always carry a
    /// `status`; events never do.
    #[must_use]
    pub fn is_breakpoint_event(&self) -> bool {
        !self.request && self.status.is_none() && self.kind == RequestType::Breakpoint.as_str()
    }

    /// Whether this is an error reply.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status == Some(Status::Error)
    }

    /// The engine-supplied reason of an error reply.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.payload.get("reason").and_then(Value::as_str)
    }

    /// Decode the payload into a typed structure.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, HgdbError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            HgdbError::protocol(format!("unexpected '{}' payload: {e}", self.kind))
        })
    }

    /// Turn an error reply into [`HgdbError::Engine`], passing anything else
    /// through.
    pub fn into_result(self) -> Result<Self, HgdbError> {
        if self.is_error() {
            Err(HgdbError::engine(
                self.kind.clone(),
                self.reason().unwrap_or("unknown error"),
            ))
        } else {
            Ok(self)
        }
    }
}
