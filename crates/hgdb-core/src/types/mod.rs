//! Typed payloads and the symbol model.
//!
//! - [`symbol`]: entities stored in a symbol table
//! - [`request`]: one payload type per client request
//! - [`event`]: unsolicited events and structured replies

pub mod event;
pub mod request;
pub mod symbol;

pub use event::{
    BreakpointEvent, BreakpointInfo, InstanceHit, MonitorEvent, ValueMap, breakpoint_list,
};
pub use request::{
    BpLocationPayload, BreakpointAction, BreakpointIdPayload, BreakpointPayload, ClientRequest,
    Command, CommandPayload, ConnectionPayload, DataBreakpointAction, DataBreakpointPayload,
    DebuggerInfoPayload, EvaluationPayload, InfoCommand, MonitorAction, MonitorPayload,
    MonitorTarget, MonitorType, OptionChangePayload, PathMapping, PathMappingPayload,
    SetValuePayload,
};
pub use symbol::{
    Annotation, BreakpointKind, BreakpointSymbol, ContextVariable, GeneratorVariable, IndexRange,
    Instance, ScopeEntry, Variable, VariableType,
};
