//! Symbol model entities.
//!
//! These describe a design's debuggable structure. Ids are non-negative
//! integers scoped to one symbol table.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// One concrete instantiation of a design block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Instance id.
    pub id: u64,
    /// Hierarchical path, e.g. `top.dut.fifo`.
    pub name: String,
    /// Free-form tag.
    #[serde(default)]
    pub annotation: String,
}

impl Instance {
    /// Create an instance without annotation.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            annotation: String::new(),
        }
    }
}

/// Inclusive bounds of one array dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRange {
    /// Lower bound.
    pub min: i64,
    /// Upper bound.
    pub max: i64,
}

/// Sampling discipline of a variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// Sampled when the breakpoint is hit.
    #[default]
    Normal,
    /// Sampled one evaluation cycle after assignment.
    Delay,
}

impl VariableType {
    /// Integer encoding used by the structured store.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::Delay => 1,
        }
    }

    /// Decode the structured store encoding. Unknown values read as normal.
    #[must_use]
    pub const fn from_i64(value: i64) -> Self {
        if value == 1 { Self::Delay } else { Self::Normal }
    }
}

/// An RTL signal or a constant expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Variable id.
    pub id: u64,
    /// Signal name or literal.
    pub value: String,
    /// `true` when `value` names a live signal.
    pub is_rtl: bool,
    /// Array slice bounds, outermost first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<IndexRange>>,
    /// Sampling discipline.
    #[serde(default, rename = "type")]
    pub var_type: VariableType,
}

impl Variable {
    /// Create a scalar variable.
    #[must_use]
    pub fn new(id: u64, value: impl Into<String>, is_rtl: bool) -> Self {
        Self {
            id,
            value: value.into(),
            is_rtl,
            indices: None,
            var_type: VariableType::Normal,
        }
    }
}

/// Breakpoint kind bits.
///
/// `NORMAL` fires on reaching a source location, `DATA` on a write to a
/// named signal. Bits combine for lookup filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointKind(u8);

impl BreakpointKind {
    /// Location breakpoint.
    pub const NORMAL: Self = Self(1);
    /// Data breakpoint.
    pub const DATA: Self = Self(2);
    /// Both kinds; matches everything.
    pub const ANY: Self = Self(3);

    /// Build from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` and `other` share a bit.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for BreakpointKind {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl BitOr for BreakpointKind {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for BreakpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.contains(Self::NORMAL), self.contains(Self::DATA)) {
            (true, true) => write!(f, "normal|data"),
            (true, false) => write!(f, "normal"),
            (false, true) => write!(f, "data"),
            (false, false) => write!(f, "none"),
        }
    }
}

/// A breakpoint known to the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointSymbol {
    /// Breakpoint id.
    pub id: u64,
    /// Owning instance.
    pub instance_id: u64,
    /// Source file.
    pub filename: String,
    /// Source line.
    pub line_num: u32,
    /// Source column; 0 when unspecified.
    #[serde(default)]
    pub column_num: u32,
    /// Enable condition; empty means unconditional.
    #[serde(default)]
    pub condition: String,
    /// Signal transition that arms the breakpoint; empty means default.
    #[serde(default)]
    pub trigger: String,
}

impl BreakpointSymbol {
    /// Create an unconditional breakpoint.
    #[must_use]
    pub fn new(id: u64, instance_id: u64, filename: impl Into<String>, line_num: u32) -> Self {
        Self {
            id,
            instance_id,
            filename: filename.into(),
            line_num,
            column_num: 0,
            condition: String::new(),
            trigger: String::new(),
        }
    }

    /// Set the column.
    #[must_use]
    pub const fn with_column(mut self, column_num: u32) -> Self {
        self.column_num = column_num;
        self
    }

    /// Set the enable condition.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Set the trigger expression.
    #[must_use]
    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = trigger.into();
        self
    }

    /// Location match: a zero `column_num` matches any column.
    #[must_use]
    pub fn matches(&self, filename: &str, line_num: u32, column_num: u32) -> bool {
        self.filename == filename
            && self.line_num == line_num
            && (column_num == 0 || self.column_num == column_num)
    }
}

/// Binds a name in a breakpoint's lexical context to a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextVariable {
    /// Source-level name.
    pub name: String,
    /// Breakpoint whose context defines the name.
    pub breakpoint_id: u64,
    /// Bound variable.
    pub variable_id: u64,
    /// Sampling discipline at this breakpoint.
    #[serde(default, rename = "type")]
    pub delay_mode: VariableType,
}

impl ContextVariable {
    /// Create a normally sampled binding.
    #[must_use]
    pub fn new(name: impl Into<String>, breakpoint_id: u64, variable_id: u64) -> Self {
        Self {
            name: name.into(),
            breakpoint_id,
            variable_id,
            delay_mode: VariableType::Normal,
        }
    }
}

/// Binds a name in an instance's top-level scope to a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorVariable {
    /// Source-level name.
    pub name: String,
    /// Owning instance.
    pub instance_id: u64,
    /// Bound variable.
    pub variable_id: u64,
    /// Free-form tag.
    #[serde(default)]
    pub annotation: String,
}

impl GeneratorVariable {
    /// Create a binding without annotation.
    #[must_use]
    pub fn new(name: impl Into<String>, instance_id: u64, variable_id: u64) -> Self {
        Self {
            name: name.into(),
            instance_id,
            variable_id,
            annotation: String::new(),
        }
    }
}

/// A named annotation. The `clock` annotation lists clock signal names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation name.
    pub name: String,
    /// Annotation value.
    pub value: String,
}

impl Annotation {
    /// Name used for non-standard clock signals.
    pub const CLOCK: &'static str = "clock";

    /// Create an annotation.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An ordered group of breakpoint ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeEntry {
    /// Scope id.
    pub id: u64,
    /// Breakpoint ids in stored order.
    pub breakpoints: Vec<u64>,
}
