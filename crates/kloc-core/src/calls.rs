//! Call and value records.
//!
//! These records are produced by a language-specific call extractor and
//! shipped next to the index as `calls.json`:
//!
//! ```json
//! {
//!   "values": [{"id": "...", "kind": "parameter", "symbol": "...", "location": {...}}],
//!   "calls":  [{"id": "...", "kind": "method", "callee": "...", "arguments": [...]}]
//! }
//! ```
//!
//! A call's result value is the value record that shares the call's `id`,
//! unless the call names one explicitly with `result_value_id`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::graph::Location;

// ============================================================================
// Kinds
// ============================================================================

/// Kind of a runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Parameter,
    Local,
    Result,
    Literal,
    Constant,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Parameter => "parameter",
            ValueKind::Local => "local",
            ValueKind::Result => "result",
            ValueKind::Literal => "literal",
            ValueKind::Constant => "constant",
            ValueKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a call site.
///
/// This is a closed set: every consumer matches it exhaustively. `Unknown`
/// absorbs shapes an extractor emits that this version does not model; the
/// linker reconciles it against the callee's symbol grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallShape {
    /// Free function call: `helper($x)`.
    Function,
    /// Instance method call: `$obj->save()`.
    Method,
    /// Static method call: `User::find(1)`.
    MethodStatic,
    /// Object construction: `new User()`.
    Constructor,
    /// Instance property access: `$obj->name`.
    Access,
    /// Static property or constant access: `User::$count`.
    AccessStatic,
    #[default]
    #[serde(other)]
    Unknown,
}

impl CallShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallShape::Function => "function",
            CallShape::Method => "method",
            CallShape::MethodStatic => "method_static",
            CallShape::Constructor => "constructor",
            CallShape::Access => "access",
            CallShape::AccessStatic => "access_static",
            CallShape::Unknown => "unknown",
        }
    }

    /// Whether the call site invokes code (as opposed to reading a member).
    pub fn is_invocation(&self) -> bool {
        match self {
            CallShape::Function
            | CallShape::Method
            | CallShape::MethodStatic
            | CallShape::Constructor => true,
            CallShape::Access | CallShape::AccessStatic | CallShape::Unknown => false,
        }
    }

    /// Whether the call site targets the type rather than an instance.
    pub fn is_static(&self) -> bool {
        match self {
            CallShape::MethodStatic | CallShape::AccessStatic => true,
            CallShape::Function
            | CallShape::Method
            | CallShape::Constructor
            | CallShape::Access
            | CallShape::Unknown => false,
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a call's immediate receiver.
///
/// A receiver produced by another call carries that call's shape; any other
/// receiver carries its value kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverKind {
    Function,
    Method,
    MethodStatic,
    Constructor,
    Access,
    AccessStatic,
    Parameter,
    Local,
    Result,
    Literal,
    Constant,
    Unknown,
}

impl From<CallShape> for ReceiverKind {
    fn from(shape: CallShape) -> Self {
        match shape {
            CallShape::Function => ReceiverKind::Function,
            CallShape::Method => ReceiverKind::Method,
            CallShape::MethodStatic => ReceiverKind::MethodStatic,
            CallShape::Constructor => ReceiverKind::Constructor,
            CallShape::Access => ReceiverKind::Access,
            CallShape::AccessStatic => ReceiverKind::AccessStatic,
            CallShape::Unknown => ReceiverKind::Result,
        }
    }
}

impl From<ValueKind> for ReceiverKind {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Parameter => ReceiverKind::Parameter,
            ValueKind::Local => ReceiverKind::Local,
            ValueKind::Result => ReceiverKind::Result,
            ValueKind::Literal => ReceiverKind::Literal,
            ValueKind::Constant => ReceiverKind::Constant,
            ValueKind::Unknown => ReceiverKind::Unknown,
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Source position of a value or call record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RecordLocation {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub col: u32,
}

impl RecordLocation {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        RecordLocation {
            file: file.into(),
            line,
            col,
        }
    }

    /// Convert into a graph edge location.
    pub fn to_location(&self) -> Location {
        Location::new(self.file.clone(), self.line, self.col)
    }
}

/// A runtime value observed by the call extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRecord {
    pub id: String,
    #[serde(default)]
    pub kind: ValueKind,
    /// Symbol of the parameter, local or property holding the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Symbol of the value's static type.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_symbol: Option<String>,
    #[serde(default)]
    pub location: RecordLocation,
    /// Value this one was assigned from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_value_id: Option<String>,
}

impl ValueRecord {
    pub fn new(id: impl Into<String>, kind: ValueKind, location: RecordLocation) -> Self {
        ValueRecord {
            id: id.into(),
            kind,
            symbol: None,
            type_symbol: None,
            location,
            source_value_id: None,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_type(mut self, type_symbol: impl Into<String>) -> Self {
        self.type_symbol = Some(type_symbol.into());
        self
    }

    pub fn with_source(mut self, source_value_id: impl Into<String>) -> Self {
        self.source_value_id = Some(source_value_id.into());
        self
    }
}

/// One positional argument of a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentRecord {
    pub position: u32,
    pub value_id: String,
}

/// A call site observed by the call extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    #[serde(default)]
    pub kind: CallShape,
    #[serde(default)]
    pub location: RecordLocation,
    /// Symbol of the enclosing method or function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    /// Symbol of the invoked method, function or accessed member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_value_id: Option<String>,
    #[serde(default)]
    pub arguments: Vec<ArgumentRecord>,
    /// Explicit result binding; defaults to the value sharing this call's ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_value_id: Option<String>,
}

impl CallRecord {
    pub fn new(id: impl Into<String>, kind: CallShape, location: RecordLocation) -> Self {
        CallRecord {
            id: id.into(),
            kind,
            location,
            caller: None,
            callee: None,
            return_type: None,
            receiver_value_id: None,
            arguments: Vec::new(),
            result_value_id: None,
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn with_callee(mut self, callee: impl Into<String>) -> Self {
        self.callee = Some(callee.into());
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn with_receiver(mut self, value_id: impl Into<String>) -> Self {
        self.receiver_value_id = Some(value_id.into());
        self
    }

    pub fn with_argument(mut self, position: u32, value_id: impl Into<String>) -> Self {
        self.arguments.push(ArgumentRecord {
            position,
            value_id: value_id.into(),
        });
        self
    }

    /// ID of the value this call produces.
    pub fn result_id(&self) -> &str {
        self.result_value_id.as_deref().unwrap_or(&self.id)
    }
}

/// Contents of a `calls.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CallsData {
    #[serde(default)]
    pub values: Vec<ValueRecord>,
    #[serde(default)]
    pub calls: Vec<CallRecord>,
}

impl CallsData {
    /// Parse `calls.json` content.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        serde_json::from_str(json).map_err(|e| MapError::InvalidCalls {
            message: e.to_string(),
        })
    }

    /// Parse `calls.json` bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MapError> {
        serde_json::from_slice(bytes).map_err(|e| MapError::InvalidCalls {
            message: e.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.calls.is_empty()
    }

    /// Index value records by ID. Later duplicates lose to the first record.
    pub fn values_by_id(&self) -> HashMap<&str, &ValueRecord> {
        let mut map = HashMap::with_capacity(self.values.len());
        for value in &self.values {
            map.entry(value.id.as_str()).or_insert(value);
        }
        map
    }

    /// Index call records by the ID of the value each one produces.
    pub fn calls_by_result(&self) -> HashMap<&str, &CallRecord> {
        let mut map = HashMap::with_capacity(self.calls.len());
        for call in &self.calls {
            map.entry(call.result_id()).or_insert(call);
        }
        map
    }
}
