// Blueprint Types - Core data structures for the visual scripting system
//
// These types define the structure of blueprints, nodes, pins, and connections.
// Blueprints are authored as JSON and handed to the runtime read-only.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Pin Types
// ─────────────────────────────────────────────────────────────────────────────

/// Direction of a pin on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

/// Data types that can flow through pins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase")]
pub enum PinType {
    /// Execution flow (no data, just control flow)
    Exec,
    /// Boolean value
    Boolean,
    /// Floating point number
    Number,
    /// String value
    String,
    /// A point value read from or written to the building network
    PointValue,
    /// Dynamic type - accepts anything
    Any,
    /// Array of a specific type
    Array { element: Box<PinType> },
}

impl PinType {
    /// Check if this type is compatible with another (for connection validation)
    pub fn is_compatible_with(&self, other: &PinType) -> bool {
        match (self, other) {
            // Exec only ever wires to exec
            (PinType::Exec, PinType::Exec) => true,
            (PinType::Exec, _) | (_, PinType::Exec) => false,
            (a, b) if a == b => true,
            (PinType::Any, _) | (_, PinType::Any) => true,
            // Point values carry numbers and booleans
            (PinType::PointValue, PinType::Number)
            | (PinType::PointValue, PinType::Boolean)
            | (PinType::Number, PinType::PointValue)
            | (PinType::Boolean, PinType::PointValue) => true,
            (PinType::Array { element: a }, PinType::Array { element: b }) => {
                a.is_compatible_with(b)
            }
            _ => false,
        }
    }

    /// Check if this is an execution pin type
    pub fn is_exec(&self) -> bool {
        matches!(self, PinType::Exec)
    }

    /// Check if this is a data pin type
    pub fn is_data(&self) -> bool {
        !self.is_exec()
    }

    /// Create an array pin type
    pub fn array(element: PinType) -> Self {
        PinType::Array {
            element: Box::new(element),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pin Definitions
// ─────────────────────────────────────────────────────────────────────────────

/// Definition of a pin on a node type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinDef {
    /// Pin name (used in connections)
    pub name: String,
    /// Pin direction (input or output)
    pub direction: PinDirection,
    /// Data type of the pin
    #[serde(rename = "type")]
    pub pin_type: PinType,
    /// Default value for input pins (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Label shown in the editor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PinDef {
    fn new(name: &str, direction: PinDirection, pin_type: PinType) -> Self {
        Self {
            name: name.to_string(),
            direction,
            pin_type,
            default: None,
            label: None,
            description: None,
        }
    }

    /// Create an execution input pin
    pub fn exec_in() -> Self {
        Self::new("exec", PinDirection::Input, PinType::Exec)
    }

    /// Create an execution output pin with a custom name
    pub fn exec_out(name: &str) -> Self {
        Self::new(name, PinDirection::Output, PinType::Exec)
    }

    /// Create a data input pin
    pub fn data_in(name: &str, pin_type: PinType) -> Self {
        Self::new(name, PinDirection::Input, pin_type)
    }

    /// Create a data input pin with a default value
    pub fn data_in_with_default(name: &str, pin_type: PinType, default: Value) -> Self {
        Self {
            default: Some(default),
            ..Self::new(name, PinDirection::Input, pin_type)
        }
    }

    /// Create a data output pin
    pub fn data_out(name: &str, pin_type: PinType) -> Self {
        Self::new(name, PinDirection::Output, pin_type)
    }

    /// Attach an editor label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Definitions
// ─────────────────────────────────────────────────────────────────────────────

/// How a node participates in execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Purity {
    /// No exec pins, evaluated lazily and cached
    Pure,
    /// Visited by the exec walk, may have side effects
    Impure,
    /// Impure and may suspend for an extended period
    Latent,
}

/// Definition of a node type (registered in the NodeRegistry)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDef {
    /// Unique identifier (e.g., "flow/Branch" or "my-plugin/CustomNode")
    pub id: String,
    /// Human-readable display name
    pub name: String,
    /// Category for organization (e.g., "Flow Control", "Math")
    pub category: String,
    /// Whether this is a pure node (no exec pins, evaluated on demand)
    #[serde(default)]
    pub pure: bool,
    /// Whether this node can suspend execution (latent node)
    #[serde(default)]
    pub latent: bool,
    /// Whether this node can start a traversal
    #[serde(default)]
    pub entry: bool,
    /// Trigger kind this entry node answers to ("start", "event", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Pin definitions for this node type
    pub pins: Vec<PinDef>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodeDef {
    /// Start a definition with no pins; fill the rest with struct update syntax
    pub fn new(id: &str, name: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            pure: false,
            latent: false,
            entry: false,
            trigger: None,
            pins: Vec::new(),
            description: None,
        }
    }

    pub fn purity(&self) -> Purity {
        if self.pure {
            Purity::Pure
        } else if self.latent {
            Purity::Latent
        } else {
            Purity::Impure
        }
    }

    pub fn is_entry(&self) -> bool {
        self.entry
    }

    /// Whether this entry node is the exact match for a trigger kind
    pub fn responds_to(&self, trigger_kind: &str) -> bool {
        self.entry && self.trigger.as_deref() == Some(trigger_kind)
    }

    /// Get all input pins
    pub fn input_pins(&self) -> impl Iterator<Item = &PinDef> {
        self.pins
            .iter()
            .filter(|p| p.direction == PinDirection::Input)
    }

    /// Get all output pins
    pub fn output_pins(&self) -> impl Iterator<Item = &PinDef> {
        self.pins
            .iter()
            .filter(|p| p.direction == PinDirection::Output)
    }

    /// Get all execution output pins
    pub fn exec_outputs(&self) -> impl Iterator<Item = &PinDef> {
        self.output_pins().filter(|p| p.pin_type.is_exec())
    }

    /// Get all data input pins
    pub fn data_inputs(&self) -> impl Iterator<Item = &PinDef> {
        self.input_pins().filter(|p| p.pin_type.is_data())
    }

    /// Get all data output pins
    pub fn data_outputs(&self) -> impl Iterator<Item = &PinDef> {
        self.output_pins().filter(|p| p.pin_type.is_data())
    }

    /// Get a pin by name and direction
    pub fn get_pin(&self, name: &str, direction: PinDirection) -> Option<&PinDef> {
        self.pins
            .iter()
            .find(|p| p.name == name && p.direction == direction)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Blueprint Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Variable definition within a blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDef {
    /// Data type of the variable
    #[serde(rename = "type")]
    pub var_type: PinType,
    /// Default value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Position in the visual editor (for UI purposes)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// A node instance within a blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintNode {
    /// Unique instance ID within this blueprint
    pub id: String,
    /// Node type (references NodeDef.id)
    #[serde(rename = "type")]
    pub node_type: String,
    /// Position in the visual editor
    #[serde(default)]
    pub position: Position,
    /// Node-specific configuration (e.g., operator for Compare node)
    #[serde(default = "empty_config")]
    pub config: Value,
}

impl BlueprintNode {
    pub fn new(id: &str, node_type: &str) -> Self {
        Self {
            id: id.to_string(),
            node_type: node_type.to_string(),
            position: Position::default(),
            config: empty_config(),
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }
}

fn empty_config() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One side of a connection: a pin on a node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub node_id: String,
    pub pin: String,
}

impl Endpoint {
    pub fn new(node_id: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            pin: pin.into(),
        }
    }

    /// Parse "node_id.pin_name", splitting at the last '.'
    ///
    /// Pin names therefore cannot contain a '.', while node ids may.
    pub fn parse(s: &str) -> Option<Self> {
        let (node_id, pin) = s.rsplit_once('.')?;
        if node_id.is_empty() || pin.is_empty() {
            return None;
        }
        Some(Self::new(node_id, pin))
    }

    /// Borrowing variant of [`Endpoint::parse`]
    pub fn split(s: &str) -> Option<(&str, &str)> {
        s.rsplit_once('.')
            .filter(|(node, pin)| !node.is_empty() && !pin.is_empty())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node_id, self.pin)
    }
}

/// A connection between two pins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Source: "node_id.pin_name"
    pub from: String,
    /// Destination: "node_id.pin_name"
    pub to: String,
}

impl Connection {
    /// Create a new connection
    pub fn new(from_node: &str, from_pin: &str, to_node: &str, to_pin: &str) -> Self {
        Self {
            from: Endpoint::new(from_node, from_pin).to_string(),
            to: Endpoint::new(to_node, to_pin).to_string(),
        }
    }

    /// Parse the "from" field into (node_id, pin_name)
    pub fn from_parts(&self) -> Option<(&str, &str)> {
        Endpoint::split(&self.from)
    }

    /// Parse the "to" field into (node_id, pin_name)
    pub fn to_parts(&self) -> Option<(&str, &str)> {
        Endpoint::split(&self.to)
    }

    pub fn from_endpoint(&self) -> Option<Endpoint> {
        Endpoint::parse(&self.from)
    }

    pub fn to_endpoint(&self) -> Option<Endpoint> {
        Endpoint::parse(&self.to)
    }
}

/// Complete blueprint definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Version string
    #[serde(default = "default_version")]
    pub version: String,
    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Blueprint-level variables
    #[serde(default)]
    pub variables: HashMap<String, VariableDef>,
    /// Nodes in this blueprint
    #[serde(default)]
    pub nodes: Vec<BlueprintNode>,
    /// Connections between nodes
    #[serde(default)]
    pub connections: Vec<Connection>,
    /// Reusable subgraphs callable from `function/Call` nodes
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub functions: HashMap<String, FunctionDef>,
}

fn connections_from<'s>(
    connections: &'s [Connection],
    node_id: &str,
    pin_name: &str,
) -> impl Iterator<Item = &'s Connection> {
    connections
        .iter()
        .filter(move |c| c.from_parts() == Some((node_id, pin_name)))
}

fn connections_into<'s>(
    connections: &'s [Connection],
    node_id: &str,
) -> impl Iterator<Item = &'s Connection> {
    connections
        .iter()
        .filter(move |c| c.to_parts().map(|(n, _)| n) == Some(node_id))
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Blueprint {
    /// Create a new empty blueprint
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: default_version(),
            description: None,
            variables: HashMap::new(),
            nodes: Vec::new(),
            connections: Vec::new(),
            functions: HashMap::new(),
        }
    }

    /// Add a node (builder style, mostly for tests and tooling)
    pub fn with_node(mut self, node: BlueprintNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a connection (builder style)
    pub fn with_connection(mut self, from: &str, to: &str) -> Self {
        self.connections.push(Connection {
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    /// Add a function (builder style)
    pub fn with_function(mut self, name: &str, function: FunctionDef) -> Self {
        self.functions.insert(name.to_string(), function);
        self
    }

    /// Declare a variable with a default value (builder style)
    pub fn with_variable(mut self, name: &str, var_type: PinType, default: Value) -> Self {
        self.variables.insert(
            name.to_string(),
            VariableDef {
                var_type,
                default: Some(default),
                description: None,
            },
        );
        self
    }

    /// Get a node by ID
    pub fn get_node(&self, id: &str) -> Option<&BlueprintNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Get all connections leaving a specific node and pin
    pub fn connections_from<'s>(
        &'s self,
        node_id: &str,
        pin_name: &str,
    ) -> impl Iterator<Item = &'s Connection> {
        connections_from(&self.connections, node_id, pin_name)
    }

    /// Get all connections arriving at any pin of a node
    pub fn connections_into<'s>(&'s self, node_id: &str) -> impl Iterator<Item = &'s Connection> {
        connections_into(&self.connections, node_id)
    }

    /// The node wired to an output pin, if any (first connection wins)
    pub fn target_of<'s>(&'s self, node_id: &str, pin_name: &str) -> Option<&'s str> {
        self.connections_from(node_id, pin_name)
            .find_map(|c| c.to_parts().map(|(n, _)| n))
    }

    /// Get a function by name
    pub fn get_function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    /// Validate every function, collecting one error per broken function
    pub fn validate_functions(&self) -> Result<(), Vec<FunctionValidationError>> {
        let errors: Vec<_> = self
            .functions
            .iter()
            .filter_map(|(name, function)| function.validate(name).err())
            .collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Declared variables mapped to their default values (`null` when unset)
    pub fn variable_defaults(&self) -> HashMap<String, Value> {
        self.variables
            .iter()
            .map(|(name, def)| (name.clone(), def.default.clone().unwrap_or(Value::Null)))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Node id whose outputs carry a function's input values
pub const FUNCTION_ENTRY_NODE: &str = "__entry__";
/// Node id whose inputs become a function's output values
pub const FUNCTION_EXIT_NODE: &str = "__exit__";
/// Node type that calls the function named by its `function` config
pub const FUNCTION_CALL_NODE: &str = "function/Call";

/// An input or output of a function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: PinType,
    /// Used when the caller leaves an input unconnected, or the body never
    /// produces an output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FunctionParam {
    pub fn new(name: &str, param_type: PinType) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            default: None,
            description: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A reusable subgraph with typed inputs and outputs.
///
/// The body is an ordinary node graph containing two marker nodes:
/// [`FUNCTION_ENTRY_NODE`] exposes each input as an output pin (and, for
/// impure functions, an `exec` pin the body starts from) and
/// [`FUNCTION_EXIT_NODE`] collects each output on an input pin of the same name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: Vec<FunctionParam>,
    #[serde(default)]
    pub outputs: Vec<FunctionParam>,
    /// Pure functions have no exec flow; their outputs are pulled like a pure node
    #[serde(default)]
    pub pure: bool,
    #[serde(default)]
    pub nodes: Vec<BlueprintNode>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// Problems found in one function definition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("function '{function_name}' is invalid: {}", .errors.join(", "))]
pub struct FunctionValidationError {
    pub function_name: String,
    pub errors: Vec<String>,
}

impl FunctionDef {
    pub fn get_node(&self, id: &str) -> Option<&BlueprintNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn connections_from<'s>(
        &'s self,
        node_id: &str,
        pin_name: &str,
    ) -> impl Iterator<Item = &'s Connection> {
        connections_from(&self.connections, node_id, pin_name)
    }

    /// The body as a standalone blueprint the engine can walk
    pub fn to_blueprint(&self, id: &str) -> Blueprint {
        Blueprint {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            ..Blueprint::new(id, self.name.as_deref().unwrap_or(id))
        }
    }

    /// Check the marker nodes, wiring and parameter names
    pub fn validate(&self, name: &str) -> Result<(), FunctionValidationError> {
        let mut errors = Vec::new();

        for marker in [FUNCTION_ENTRY_NODE, FUNCTION_EXIT_NODE] {
            if self.get_node(marker).is_none() {
                errors.push(format!("missing node '{marker}'"));
            }
        }

        let node_ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        for conn in &self.connections {
            for (side, endpoint) in [("from", &conn.from), ("to", &conn.to)] {
                match Endpoint::split(endpoint) {
                    Some((node, _)) if !node_ids.contains(node) => {
                        errors.push(format!("connection {side} unknown node '{node}'"))
                    }
                    Some(_) => {}
                    None => errors.push(format!("malformed endpoint '{endpoint}'")),
                }
            }
        }

        if self.pure {
            if self.connections_from(FUNCTION_ENTRY_NODE, "exec").next().is_some() {
                errors.push("pure function has an exec connection from its entry".to_string());
            }
            let exit_exec = format!("{FUNCTION_EXIT_NODE}.exec");
            if self.connections.iter().any(|c| c.to == exit_exec) {
                errors.push("pure function has an exec connection into its exit".to_string());
            }
        }

        for (kind, params) in [("input", &self.inputs), ("output", &self.outputs)] {
            let mut seen = HashSet::new();
            for param in params {
                if !seen.insert(param.name.as_str()) {
                    errors.push(format!("duplicate {kind} '{}'", param.name));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FunctionValidationError {
                function_name: name.to_string(),
                errors,
            })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Execution Types
// ─────────────────────────────────────────────────────────────────────────────

/// The external stimulus that starts one execution of a blueprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrigger {
    /// Trigger kind ("start", "event", ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Trigger payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Name of the published event that caused an "event" trigger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl ExecutionTrigger {
    pub fn new(kind: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            kind: kind.into(),
            data,
            event_type: None,
        }
    }

    pub fn start() -> Self {
        Self::new("start", None)
    }

    pub fn event(data: Value) -> Self {
        Self::new("event", Some(data))
    }

    /// An "event" trigger for a named event
    pub fn named_event(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: Some(event_type.into()),
            ..Self::event(data)
        }
    }

    /// The event name: explicit, or the payload's `event_type` field
    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref().or_else(|| {
            self.data
                .as_ref()
                .and_then(|data| data.get("event_type"))
                .and_then(Value::as_str)
        })
    }
}

/// Result of executing a single node: where control goes next
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeResult {
    /// Continue execution from the specified output exec pin
    Continue { pin: String },
    /// Run each pin's subgraph to completion, in order
    Sequence { pins: Vec<String> },
    /// Run the subgraph on `pin` once per index in `start..end`
    Loop {
        pin: String,
        #[serde(deserialize_with = "integral")]
        start: i64,
        #[serde(deserialize_with = "integral")]
        end: i64,
        #[serde(default, deserialize_with = "integral")]
        current: i64,
    },
    /// Node produced an error
    Error {
        #[serde(default = "unspecified_error")]
        message: String,
    },
    /// Node execution completed, no more execution from this node
    End,
}

/// Integers may arrive written as floats (`3.0`) from dynamically typed hosts
fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = number.as_i64() {
        return Ok(n);
    }
    match number.as_f64() {
        Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
        _ => Err(de::Error::custom(format!("expected an integer, got {number}"))),
    }
}

fn unspecified_error() -> String {
    "node reported an error".to_string()
}

/// Overall status of a blueprint run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Completed => f.write_str("completed"),
            ExecutionStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Kinds of conditions that were logged and swallowed during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnknownNodeType,
    NodeExecutionError,
    PureEvaluationError,
    StepLimitExceeded,
}

/// A recorded condition from a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub node_id: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Result of blueprint execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Status of the execution
    pub status: ExecutionStatus,
    /// Error message if failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Node outputs keyed by node ID, then pin name
    #[serde(default)]
    pub outputs: HashMap<String, HashMap<String, Value>>,
    /// Final variable values after execution
    #[serde(default)]
    pub variables: HashMap<String, Value>,
    /// Conditions logged during the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl ExecutionResult {
    /// A result for a run that could not start
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            error: Some(error.into()),
            outputs: HashMap::new(),
            variables: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Output value of a node pin
    pub fn output(&self, node_id: &str, pin: &str) -> Option<&Value> {
        self.outputs.get(node_id).and_then(|values| values.get(pin))
    }

    pub fn has_diagnostic(&self, kind: DiagnosticKind) -> bool {
        self.diagnostics.iter().any(|d| d.kind == kind)
    }
}
