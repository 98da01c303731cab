// Executor - Node execution context and output types
//
// Provides the context passed to node executors and the output structure
// they hand back to the engine.

use std::collections::HashMap;

use serde_json::Value;
use tracing::warn;

use blueprint_types::NodeResult;

use crate::services::{LogLevel, RuntimeServices};

// ─────────────────────────────────────────────────────────────────────────────
// Execution Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context passed to node executors
pub struct NodeContext {
    /// Node instance ID
    pub node_id: String,
    /// Node type ID (e.g. "math/Add")
    pub node_type: String,
    /// Node configuration from blueprint JSON
    pub config: Value,
    /// Input values (pin_name -> value)
    pub inputs: HashMap<String, Value>,
    /// Snapshot of the blueprint variables at the time of the call
    pub variables: HashMap<String, Value>,
    /// Payload of the trigger that started the run (not set for pure evaluation)
    pub trigger_data: Option<Value>,
    /// Name of the event behind an "event" trigger, when known
    pub event_type: Option<String>,
    /// External collaborators (points, events, variables, logging)
    pub services: RuntimeServices,
}

impl NodeContext {
    /// Create a new node context
    pub fn new(
        node_id: String,
        config: Value,
        inputs: HashMap<String, Value>,
        variables: HashMap<String, Value>,
    ) -> Self {
        Self {
            node_id,
            node_type: String::new(),
            config,
            inputs,
            variables,
            trigger_data: None,
            event_type: None,
            services: RuntimeServices::default(),
        }
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    pub fn with_trigger_data(mut self, data: Option<Value>) -> Self {
        self.trigger_data = data;
        self
    }

    pub fn with_event_type(mut self, event_type: Option<String>) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn with_services(mut self, services: RuntimeServices) -> Self {
        self.services = services;
        self
    }

    /// Get an input value by pin name
    pub fn get_input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Get input as f64 (numeric strings and booleans are coerced)
    pub fn get_input_real(&self, name: &str) -> Option<f64> {
        self.inputs.get(name).and_then(coerce_number)
    }

    /// Get input as i64, truncating fractional numbers
    pub fn get_input_integer(&self, name: &str) -> Option<i64> {
        let value = self.inputs.get(name)?;
        value.as_i64().or_else(|| coerce_number(value).map(|n| n as i64))
    }

    /// Get input as bool
    pub fn get_input_bool(&self, name: &str) -> Option<bool> {
        self.inputs.get(name).and_then(coerce_bool)
    }

    /// Get input as string
    pub fn get_input_string(&self, name: &str) -> Option<&str> {
        self.inputs.get(name).and_then(|v| v.as_str())
    }

    /// Get a config value
    pub fn get_config(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Get config as string
    pub fn get_config_string(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    /// Get config as i64
    pub fn get_config_integer(&self, key: &str) -> Option<i64> {
        self.config.get(key).and_then(|v| v.as_i64())
    }

    /// Get a variable value from the snapshot
    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Set a variable value in the shared store
    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.services.variables.set(name, value.clone());
        self.variables.insert(name.to_string(), value);
    }

    /// Log through the host's log sink
    pub fn log(&self, level: LogLevel, message: &str) {
        self.services.logger.log(level, &self.node_id, message);
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

/// Render a value the way log output expects it (strings unquoted)
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            // Integral floats print without the trailing ".0"
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(v) => v.to_string(),
        None => "(empty)".to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Output
// ─────────────────────────────────────────────────────────────────────────────

/// Output from a node execution
#[derive(Debug, Clone)]
pub struct NodeOutput {
    /// Output values (pin_name -> value)
    pub values: HashMap<String, Value>,
    /// Result of execution (which exec pin to follow, etc.)
    pub result: NodeResult,
}

impl NodeOutput {
    /// Create output that continues to a specific exec pin
    pub fn continue_to(exec_pin: &str, values: HashMap<String, Value>) -> Self {
        Self {
            values,
            result: NodeResult::Continue {
                pin: exec_pin.to_string(),
            },
        }
    }

    /// Create output that runs several exec pins one after another
    pub fn sequence<I, S>(pins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: HashMap::new(),
            result: NodeResult::Sequence {
                pins: pins.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Create output that runs the subgraph on `exec_pin` for each index in `start..end`
    pub fn loop_over(exec_pin: &str, start: i64, end: i64) -> Self {
        Self {
            values: HashMap::new(),
            result: NodeResult::Loop {
                pin: exec_pin.to_string(),
                start,
                end,
                current: start,
            },
        }
    }

    /// Create output that ends execution (no more exec flow)
    pub fn end(values: HashMap<String, Value>) -> Self {
        Self {
            values,
            result: NodeResult::End,
        }
    }

    /// Create output for a pure node (just values, no exec flow)
    pub fn pure(values: HashMap<String, Value>) -> Self {
        Self::end(values)
    }

    /// Pure output with a single value
    pub fn single(pin: &str, value: Value) -> Self {
        Self::pure(HashMap::from([(pin.to_string(), value)]))
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            values: HashMap::new(),
            result: NodeResult::Error {
                message: message.into(),
            },
        }
    }

    /// Add an output value
    pub fn with_value(mut self, pin: &str, value: Value) -> Self {
        self.values.insert(pin.to_string(), value);
        self
    }

    /// Normalize a loosely-shaped outcome (as returned by dynamic nodes).
    ///
    /// - nothing / `null` ends the branch with no values
    /// - an object without `values` or `result` is a bare value map
    /// - `values` without `result` ends the branch
    /// - an unrecognized `result` is logged and ends the branch
    pub fn from_raw(raw: Option<Value>) -> Self {
        let Some(Value::Object(mut map)) = raw else {
            return Self::end(HashMap::new());
        };

        if !map.contains_key("values") && !map.contains_key("result") {
            return Self::end(map.into_iter().collect());
        }

        let values = match map.remove("values") {
            Some(Value::Object(values)) => values.into_iter().collect(),
            _ => HashMap::new(),
        };
        let result = match map.remove("result") {
            None | Some(Value::Null) => NodeResult::End,
            Some(raw_result) => match serde_json::from_value::<NodeResult>(raw_result.clone()) {
                Ok(result) => result,
                Err(err) => {
                    warn!(result = %raw_result, error = %err, "Unrecognized node result, branch ends");
                    NodeResult::End
                }
            },
        };

        Self { values, result }
    }

    /// Check if this output continues execution
    pub fn is_continue(&self) -> bool {
        matches!(self.result, NodeResult::Continue { .. })
    }

    /// Check if this output ends execution
    pub fn is_end(&self) -> bool {
        matches!(self.result, NodeResult::End)
    }

    /// Check if this output is an error
    pub fn is_error(&self) -> bool {
        matches!(self.result, NodeResult::Error { .. })
    }

    /// Get the next exec pin if continuing
    pub fn next_exec_pin(&self) -> Option<&str> {
        match &self.result {
            NodeResult::Continue { pin } => Some(pin),
            _ => None,
        }
    }

    /// Get the error message if this is an error
    pub fn error_message(&self) -> Option<&str> {
        match &self.result {
            NodeResult::Error { message } => Some(message),
            _ => None,
        }
    }
}
