//! Runtime services consumed by blueprint nodes.
//!
//! The engine does not talk to the building network, the event bus or the
//! variable store itself. Hosts hand it implementations of these traits and
//! nodes reach them through their `NodeContext`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{NodeError, PointError};

// ─────────────────────────────────────────────────────────────────────────────
// Points
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for point value storage.
#[async_trait]
pub trait PointStore: Send + Sync + 'static {
    /// Read a point value by path. `Ok(None)` means the point does not exist.
    async fn read(&self, path: &str) -> Result<Option<Value>, PointError>;
    /// Write a point value by path.
    async fn write(&self, path: &str, value: Value) -> Result<(), PointError>;
}

/// Point store backed by an in-process map.
#[derive(Default)]
pub struct MemoryPointStore {
    points: DashMap<String, Value>,
}

impl MemoryPointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with initial point values
    pub fn with_points<I, K>(points: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let store = Self::new();
        for (path, value) in points {
            store.points.insert(path.into(), value);
        }
        store
    }

    /// Current value of a point
    pub fn get(&self, path: &str) -> Option<Value> {
        self.points.get(path).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[async_trait]
impl PointStore for MemoryPointStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, PointError> {
        Ok(self.get(path))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), PointError> {
        if path.is_empty() {
            return Err(PointError::WriteFailed("empty point path".to_string()));
        }
        self.points.insert(path.to_string(), value);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Variables
// ─────────────────────────────────────────────────────────────────────────────

/// Named variable storage shared between the engine and its nodes.
pub trait VariableStore: Send + Sync + 'static {
    fn get(&self, name: &str) -> Option<Value>;
    fn set(&self, name: &str, value: Value);
    fn get_all(&self) -> HashMap<String, Value>;
    /// Replace every variable at once (used to seed a run)
    fn replace_all(&self, values: HashMap<String, Value>);
}

/// Variable store backed by an in-process map.
#[derive(Default)]
pub struct MemoryVariableStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VariableStore for MemoryVariableStore {
    fn get(&self, name: &str) -> Option<Value> {
        self.values.read().get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) {
        self.values.write().insert(name.to_string(), value);
    }

    fn get_all(&self) -> HashMap<String, Value> {
        self.values.read().clone()
    }

    fn replace_all(&self, values: HashMap<String, Value>) {
        *self.values.write() = values;
    }
}

/// A run's view of the variable store.
///
/// Holds the local snapshot handed to nodes and resynchronizes it from the
/// store after every node step, so writes made in one branch are visible to
/// every later node in the run.
pub struct VariablesHandle {
    store: Arc<dyn VariableStore>,
    snapshot: HashMap<String, Value>,
}

impl VariablesHandle {
    /// Seed the store with `defaults` and take the first snapshot
    pub fn init(store: Arc<dyn VariableStore>, defaults: HashMap<String, Value>) -> Self {
        store.replace_all(defaults.clone());
        Self {
            store,
            snapshot: defaults,
        }
    }

    /// Another handle on the same store, for a nested run
    pub fn attach(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            snapshot: self.snapshot.clone(),
        }
    }

    pub fn snapshot(&self) -> &HashMap<String, Value> {
        &self.snapshot
    }

    pub fn resync(&mut self) {
        self.snapshot = self.store.get_all();
    }

    /// Write through to the store and the local snapshot
    pub fn publish(&mut self, name: &str, value: Value) {
        self.store.set(name, value.clone());
        self.snapshot.insert(name.to_string(), value);
    }

    /// Final values, read back from the store
    pub fn into_final(self) -> HashMap<String, Value> {
        self.store.get_all()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

/// Log levels available to blueprints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parse a level name; unknown names fall back to `Info`
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "error" => LogLevel::Error,
            "warn" | "warning" => LogLevel::Warn,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(name)
    }
}

/// Destination for messages logged by blueprint nodes.
pub trait LogSink: Send + Sync + 'static {
    fn log(&self, level: LogLevel, node_id: &str, message: &str);
}

/// Forwards blueprint logs to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, node_id: &str, message: &str) {
        match level {
            LogLevel::Error => tracing::error!(node_id, "Blueprint: {}", message),
            LogLevel::Warn => tracing::warn!(node_id, "Blueprint: {}", message),
            LogLevel::Info => tracing::info!(node_id, "Blueprint: {}", message),
            LogLevel::Debug => tracing::debug!(node_id, "Blueprint: {}", message),
            LogLevel::Trace => tracing::trace!(node_id, "Blueprint: {}", message),
        }
    }
}

/// A captured log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub node_id: String,
    pub message: String,
}

/// Keeps every log line in memory (and still forwards to `tracing`).
#[derive(Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    /// Messages only, in logging order
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, level: LogLevel, node_id: &str, message: &str) {
        TracingLogSink.log(level, node_id, message);
        self.entries.lock().push(LogEntry {
            level,
            node_id: node_id.to_string(),
            message: message.to_string(),
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// An event that can be published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Type of the event (e.g., "device/point/changed")
    pub event_type: String,
    /// Source of the event (e.g., blueprint ID)
    pub source: String,
    /// Event payload data
    pub data: Value,
    /// Timestamp in milliseconds since Unix epoch
    pub timestamp: u64,
}

impl Event {
    /// Create a new event with the current timestamp.
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            data,
            timestamp: chrono::Utc::now().timestamp_millis().max(0) as u64,
        }
    }
}

/// Event publisher handle for emitting events.
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<Event>,
}

impl EventPublisher {
    /// Create a new event publisher with the given broadcast sender.
    pub fn new(tx: broadcast::Sender<Event>) -> Self {
        Self { tx }
    }

    /// Create a publisher together with a first subscriber
    pub fn channel(capacity: usize) -> (Self, broadcast::Receiver<Event>) {
        let (tx, rx) = broadcast::channel(capacity);
        (Self::new(tx), rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers, returning how many received it.
    ///
    /// Publishing with nobody subscribed is not an error; the event is dropped.
    pub fn emit(&self, event: Event) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!(event_type = %event.event_type, "No subscribers, event dropped");
                0
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service bundle
// ─────────────────────────────────────────────────────────────────────────────

/// Services that can be accessed from nodes.
#[derive(Clone)]
pub struct RuntimeServices {
    /// Point store for reading/writing point values
    pub points: Option<Arc<dyn PointStore>>,
    /// Event publisher for emitting events
    pub events: Option<EventPublisher>,
    /// Variable store shared by all nodes of a run
    pub variables: Arc<dyn VariableStore>,
    /// Destination for blueprint log output
    pub logger: Arc<dyn LogSink>,
}

impl Default for RuntimeServices {
    fn default() -> Self {
        Self {
            points: None,
            events: None,
            variables: Arc::new(MemoryVariableStore::new()),
            logger: Arc::new(TracingLogSink),
        }
    }
}

impl RuntimeServices {
    pub fn with_points(mut self, points: Arc<dyn PointStore>) -> Self {
        self.points = Some(points);
        self
    }

    pub fn with_events(mut self, events: EventPublisher) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_variables(mut self, variables: Arc<dyn VariableStore>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn LogSink>) -> Self {
        self.logger = logger;
        self
    }

    pub fn point_store(&self) -> Result<&Arc<dyn PointStore>, NodeError> {
        self.points
            .as_ref()
            .ok_or(NodeError::ServiceUnavailable("Point store"))
    }

    pub fn event_publisher(&self) -> Result<&EventPublisher, NodeError> {
        self.events
            .as_ref()
            .ok_or(NodeError::ServiceUnavailable("Event publisher"))
    }
}
