//! Blueprint Runtime - Execution engine for visual scripts
//!
//! This crate contains the node registry, the built-in node library and the
//! engine that runs a blueprint graph in response to a trigger.

pub use blueprint_types;

mod config;
mod engine;
mod error;
mod executor;
pub mod nodes;
mod registry;
pub mod services;

pub use config::EngineConfig;
pub use engine::BlueprintEngine;
pub use error::{EngineError, NodeError, PointError};
pub use executor::*;
pub use nodes::register_builtin_nodes;
pub use registry::*;
pub use services::{
    Event, EventPublisher, LogLevel, LogSink, MemoryLogSink, MemoryPointStore,
    MemoryVariableStore, PointStore, RuntimeServices, TracingLogSink, VariableStore,
};
