//! Blueprint Types - Core type definitions for the visual scripting system
//!
//! This crate contains the pure data structures used by the blueprint system:
//! the pin and type model, the graph model, triggers and execution results.
//! It has no async or runtime dependencies so editors and tooling can share it.

mod types;

pub use types::*;
