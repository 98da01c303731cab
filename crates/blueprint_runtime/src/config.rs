//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Limits and reserved names used by the execution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum node executions in a single run before the engine stops
    /// following control flow (guards against exec cycles)
    pub max_steps: usize,
    /// Variable the current loop index is published under
    pub loop_index_variable: String,
    /// Upper bound on iterations of a single loop result
    pub max_loop_iterations: u64,
    /// How deeply function calls may nest
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            loop_index_variable: "__loop_index".to_string(),
            max_loop_iterations: 1_000_000,
            max_call_depth: 32,
        }
    }
}
