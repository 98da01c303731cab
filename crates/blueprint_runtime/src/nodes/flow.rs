// ─────────────────────────────────────────────────────────────────────────────
// Flow Control Nodes
// ─────────────────────────────────────────────────────────────────────────────

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blueprint_types::{NodeDef, PinDef, PinType};
use serde_json::json;

use super::exec_node;
use crate::error::NodeError;
use crate::executor::{NodeContext, NodeOutput};
use crate::registry::{NodeExecutor, NodeRegistry};

const CATEGORY: &str = "Flow Control";

/// Branches a sequence node gets when `outputs` is not configured
const DEFAULT_SEQUENCE_OUTPUTS: i64 = 2;

pub(super) fn register(registry: &mut NodeRegistry) {
    // Branch
    registry.register_fn(
        exec_node(
            "flow/Branch",
            "Branch",
            CATEGORY,
            "Route execution based on a condition",
            vec![
                PinDef::exec_in(),
                PinDef::data_in("condition", PinType::Boolean),
                PinDef::exec_out("true").with_label("True"),
                PinDef::exec_out("false").with_label("False"),
            ],
        ),
        |ctx| {
            let condition = ctx.get_input_bool("condition").unwrap_or(false);
            let pin = if condition { "true" } else { "false" };
            NodeOutput::continue_to(pin, HashMap::new())
        },
    );

    // Sequence
    registry.register_fn(
        exec_node(
            "flow/Sequence",
            "Sequence",
            CATEGORY,
            "Run each output in order, one after another",
            vec![
                PinDef::exec_in(),
                PinDef::exec_out("then_0").with_label("Then 0"),
                PinDef::exec_out("then_1").with_label("Then 1"),
            ],
        ),
        |ctx| {
            let count = ctx
                .get_config_integer("outputs")
                .unwrap_or(DEFAULT_SEQUENCE_OUTPUTS)
                .max(0);
            NodeOutput::sequence((0..count).map(|i| format!("then_{i}")))
        },
    );

    // ForLoop
    registry.register_fn(
        exec_node(
            "flow/ForLoop",
            "For Loop",
            CATEGORY,
            "Run the body once for each index in [start, end)",
            vec![
                PinDef::exec_in(),
                PinDef::data_in("start", PinType::Number),
                PinDef::data_in("end", PinType::Number),
                PinDef::exec_out("body").with_label("Loop Body"),
                PinDef::data_out("index", PinType::Number),
                PinDef::exec_out("completed").with_label("Completed"),
            ],
        ),
        |ctx| {
            let start = ctx.get_input_integer("start").unwrap_or(0);
            let end = ctx.get_input_integer("end").unwrap_or(0);
            NodeOutput::loop_over("body", start, end)
        },
    );

    // Delay
    registry.register(
        NodeDef {
            latent: true,
            ..exec_node(
                "flow/Delay",
                "Delay",
                CATEGORY,
                "Wait before continuing",
                vec![
                    PinDef::exec_in(),
                    PinDef::data_in("duration_ms", PinType::Number),
                    PinDef::exec_out("completed"),
                ],
            )
        },
        Arc::new(DelayNode),
    );
}

/// Suspends the branch for `duration_ms` (input, else config)
struct DelayNode;

#[async_trait]
impl NodeExecutor for DelayNode {
    async fn execute(&self, ctx: &mut NodeContext) -> Result<NodeOutput, NodeError> {
        let millis = ctx
            .get_input_real("duration_ms")
            .or_else(|| ctx.get_config("duration_ms").and_then(|v| v.as_f64()))
            .unwrap_or(0.0)
            .max(0.0);

        tracing::debug!(node_id = %ctx.node_id, millis, "Delay started");
        tokio::time::sleep(Duration::from_millis(millis as u64)).await;

        Ok(NodeOutput::continue_to(
            "completed",
            HashMap::from([("elapsed_ms".to_string(), json!(millis))]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::nodes::test_support::{eval, run_node};
    use crate::services::RuntimeServices;
    use blueprint_types::NodeResult;
    use serde_json::json;

    #[tokio::test]
    async fn test_branch() {
        let output = eval("flow/Branch", json!({"condition": true})).await;
        assert_eq!(output.next_exec_pin(), Some("true"));
        let output = eval("flow/Branch", json!({"condition": false})).await;
        assert_eq!(output.next_exec_pin(), Some("false"));
        let output = eval("flow/Branch", json!({})).await;
        assert_eq!(output.next_exec_pin(), Some("false"));
    }

    #[tokio::test]
    async fn test_sequence_outputs() {
        let output = eval("flow/Sequence", json!({})).await;
        assert_eq!(
            output.result,
            NodeResult::Sequence {
                pins: vec!["then_0".to_string(), "then_1".to_string()]
            }
        );

        let output = run_node(
            "flow/Sequence",
            json!({}),
            json!({"outputs": 3}),
            RuntimeServices::default(),
        )
        .await
        .unwrap();
        match output.result {
            NodeResult::Sequence { pins } => assert_eq!(pins.len(), 3),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_for_loop_result() {
        let output = eval("flow/ForLoop", json!({"start": 0, "end": 3})).await;
        assert!(matches!(
            output.result,
            NodeResult::Loop { ref pin, start: 0, end: 3, .. } if pin == "body"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_waits() {
        let started = tokio::time::Instant::now();
        let output = eval("flow/Delay", json!({"duration_ms": 250})).await;
        assert_eq!(output.next_exec_pin(), Some("completed"));
        assert!(started.elapsed() >= std::time::Duration::from_millis(250));
    }
}
