// ─────────────────────────────────────────────────────────────────────────────
// Point Nodes
// ─────────────────────────────────────────────────────────────────────────────

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use blueprint_types::{PinDef, PinType};
use serde_json::Value;

use super::exec_node;
use crate::error::{NodeError, PointError};
use crate::executor::{NodeContext, NodeOutput};
use crate::registry::{NodeExecutor, NodeRegistry};

const CATEGORY: &str = "Points";

pub(super) fn register(registry: &mut NodeRegistry) {
    registry.register(
        exec_node(
            "point/ReadPoint",
            "Read Point",
            CATEGORY,
            "Read the current value of a point",
            vec![
                PinDef::exec_in(),
                PinDef::data_in("path", PinType::String),
                PinDef::data_out("value", PinType::PointValue),
                PinDef::exec_out("then"),
            ],
        ),
        Arc::new(ReadPointNode),
    );

    registry.register(
        exec_node(
            "point/WritePoint",
            "Write Point",
            CATEGORY,
            "Write a value to a point",
            vec![
                PinDef::exec_in(),
                PinDef::data_in("path", PinType::String),
                PinDef::data_in("value", PinType::PointValue),
                PinDef::exec_out("then"),
            ],
        ),
        Arc::new(WritePointNode),
    );
}

/// Point path from the `path` input, falling back to `config.path`
fn point_path(ctx: &NodeContext) -> Result<String, NodeError> {
    ctx.get_input_string("path")
        .or_else(|| ctx.get_config_string("path"))
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .ok_or_else(|| NodeError::invalid_input("path", "no point path given"))
}

struct ReadPointNode;

#[async_trait]
impl NodeExecutor for ReadPointNode {
    async fn execute(&self, ctx: &mut NodeContext) -> Result<NodeOutput, NodeError> {
        let path = point_path(ctx)?;
        let store = ctx.services.point_store()?;

        let value = store
            .read(&path)
            .await?
            .ok_or_else(|| PointError::NotFound(path.clone()))?;
        tracing::debug!(node_id = %ctx.node_id, %path, %value, "Point read");

        Ok(NodeOutput::continue_to(
            "then",
            HashMap::from([("value".to_string(), value)]),
        ))
    }
}

struct WritePointNode;

#[async_trait]
impl NodeExecutor for WritePointNode {
    async fn execute(&self, ctx: &mut NodeContext) -> Result<NodeOutput, NodeError> {
        let path = point_path(ctx)?;
        let value = ctx.get_input("value").cloned().unwrap_or(Value::Null);
        let store = ctx.services.point_store()?;

        store.write(&path, value.clone()).await?;
        tracing::debug!(node_id = %ctx.node_id, %path, %value, "Point written");

        Ok(NodeOutput::continue_to("then", HashMap::new()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::error::{NodeError, PointError};
    use crate::nodes::test_support::run_node;
    use crate::services::{MemoryPointStore, RuntimeServices};

    #[tokio::test]
    async fn test_read_point_from_config_path() {
        let store = Arc::new(MemoryPointStore::with_points([("ahu-1/sat", json!(55.5))]));
        let services = RuntimeServices::default().with_points(store);

        let output = run_node("point/ReadPoint", json!({}), json!({"path": "ahu-1/sat"}), services)
            .await
            .unwrap();
        assert_eq!(output.next_exec_pin(), Some("then"));
        assert_eq!(output.values["value"], json!(55.5));
    }

    #[tokio::test]
    async fn test_read_missing_point() {
        let services = RuntimeServices::default().with_points(Arc::new(MemoryPointStore::new()));
        let result = run_node("point/ReadPoint", json!({"path": "nope"}), json!({}), services).await;
        assert!(matches!(result, Err(NodeError::Point(PointError::NotFound(p))) if p == "nope"));
    }

    #[tokio::test]
    async fn test_write_point() {
        let store = Arc::new(MemoryPointStore::new());
        let services = RuntimeServices::default().with_points(store.clone());

        run_node(
            "point/WritePoint",
            json!({"path": "vav-3/damper", "value": 40}),
            json!({}),
            services,
        )
        .await
        .unwrap();
        assert_eq!(store.get("vav-3/damper"), Some(json!(40)));
    }

    #[tokio::test]
    async fn test_points_require_store_and_path() {
        let result = run_node("point/ReadPoint", json!({"path": "x"}), json!({}), RuntimeServices::default()).await;
        assert!(matches!(result, Err(NodeError::ServiceUnavailable(_))));

        let services = RuntimeServices::default().with_points(Arc::new(MemoryPointStore::new()));
        let result = run_node("point/WritePoint", json!({}), json!({}), services).await;
        assert!(matches!(result, Err(NodeError::InvalidInput { .. })));
    }
}
