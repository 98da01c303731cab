//! Built-in Node Registration
//!
//! Registers all built-in blueprint nodes (math, logic, flow control, etc.)

use blueprint_types::{NodeDef, PinDef};

use crate::registry::NodeRegistry;

mod compare;
mod events;
mod flow;
mod logic;
mod math;
mod points;
mod utility;

/// Register all built-in nodes
pub fn register_builtin_nodes(registry: &mut NodeRegistry) {
    math::register(registry);
    logic::register(registry);
    compare::register(registry);
    flow::register(registry);
    events::register(registry);
    points::register(registry);
    utility::register(registry);

    tracing::debug!("Registered {} built-in nodes", registry.len());
}

impl NodeRegistry {
    /// A registry preloaded with every built-in node
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtin_nodes(&mut registry);
        registry
    }
}

/// Definition of a pure node
fn pure_node(id: &str, name: &str, category: &str, description: &str, pins: Vec<PinDef>) -> NodeDef {
    NodeDef {
        pure: true,
        pins,
        description: Some(description.to_string()),
        ..NodeDef::new(id, name, category)
    }
}

/// Definition of an impure node
fn exec_node(id: &str, name: &str, category: &str, description: &str, pins: Vec<PinDef>) -> NodeDef {
    NodeDef {
        pins,
        description: Some(description.to_string()),
        ..NodeDef::new(id, name, category)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use serde_json::Value;

    use crate::executor::{NodeContext, NodeOutput};
    use crate::registry::NodeRegistry;
    use crate::services::RuntimeServices;

    /// Run a built-in node directly with the given inputs and config
    pub async fn run_node(
        node_type: &str,
        inputs: Value,
        config: Value,
        services: RuntimeServices,
    ) -> Result<NodeOutput, crate::error::NodeError> {
        let registry = NodeRegistry::with_builtins();
        let executor = registry
            .get_executor(node_type)
            .unwrap_or_else(|| panic!("{node_type} not registered"));
        let inputs: HashMap<String, Value> = match inputs {
            Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        let mut ctx = NodeContext::new("node_1".to_string(), config, inputs, HashMap::new())
            .with_node_type(node_type)
            .with_services(services);
        executor.execute(&mut ctx).await
    }

    pub async fn eval(node_type: &str, inputs: Value) -> NodeOutput {
        run_node(node_type, inputs, Value::Null, RuntimeServices::default())
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_types::Purity;

    #[test]
    fn test_builtins_registered() {
        let registry = NodeRegistry::with_builtins();
        for id in [
            "math/Add",
            "math/Divide",
            "logic/Not",
            "compare/Compare",
            "flow/Branch",
            "flow/Sequence",
            "flow/ForLoop",
            "flow/Delay",
            "event/OnStart",
            "event/OnEvent",
            "event/PublishEvent",
            "point/ReadPoint",
            "point/WritePoint",
            "utility/Print",
            "utility/SetVariable",
        ] {
            assert!(registry.contains(id), "{id} missing");
        }
        assert!(registry.categories().contains(&"Math".to_string()));
    }

    #[test]
    fn test_builtin_purity() {
        let registry = NodeRegistry::with_builtins();
        let purity = |id: &str| registry.get_definition(id).unwrap().purity();
        assert_eq!(purity("math/Add"), Purity::Pure);
        assert_eq!(purity("flow/Branch"), Purity::Impure);
        assert_eq!(purity("flow/Delay"), Purity::Latent);

        let on_start = registry.get_definition("event/OnStart").unwrap();
        assert!(on_start.responds_to("start"));
        assert!(!on_start.responds_to("event"));
    }
}
