// ─────────────────────────────────────────────────────────────────────────────
// Logic Nodes
// ─────────────────────────────────────────────────────────────────────────────

use blueprint_types::{PinDef, PinType};
use serde_json::Value;

use super::pure_node;
use crate::executor::{NodeContext, NodeOutput};
use crate::registry::NodeRegistry;

const CATEGORY: &str = "Logic";

pub(super) fn register(registry: &mut NodeRegistry) {
    binary(registry, "logic/And", "AND", "Logical AND", |a, b| a && b);
    binary(registry, "logic/Or", "OR", "Logical OR", |a, b| a || b);
    binary(registry, "logic/Xor", "XOR", "Logical XOR", |a, b| a ^ b);

    // Not
    registry.register_fn(
        pure_node(
            "logic/Not",
            "NOT",
            CATEGORY,
            "Logical NOT",
            vec![
                PinDef::data_in("value", PinType::Boolean),
                PinDef::data_out("result", PinType::Boolean),
            ],
        ),
        |ctx| {
            let value = ctx.get_input_bool("value").unwrap_or(false);
            NodeOutput::single("result", Value::Bool(!value))
        },
    );
}

fn binary(registry: &mut NodeRegistry, id: &str, name: &str, description: &str, f: fn(bool, bool) -> bool) {
    registry.register_fn(
        pure_node(
            id,
            name,
            CATEGORY,
            description,
            vec![
                PinDef::data_in("a", PinType::Boolean),
                PinDef::data_in("b", PinType::Boolean),
                PinDef::data_out("result", PinType::Boolean),
            ],
        ),
        move |ctx: &mut NodeContext| {
            let a = ctx.get_input_bool("a").unwrap_or(false);
            let b = ctx.get_input_bool("b").unwrap_or(false);
            NodeOutput::single("result", Value::Bool(f(a, b)))
        },
    );
}

#[cfg(test)]
mod tests {
    use crate::nodes::test_support::eval;
    use serde_json::json;

    #[tokio::test]
    async fn test_logic_gates() {
        let and = eval("logic/And", json!({"a": true, "b": false})).await;
        assert_eq!(and.values["result"], json!(false));
        let or = eval("logic/Or", json!({"a": true, "b": false})).await;
        assert_eq!(or.values["result"], json!(true));
        let xor = eval("logic/Xor", json!({"a": true, "b": true})).await;
        assert_eq!(xor.values["result"], json!(false));
    }

    #[tokio::test]
    async fn test_not_defaults_false_input() {
        let output = eval("logic/Not", json!({})).await;
        assert_eq!(output.values["result"], json!(true));
    }
}
