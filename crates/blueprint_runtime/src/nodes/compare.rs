// ─────────────────────────────────────────────────────────────────────────────
// Comparison Nodes
// ─────────────────────────────────────────────────────────────────────────────

use blueprint_types::{PinDef, PinType};
use serde_json::Value;

use super::pure_node;
use crate::executor::{NodeContext, NodeOutput};
use crate::registry::NodeRegistry;

const CATEGORY: &str = "Comparison";

pub(super) fn register(registry: &mut NodeRegistry) {
    for (id, name, op) in [
        ("compare/Equal", "Equal", "=="),
        ("compare/NotEqual", "Not Equal", "!="),
        ("compare/Greater", "Greater", ">"),
        ("compare/GreaterOrEqual", "Greater Or Equal", ">="),
        ("compare/Less", "Less", "<"),
        ("compare/LessOrEqual", "Less Or Equal", "<="),
    ] {
        registry.register_fn(
            pure_node(
                id,
                name,
                CATEGORY,
                &format!("a {op} b"),
                vec![
                    PinDef::data_in("a", PinType::Any),
                    PinDef::data_in("b", PinType::Any),
                    PinDef::data_out("result", PinType::Boolean),
                ],
            ),
            move |ctx| NodeOutput::single("result", Value::Bool(apply(ctx, op))),
        );
    }

    // Compare (operator chosen in config)
    registry.register_fn(
        pure_node(
            "compare/Compare",
            "Compare",
            CATEGORY,
            "Compare a and b with the configured operator",
            vec![
                PinDef::data_in("a", PinType::Any),
                PinDef::data_in("b", PinType::Any),
                PinDef::data_out("result", PinType::Boolean),
            ],
        ),
        |ctx| {
            let op = ctx.get_config_string("operator").unwrap_or("==").to_string();
            if !matches!(op.as_str(), "==" | "!=" | ">" | ">=" | "<" | "<=") {
                return NodeOutput::error(format!("unknown operator '{op}'"));
            }
            NodeOutput::single("result", Value::Bool(apply(ctx, &op)))
        },
    );

    // InRange
    registry.register_fn(
        pure_node(
            "compare/InRange",
            "In Range",
            CATEGORY,
            "Whether min <= value <= max",
            vec![
                PinDef::data_in("value", PinType::Number),
                PinDef::data_in("min", PinType::Number),
                PinDef::data_in("max", PinType::Number),
                PinDef::data_out("result", PinType::Boolean),
            ],
        ),
        |ctx| {
            let value = ctx.get_input_real("value").unwrap_or(0.0);
            let min = ctx.get_input_real("min").unwrap_or(0.0);
            let max = ctx.get_input_real("max").unwrap_or(0.0);
            NodeOutput::single("result", Value::Bool(min <= value && value <= max))
        },
    );
}

/// Evaluate `a op b`. Numbers (and numeric strings) compare numerically;
/// anything else only supports equality.
fn apply(ctx: &NodeContext, op: &str) -> bool {
    // Unconnected pins count as 0
    let number = |pin: &str| match ctx.get_input(pin) {
        None => Some(0.0),
        Some(_) => ctx.get_input_real(pin),
    };
    let numeric = number("a").zip(number("b"));

    match numeric {
        Some((a, b)) => match op {
            "==" => a == b,
            "!=" => a != b,
            ">" => a > b,
            ">=" => a >= b,
            "<" => a < b,
            "<=" => a <= b,
            _ => false,
        },
        None => {
            let equal = ctx.get_input("a") == ctx.get_input("b");
            match op {
                "==" => equal,
                "!=" => !equal,
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::nodes::test_support::{eval, run_node};
    use crate::services::RuntimeServices;
    use serde_json::json;

    #[tokio::test]
    async fn test_numeric_comparisons() {
        let cases = [
            ("compare/Equal", 3, 3, true),
            ("compare/NotEqual", 3, 3, false),
            ("compare/Greater", 4, 3, true),
            ("compare/GreaterOrEqual", 3, 3, true),
            ("compare/Less", 4, 3, false),
            ("compare/LessOrEqual", 2, 3, true),
        ];
        for (node, a, b, expected) in cases {
            let output = eval(node, json!({"a": a, "b": b})).await;
            assert_eq!(output.values["result"], json!(expected), "{node}");
        }
    }

    #[tokio::test]
    async fn test_string_equality() {
        let output = eval("compare/Equal", json!({"a": "occupied", "b": "occupied"})).await;
        assert_eq!(output.values["result"], json!(true));
        let output = eval("compare/Greater", json!({"a": "b", "b": "a"})).await;
        assert_eq!(output.values["result"], json!(false));
    }

    #[tokio::test]
    async fn test_compare_operator_from_config() {
        let output = run_node(
            "compare/Compare",
            json!({"a": 72.5, "b": 70}),
            json!({"operator": ">"}),
            RuntimeServices::default(),
        )
        .await
        .unwrap();
        assert_eq!(output.values["result"], json!(true));

        let output = run_node(
            "compare/Compare",
            json!({}),
            json!({"operator": "<>"}),
            RuntimeServices::default(),
        )
        .await
        .unwrap();
        assert!(output.is_error());
    }

    #[tokio::test]
    async fn test_in_range_inclusive() {
        let output = eval("compare/InRange", json!({"value": 70, "min": 68, "max": 70})).await;
        assert_eq!(output.values["result"], json!(true));
        let output = eval("compare/InRange", json!({"value": 75, "min": 68, "max": 72})).await;
        assert_eq!(output.values["result"], json!(false));
    }
}
