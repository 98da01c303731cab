// ─────────────────────────────────────────────────────────────────────────────
// Math Nodes
// ─────────────────────────────────────────────────────────────────────────────

use blueprint_types::{PinDef, PinType};
use rand::Rng;
use serde_json::json;

use super::pure_node;
use crate::executor::{NodeContext, NodeOutput};
use crate::registry::NodeRegistry;

const CATEGORY: &str = "Math";

pub(super) fn register(registry: &mut NodeRegistry) {
    binary(registry, "math/Add", "Add", "Add two numbers", "sum", |a, b| a + b);
    binary(registry, "math/Subtract", "Subtract", "Subtract b from a", "difference", |a, b| a - b);
    binary(registry, "math/Multiply", "Multiply", "Multiply two numbers", "product", |a, b| a * b);
    binary(registry, "math/Divide", "Divide", "Divide a by b (0 when b is 0)", "quotient", |a, b| {
        if b == 0.0 { 0.0 } else { a / b }
    });
    binary(registry, "math/Modulo", "Modulo", "Remainder of a / b (0 when b is 0)", "remainder", |a, b| {
        if b == 0.0 { 0.0 } else { a % b }
    });
    binary(registry, "math/Min", "Min", "Smaller of two numbers", "result", f64::min);
    binary(registry, "math/Max", "Max", "Larger of two numbers", "result", f64::max);

    // Abs
    registry.register_fn(
        pure_node(
            "math/Abs",
            "Abs",
            CATEGORY,
            "Absolute value",
            vec![
                PinDef::data_in("value", PinType::Number),
                PinDef::data_out("result", PinType::Number),
            ],
        ),
        |ctx| {
            let value = ctx.get_input_real("value").unwrap_or(0.0);
            NodeOutput::single("result", json!(value.abs()))
        },
    );

    // Clamp
    registry.register_fn(
        pure_node(
            "math/Clamp",
            "Clamp",
            CATEGORY,
            "Clamp a value between min and max",
            vec![
                PinDef::data_in("value", PinType::Number),
                PinDef::data_in_with_default("min", PinType::Number, json!(0)),
                PinDef::data_in_with_default("max", PinType::Number, json!(1)),
                PinDef::data_out("result", PinType::Number),
            ],
        ),
        |ctx| {
            let value = ctx.get_input_real("value").unwrap_or(0.0);
            let min = ctx.get_input_real("min").unwrap_or(0.0);
            let max = ctx.get_input_real("max").unwrap_or(1.0);
            // f64::clamp panics on min > max
            let result = value.max(min).min(max);
            NodeOutput::single("result", json!(result))
        },
    );

    // Random
    registry.register_fn(
        pure_node(
            "math/Random",
            "Random",
            CATEGORY,
            "Random number in [min, max)",
            vec![
                PinDef::data_in_with_default("min", PinType::Number, json!(0)),
                PinDef::data_in_with_default("max", PinType::Number, json!(1)),
                PinDef::data_out("value", PinType::Number),
            ],
        ),
        |ctx| {
            let min = ctx.get_input_real("min").unwrap_or(0.0);
            let max = ctx.get_input_real("max").unwrap_or(1.0);
            NodeOutput::single("value", json!(sample(min, max)))
        },
    );
}

/// Uniform sample from `[min, max)`; degenerate or non-finite ranges give `min`
fn sample(min: f64, max: f64) -> f64 {
    if !(min < max) || !min.is_finite() || !max.is_finite() {
        return min;
    }
    let mut rng = rand::thread_rng();
    if (max - min).is_finite() {
        return rng.gen_range(min..max);
    }
    // Width overflows f64: interpolate so no intermediate leaves the range
    let t: f64 = rng.r#gen();
    (min * (1.0 - t) + max * t).clamp(min, max)
}

/// Register a pure node computing `out = f(a, b)`
fn binary(
    registry: &mut NodeRegistry,
    id: &str,
    name: &str,
    description: &str,
    out: &'static str,
    f: fn(f64, f64) -> f64,
) {
    registry.register_fn(
        pure_node(
            id,
            name,
            CATEGORY,
            description,
            vec![
                PinDef::data_in("a", PinType::Number),
                PinDef::data_in("b", PinType::Number),
                PinDef::data_out(out, PinType::Number),
            ],
        ),
        move |ctx: &mut NodeContext| {
            let a = ctx.get_input_real("a").unwrap_or(0.0);
            let b = ctx.get_input_real("b").unwrap_or(0.0);
            NodeOutput::single(out, json!(f(a, b)))
        },
    );
}
