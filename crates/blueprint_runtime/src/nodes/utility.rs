// ─────────────────────────────────────────────────────────────────────────────
// Utility Nodes
// ─────────────────────────────────────────────────────────────────────────────

use std::collections::HashMap;

use blueprint_types::{PinDef, PinType};
use serde_json::Value;

use super::{exec_node, pure_node};
use crate::executor::{display_value, NodeOutput};
use crate::registry::NodeRegistry;
use crate::services::LogLevel;

const CATEGORY: &str = "Utility";

pub(super) fn register(registry: &mut NodeRegistry) {
    // Print
    registry.register_fn(
        exec_node(
            "utility/Print",
            "Print",
            CATEGORY,
            "Print a message to the log",
            vec![
                PinDef::exec_in(),
                PinDef::data_in("message", PinType::Any),
                PinDef::exec_out("then"),
            ],
        ),
        |ctx| {
            let message = display_value(ctx.get_input("message"));
            ctx.log(LogLevel::Info, &message);
            NodeOutput::continue_to("then", HashMap::new())
        },
    );

    // Log
    registry.register_fn(
        exec_node(
            "utility/Log",
            "Log",
            CATEGORY,
            "Log a message at the configured level",
            vec![
                PinDef::exec_in(),
                PinDef::data_in("message", PinType::Any),
                PinDef::exec_out("then"),
            ],
        ),
        |ctx| {
            let level = LogLevel::from_name(ctx.get_config_string("level").unwrap_or("info"));
            let message = display_value(ctx.get_input("message"));
            ctx.log(level, &message);
            NodeOutput::continue_to("then", HashMap::new())
        },
    );

    // Constant
    registry.register_fn(
        pure_node(
            "utility/Constant",
            "Constant",
            CATEGORY,
            "A fixed value from the node config",
            vec![PinDef::data_out("value", PinType::Any)],
        ),
        |ctx| {
            let value = ctx.get_config("value").cloned().unwrap_or(Value::Null);
            NodeOutput::single("value", value)
        },
    );

    // GetVariable
    registry.register_fn(
        pure_node(
            "utility/GetVariable",
            "Get Variable",
            CATEGORY,
            "Read a blueprint variable",
            vec![PinDef::data_out("value", PinType::Any)],
        ),
        |ctx| {
            let Some(name) = ctx.get_config_string("variable") else {
                return NodeOutput::error("Invalid input 'variable': missing");
            };
            let value = ctx.services.variables.get(name).unwrap_or(Value::Null);
            NodeOutput::single("value", value)
        },
    );

    // SetVariable
    registry.register_fn(
        exec_node(
            "utility/SetVariable",
            "Set Variable",
            CATEGORY,
            "Write a blueprint variable",
            vec![
                PinDef::exec_in(),
                PinDef::data_in("value", PinType::Any),
                PinDef::exec_out("then"),
                PinDef::data_out("value", PinType::Any),
            ],
        ),
        |ctx| {
            let Some(name) = ctx.get_config_string("variable").map(str::to_string) else {
                return NodeOutput::error("Invalid input 'variable': missing");
            };
            let value = ctx.get_input("value").cloned().unwrap_or(Value::Null);
            ctx.set_variable(&name, value.clone());
            NodeOutput::continue_to("then", HashMap::from([("value".to_string(), value)]))
        },
    );

    // ToString
    registry.register_fn(
        pure_node(
            "utility/ToString",
            "To String",
            CATEGORY,
            "Render any value as text",
            vec![
                PinDef::data_in("value", PinType::Any),
                PinDef::data_out("result", PinType::String),
            ],
        ),
        |ctx| NodeOutput::single("result", Value::String(display_value(ctx.get_input("value")))),
    );
}
