// ─────────────────────────────────────────────────────────────────────────────
// Event Nodes
// ─────────────────────────────────────────────────────────────────────────────

use std::collections::HashMap;

use blueprint_types::{NodeDef, PinDef, PinType};
use serde_json::Value;

use super::exec_node;
use crate::executor::NodeOutput;
use crate::registry::NodeRegistry;
use crate::services::Event;

const CATEGORY: &str = "Events";

fn entry_node(id: &str, name: &str, trigger: &str, description: &str, pins: Vec<PinDef>) -> NodeDef {
    NodeDef {
        entry: true,
        trigger: Some(trigger.to_string()),
        ..exec_node(id, name, CATEGORY, description, pins)
    }
}

pub(super) fn register(registry: &mut NodeRegistry) {
    // OnStart
    registry.register_fn(
        entry_node(
            "event/OnStart",
            "On Start",
            "start",
            "Fires when the blueprint is started",
            vec![PinDef::exec_out("exec")],
        ),
        |_ctx| NodeOutput::continue_to("exec", HashMap::new()),
    );

    // OnEvent
    registry.register_fn(
        entry_node(
            "event/OnEvent",
            "On Event",
            "event",
            "Fires when an event reaches the blueprint",
            vec![
                PinDef::exec_out("exec"),
                PinDef::data_out("event_type", PinType::String),
                PinDef::data_out("data", PinType::Any),
            ],
        ),
        |ctx| {
            let data = ctx.trigger_data.clone().unwrap_or(Value::Null);
            // Top-level payload fields are exposed as pins of their own
            let mut values: HashMap<String, Value> = match &data {
                Value::Object(fields) => fields.clone().into_iter().collect(),
                _ => HashMap::new(),
            };
            if let Some(event_type) = &ctx.event_type {
                values.insert("event_type".to_string(), Value::from(event_type.as_str()));
            }
            values.entry("event_type".to_string()).or_insert(Value::Null);
            values.insert("data".to_string(), data);
            NodeOutput::continue_to("exec", values)
        },
    );

    // PublishEvent
    registry.register_fn(
        exec_node(
            "event/PublishEvent",
            "Publish Event",
            CATEGORY,
            "Publish an event to subscribers",
            vec![
                PinDef::exec_in(),
                PinDef::data_in("event_type", PinType::String),
                PinDef::data_in("data", PinType::Any),
                PinDef::exec_out("then"),
            ],
        ),
        |ctx| {
            let event_type = ctx
                .get_input_string("event_type")
                .or_else(|| ctx.get_config_string("event_type"))
                .map(str::to_string);
            let Some(event_type) = event_type else {
                return NodeOutput::error("Invalid input 'event_type': missing");
            };
            let data = ctx.get_input("data").cloned().unwrap_or(Value::Null);

            let publisher = match ctx.services.event_publisher() {
                Ok(publisher) => publisher,
                Err(err) => return NodeOutput::error(err.to_string()),
            };
            publisher.emit(Event::new(event_type, ctx.node_id.clone(), data));
            NodeOutput::continue_to("then", HashMap::new())
        },
    );
}
