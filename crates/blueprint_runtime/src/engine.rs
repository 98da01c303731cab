// Blueprint Engine - Runs blueprint graphs
//
// The engine walks the graph following execution pins and evaluates data pins
// on demand. Pure nodes are executed at most once per run and cached; impure
// nodes run when the exec walk reaches them. Nested flow (sequence branches,
// loop bodies) is driven by an explicit frame stack rather than recursion.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use blueprint_types::{
    Blueprint, BlueprintNode, Diagnostic, DiagnosticKind, ExecutionResult, ExecutionStatus,
    ExecutionTrigger, FunctionDef, FunctionParam, NodeDef, NodeResult, PinDirection,
    FUNCTION_CALL_NODE, FUNCTION_ENTRY_NODE, FUNCTION_EXIT_NODE,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, NodeError};
use crate::executor::{NodeContext, NodeOutput};
use crate::registry::{NodeExecutor, NodeRegistry};
use crate::services::{RuntimeServices, VariablesHandle};

/// Exec pin a loop node continues from once every iteration has run
const LOOP_COMPLETED_PIN: &str = "completed";

// ─────────────────────────────────────────────────────────────────────────────
// Blueprint Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Executes the active blueprint in response to triggers
pub struct BlueprintEngine {
    /// Node registry with definitions and executors
    registry: Arc<NodeRegistry>,
    /// Collaborators handed to every node
    services: RuntimeServices,
    config: EngineConfig,
    /// Blueprint used by the next run
    blueprint: RwLock<Option<Arc<Blueprint>>>,
}

impl BlueprintEngine {
    /// Create a new engine with the given registry and services
    pub fn new(registry: Arc<NodeRegistry>, services: RuntimeServices) -> Self {
        Self {
            registry,
            services,
            config: EngineConfig::default(),
            blueprint: RwLock::new(None),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn services(&self) -> &RuntimeServices {
        &self.services
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Make a blueprint the active one for subsequent runs
    pub fn set_blueprint(&self, blueprint: Arc<Blueprint>) {
        debug!(blueprint_id = %blueprint.id, nodes = blueprint.nodes.len(), "Blueprint set");
        *self.blueprint.write() = Some(blueprint);
    }

    pub fn clear_blueprint(&self) {
        *self.blueprint.write() = None;
    }

    /// The active blueprint, if any
    pub fn blueprint(&self) -> Option<Arc<Blueprint>> {
        self.blueprint.read().clone()
    }

    /// Entry nodes that should fire for a trigger.
    ///
    /// Nodes whose definition answers exactly this trigger kind are preferred;
    /// when there are none every entry node fires. Among the preferred nodes,
    /// one configured with an `event_type` only fires for that event.
    pub fn select_entry_nodes<'b>(
        &self,
        blueprint: &'b Blueprint,
        trigger: &ExecutionTrigger,
    ) -> Vec<&'b BlueprintNode> {
        let entries: Vec<(&BlueprintNode, &NodeDef)> = blueprint
            .nodes
            .iter()
            .filter_map(|node| {
                self.registry
                    .get_definition(&node.node_type)
                    .filter(|def| def.is_entry())
                    .map(|def| (node, def))
            })
            .collect();

        let matching: Vec<&BlueprintNode> = entries
            .iter()
            .filter(|(_, def)| def.responds_to(&trigger.kind))
            .map(|(node, _)| *node)
            .collect();

        if matching.is_empty() {
            entries.into_iter().map(|(node, _)| node).collect()
        } else {
            matching
                .into_iter()
                .filter(|node| accepts_event(node, trigger))
                .collect()
        }
    }

    /// Run the active blueprint for one trigger
    pub async fn execute_blueprint(
        &self,
        trigger: ExecutionTrigger,
    ) -> Result<ExecutionResult, EngineError> {
        let blueprint = self.blueprint().ok_or(EngineError::NoBlueprintLoaded)?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "blueprint_run",
            blueprint_id = %blueprint.id,
            %run_id,
            trigger = %trigger.kind
        );

        async move {
            info!("Starting blueprint execution");

            let variables = VariablesHandle::init(
                Arc::clone(&self.services.variables),
                blueprint.variable_defaults(),
            );
            let mut run = Run {
                engine: self,
                blueprint: &blueprint,
                functions: &blueprint.functions,
                trigger: &trigger,
                in_function: false,
                state: ExecutionState::new(variables),
            };

            let entries = self.select_entry_nodes(&blueprint, &trigger);
            debug!(entries = entries.len(), "Selected entry nodes");
            for entry in entries {
                run.execute_from_node(&entry.id).await;
            }

            let state = run.state;
            let result = ExecutionResult {
                status: ExecutionStatus::Completed,
                error: None,
                outputs: state.node_outputs,
                variables: state.variables.into_final(),
                diagnostics: state.diagnostics,
            };
            info!(
                status = %result.status,
                diagnostics = result.diagnostics.len(),
                "Blueprint execution completed"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run State
// ─────────────────────────────────────────────────────────────────────────────

/// Per-run state, discarded when the run ends
struct ExecutionState {
    /// Cached output values (node_id -> pin_name -> value)
    node_outputs: HashMap<String, HashMap<String, Value>>,
    variables: VariablesHandle,
    diagnostics: Vec<Diagnostic>,
    /// Pure nodes currently being evaluated (cycle guard)
    evaluating: HashSet<String>,
    steps: usize,
    step_limit_hit: bool,
    /// Function calls enclosing this state
    call_depth: usize,
}

impl ExecutionState {
    fn new(variables: VariablesHandle) -> Self {
        Self {
            node_outputs: HashMap::new(),
            variables,
            diagnostics: Vec::new(),
            evaluating: HashSet::new(),
            steps: 0,
            step_limit_hit: false,
            call_depth: 0,
        }
    }

    fn report(&mut self, node_id: &str, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            node_id: node_id.to_string(),
            kind,
            message: message.into(),
        });
    }
}

/// Pending work in a traversal
enum Frame {
    /// Execute this node, then follow its result
    Node(String),
    /// Next iteration of a loop node
    Loop {
        node_id: String,
        pin: String,
        index: i64,
        end: i64,
    },
}

/// One execution of a blueprint (or of a function body) for one trigger
struct Run<'a> {
    engine: &'a BlueprintEngine,
    /// Graph being walked: the blueprint, or a function body
    blueprint: &'a Blueprint,
    /// Functions callable from this graph
    functions: &'a HashMap<String, FunctionDef>,
    trigger: &'a ExecutionTrigger,
    /// Walking a function body, where the exit node returns
    in_function: bool,
    state: ExecutionState,
}

impl<'a> Run<'a> {
    /// Walk the exec graph from a node until every branch it spawns has ended
    async fn execute_from_node(&mut self, start_id: &str) {
        let mut stack = vec![Frame::Node(start_id.to_string())];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Node(node_id) => {
                    if !self.take_step(&node_id) {
                        return;
                    }
                    self.execute_node(&node_id, &mut stack).await;
                }
                Frame::Loop {
                    node_id,
                    pin,
                    index,
                    end,
                } => self.loop_iteration(node_id, pin, index, end, &mut stack),
            }
        }
    }

    /// Count a node execution; false once the step limit is reached
    fn take_step(&mut self, node_id: &str) -> bool {
        if self.state.steps >= self.engine.config.max_steps {
            if !self.state.step_limit_hit {
                self.state.step_limit_hit = true;
                warn!(node_id, max_steps = self.engine.config.max_steps, "Step limit exceeded");
                self.state.report(
                    node_id,
                    DiagnosticKind::StepLimitExceeded,
                    format!("stopped after {} steps", self.engine.config.max_steps),
                );
            }
            return false;
        }
        self.state.steps += 1;
        true
    }

    /// Execute one node and push whatever its result asks for next
    async fn execute_node(&mut self, node_id: &str, stack: &mut Vec<Frame>) {
        let engine = self.engine;
        let blueprint = self.blueprint;

        let Some(node) = blueprint.get_node(node_id) else {
            debug!(node_id, "Exec target not found, branch ends");
            return;
        };
        if self.in_function && node_id == FUNCTION_EXIT_NODE {
            debug!("Function exit reached");
            stack.clear();
            return;
        }
        if node.node_type == FUNCTION_CALL_NODE {
            let inputs = self.gather_inputs(node_id).await;
            let output = match self.call_function(node_id, node, inputs).await {
                Ok(values) => NodeOutput::continue_to("then", values),
                Err(err) => NodeOutput::error(err.to_string()),
            };
            self.follow(node_id, node, output, stack);
            return;
        }
        let Some(registered) = engine.registry.lookup(&node.node_type) else {
            warn!(node_id, node_type = %node.node_type, "Unknown node type, branch ends");
            self.state.report(
                node_id,
                DiagnosticKind::UnknownNodeType,
                format!("unknown node type '{}'", node.node_type),
            );
            return;
        };

        debug!(node_id, node_type = %node.node_type, "Executing node");

        let inputs = self.gather_inputs(node_id).await;
        let mut ctx = NodeContext {
            node_id: node_id.to_string(),
            node_type: node.node_type.clone(),
            config: node.config.clone(),
            inputs,
            variables: self.state.variables.snapshot().clone(),
            trigger_data: self.trigger.data.clone(),
            event_type: self.trigger.event_type().map(str::to_string),
            services: engine.services.clone(),
        };

        let output = match invoke(registered.executor.as_ref(), &mut ctx).await {
            Ok(output) => output,
            Err(err) => NodeOutput::error(err.to_string()),
        };
        self.follow(node_id, node, output, stack);
    }

    /// Record a node's output and push whatever its result asks for next
    fn follow(
        &mut self,
        node_id: &str,
        node: &BlueprintNode,
        output: NodeOutput,
        stack: &mut Vec<Frame>,
    ) {
        let engine = self.engine;
        let blueprint = self.blueprint;

        self.state
            .node_outputs
            .insert(node_id.to_string(), output.values);
        self.state.variables.resync();

        match output.result {
            NodeResult::Continue { pin } => {
                if let Some(next) = blueprint.target_of(node_id, &pin) {
                    stack.push(Frame::Node(next.to_string()));
                }
            }
            NodeResult::Sequence { pins } => {
                // Reversed so the first pin's subtree is popped (and finished) first
                for pin in pins.iter().rev() {
                    if let Some(next) = blueprint.target_of(node_id, pin) {
                        stack.push(Frame::Node(next.to_string()));
                    }
                }
            }
            NodeResult::Loop {
                pin, start, end, ..
            } => {
                let max = engine.config.max_loop_iterations;
                let range = end.saturating_sub(start);
                let capped_end = if range > 0 && range as u64 > max {
                    warn!(node_id, start, end, max, "Loop range capped");
                    start.saturating_add(i64::try_from(max).unwrap_or(i64::MAX))
                } else {
                    end
                };
                stack.push(Frame::Loop {
                    node_id: node_id.to_string(),
                    pin,
                    index: start,
                    end: capped_end,
                });
            }
            NodeResult::Error { message } => {
                warn!(node_id, node_type = %node.node_type, error = %message, "Node execution error");
                self.state
                    .report(node_id, DiagnosticKind::NodeExecutionError, message);
            }
            NodeResult::End => {}
        }
    }

    /// Run (or finish) one iteration of a loop node
    fn loop_iteration(
        &mut self,
        node_id: String,
        pin: String,
        index: i64,
        end: i64,
        stack: &mut Vec<Frame>,
    ) {
        if index >= end {
            if let Some(next) = self.blueprint.target_of(&node_id, LOOP_COMPLETED_PIN) {
                stack.push(Frame::Node(next.to_string()));
            }
            return;
        }

        self.state.node_outputs.insert(
            node_id.clone(),
            HashMap::from([("index".to_string(), Value::from(index))]),
        );
        self.state
            .variables
            .publish(&self.engine.config.loop_index_variable, Value::from(index));

        let body = self.blueprint.target_of(&node_id, &pin).map(str::to_string);
        stack.push(Frame::Loop {
            node_id,
            pin,
            index: index + 1,
            end,
        });
        if let Some(body) = body {
            stack.push(Frame::Node(body));
        }
    }

    /// Resolve the data inputs of a node.
    ///
    /// Declared pin defaults come first, then `config.defaults`, then values
    /// pulled through connections (cached, or evaluated if the source is pure).
    async fn gather_inputs(&mut self, node_id: &str) -> HashMap<String, Value> {
        let engine = self.engine;
        let blueprint = self.blueprint;
        let mut inputs = HashMap::new();

        let Some(node) = blueprint.get_node(node_id) else {
            return inputs;
        };
        let def = engine.registry.get_definition(&node.node_type);

        if let Some(def) = def {
            for pin in def.data_inputs() {
                if let Some(default) = &pin.default {
                    inputs.insert(pin.name.clone(), default.clone());
                }
            }
        }
        if let Some(Value::Object(defaults)) = node.config.get("defaults") {
            for (pin, value) in defaults {
                inputs.insert(pin.clone(), value.clone());
            }
        }

        for conn in blueprint.connections_into(node_id) {
            let (Some((from_node, from_pin)), Some((_, to_pin))) =
                (conn.from_parts(), conn.to_parts())
            else {
                continue;
            };
            if is_exec_wire(engine, blueprint, def, from_node, from_pin, to_pin) {
                continue;
            }

            let value = match self.state.node_outputs.get(from_node) {
                Some(cached) => cached.get(from_pin).cloned(),
                None => self.evaluate_data_node(from_node, from_pin).await,
            };
            if let Some(value) = value {
                inputs.insert(to_pin.to_string(), value);
            }
        }

        inputs
    }

    /// Pull one output of a node, evaluating it if it is pure and not cached.
    ///
    /// Impure nodes are only ever run by the exec walk, so an impure source that
    /// has not run yet yields nothing.
    fn evaluate_data_node<'s>(
        &'s mut self,
        node_id: &'s str,
        pin: &'s str,
    ) -> BoxFuture<'s, Option<Value>> {
        async move {
            if let Some(cached) = self.state.node_outputs.get(node_id) {
                return cached.get(pin).cloned();
            }

            let engine = self.engine;
            let blueprint = self.blueprint;
            let node = blueprint.get_node(node_id)?;
            let registered = if node.node_type == FUNCTION_CALL_NODE {
                if !self.calls_pure_function(node) {
                    return None;
                }
                None
            } else {
                let Some(registered) = engine.registry.lookup(&node.node_type) else {
                    debug!(node_id, node_type = %node.node_type, "Data source has unknown type");
                    return None;
                };
                if !registered.definition.pure {
                    return None;
                }
                Some(registered)
            };
            if !self.state.evaluating.insert(node_id.to_string()) {
                warn!(node_id, "Cycle between pure nodes, value unavailable");
                return None;
            }

            debug!(node_id, node_type = %node.node_type, "Evaluating pure node");

            let inputs = self.gather_inputs(node_id).await;
            let outcome = match registered {
                Some(registered) => {
                    let mut ctx = NodeContext {
                        node_id: node_id.to_string(),
                        node_type: node.node_type.clone(),
                        config: node.config.clone(),
                        inputs,
                        variables: self.state.variables.snapshot().clone(),
                        trigger_data: None,
                        event_type: None,
                        services: engine.services.clone(),
                    };
                    match invoke(registered.executor.as_ref(), &mut ctx).await {
                        Ok(output) => match output.error_message() {
                            Some(message) => Err(message.to_string()),
                            None => Ok(output.values),
                        },
                        Err(err) => Err(err.to_string()),
                    }
                }
                None => self
                    .call_function(node_id, node, inputs)
                    .await
                    .map_err(|err| err.to_string()),
            };
            self.state.evaluating.remove(node_id);

            let values = outcome.unwrap_or_else(|message| {
                warn!(node_id, error = %message, "Pure node evaluation failed");
                self.state
                    .report(node_id, DiagnosticKind::PureEvaluationError, message);
                // Cached empty so the failing node is not retried this run
                HashMap::new()
            });

            let value = values.get(pin).cloned();
            self.state.node_outputs.insert(node_id.to_string(), values);
            value
        }
        .boxed()
    }

    /// Whether a `function/Call` node names a known pure function
    fn calls_pure_function(&self, node: &BlueprintNode) -> bool {
        function_name(node)
            .and_then(|name| self.functions.get(name))
            .is_some_and(|function| function.pure)
    }

    /// Run the function named by a `function/Call` node and collect its outputs.
    ///
    /// The body runs as a nested walk sharing this run's variables, step
    /// budget and diagnostics; its cached outputs stay private to the call.
    fn call_function<'s>(
        &'s mut self,
        node_id: &'s str,
        node: &'s BlueprintNode,
        inputs: HashMap<String, Value>,
    ) -> BoxFuture<'s, Result<HashMap<String, Value>, NodeError>> {
        async move {
            let functions = self.functions;
            let name = function_name(node).unwrap_or_default();
            let function = functions
                .get(name)
                .ok_or_else(|| NodeError::UnknownFunction(name.to_string()))?;
            function.validate(name)?;

            let max_depth = self.engine.config.max_call_depth;
            if self.state.call_depth >= max_depth {
                return Err(NodeError::CallDepthExceeded(max_depth));
            }

            debug!(node_id, function = name, pure = function.pure, "Calling function");

            let graph = function.to_blueprint(name);
            let mut state = ExecutionState::new(self.state.variables.attach());
            state.node_outputs.insert(
                FUNCTION_ENTRY_NODE.to_string(),
                param_values(&function.inputs, &inputs),
            );
            state.steps = self.state.steps;
            state.step_limit_hit = self.state.step_limit_hit;
            state.call_depth = self.state.call_depth + 1;

            let mut body = Run {
                engine: self.engine,
                blueprint: &graph,
                functions,
                trigger: self.trigger,
                in_function: true,
                state,
            };
            if !function.pure {
                if let Some(first) = graph.target_of(FUNCTION_ENTRY_NODE, "exec") {
                    body.execute_from_node(first).await;
                }
            }
            let returned = body.gather_inputs(FUNCTION_EXIT_NODE).await;
            let outputs = param_values(&function.outputs, &returned);

            let state = body.state;
            self.state.steps = state.steps;
            self.state.step_limit_hit = state.step_limit_hit;
            self.state
                .diagnostics
                .extend(state.diagnostics.into_iter().map(|d| Diagnostic {
                    node_id: format!("{node_id}/{}", d.node_id),
                    ..d
                }));
            self.state.variables.resync();

            Ok(outputs)
        }
        .boxed()
    }
}

fn function_name(node: &BlueprintNode) -> Option<&str> {
    node.config.get("function").and_then(Value::as_str)
}

/// One value per parameter: supplied, else the parameter default, else null
fn param_values(
    params: &[FunctionParam],
    supplied: &HashMap<String, Value>,
) -> HashMap<String, Value> {
    params
        .iter()
        .map(|param| {
            let value = supplied
                .get(&param.name)
                .cloned()
                .or_else(|| param.default.clone())
                .unwrap_or(Value::Null);
            (param.name.clone(), value)
        })
        .collect()
}

/// An entry node configured with an `event_type` only fires for that event
fn accepts_event(node: &BlueprintNode, trigger: &ExecutionTrigger) -> bool {
    match node.config.get("event_type").and_then(Value::as_str) {
        Some(wanted) => trigger.event_type() == Some(wanted),
        None => true,
    }
}

/// Whether a connection carries control flow rather than data
fn is_exec_wire(
    engine: &BlueprintEngine,
    blueprint: &Blueprint,
    target_def: Option<&NodeDef>,
    from_node: &str,
    from_pin: &str,
    to_pin: &str,
) -> bool {
    let target_is_exec = target_def
        .and_then(|def| def.get_pin(to_pin, PinDirection::Input))
        .map(|pin| pin.pin_type.is_exec())
        .unwrap_or(to_pin == "exec");
    let source_is_exec = blueprint
        .get_node(from_node)
        .and_then(|node| engine.registry.get_definition(&node.node_type))
        .and_then(|def| def.get_pin(from_pin, PinDirection::Output))
        .map(|pin| pin.pin_type.is_exec())
        .unwrap_or(false);
    target_is_exec || source_is_exec
}

/// Run a node executor, turning panics into node errors
async fn invoke(
    executor: &dyn NodeExecutor,
    ctx: &mut NodeContext,
) -> Result<NodeOutput, NodeError> {
    match AssertUnwindSafe(executor.execute(ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(NodeError::Panicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_types::{PinDef, PinType};
    use serde_json::json;

    fn entry_def(id: &str, trigger: &str) -> NodeDef {
        NodeDef {
            entry: true,
            trigger: Some(trigger.to_string()),
            pins: vec![PinDef::exec_out("exec")],
            ..NodeDef::new(id, id, "Events")
        }
    }

    fn test_registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register_fn(entry_def("test/OnStart", "start"), |_| {
            NodeOutput::continue_to("exec", HashMap::new())
        });
        registry.register_fn(entry_def("test/OnEvent", "event"), |_| {
            NodeOutput::continue_to("exec", HashMap::new())
        });
        registry.register_fn(
            NodeDef {
                pins: vec![PinDef::exec_in(), PinDef::exec_out("then")],
                ..NodeDef::new("test/Panic", "Panic", "Test")
            },
            |_| panic!("sensor exploded"),
        );
        registry.register_fn(
            NodeDef {
                pins: vec![
                    PinDef::exec_in(),
                    PinDef::data_in("value", PinType::Any),
                    PinDef::exec_out("then"),
                ],
                ..NodeDef::new("test/Record", "Record", "Test")
            },
            |ctx| {
                let value = ctx.get_input("value").cloned().unwrap_or(Value::Null);
                NodeOutput::continue_to("then", HashMap::from([("seen".to_string(), value)]))
            },
        );
        registry
    }

    fn engine_with(blueprint: Blueprint) -> BlueprintEngine {
        let engine = BlueprintEngine::new(Arc::new(test_registry()), RuntimeServices::default());
        engine.set_blueprint(Arc::new(blueprint));
        engine
    }

    #[tokio::test]
    async fn test_no_blueprint_loaded() {
        let engine = BlueprintEngine::new(Arc::new(test_registry()), RuntimeServices::default());
        let result = engine.execute_blueprint(ExecutionTrigger::start()).await;
        assert!(matches!(result, Err(EngineError::NoBlueprintLoaded)));
    }

    #[test]
    fn test_entry_selection_prefers_exact_trigger() {
        let bp = Blueprint::new("bp", "Entries")
            .with_node(BlueprintNode::new("start", "test/OnStart"))
            .with_node(BlueprintNode::new("event", "test/OnEvent"));
        let engine = engine_with(bp.clone());

        let ids: Vec<_> = engine
            .select_entry_nodes(&bp, &ExecutionTrigger::start())
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["start"]);

        // No exact match: every entry node fires
        let ids: Vec<_> = engine
            .select_entry_nodes(&bp, &ExecutionTrigger::new("schedule", None))
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["start", "event"]);
    }

    #[test]
    fn test_entry_selection_honors_event_filter() {
        let bp = Blueprint::new("bp", "Filtered")
            .with_node(
                BlueprintNode::new("alarm", "test/OnEvent").with_config(json!({"event_type": "alarm"})),
            )
            .with_node(BlueprintNode::new("any", "test/OnEvent"));
        let engine = engine_with(bp.clone());

        let select = |trigger: ExecutionTrigger| -> Vec<String> {
            engine
                .select_entry_nodes(&bp, &trigger)
                .iter()
                .map(|n| n.id.clone())
                .collect()
        };
        assert_eq!(select(ExecutionTrigger::named_event("alarm", json!({}))), vec!["alarm", "any"]);
        assert_eq!(select(ExecutionTrigger::named_event("fault", json!({}))), vec!["any"]);
        assert_eq!(select(ExecutionTrigger::event(json!({"event_type": "alarm"}))), vec!["alarm", "any"]);
        // The filter only narrows exact matches, not the broad fallback
        assert_eq!(select(ExecutionTrigger::start()), vec!["alarm", "any"]);
    }

    #[tokio::test]
    async fn test_panicking_node_is_contained() {
        let bp = Blueprint::new("bp", "Panics")
            .with_node(BlueprintNode::new("start", "test/OnStart"))
            .with_node(BlueprintNode::new("boom", "test/Panic"))
            .with_node(BlueprintNode::new("after", "test/Record"))
            .with_connection("start.exec", "boom.exec")
            .with_connection("boom.then", "after.exec");
        let engine = engine_with(bp);

        let result = engine.execute_blueprint(ExecutionTrigger::start()).await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert!(result.has_diagnostic(DiagnosticKind::NodeExecutionError));
        assert!(result.diagnostics[0].message.contains("sensor exploded"));
        assert!(result.outputs.get("boom").unwrap().is_empty());
        assert!(!result.outputs.contains_key("after"));
    }

    #[tokio::test]
    async fn test_impure_source_not_yet_run_is_not_pulled() {
        // "late" is impure and never reached by the exec walk
        let bp = Blueprint::new("bp", "Impure source")
            .with_node(BlueprintNode::new("start", "test/OnStart"))
            .with_node(BlueprintNode::new("late", "test/Record"))
            .with_node(BlueprintNode::new("rec", "test/Record"))
            .with_connection("start.exec", "rec.exec")
            .with_connection("late.seen", "rec.value");
        let engine = engine_with(bp);

        let result = engine.execute_blueprint(ExecutionTrigger::start()).await.unwrap();
        assert_eq!(result.output("rec", "seen"), Some(&Value::Null));
        assert!(!result.outputs.contains_key("late"));
    }

    #[tokio::test]
    async fn test_config_defaults_feed_inputs() {
        let bp = Blueprint::new("bp", "Defaults")
            .with_node(BlueprintNode::new("start", "test/OnStart"))
            .with_node(
                BlueprintNode::new("rec", "test/Record")
                    .with_config(json!({"defaults": {"value": "hello"}})),
            )
            .with_connection("start.exec", "rec.exec");
        let engine = engine_with(bp);

        let result = engine.execute_blueprint(ExecutionTrigger::start()).await.unwrap();
        assert_eq!(result.output("rec", "seen"), Some(&json!("hello")));
    }

    #[tokio::test]
    async fn test_step_limit_stops_exec_cycle() {
        let bp = Blueprint::new("bp", "Cycle")
            .with_node(BlueprintNode::new("start", "test/OnStart"))
            .with_node(BlueprintNode::new("a", "test/Record"))
            .with_node(BlueprintNode::new("b", "test/Record"))
            .with_connection("start.exec", "a.exec")
            .with_connection("a.then", "b.exec")
            .with_connection("b.then", "a.exec");
        let engine = engine_with(bp).with_config(EngineConfig {
            max_steps: 10,
            ..EngineConfig::default()
        });

        let result = engine.execute_blueprint(ExecutionTrigger::start()).await.unwrap();
        let limits: Vec<_> = result
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::StepLimitExceeded)
            .collect();
        assert_eq!(limits.len(), 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
