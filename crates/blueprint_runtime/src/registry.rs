// Node Registry - Stores node definitions and their executors
//
// The registry holds all available node types in two layers: built-in nodes
// that live for the whole process, and plugin nodes that come and go with the
// plugin that registered them. Lookups try the plugin layer first, so a plugin
// may shadow a built-in.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use blueprint_types::{NodeDef, PinDirection};
use serde_json::Value;

use crate::error::NodeError;
use crate::executor::{NodeContext, NodeOutput};

// ─────────────────────────────────────────────────────────────────────────────
// Node Executor Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for node execution
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    /// Execute the node with the given context
    async fn execute(&self, ctx: &mut NodeContext) -> Result<NodeOutput, NodeError>;
}

/// Function-based node executor (for simple nodes)
pub struct FnNodeExecutor<F>
where
    F: Fn(&mut NodeContext) -> NodeOutput + Send + Sync,
{
    func: F,
}

impl<F> FnNodeExecutor<F>
where
    F: Fn(&mut NodeContext) -> NodeOutput + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> NodeExecutor for FnNodeExecutor<F>
where
    F: Fn(&mut NodeContext) -> NodeOutput + Send + Sync,
{
    async fn execute(&self, ctx: &mut NodeContext) -> Result<NodeOutput, NodeError> {
        Ok((self.func)(ctx))
    }
}

/// Executor for nodes that return a loosely-shaped JSON outcome.
///
/// Plugins describe their results as JSON; the outcome is normalized with
/// [`NodeOutput::from_raw`].
pub struct RawFnNodeExecutor<F>
where
    F: Fn(&mut NodeContext) -> Result<Option<Value>, NodeError> + Send + Sync,
{
    func: F,
}

impl<F> RawFnNodeExecutor<F>
where
    F: Fn(&mut NodeContext) -> Result<Option<Value>, NodeError> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> NodeExecutor for RawFnNodeExecutor<F>
where
    F: Fn(&mut NodeContext) -> Result<Option<Value>, NodeError> + Send + Sync,
{
    async fn execute(&self, ctx: &mut NodeContext) -> Result<NodeOutput, NodeError> {
        (self.func)(ctx).map(NodeOutput::from_raw)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Where a registered node came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOrigin {
    Builtin,
    /// Owned by the named plugin
    Plugin(String),
}

/// Entry in the node registry
#[derive(Clone)]
pub struct RegisteredNode {
    pub definition: NodeDef,
    pub executor: Arc<dyn NodeExecutor>,
    pub origin: NodeOrigin,
}

/// Registry of all available node types
#[derive(Default)]
pub struct NodeRegistry {
    builtins: HashMap<String, RegisteredNode>,
    plugins: HashMap<String, RegisteredNode>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a built-in node type with its executor
    pub fn register(&mut self, definition: NodeDef, executor: Arc<dyn NodeExecutor>) {
        let id = definition.id.clone();
        self.builtins.insert(
            id,
            RegisteredNode {
                definition,
                executor,
                origin: NodeOrigin::Builtin,
            },
        );
    }

    /// Register a built-in node with a sync function executor
    pub fn register_fn<F>(&mut self, definition: NodeDef, func: F)
    where
        F: Fn(&mut NodeContext) -> NodeOutput + Send + Sync + 'static,
    {
        self.register(definition, Arc::new(FnNodeExecutor::new(func)));
    }

    /// Register a node provided by a plugin
    pub fn register_plugin(
        &mut self,
        owner: &str,
        definition: NodeDef,
        executor: Arc<dyn NodeExecutor>,
    ) {
        let id = definition.id.clone();
        if self.builtins.contains_key(&id) {
            tracing::debug!(node_type = %id, plugin = owner, "Plugin node shadows built-in");
        }
        self.plugins.insert(
            id,
            RegisteredNode {
                definition,
                executor,
                origin: NodeOrigin::Plugin(owner.to_string()),
            },
        );
    }

    /// Register a plugin node whose function returns a raw JSON outcome
    pub fn register_plugin_fn<F>(&mut self, owner: &str, definition: NodeDef, func: F)
    where
        F: Fn(&mut NodeContext) -> Result<Option<Value>, NodeError> + Send + Sync + 'static,
    {
        self.register_plugin(owner, definition, Arc::new(RawFnNodeExecutor::new(func)));
    }

    /// Drop every node a plugin registered. Returns how many were removed.
    pub fn unload_plugin(&mut self, owner: &str) -> usize {
        let before = self.plugins.len();
        self.plugins
            .retain(|_, node| node.origin != NodeOrigin::Plugin(owner.to_string()));
        let removed = before - self.plugins.len();
        tracing::debug!(plugin = owner, removed, "Unloaded plugin nodes");
        removed
    }

    /// Resolve a node type: plugin nodes first, then built-ins
    pub fn lookup(&self, id: &str) -> Option<&RegisteredNode> {
        self.plugins.get(id).or_else(|| self.builtins.get(id))
    }

    /// Get a node definition by ID
    pub fn get_definition(&self, id: &str) -> Option<&NodeDef> {
        self.lookup(id).map(|n| &n.definition)
    }

    /// Get a node executor by ID
    pub fn get_executor(&self, id: &str) -> Option<Arc<dyn NodeExecutor>> {
        self.lookup(id).map(|n| Arc::clone(&n.executor))
    }

    /// All resolvable definitions (shadowed built-ins are skipped)
    pub fn definitions(&self) -> impl Iterator<Item = &NodeDef> {
        self.plugins.values().map(|n| &n.definition).chain(
            self.builtins
                .values()
                .filter(|n| !self.plugins.contains_key(&n.definition.id))
                .map(|n| &n.definition),
        )
    }

    /// Get all categories
    pub fn categories(&self) -> Vec<String> {
        let mut cats: Vec<_> = self.definitions().map(|d| d.category.clone()).collect();
        cats.sort();
        cats.dedup();
        cats
    }

    /// Check whether an output pin of one node type may be wired to an input
    /// pin of another. Unknown types or pins cannot be connected.
    pub fn can_connect(&self, from_type: &str, from_pin: &str, to_type: &str, to_pin: &str) -> bool {
        let from = self
            .get_definition(from_type)
            .and_then(|d| d.get_pin(from_pin, PinDirection::Output));
        let to = self
            .get_definition(to_type)
            .and_then(|d| d.get_pin(to_pin, PinDirection::Input));
        match (from, to) {
            (Some(from), Some(to)) => from.pin_type.is_compatible_with(&to.pin_type),
            _ => false,
        }
    }

    /// Check if a node is registered
    pub fn contains(&self, id: &str) -> bool {
        self.lookup(id).is_some()
    }

    /// Number of distinct resolvable node types
    pub fn len(&self) -> usize {
        self.definitions().count()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.builtins.is_empty() && self.plugins.is_empty()
    }
}
