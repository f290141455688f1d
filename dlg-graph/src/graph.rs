//! Dataflow graph and builder
//!
//! The graph keeps nodes in the order the upstream compiler supplied them.
//! That order is assumed to be topological; this module only checks that the
//! graph is well formed (unique handles and names, references resolve to some
//! node). Ordering problems surface later, during lowering.

use crate::node::{Arg, Node, NodeRole};
use dlg_common::{Literal, LowerResult, LoweringError, NodeId, QuantAttrs, TensorSpec};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphRepr")]
pub struct Graph {
    nodes: Vec<Node>,
    #[serde(skip)]
    index: HashMap<NodeId, usize>,
}

#[derive(Deserialize)]
struct GraphRepr {
    nodes: Vec<Node>,
}

impl TryFrom<GraphRepr> for Graph {
    type Error = LoweringError;

    fn try_from(repr: GraphRepr) -> Result<Self, Self::Error> {
        Graph::from_nodes(repr.nodes)
    }
}

impl Graph {
    /// Build a graph from nodes in their supplied order, validating structure
    pub fn from_nodes(nodes: Vec<Node>) -> LowerResult<Self> {
        let mut index = HashMap::with_capacity(nodes.len());
        let mut names = HashSet::with_capacity(nodes.len());

        for (pos, node) in nodes.iter().enumerate() {
            if index.insert(node.id, pos).is_some() {
                return Err(LoweringError::invalid_graph(format!("duplicate node id {}", node.id)));
            }
            if !names.insert(node.name.as_str()) {
                return Err(LoweringError::invalid_graph(format!("duplicate node name `{}`", node.name)));
            }
            let needs_target = matches!(node.role, NodeRole::CallFunction | NodeRole::GetAttr);
            if needs_target && node.target.is_none() {
                return Err(LoweringError::invalid_graph(format!(
                    "{} node `{}` has no target",
                    node.role, node.name
                )));
            }
        }

        for node in &nodes {
            for input in node.input_nodes() {
                if !index.contains_key(&input) {
                    return Err(LoweringError::invalid_graph(format!(
                        "node `{}` references unknown node {}",
                        node.name, input
                    )));
                }
            }
        }

        trace!("Graph::from_nodes: {} nodes", nodes.len());
        Ok(Self { nodes, index })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&pos| &self.nodes[pos])
    }

    /// Name of a node for diagnostics; falls back to the handle
    pub fn label(&self, id: NodeId) -> String {
        self.node(id).map(|n| n.name.clone()).unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes consuming `id`, in graph order
    pub fn users(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.input_nodes().contains(&id))
            .map(|n| n.id)
            .collect()
    }

    /// First handle above every handle in use
    pub fn next_free_id(&self) -> NodeId {
        NodeId(self.nodes.iter().map(|n| n.id.0 + 1).max().unwrap_or(0))
    }

    pub fn count_role(&self, role: NodeRole) -> usize {
        self.nodes.iter().filter(|n| n.role == role).count()
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "graph():")?;
        for node in &self.nodes {
            writeln!(f, "    {}  # {}", node, node.id)?;
        }
        Ok(())
    }
}

/// Builder for constructing graphs programmatically
pub struct GraphBuilder {
    nodes: Vec<Node>,
    next_id: u32,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 0,
        }
    }

    fn new_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    pub fn placeholder(&mut self, name: &str, spec: TensorSpec) -> NodeId {
        let id = self.new_id();
        self.push(Node::new(id, name, NodeRole::Placeholder).with_outputs(vec![spec]))
    }

    pub fn get_attr(&mut self, name: &str, target: &str, spec: TensorSpec) -> NodeId {
        let id = self.new_id();
        self.push(
            Node::new(id, name, NodeRole::GetAttr)
                .with_target(target)
                .with_outputs(vec![spec]),
        )
    }

    pub fn call_function(&mut self, name: &str, target: &str, args: Vec<Arg>, spec: TensorSpec) -> NodeId {
        self.call_function_multi(name, target, args, vec![spec])
    }

    pub fn call_function_multi(
        &mut self,
        name: &str,
        target: &str,
        args: Vec<Arg>,
        outputs: Vec<TensorSpec>,
    ) -> NodeId {
        let id = self.new_id();
        self.push(
            Node::new(id, name, NodeRole::CallFunction)
                .with_target(target)
                .with_args(args)
                .with_outputs(outputs),
        )
    }

    pub fn output(&mut self, results: &[NodeId]) -> NodeId {
        let id = self.new_id();
        let args = results.iter().copied().map(Arg::node).collect();
        self.push(Node::new(id, "output", NodeRole::Output).with_args(args))
    }

    /// Add a node as-is; its handle must not collide with builder-assigned ones
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.next_id = self.next_id.max(node.id.0 + 1);
        self.push(node)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn set_quant_attrs(&mut self, id: NodeId, attrs: QuantAttrs) -> &mut Self {
        if let Some(node) = self.node_mut(id) {
            node.meta.quant_attrs = Some(attrs);
        }
        self
    }

    pub fn set_debug_handle(&mut self, id: NodeId, handle: u32) -> &mut Self {
        if let Some(node) = self.node_mut(id) {
            node.meta.debug_handle = Some(handle);
        }
        self
    }

    pub fn build(self) -> LowerResult<Graph> {
        Graph::from_nodes(self.nodes)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for literal args in builder calls
pub fn lit(value: impl Into<Literal>) -> Arg {
    Arg::Lit(value.into())
}
