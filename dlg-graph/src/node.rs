//! Graph nodes
//!
//! A node is one step of the upstream dataflow graph. Nodes are owned by the
//! [`Graph`](crate::Graph) and are read-only to the lowering core.

use dlg_common::{Literal, NodeId, QuantAttrs, TensorSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role tag of a node, as assigned by the upstream exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Input boundary (user input or lifted parameter)
    Placeholder,
    /// Compute step with a target operator
    CallFunction,
    /// Reference to a stored attribute tensor
    GetAttr,
    /// Output boundary
    Output,
    CallModule,
    CallMethod,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeRole::Placeholder => "placeholder",
            NodeRole::CallFunction => "call_function",
            NodeRole::GetAttr => "get_attr",
            NodeRole::Output => "output",
            NodeRole::CallModule => "call_module",
            NodeRole::CallMethod => "call_method",
        };
        write!(f, "{}", name)
    }
}

/// Node argument: a reference to another node or a literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Node { node: NodeId },
    Lit(Literal),
}

impl Arg {
    pub fn node(id: NodeId) -> Self {
        Arg::Node { node: id }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Arg::Node { node } => Some(*node),
            Arg::Lit(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Arg::Lit(lit) => Some(lit),
            Arg::Node { .. } => None,
        }
    }
}

impl From<NodeId> for Arg {
    fn from(id: NodeId) -> Self {
        Arg::node(id)
    }
}

impl From<Literal> for Arg {
    fn from(lit: Literal) -> Self {
        Arg::Lit(lit)
    }
}

/// Fixed-schema per-node metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quant_attrs: Option<QuantAttrs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_handle: Option<u32>,
}

impl NodeMeta {
    fn is_empty(&self) -> bool {
        self.quant_attrs.is_none() && self.debug_handle.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub role: NodeRole,
    /// Operator kind for compute nodes, attribute path for `get_attr`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub args: Vec<Arg>,
    #[serde(default)]
    pub outputs: Vec<TensorSpec>,
    #[serde(default, skip_serializing_if = "NodeMeta::is_empty")]
    pub meta: NodeMeta,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            target: None,
            args: Vec::new(),
            outputs: Vec::new(),
            meta: NodeMeta::default(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_args(mut self, args: Vec<Arg>) -> Self {
        self.args = args;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<TensorSpec>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_meta(mut self, meta: NodeMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Node references among the args, in order, first occurrence only
    pub fn input_nodes(&self) -> Vec<NodeId> {
        let mut seen = Vec::new();
        for id in self.args.iter().filter_map(Arg::as_node) {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
        seen
    }

    pub fn arg(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn quant_attrs(&self) -> Option<&QuantAttrs> {
        self.meta.quant_attrs.as_ref()
    }

    /// The single declared output, if the node declares exactly one
    pub fn output_spec(&self) -> Option<&TensorSpec> {
        match self.outputs.as_slice() {
            [spec] => Some(spec),
            _ => None,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{} = {}", self.name, self.role)?;
        if let Some(target) = &self.target {
            write!(f, "[{}]", target)?;
        }
        write!(f, "(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            match arg {
                Arg::Node { node } => write!(f, "{}", node)?,
                Arg::Lit(lit) => write!(f, "{}", lit)?,
            }
        }
        write!(f, ")")?;
        for (i, spec) in self.outputs.iter().enumerate() {
            write!(f, "{}{}", if i == 0 { " : " } else { ", " }, spec)?;
        }
        Ok(())
    }
}
