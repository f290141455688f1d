//! Constant classification
//!
//! The lowering core never decides on its own whether a node is a compile-time
//! constant. It asks a [`ConstantOracle`]. [`ExportSignature`] is the reference
//! oracle: it mirrors the exported program's graph signature, which maps
//! placeholder names to parameters, buffers and lifted tensor constants.

use crate::node::{Node, NodeRole};
use dlg_common::TensorData;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Answer of the oracle for one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification<'a> {
    /// Value is supplied at run time
    Runtime,
    /// Compile-time constant; the payload is missing if the program lost it
    Constant(Option<&'a TensorData>),
}

impl Classification<'_> {
    pub fn is_constant(&self) -> bool {
        matches!(self, Classification::Constant(_))
    }
}

pub trait ConstantOracle {
    /// Classify `node`. Must be a pure predicate.
    fn classify<'a>(&'a self, node: &Node) -> Classification<'a>;

    fn is_constant(&self, node: &Node) -> bool {
        self.classify(node).is_constant()
    }
}

/// Graph signature of an exported program plus its stored tensors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSignature {
    /// Placeholder name -> parameter fqn
    pub inputs_to_parameters: BTreeMap<String, String>,
    /// Placeholder name -> buffer fqn
    pub inputs_to_buffers: BTreeMap<String, String>,
    /// Placeholder name -> lifted constant name
    pub inputs_to_lifted_tensor_constants: BTreeMap<String, String>,
    /// Stored tensors by fqn (state dict and constants)
    pub tensors: BTreeMap<String, TensorData>,
}

impl ExportSignature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parameter(&mut self, placeholder: &str, fqn: &str, data: TensorData) -> &mut Self {
        self.inputs_to_parameters.insert(placeholder.to_string(), fqn.to_string());
        self.tensors.insert(fqn.to_string(), data);
        self
    }

    pub fn add_buffer(&mut self, placeholder: &str, fqn: &str, data: TensorData) -> &mut Self {
        self.inputs_to_buffers.insert(placeholder.to_string(), fqn.to_string());
        self.tensors.insert(fqn.to_string(), data);
        self
    }

    pub fn add_lifted_constant(&mut self, placeholder: &str, name: &str, data: Option<TensorData>) -> &mut Self {
        self.inputs_to_lifted_tensor_constants
            .insert(placeholder.to_string(), name.to_string());
        if let Some(data) = data {
            self.tensors.insert(name.to_string(), data);
        }
        self
    }

    /// Stored tensor backing a `get_attr` target
    pub fn add_attribute(&mut self, target: &str, data: TensorData) -> &mut Self {
        self.tensors.insert(target.to_string(), data);
        self
    }

    fn placeholder_fqn(&self, name: &str) -> Option<&String> {
        self.inputs_to_parameters
            .get(name)
            .or_else(|| self.inputs_to_buffers.get(name))
            .or_else(|| self.inputs_to_lifted_tensor_constants.get(name))
    }
}

impl ConstantOracle for ExportSignature {
    fn classify<'a>(&'a self, node: &Node) -> Classification<'a> {
        match node.role {
            NodeRole::GetAttr => {
                let payload = node.target.as_ref().and_then(|t| self.tensors.get(t));
                Classification::Constant(payload)
            }
            NodeRole::Placeholder => match self.placeholder_fqn(&node.name) {
                Some(fqn) => Classification::Constant(self.tensors.get(fqn)),
                None => Classification::Runtime,
            },
            _ => Classification::Runtime,
        }
    }
}
