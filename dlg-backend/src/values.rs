//! Value table
//!
//! Every datum produced during lowering gets one stable id. Ids start at 0
//! and grow by one per allocation; a node with several declared outputs gets
//! several consecutive ids. The table remembers which node produced which
//! ids so that consumers can resolve their inputs.

use dlg_common::{ConstantId, DType, LowerResult, LoweringError, MemObjId, NodeId, TensorSpec, ValueId};
use dlg_graph::Node;
use log::trace;
use serde::Serialize;
use std::collections::HashMap;

/// One value of the lowered graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Value {
    pub id: ValueId,
    pub dtype: DType,
    pub dims: Vec<usize>,
    /// Index into the constant pool; serialized as -1 when absent
    #[serde(serialize_with = "sentinel::serialize")]
    pub constant_id: Option<ConstantId>,
    /// Planned memory object; serialized as -1 for dedicated memory
    #[serde(serialize_with = "sentinel::serialize")]
    pub mem_obj_id: Option<MemObjId>,
}

impl Value {
    /// Constant-pool index in the wire convention (-1 for none)
    pub fn constant_index(&self) -> i64 {
        self.constant_id.map_or(-1, i64::from)
    }

    pub fn mem_obj_index(&self) -> i64 {
        self.mem_obj_id.map_or(-1, i64::from)
    }

    pub fn is_constant(&self) -> bool {
        self.constant_id.is_some()
    }
}

mod sentinel {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(value.map_or(-1, i64::from))
    }
}

#[derive(Debug, Default)]
pub struct ValueTable {
    values: Vec<Value>,
    node_to_ids: HashMap<NodeId, Vec<ValueId>>,
}

impl ValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate one value per declared output of `node`
    pub fn allocate(&mut self, node: &Node, constant_id: Option<ConstantId>) -> LowerResult<Vec<ValueId>> {
        if node.outputs.is_empty() {
            return Err(LoweringError::MissingOutputSpec { node: node.name.clone() });
        }
        if self.node_to_ids.contains_key(&node.id) {
            return Err(LoweringError::AlreadyAllocated { node: node.name.clone() });
        }

        let ids: Vec<ValueId> = node
            .outputs
            .iter()
            .map(|spec| self.push(spec, constant_id))
            .collect();
        trace!("ValueTable: {} -> {:?}", node.name, ids);
        self.node_to_ids.insert(node.id, ids.clone());
        Ok(ids)
    }

    fn push(&mut self, spec: &TensorSpec, constant_id: Option<ConstantId>) -> ValueId {
        let id = self.values.len() as ValueId;
        self.values.push(Value {
            id,
            dtype: spec.dtype,
            dims: spec.dims.clone(),
            constant_id,
            mem_obj_id: spec.mem_obj_id,
        });
        id
    }

    /// Ids produced by `node`; fails if the node has not been allocated yet
    pub fn lookup(&self, node: NodeId) -> LowerResult<&[ValueId]> {
        self.node_to_ids
            .get(&node)
            .map(Vec::as_slice)
            .ok_or_else(|| LoweringError::topology(node.to_string()))
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.node_to_ids.contains_key(&node)
    }

    pub fn get(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id as usize)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
