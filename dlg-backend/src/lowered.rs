//! Lowered graph artifact
//!
//! The output of the driver. It references values only by id and constants
//! only by pool index; the byte layout it is eventually persisted in belongs
//! to the downstream serializer.

use crate::values::Value;
use dlg_common::{Literal, TensorData, ValueId};
use serde::Serialize;

/// One backend operator call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoweredOp {
    pub name: String,
    pub inputs: Vec<ValueId>,
    pub outputs: Vec<ValueId>,
    pub params: Vec<Literal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_handle: Option<u32>,
}

impl LoweredOp {
    pub fn new(name: impl Into<String>, inputs: Vec<ValueId>, outputs: Vec<ValueId>) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            params: Vec::new(),
            debug_handle: None,
        }
    }

    pub fn with_params(mut self, params: Vec<Literal>) -> Self {
        self.params = params;
        self
    }
}

/// Immutable result of one lowering call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoweredGraph {
    version: String,
    chain: Vec<LoweredOp>,
    values: Vec<Value>,
    input_ids: Vec<ValueId>,
    output_ids: Vec<ValueId>,
    constants: Vec<TensorData>,
    side_blobs: Vec<Vec<u8>>,
}

impl LoweredGraph {
    pub(crate) fn new(
        version: String,
        chain: Vec<LoweredOp>,
        values: Vec<Value>,
        input_ids: Vec<ValueId>,
        output_ids: Vec<ValueId>,
        constants: Vec<TensorData>,
        side_blobs: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            version,
            chain,
            values,
            input_ids,
            output_ids,
            constants,
            side_blobs,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn chain(&self) -> &[LoweredOp] {
        &self.chain
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id as usize)
    }

    pub fn input_ids(&self) -> &[ValueId] {
        &self.input_ids
    }

    pub fn output_ids(&self) -> &[ValueId] {
        &self.output_ids
    }

    pub fn constants(&self) -> &[TensorData] {
        &self.constants
    }

    pub fn side_blobs(&self) -> &[Vec<u8>] {
        &self.side_blobs
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// One-line-per-op listing for logs and the CLI
    pub fn summary(&self) -> String {
        let mut out = format!(
            "version {}: {} values, {} ops, {} constants, inputs {:?}, outputs {:?}\n",
            self.version,
            self.values.len(),
            self.chain.len(),
            self.constants.len(),
            self.input_ids,
            self.output_ids
        );
        for op in &self.chain {
            out.push_str(&format!("  {:?} = {}({:?})", op.outputs, op.name, op.inputs));
            if !op.params.is_empty() {
                let params: Vec<String> = op.params.iter().map(|p| p.to_string()).collect();
                out.push_str(&format!(" [{}]", params.join(", ")));
            }
            out.push('\n');
        }
        out
    }
}
