//! Lowering context
//!
//! The state one lowering call owns: the value table and constant pool, plus
//! read-only access to the graph, the oracle and the options. Operator
//! routines receive it mutably so they can resolve inputs and request ids
//! for their outputs; they never see the op chain.

use crate::constants::ConstantPool;
use crate::options::LoweringOptions;
use crate::values::{Value, ValueTable};
use dlg_common::{LowerResult, LoweringError, NodeId, TensorSpec, ValueId};
use dlg_graph::{Classification, ConstantOracle, Graph, Node};

/// A resolved operator input
#[derive(Debug, Clone, Copy)]
pub struct Operand<'g> {
    pub id: ValueId,
    pub spec: &'g TensorSpec,
}

pub struct LowerCtx<'g> {
    graph: &'g Graph,
    oracle: &'g dyn ConstantOracle,
    options: &'g LoweringOptions,
    values: ValueTable,
    constants: ConstantPool,
}

impl<'g> LowerCtx<'g> {
    pub fn new(graph: &'g Graph, oracle: &'g dyn ConstantOracle, options: &'g LoweringOptions) -> Self {
        Self {
            graph,
            oracle,
            options,
            values: ValueTable::new(),
            constants: ConstantPool::new(),
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn options(&self) -> &'g LoweringOptions {
        self.options
    }

    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn is_constant(&self, node: &Node) -> bool {
        self.oracle.is_constant(node)
    }

    /// Ids produced by `node`, with the node's name in the error
    pub fn lookup(&self, node: NodeId) -> LowerResult<&[ValueId]> {
        self.values
            .lookup(node)
            .map_err(|_| LoweringError::topology(self.graph.label(node)))
    }

    /// Allocate the values of `node`, appending its payload to the constant
    /// pool first if the oracle classifies it as a constant
    pub fn define_values(&mut self, node: &Node) -> LowerResult<Vec<ValueId>> {
        if let Some(spec) = node.outputs.iter().find(|s| !self.options.supports(s.dtype)) {
            return Err(LoweringError::UnsupportedDtype {
                node: node.name.clone(),
                dtype: spec.dtype,
            });
        }

        let constant_id = match self.oracle.classify(node) {
            Classification::Runtime => None,
            Classification::Constant(Some(payload)) => Some(self.constants.append(payload.clone())?),
            Classification::Constant(None) => {
                return Err(LoweringError::configuration(format!(
                    "`{}` is classified constant but has no payload",
                    node.name
                )));
            }
        };
        self.values.allocate(node, constant_id)
    }

    /// Output id of a node that must produce exactly one value
    pub fn define_value(&mut self, node: &Node) -> LowerResult<ValueId> {
        if node.outputs.len() > 1 {
            return Err(LoweringError::validation(
                &node.name,
                format!("expected a single output, node declares {}", node.outputs.len()),
            ));
        }
        let ids = self.define_values(node)?;
        Ok(ids[0])
    }

    /// Resolve argument `index` of `node`, which must reference a node
    /// producing exactly one value
    pub fn input(&self, node: &Node, index: usize) -> LowerResult<Operand<'g>> {
        let producer_id = node
            .arg(index)
            .and_then(|a| a.as_node())
            .ok_or_else(|| LoweringError::validation(&node.name, format!("argument {} must be a tensor", index)))?;

        let ids = self.lookup(producer_id)?;
        let producer = self
            .graph
            .node(producer_id)
            .ok_or_else(|| LoweringError::topology(producer_id.to_string()))?;
        match (ids, producer.output_spec()) {
            ([id], Some(spec)) => Ok(Operand { id: *id, spec }),
            _ => Err(LoweringError::validation(
                &node.name,
                format!("argument {} (`{}`) produces {} values, expected one", index, producer.name, ids.len()),
            )),
        }
    }

    /// Like [`input`](Self::input), but an absent or `none` argument yields `None`
    pub fn optional_input(&self, node: &Node, index: usize) -> LowerResult<Option<Operand<'g>>> {
        match node.arg(index) {
            None => Ok(None),
            Some(arg) if arg.as_literal().is_some_and(|l| l.is_none()) => Ok(None),
            Some(_) => self.input(node, index).map(Some),
        }
    }

    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id)
    }

    pub(crate) fn into_parts(self) -> (ValueTable, ConstantPool) {
        (self.values, self.constants)
    }
}
