//! Backend graph builder
//!
//! Walks the upstream graph once, in the order supplied, and produces a
//! [`LoweredGraph`]. The graph must already be topologically sorted; the
//! builder never reorders, so a node consuming a value that has not been
//! produced yet is reported as a topology violation.
//!
//! Per role:
//! - `placeholder`: allocate values; non-constant ones become graph inputs
//! - `get_attr`: allocate values for the referenced payload, no op emitted
//! - `call_function`: resolve inputs, dispatch through the registry, append
//!   the op to the chain
//! - `output`: resolve every referenced producer into the output list
//!
//! A builder is consumed by [`build`](BackendGraphBuilder::build); lowering
//! another graph needs a fresh one.

use crate::context::LowerCtx;
use crate::lowered::{LoweredGraph, LoweredOp};
use crate::options::LoweringOptions;
use crate::registry::Registry;
use crate::values::ValueTable;
use dlg_common::{LowerResult, LoweringError, ValueId};
use dlg_graph::{ConstantOracle, Graph, Node, NodeRole};
use log::{debug, info, trace};

pub struct BackendGraphBuilder<'g> {
    graph: &'g Graph,
    registry: &'g Registry,
    ctx: LowerCtx<'g>,
    chain: Vec<LoweredOp>,
    input_ids: Vec<ValueId>,
    output_ids: Vec<ValueId>,
    side_blobs: Vec<Vec<u8>>,
}

impl<'g> BackendGraphBuilder<'g> {
    pub fn new(
        graph: &'g Graph,
        oracle: &'g dyn ConstantOracle,
        registry: &'g Registry,
        options: &'g LoweringOptions,
    ) -> Self {
        Self {
            graph,
            registry,
            ctx: LowerCtx::new(graph, oracle, options),
            chain: Vec::new(),
            input_ids: Vec::new(),
            output_ids: Vec::new(),
            side_blobs: Vec::new(),
        }
    }

    /// Opaque blobs carried through to the lowered graph unchanged
    pub fn with_side_blobs(mut self, blobs: Vec<Vec<u8>>) -> Self {
        self.side_blobs = blobs;
        self
    }

    pub fn values(&self) -> &ValueTable {
        self.ctx.values()
    }

    pub fn value_count(&self) -> usize {
        self.ctx.values().len()
    }

    pub fn chain(&self) -> &[LoweredOp] {
        &self.chain
    }

    pub fn input_ids(&self) -> &[ValueId] {
        &self.input_ids
    }

    pub fn output_ids(&self) -> &[ValueId] {
        &self.output_ids
    }

    /// Lower a single node. On error the lowering call must be abandoned;
    /// the builder makes no promise about its state afterwards.
    pub fn process_node(&mut self, node: &Node) -> LowerResult<()> {
        match node.role {
            NodeRole::Placeholder => self.process_placeholder(node),
            NodeRole::GetAttr => self.process_get_attr(node),
            NodeRole::CallFunction => self.process_call_function(node),
            NodeRole::Output => self.process_output(node),
            role => Err(LoweringError::UnsupportedNodeRole {
                node: node.name.clone(),
                role: role.to_string(),
            }),
        }
    }

    fn process_placeholder(&mut self, node: &Node) -> LowerResult<()> {
        let ids = self.ctx.define_values(node)?;
        if self.ctx.is_constant(node) {
            trace!("BackendGraphBuilder: constant placeholder {} -> {:?}", node.name, ids);
        } else {
            debug!("BackendGraphBuilder: input {} -> {:?}", node.name, ids);
            self.input_ids.extend(ids);
        }
        Ok(())
    }

    fn process_get_attr(&mut self, node: &Node) -> LowerResult<()> {
        let ids = self.ctx.define_values(node)?;
        trace!("BackendGraphBuilder: attribute {} -> {:?}", node.name, ids);
        Ok(())
    }

    fn process_call_function(&mut self, node: &Node) -> LowerResult<()> {
        for input in node.input_nodes() {
            self.ctx.lookup(input)?;
        }
        let first_free = self.ctx.values().len() as ValueId;

        let mut op = self.registry.dispatch(node, &mut self.ctx)?;
        self.check_protocol(node, &op, first_free)?;
        if op.debug_handle.is_none() {
            op.debug_handle = node.meta.debug_handle;
        }

        debug!(
            "BackendGraphBuilder: {} = {}({:?}) -> {:?}",
            node.name, op.name, op.inputs, op.outputs
        );
        self.chain.push(op);
        Ok(())
    }

    /// A routine must emit exactly the ids allocated for its node and only
    /// consume ids that existed before it ran
    fn check_protocol(&self, node: &Node, op: &LoweredOp, first_free: ValueId) -> LowerResult<()> {
        let allocated = self.ctx.lookup(node.id).map_err(|_| {
            LoweringError::configuration(format!(
                "routine for `{}` did not allocate the node's outputs",
                node.name
            ))
        })?;
        if op.outputs != allocated {
            return Err(LoweringError::configuration(format!(
                "routine for `{}` emitted outputs {:?}, node owns {:?}",
                node.name, op.outputs, allocated
            )));
        }
        if let Some(bad) = op.inputs.iter().find(|&&id| id >= first_free) {
            return Err(LoweringError::configuration(format!(
                "routine for `{}` consumed value {} which it did not resolve from an input",
                node.name, bad
            )));
        }
        Ok(())
    }

    fn process_output(&mut self, node: &Node) -> LowerResult<()> {
        for producer in node.args.iter().filter_map(|a| a.as_node()) {
            let ids = self.ctx.lookup(producer)?;
            debug!("BackendGraphBuilder: output {} -> {:?}", self.graph.label(producer), ids);
            self.output_ids.extend_from_slice(ids);
        }
        Ok(())
    }

    /// Lower every node and take the finished snapshot
    pub fn build(mut self) -> LowerResult<LoweredGraph> {
        info!("BackendGraphBuilder: lowering {} nodes", self.graph.len());
        let graph = self.graph;
        for node in graph.nodes() {
            self.process_node(node)?;
        }

        let version = self.ctx.options().version.clone();
        let (values, constants) = self.ctx.into_parts();
        info!(
            "BackendGraphBuilder: {} values, {} ops, {} constants",
            values.len(),
            self.chain.len(),
            constants.len()
        );
        Ok(LoweredGraph::new(
            version,
            self.chain,
            values.into_values(),
            self.input_ids,
            self.output_ids,
            constants.into_entries(),
            self.side_blobs,
        ))
    }
}
