//! Quantization boundary insertion
//!
//! A delegated region consumes and produces quantized tensors, while the code
//! around it works on the logical floating point values. This pass makes the
//! conversions explicit:
//!
//! - every runtime input carrying quantization attributes gets a quantize node
//!   right after it, and all of its consumers are moved onto that node;
//! - every quantized value handed to the graph output gets a dequantize node
//!   right before the output node. Other consumers of that value keep reading
//!   it directly.
//!
//! The rewrite is built into a fresh node list and only becomes a [`Graph`]
//! once every insertion succeeded.

use crate::pass::{GraphPass, PassResult};
use crate::schema::QdqSchema;
use dlg_common::{DType, LowerResult, LoweringError, NodeId, TensorSpec};
use dlg_graph::{Arg, ConstantOracle, Graph, Node, NodeMeta, NodeRole};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone, Copy)]
pub struct InsertIoQdq;

impl GraphPass for InsertIoQdq {
    fn name(&self) -> &'static str {
        "insert_io_qdq"
    }

    fn run(&self, graph: &Graph, oracle: &dyn ConstantOracle) -> LowerResult<PassResult> {
        let mut rewrite = Rewrite::new(graph);
        for node in graph.nodes() {
            rewrite.visit(node, oracle)?;
        }
        rewrite.finish()
    }
}

/// Convenience wrapper around [`InsertIoQdq`]
pub fn insert_io_qdq(graph: &Graph, oracle: &dyn ConstantOracle) -> LowerResult<PassResult> {
    InsertIoQdq.run(graph, oracle)
}

struct Rewrite {
    nodes: Vec<Node>,
    /// Position of each emitted node in `nodes`
    position: HashMap<NodeId, usize>,
    /// Input node -> the quantize node standing in for it
    replaced: HashMap<NodeId, NodeId>,
    /// Floating point spec behind an inserted quantize node
    logical: HashMap<NodeId, TensorSpec>,
    names: HashSet<String>,
    next_id: u32,
    quantized: usize,
    dequantized: usize,
}

impl Rewrite {
    fn new(graph: &Graph) -> Self {
        Self {
            nodes: Vec::with_capacity(graph.len()),
            position: HashMap::with_capacity(graph.len()),
            replaced: HashMap::new(),
            logical: HashMap::new(),
            names: graph.nodes().iter().map(|n| n.name.clone()).collect(),
            next_id: graph.next_free_id().0,
            quantized: 0,
            dequantized: 0,
        }
    }

    fn emit(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.position.insert(id, self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn fresh_name(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut counter = 1;
        while self.names.contains(&name) {
            name = format!("{}_{}", base, counter);
            counter += 1;
        }
        self.names.insert(name.clone());
        name
    }

    fn visit(&mut self, node: &Node, oracle: &dyn ConstantOracle) -> LowerResult<()> {
        let mut node = node.clone();
        for arg in &mut node.args {
            if let Arg::Node { node: id } = arg {
                if let Some(&replacement) = self.replaced.get(&*id) {
                    *id = replacement;
                }
            }
        }

        match node.role {
            NodeRole::Placeholder if node.quant_attrs().is_some() && !oracle.is_constant(&node) => {
                self.quantize_input(node)
            }
            NodeRole::Output => self.dequantize_outputs(node),
            _ => {
                self.emit(node);
                Ok(())
            }
        }
    }

    fn quantize_input(&mut self, mut input: Node) -> LowerResult<()> {
        let attrs = match input.meta.quant_attrs.take() {
            Some(attrs) => attrs,
            None => {
                self.emit(input);
                return Ok(());
            }
        };
        let schema = QdqSchema::encode(attrs.encoding)?;
        let params = schema.params_from(&attrs, &input.name)?;
        let dtype = attrs.dtype.ok_or_else(|| {
            LoweringError::configuration(format!("`{}` has no quantized dtype", input.name))
        })?;
        let spec = single_spec(&input)?.clone();

        let id = self.fresh_id();
        let name = self.fresh_name(&format!("{}_quantize", input.name));
        let mut args = vec![Arg::node(input.id)];
        args.extend(params.into_iter().map(Arg::from));
        let debug_handle = input.meta.debug_handle;
        let quantize = Node::new(id, name, NodeRole::CallFunction)
            .with_target(schema.target)
            .with_args(args)
            .with_outputs(vec![TensorSpec::new(dtype, spec.dims.clone())])
            .with_meta(NodeMeta {
                quant_attrs: Some(attrs),
                debug_handle,
            });

        debug!("InsertIoQdq: {} -> {} ({})", input.name, quantize.name, schema.target);
        self.replaced.insert(input.id, id);
        self.logical.insert(id, spec);
        self.emit(input);
        self.emit(quantize);
        self.quantized += 1;
        Ok(())
    }

    fn dequantize_outputs(&mut self, mut output: Node) -> LowerResult<()> {
        let mut inserted: HashMap<NodeId, NodeId> = HashMap::new();
        for arg in &mut output.args {
            let Arg::Node { node: producer } = arg else {
                continue;
            };
            if let Some(&dequantize) = inserted.get(&*producer) {
                *producer = dequantize;
                continue;
            }
            let Some(dequantize) = self.dequantize(*producer)? else {
                continue;
            };
            let id = self.emit(dequantize);
            inserted.insert(*producer, id);
            *producer = id;
            self.dequantized += 1;
        }
        self.emit(output);
        Ok(())
    }

    /// Dequantize node for `producer`, if it carries quantization attributes
    fn dequantize(&mut self, producer: NodeId) -> LowerResult<Option<Node>> {
        let Some(source) = self.position.get(&producer).map(|&pos| &self.nodes[pos]) else {
            return Ok(None);
        };
        let Some(attrs) = source.quant_attrs() else {
            return Ok(None);
        };
        let schema = QdqSchema::decode(attrs.encoding)?;
        let params = schema.params_from(attrs, &source.name)?;
        let spec = match self.logical.get(&producer) {
            Some(spec) => spec.clone(),
            None => single_spec(source)?.clone(),
        };
        // producers declared in their quantized dtype decode to float32
        let dtype = if spec.dtype.is_quantized() { DType::Float32 } else { spec.dtype };
        let base = format!("{}_dequantize", source.name);
        let debug_handle = source.meta.debug_handle;

        let id = self.fresh_id();
        let name = self.fresh_name(&base);
        let mut args = vec![Arg::node(producer)];
        args.extend(params.into_iter().map(Arg::from));
        debug!("InsertIoQdq: {} before output ({})", name, schema.target);
        Ok(Some(
            Node::new(id, name, NodeRole::CallFunction)
                .with_target(schema.target)
                .with_args(args)
                .with_outputs(vec![TensorSpec::new(dtype, spec.dims)])
                .with_meta(NodeMeta {
                    quant_attrs: None,
                    debug_handle,
                }),
        ))
    }

    fn finish(self) -> LowerResult<PassResult> {
        let modified = self.quantized + self.dequantized > 0;
        info!(
            "InsertIoQdq: {} quantize and {} dequantize nodes inserted",
            self.quantized, self.dequantized
        );
        Ok(PassResult {
            graph: Graph::from_nodes(self.nodes)?,
            modified,
        })
    }
}

fn single_spec(node: &Node) -> LowerResult<&TensorSpec> {
    node.output_spec().ok_or_else(|| {
        LoweringError::configuration(format!(
            "`{}` carries quantization attributes but declares {} outputs",
            node.name,
            node.outputs.len()
        ))
    })
}

