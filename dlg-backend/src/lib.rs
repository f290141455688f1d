//! Delegate Graph Lowering - Backend IR Builder
//!
//! Lowers an upstream dataflow graph into the flat, id-based form a delegate
//! runtime consumes: a value table, an ordered op chain, input/output id
//! lists and a constant pool.
//!
//! ## Architecture
//!
//! - `values` - Value table and id allocation
//! - `constants` - Append-only constant pool
//! - `registry` - Operator kind to lowering routine mapping
//! - `ops` - Built-in lowering routines
//! - `context` - Per-call state handed to lowering routines
//! - `builder` - The driver walking the graph
//! - `lowered` - The immutable result

pub mod builder;
pub mod constants;
pub mod context;
pub mod lowered;
pub mod ops;
pub mod options;
pub mod registry;
pub mod values;

pub use builder::BackendGraphBuilder;
pub use constants::ConstantPool;
pub use context::{LowerCtx, Operand};
pub use lowered::{LoweredGraph, LoweredOp};
pub use options::LoweringOptions;
pub use registry::{NodeLowering, Registry, RegistryBuilder};
pub use values::{Value, ValueTable};

use dlg_common::LowerResult;
use dlg_graph::{ConstantOracle, Graph, Program};
use dlg_passes::{GraphPass, InsertIoQdq};
use log::info;

/// Lower `graph` in the order its nodes are stored
pub fn lower_graph(
    graph: &Graph,
    oracle: &dyn ConstantOracle,
    registry: &Registry,
    options: &LoweringOptions,
) -> LowerResult<LoweredGraph> {
    BackendGraphBuilder::new(graph, oracle, registry, options).build()
}

/// Lower a program, running the quantization boundary pass first when
/// `options.insert_io_qdq` is set
pub fn lower_program(program: &Program, registry: &Registry, options: &LoweringOptions) -> LowerResult<LoweredGraph> {
    if !options.insert_io_qdq {
        return lower_graph(&program.graph, &program.signature, registry, options);
    }

    let result = InsertIoQdq.run(&program.graph, &program.signature)?;
    info!(
        "lower_program: {} {}",
        InsertIoQdq.name(),
        if result.modified { "inserted boundary nodes" } else { "made no changes" }
    );
    lower_graph(&result.graph, &program.signature, registry, options)
}

#[cfg(test)]
mod tests;
