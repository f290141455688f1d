//! Tests for the backend builder, registry and built-in routines

mod registry_tests;

use crate::{lower_graph, LoweredGraph, LoweringOptions, Registry};
use dlg_common::{DType, LowerResult, TensorSpec};
use dlg_graph::{ExportSignature, Graph};

pub(crate) fn float32(dims: &[usize]) -> TensorSpec {
    TensorSpec::new(DType::Float32, dims.to_vec())
}

pub(crate) fn lower(graph: &Graph, signature: &ExportSignature) -> LowerResult<LoweredGraph> {
    let registry = Registry::with_builtins().unwrap();
    lower_graph(graph, signature, &registry, &LoweringOptions::default())
}
