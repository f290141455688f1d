//! Tests for quantize/dequantize insertion at the graph boundary

use dlg_common::{DType, Encoding, Literal, LoweringError, NodeId, QuantAttrs, TensorData, TensorSpec};
use dlg_graph::{lit, Arg, ExportSignature, Graph, GraphBuilder, Node, NodeRole};
use dlg_passes::schema::{
    DEQUANTIZE_PER_CHANNEL, DEQUANTIZE_PER_TENSOR_TENSOR, QUANTIZE_PER_CHANNEL, QUANTIZE_PER_TENSOR,
    QUANTIZE_PER_TENSOR_TENSOR,
};
use dlg_passes::{insert_io_qdq, InsertIoQdq, PassManager};
use pretty_assertions::assert_eq;

const RELU: &str = "aten.relu.default";

fn f32_spec(dims: &[usize]) -> TensorSpec {
    TensorSpec::new(DType::Float32, dims.to_vec())
}

fn int8_attrs() -> QuantAttrs {
    QuantAttrs::per_tensor(0.5, 0, DType::Int8)
}

fn nodes_with_target<'g>(graph: &'g Graph, target: &str) -> Vec<&'g Node> {
    graph
        .nodes()
        .iter()
        .filter(|n| n.target.as_deref() == Some(target))
        .collect()
}

fn by_name<'g>(graph: &'g Graph, name: &str) -> &'g Node {
    graph.nodes().iter().find(|n| n.name == name).unwrap()
}

/// `x` (quantized input) feeding two consumers
fn fan_out_input() -> Graph {
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[4]).with_mem_obj(2));
    let a = b.call_function("relu_a", RELU, vec![Arg::node(x)], f32_spec(&[4]));
    let c = b.call_function("relu_b", RELU, vec![Arg::node(x)], f32_spec(&[4]));
    b.output(&[a, c]);
    b.set_quant_attrs(x, int8_attrs()).set_debug_handle(x, 9);
    b.build().unwrap()
}

#[test]
fn test_encode_inserted_after_input() {
    let graph = fan_out_input();
    let result = insert_io_qdq(&graph, &ExportSignature::new()).unwrap();
    assert!(result.modified);

    let quantized = nodes_with_target(&result.graph, QUANTIZE_PER_TENSOR);
    assert_eq!(quantized.len(), 1);
    let q = quantized[0];
    assert_eq!(q.id, NodeId(4));
    assert_eq!(q.name, "x_quantize");
    assert_eq!(q.role, NodeRole::CallFunction);
    assert_eq!(
        q.args,
        vec![
            Arg::node(NodeId(0)),
            lit(0.5),
            lit(0i64),
            lit(DType::Int8),
        ]
    );
    assert_eq!(q.outputs, vec![TensorSpec::new(DType::Int8, vec![4])]);
    assert_eq!(q.quant_attrs(), Some(&int8_attrs()));
    assert_eq!(q.meta.debug_handle, Some(9));

    // placed right after the input, which gives up its attributes
    assert_eq!(result.graph.nodes()[1].id, q.id);
    assert_eq!(by_name(&result.graph, "x").quant_attrs(), None);

    for consumer in ["relu_a", "relu_b"] {
        assert_eq!(by_name(&result.graph, consumer).input_nodes(), vec![q.id]);
    }
    assert_eq!(result.graph.users(NodeId(0)), vec![q.id]);
}

#[test]
fn test_original_graph_untouched() {
    let graph = fan_out_input();
    let before = graph.clone();
    let _ = insert_io_qdq(&graph, &ExportSignature::new()).unwrap();
    assert_eq!(graph, before);
}

#[test]
fn test_decode_only_rewires_output_use() {
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[4]));
    let fc = b.call_function("fc", RELU, vec![Arg::node(x)], f32_spec(&[4]));
    let act = b.call_function("act", RELU, vec![Arg::node(fc)], f32_spec(&[4]));
    b.output(&[fc, act]);
    b.set_quant_attrs(fc, int8_attrs());
    let graph = b.build().unwrap();

    let result = insert_io_qdq(&graph, &ExportSignature::new()).unwrap();
    assert!(result.modified);

    let decoded = nodes_with_target(&result.graph, DEQUANTIZE_PER_TENSOR_TENSOR);
    assert_eq!(decoded.len(), 1);
    let dq = decoded[0];
    assert_eq!(dq.name, "fc_dequantize");
    assert_eq!(
        dq.args,
        vec![
            Arg::node(fc),
            lit(vec![0.5]),
            lit(vec![0i64]),
            lit(DType::Int8),
        ]
    );
    assert_eq!(dq.outputs, vec![f32_spec(&[4])]);
    assert_eq!(dq.quant_attrs(), None);

    // non-output consumers keep reading the raw value
    assert_eq!(by_name(&result.graph, "act").input_nodes(), vec![fc]);
    // the producer keeps its attributes
    assert_eq!(by_name(&result.graph, "fc").quant_attrs(), Some(&int8_attrs()));

    let nodes = result.graph.nodes();
    let output = &nodes[nodes.len() - 1];
    assert_eq!(output.role, NodeRole::Output);
    assert_eq!(nodes[nodes.len() - 2].id, dq.id);
    assert_eq!(output.args, vec![Arg::node(dq.id), Arg::node(act)]);
}

#[test]
fn test_one_decode_per_output_producer() {
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[4]));
    let fc = b.call_function("fc", RELU, vec![Arg::node(x)], f32_spec(&[4]));
    b.output(&[fc, fc]);
    b.set_quant_attrs(fc, int8_attrs());
    let graph = b.build().unwrap();

    let result = insert_io_qdq(&graph, &ExportSignature::new()).unwrap();
    let decoded = nodes_with_target(&result.graph, DEQUANTIZE_PER_TENSOR_TENSOR);
    assert_eq!(decoded.len(), 1);
    let output = by_name(&result.graph, "output");
    assert_eq!(output.args, vec![Arg::node(decoded[0].id), Arg::node(decoded[0].id)]);
}

#[test]
fn test_input_returned_directly() {
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[2, 2]));
    b.output(&[x]);
    b.set_quant_attrs(x, int8_attrs());
    let graph = b.build().unwrap();

    let result = insert_io_qdq(&graph, &ExportSignature::new()).unwrap();
    let names: Vec<&str> = result.graph.nodes().iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["x", "x_quantize", "x_quantize_dequantize", "output"]);

    // decodes back to the input's floating point spec
    let dq = by_name(&result.graph, "x_quantize_dequantize");
    assert_eq!(dq.outputs, vec![f32_spec(&[2, 2])]);
    assert_eq!(dq.input_nodes(), vec![by_name(&result.graph, "x_quantize").id]);
}

#[test]
fn test_constant_inputs_skipped() {
    let mut sig = ExportSignature::new();
    sig.add_parameter("p_w", "fc.weight", TensorData::from_f32(vec![2], &[1.0, 2.0]));

    let mut b = GraphBuilder::new();
    let w = b.placeholder("p_w", f32_spec(&[2]));
    let act = b.call_function("act", RELU, vec![Arg::node(w)], f32_spec(&[2]));
    b.output(&[act]);
    b.set_quant_attrs(w, int8_attrs());
    let graph = b.build().unwrap();

    let result = insert_io_qdq(&graph, &sig).unwrap();
    assert!(!result.modified);
    assert_eq!(result.graph, graph);
}

#[test]
fn test_name_collision_gets_suffix() {
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[4]));
    let taken = b.call_function("x_quantize", RELU, vec![Arg::node(x)], f32_spec(&[4]));
    b.output(&[taken]);
    b.set_quant_attrs(x, int8_attrs());
    let graph = b.build().unwrap();

    let result = insert_io_qdq(&graph, &ExportSignature::new()).unwrap();
    let q = nodes_with_target(&result.graph, QUANTIZE_PER_TENSOR)[0];
    assert_eq!(q.name, "x_quantize_1");
}

#[test]
fn test_per_channel_encode() {
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[2, 3]));
    let act = b.call_function("act", RELU, vec![Arg::node(x)], f32_spec(&[2, 3]));
    b.output(&[act]);
    b.set_quant_attrs(x, QuantAttrs::per_channel(vec![0.1, 0.2, 0.3], vec![0, 0, 0], 1, DType::Int8));
    let graph = b.build().unwrap();

    let result = insert_io_qdq(&graph, &ExportSignature::new()).unwrap();
    let q = nodes_with_target(&result.graph, QUANTIZE_PER_CHANNEL)[0];
    let params: Vec<&Literal> = q.args.iter().skip(1).filter_map(Arg::as_literal).collect();
    assert_eq!(
        params,
        vec![
            &Literal::Floats(vec![0.1, 0.2, 0.3]),
            &Literal::Ints(vec![0, 0, 0]),
            &Literal::Int(1),
            &Literal::DType(DType::Int8),
        ]
    );
}

#[test]
fn test_tensor_encoding_wraps_scalars() {
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[4]));
    let act = b.call_function("act", RELU, vec![Arg::node(x)], f32_spec(&[4]));
    b.output(&[act]);
    b.set_quant_attrs(x, int8_attrs().with_encoding(Encoding::PerTensorTensor));
    let graph = b.build().unwrap();

    let result = insert_io_qdq(&graph, &ExportSignature::new()).unwrap();
    assert!(nodes_with_target(&result.graph, QUANTIZE_PER_TENSOR).is_empty());
    let quantized = nodes_with_target(&result.graph, QUANTIZE_PER_TENSOR_TENSOR);
    assert_eq!(quantized.len(), 1);
    let q = quantized[0];
    assert_eq!(
        q.args,
        vec![
            Arg::node(x),
            lit(vec![0.5]),
            lit(vec![0i64]),
            lit(DType::Int8),
        ]
    );
    assert_eq!(q.outputs, vec![TensorSpec::new(DType::Int8, vec![4])]);
    assert_eq!(by_name(&result.graph, "act").input_nodes(), vec![q.id]);
}

#[test]
fn test_per_channel_decode_before_output() {
    let attrs = QuantAttrs::per_channel(vec![0.1, 0.2, 0.3], vec![0, 1, 2], 1, DType::Int8);
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[2, 3]));
    let fc = b.call_function("fc", RELU, vec![Arg::node(x)], f32_spec(&[2, 3]));
    b.output(&[fc]);
    b.set_quant_attrs(fc, attrs.clone());
    let graph = b.build().unwrap();

    let result = insert_io_qdq(&graph, &ExportSignature::new()).unwrap();
    assert!(result.modified);
    let decoded = nodes_with_target(&result.graph, DEQUANTIZE_PER_CHANNEL);
    assert_eq!(decoded.len(), 1);
    let dq = decoded[0];
    assert_eq!(dq.name, "fc_dequantize");
    assert_eq!(
        dq.args,
        vec![
            Arg::node(fc),
            lit(vec![0.1, 0.2, 0.3]),
            lit(vec![0i64, 1, 2]),
            lit(1i64),
            lit(DType::Int8),
        ]
    );
    assert_eq!(dq.outputs, vec![f32_spec(&[2, 3])]);
    assert_eq!(by_name(&result.graph, "fc").quant_attrs(), Some(&attrs));

    let nodes = result.graph.nodes();
    assert_eq!(nodes[nodes.len() - 2].id, dq.id);
    assert_eq!(by_name(&result.graph, "output").args, vec![Arg::node(dq.id)]);
}

#[test]
fn test_missing_attribute_is_configuration_error() {
    let mut attrs = int8_attrs();
    attrs.scale = None;
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[4]));
    b.output(&[x]);
    b.set_quant_attrs(x, attrs);
    let graph = b.build().unwrap();

    let err = insert_io_qdq(&graph, &ExportSignature::new()).unwrap_err();
    assert!(matches!(err, LoweringError::Configuration { .. }));
    assert!(err.to_string().contains("scale"));
}

#[test]
fn test_unsupported_encoding() {
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", f32_spec(&[4]));
    b.output(&[x]);
    b.set_quant_attrs(x, int8_attrs().with_encoding(Encoding::PerToken));
    let graph = b.build().unwrap();

    let err = insert_io_qdq(&graph, &ExportSignature::new()).unwrap_err();
    assert_eq!(err, LoweringError::UnsupportedEncoding { kind: "per_token".to_string() });
    assert!(err.is_unsupported());
}

#[test]
fn test_pass_manager_reaches_fixed_point() {
    let manager = PassManager::new().add(InsertIoQdq);
    let sig = ExportSignature::new();

    let first = manager.run(&fan_out_input(), &sig).unwrap();
    assert!(first.modified);
    let second = manager.run(&first.graph, &sig).unwrap();
    assert!(!second.modified);
    assert_eq!(second.graph, first.graph);
}
