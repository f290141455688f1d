//! End-to-end: boundary pass followed by lowering

use dlg_backend::ops::{DEQUANTIZE_PER_TENSOR_TENSOR, PERMUTE_COPY, QUANTIZE_PER_TENSOR};
use dlg_backend::{lower_program, LoweringOptions, Registry};
use dlg_common::{DType, Literal, QuantAttrs, TensorSpec};
use dlg_graph::{lit, Arg, ExportSignature, GraphBuilder, Program};
use pretty_assertions::assert_eq;

fn quantized_permute() -> Program {
    let attrs = QuantAttrs::per_tensor(0.5, 0, DType::Int8);
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", TensorSpec::new(DType::Float32, vec![2, 3]));
    let p = b.call_function(
        "permute",
        PERMUTE_COPY,
        vec![Arg::node(x), lit(vec![1i64, 0])],
        TensorSpec::new(DType::Int8, vec![3, 2]),
    );
    b.output(&[p]);
    b.set_quant_attrs(x, attrs.clone()).set_quant_attrs(p, attrs);
    Program::new(b.build().unwrap(), ExportSignature::new())
}

#[test]
fn test_lower_with_boundary_nodes() {
    let registry = Registry::with_builtins().unwrap();
    let options = LoweringOptions {
        insert_io_qdq: true,
        ..LoweringOptions::default()
    };
    let lowered = lower_program(&quantized_permute(), &registry, &options).unwrap();

    let names: Vec<&str> = lowered.chain().iter().map(|op| op.name.as_str()).collect();
    assert_eq!(names, vec![QUANTIZE_PER_TENSOR, PERMUTE_COPY, DEQUANTIZE_PER_TENSOR_TENSOR]);

    let quantize = &lowered.chain()[0];
    assert_eq!(quantize.inputs, vec![0]);
    assert_eq!(quantize.outputs, vec![1]);
    assert_eq!(
        quantize.params,
        vec![Literal::Float(0.5), Literal::Int(0), Literal::DType(DType::Int8)]
    );

    // the permute reads the encoded value
    assert_eq!(lowered.chain()[1].inputs, vec![1]);
    assert_eq!(lowered.chain()[2].inputs, vec![2]);

    assert_eq!(lowered.input_ids(), &[0]);
    assert_eq!(lowered.output_ids(), &[3]);
    assert_eq!(lowered.value(1).unwrap().dtype, DType::Int8);
    assert_eq!(lowered.value(3).unwrap().dtype, DType::Float32);
    assert_eq!(lowered.value(3).unwrap().dims, vec![3, 2]);
}

#[test]
fn test_boundary_pass_is_opt_in() {
    let mut b = GraphBuilder::new();
    let x = b.placeholder("x", TensorSpec::new(DType::Float32, vec![4]));
    let p = b.call_function(
        "permute",
        PERMUTE_COPY,
        vec![Arg::node(x), lit(vec![0i64])],
        TensorSpec::new(DType::Float32, vec![4]),
    );
    b.output(&[p]);
    b.set_quant_attrs(x, QuantAttrs::per_tensor(0.5, 0, DType::Int8));
    let program = Program::new(b.build().unwrap(), ExportSignature::new());

    let registry = Registry::with_builtins().unwrap();
    let lowered = lower_program(&program, &registry, &LoweringOptions::default()).unwrap();
    assert_eq!(lowered.chain().len(), 1);
    assert_eq!(lowered.values().len(), 2);
}

#[test]
fn test_program_json_round_trip_lowers_identically() {
    let program = quantized_permute();
    let reloaded = Program::from_json(&program.to_json().unwrap()).unwrap();
    assert_eq!(reloaded, program);

    let registry = Registry::with_builtins().unwrap();
    let options = LoweringOptions {
        insert_io_qdq: true,
        ..LoweringOptions::default()
    };
    let first = lower_program(&program, &registry, &options).unwrap();
    let second = lower_program(&reloaded, &registry, &options).unwrap();
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}
