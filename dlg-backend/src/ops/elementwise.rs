//! Elementwise operators

use super::helpers::{broadcast_shapes, expect_dims, expect_same_dtype, float_arg_or, output_spec};
use super::{ADD, MUL, RELU};
use crate::context::LowerCtx;
use crate::lowered::LoweredOp;
use dlg_common::{Literal, LowerResult, LoweringError, ValueId};
use dlg_graph::Node;

fn lower_binary(node: &Node, ctx: &mut LowerCtx<'_>, kind: &str) -> LowerResult<(Vec<ValueId>, ValueId)> {
    let lhs = ctx.input(node, 0)?;
    let rhs = ctx.input(node, 1)?;
    expect_same_dtype(node, lhs.spec, rhs.spec)?;

    let shape = broadcast_shapes(&lhs.spec.dims, &rhs.spec.dims).ok_or_else(|| {
        LoweringError::validation(
            &node.name,
            format!("{} operands {:?} and {:?} do not broadcast", kind, lhs.spec.dims, rhs.spec.dims),
        )
    })?;
    let out = output_spec(node)?;
    expect_same_dtype(node, lhs.spec, out)?;
    expect_dims(node, "output", &out.dims, &shape)?;

    let output = ctx.define_value(node)?;
    Ok((vec![lhs.id, rhs.id], output))
}

/// `add.Tensor(a, b, alpha=1)`
pub fn lower_add(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    let alpha = float_arg_or(node, 2, "alpha", 1.0)?;
    let (inputs, output) = lower_binary(node, ctx, "add")?;
    Ok(LoweredOp::new(ADD, inputs, vec![output]).with_params(vec![Literal::Float(alpha)]))
}

/// `mul.Tensor(a, b)`
pub fn lower_mul(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    let (inputs, output) = lower_binary(node, ctx, "mul")?;
    Ok(LoweredOp::new(MUL, inputs, vec![output]))
}

pub fn lower_relu(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    let input = ctx.input(node, 0)?;
    let out = output_spec(node)?;
    expect_same_dtype(node, input.spec, out)?;
    expect_dims(node, "output", &out.dims, &input.spec.dims)?;

    let output = ctx.define_value(node)?;
    Ok(LoweredOp::new(RELU, vec![input.id], vec![output]))
}
