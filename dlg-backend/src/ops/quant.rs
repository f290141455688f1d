//! Quantize / dequantize operators
//!
//! These are the encode/decode steps the boundary pass inserts, and the ones
//! an upstream quantizer may leave inside the graph. Both the `.default` and
//! the `.tensor` overloads are accepted; the latter carry scale and zero point
//! as one-element tensors, which are normalized to scalars in the params.

use super::helpers::{
    dtype_arg, expect_dims, floats_arg, int_arg, ints_arg, normalize_dim, output_spec, scalar_float_arg,
    scalar_int_arg,
};
use crate::context::{LowerCtx, Operand};
use crate::lowered::LoweredOp;
use dlg_common::{DType, Literal, LowerResult, LoweringError};
use dlg_graph::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Quantize,
    Dequantize,
}

fn check_scale(node: &Node, scale: f64) -> LowerResult<()> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(LoweringError::validation(
            &node.name,
            format!("scale must be positive and finite, got {}", scale),
        ));
    }
    Ok(())
}

fn quant_range(node: &Node, dtype: DType) -> LowerResult<(i64, i64)> {
    dtype.quant_range().ok_or_else(|| {
        LoweringError::validation(&node.name, format!("{} is not a quantized dtype", dtype))
    })
}

fn check_zero_point(node: &Node, zero_point: i64, (qmin, qmax): (i64, i64)) -> LowerResult<()> {
    if zero_point < qmin || zero_point > qmax {
        return Err(LoweringError::validation(
            &node.name,
            format!("zero point {} is outside [{}, {}]", zero_point, qmin, qmax),
        ));
    }
    Ok(())
}

/// Shared dtype/shape checks on the converted value
fn check_conversion(node: &Node, input: &Operand<'_>, dtype: DType, direction: Direction) -> LowerResult<()> {
    let out = output_spec(node)?;
    expect_dims(node, "output", &out.dims, &input.spec.dims)?;
    match direction {
        Direction::Quantize => {
            if !input.spec.dtype.is_floating_point() {
                return Err(LoweringError::validation(
                    &node.name,
                    format!("quantize input must be floating point, got {}", input.spec.dtype),
                ));
            }
            if out.dtype != dtype {
                return Err(LoweringError::validation(
                    &node.name,
                    format!("output dtype {} does not match target dtype {}", out.dtype, dtype),
                ));
            }
        }
        Direction::Dequantize => {
            if !out.dtype.is_floating_point() {
                return Err(LoweringError::validation(
                    &node.name,
                    format!("dequantize output must be floating point, got {}", out.dtype),
                ));
            }
        }
    }
    Ok(())
}

fn op_kind(node: &Node) -> String {
    node.target.clone().unwrap_or_default()
}

/// `(x, scale, zero_point, dtype)`
fn lower_per_tensor(node: &Node, ctx: &mut LowerCtx<'_>, direction: Direction) -> LowerResult<LoweredOp> {
    let input = ctx.input(node, 0)?;
    let scale = scalar_float_arg(node, 1, "scale")?;
    let zero_point = scalar_int_arg(node, 2, "zero_point")?;
    let dtype = dtype_arg(node, 3, "dtype")?;

    check_scale(node, scale)?;
    check_zero_point(node, zero_point, quant_range(node, dtype)?)?;
    check_conversion(node, &input, dtype, direction)?;

    let output = ctx.define_value(node)?;
    let params = vec![Literal::Float(scale), Literal::Int(zero_point), Literal::DType(dtype)];
    Ok(LoweredOp::new(op_kind(node), vec![input.id], vec![output]).with_params(params))
}

/// `(x, scales, zero_points, axis, dtype)`
fn lower_per_channel(node: &Node, ctx: &mut LowerCtx<'_>, direction: Direction) -> LowerResult<LoweredOp> {
    let input = ctx.input(node, 0)?;
    let scales = floats_arg(node, 1, "scales")?;
    let zero_points = ints_arg(node, 2, "zero_points")?;
    let axis = normalize_dim(node, int_arg(node, 3, "axis")?, input.spec.rank())?;
    let dtype = dtype_arg(node, 4, "dtype")?;

    let channels = input.spec.dims[axis];
    if scales.len() != channels || zero_points.len() != channels {
        return Err(LoweringError::validation(
            &node.name,
            format!(
                "{} scales and {} zero points for {} channels along axis {}",
                scales.len(),
                zero_points.len(),
                channels,
                axis
            ),
        ));
    }
    let range = quant_range(node, dtype)?;
    for &scale in &scales {
        check_scale(node, scale)?;
    }
    for &zp in &zero_points {
        check_zero_point(node, zp, range)?;
    }
    check_conversion(node, &input, dtype, direction)?;

    let output = ctx.define_value(node)?;
    let params = vec![
        Literal::Floats(scales),
        Literal::Ints(zero_points),
        Literal::Int(axis as i64),
        Literal::DType(dtype),
    ];
    Ok(LoweredOp::new(op_kind(node), vec![input.id], vec![output]).with_params(params))
}

pub fn lower_quantize_per_tensor(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    lower_per_tensor(node, ctx, Direction::Quantize)
}

pub fn lower_dequantize_per_tensor(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    lower_per_tensor(node, ctx, Direction::Dequantize)
}

pub fn lower_quantize_per_channel(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    lower_per_channel(node, ctx, Direction::Quantize)
}

pub fn lower_dequantize_per_channel(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    lower_per_channel(node, ctx, Direction::Dequantize)
}
