//! Softmax and linear

use super::helpers::{bool_arg_or, expect_dims, expect_same_dtype, int_arg, normalize_dim, output_spec};
use super::{LINEAR, SOFTMAX};
use crate::context::LowerCtx;
use crate::lowered::LoweredOp;
use dlg_common::{Literal, LowerResult, LoweringError};
use dlg_graph::Node;

/// `_softmax(x, dim, half_to_float)`
pub fn lower_softmax(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    let input = ctx.input(node, 0)?;
    let dim = normalize_dim(node, int_arg(node, 1, "dim")?, input.spec.rank())?;
    if bool_arg_or(node, 2, "half_to_float", false)? {
        return Err(LoweringError::validation(&node.name, "half_to_float is not supported"));
    }

    let out = output_spec(node)?;
    expect_same_dtype(node, input.spec, out)?;
    expect_dims(node, "output", &out.dims, &input.spec.dims)?;

    let output = ctx.define_value(node)?;
    Ok(LoweredOp::new(SOFTMAX, vec![input.id], vec![output]).with_params(vec![Literal::Int(dim as i64)]))
}

/// `linear(x, weight, bias=None)` with `weight: [out, in]`
pub fn lower_linear(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    let input = ctx.input(node, 0)?;
    let weight = ctx.input(node, 1)?;
    let bias = ctx.optional_input(node, 2)?;
    expect_same_dtype(node, input.spec, weight.spec)?;

    let (out_features, in_features) = match weight.spec.dims.as_slice() {
        [o, i] => (*o, *i),
        dims => {
            return Err(LoweringError::validation(
                &node.name,
                format!("weight must be rank 2, got {:?}", dims),
            ));
        }
    };
    match input.spec.dims.last() {
        Some(&last) if last == in_features => {}
        _ => {
            return Err(LoweringError::validation(
                &node.name,
                format!("input {:?} does not end in {} features", input.spec.dims, in_features),
            ));
        }
    }
    if let Some(bias) = &bias {
        expect_dims(node, "bias", &bias.spec.dims, &[out_features])?;
    }

    let mut expected = input.spec.dims.clone();
    if let Some(last) = expected.last_mut() {
        *last = out_features;
    }
    let out = output_spec(node)?;
    expect_same_dtype(node, input.spec, out)?;
    expect_dims(node, "output", &out.dims, &expected)?;

    let mut inputs = vec![input.id, weight.id];
    inputs.extend(bias.map(|b| b.id));
    let output = ctx.define_value(node)?;
    Ok(LoweredOp::new(LINEAR, inputs, vec![output]))
}
