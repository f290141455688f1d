//! Layout operators: permute and view

use super::helpers::{expect_dims, expect_same_dtype, ints_arg, output_spec};
use super::{PERMUTE_COPY, VIEW_COPY};
use crate::context::LowerCtx;
use crate::lowered::LoweredOp;
use dlg_common::{Literal, LowerResult, LoweringError};
use dlg_graph::Node;

/// `permute_copy(x, dims)`: `dims` must be a bijection on `[0, rank)`
pub fn lower_permute_copy(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    let input = ctx.input(node, 0)?;
    let perm = ints_arg(node, 1, "dims")?;
    let rank = input.spec.rank();

    if perm.len() != rank {
        return Err(LoweringError::validation(
            &node.name,
            format!("permutation {:?} has {} entries, input rank is {}", perm, perm.len(), rank),
        ));
    }
    let mut seen = vec![false; rank];
    for &d in &perm {
        if d < 0 || d as usize >= rank || seen[d as usize] {
            return Err(LoweringError::validation(
                &node.name,
                format!("{:?} is not a permutation of [0, {})", perm, rank),
            ));
        }
        seen[d as usize] = true;
    }

    let out = output_spec(node)?;
    expect_same_dtype(node, input.spec, out)?;
    let permuted: Vec<usize> = perm.iter().map(|&d| input.spec.dims[d as usize]).collect();
    expect_dims(node, "output", &out.dims, &permuted)?;

    let output = ctx.define_value(node)?;
    Ok(LoweredOp::new(PERMUTE_COPY, vec![input.id], vec![output]).with_params(vec![Literal::Ints(perm)]))
}

/// `view_copy(x, size)`: element count preserved, at most one inferred `-1`
pub fn lower_view_copy(node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
    let input = ctx.input(node, 0)?;
    let size = ints_arg(node, 1, "size")?;
    let numel = input
        .spec
        .numel()
        .ok_or_else(|| LoweringError::validation(&node.name, format!("input {} is too large", input.spec)))?;

    let mut inferred = None;
    let mut known = 1usize;
    for (i, &d) in size.iter().enumerate() {
        match d {
            -1 if inferred.is_none() => inferred = Some(i),
            d if d >= 0 => {
                known = usize::try_from(d)
                    .ok()
                    .and_then(|d| known.checked_mul(d))
                    .ok_or_else(|| {
                        LoweringError::validation(&node.name, format!("view size {:?} overflows", size))
                    })?;
            }
            _ => {
                return Err(LoweringError::validation(
                    &node.name,
                    format!("invalid view size {:?}", size),
                ));
            }
        }
    }

    let mut resolved: Vec<usize> = size.iter().map(|&d| d.max(0) as usize).collect();
    if let Some(i) = inferred {
        if known == 0 || numel % known != 0 {
            return Err(LoweringError::validation(
                &node.name,
                format!("cannot infer -1 in {:?} for {} elements", size, numel),
            ));
        }
        resolved[i] = numel / known;
    } else if known != numel {
        return Err(LoweringError::validation(
            &node.name,
            format!("view size {:?} has {} elements, input has {}", size, known, numel),
        ));
    }

    let out = output_spec(node)?;
    expect_same_dtype(node, input.spec, out)?;
    expect_dims(node, "output", &out.dims, &resolved)?;

    let output = ctx.define_value(node)?;
    let params = vec![Literal::Ints(resolved.iter().map(|&d| d as i64).collect())];
    Ok(LoweredOp::new(VIEW_COPY, vec![input.id], vec![output]).with_params(params))
}
