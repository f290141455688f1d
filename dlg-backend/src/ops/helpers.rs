//! Argument helpers shared by the operator routines

use dlg_common::{DType, Literal, LowerResult, LoweringError, TensorSpec};
use dlg_graph::Node;

fn literal<'n>(node: &'n Node, index: usize, what: &str) -> LowerResult<&'n Literal> {
    node.arg(index)
        .and_then(|a| a.as_literal())
        .ok_or_else(|| LoweringError::validation(&node.name, format!("missing literal argument `{}`", what)))
}

fn wrong_type(node: &Node, what: &str, expected: &str, got: &Literal) -> LoweringError {
    LoweringError::validation(&node.name, format!("`{}` must be {}, got {}", what, expected, got))
}

pub(crate) fn int_arg(node: &Node, index: usize, what: &str) -> LowerResult<i64> {
    let lit = literal(node, index, what)?;
    lit.as_int().ok_or_else(|| wrong_type(node, what, "an int", lit))
}

pub(crate) fn ints_arg(node: &Node, index: usize, what: &str) -> LowerResult<Vec<i64>> {
    let lit = literal(node, index, what)?;
    lit.as_ints()
        .map(<[i64]>::to_vec)
        .ok_or_else(|| wrong_type(node, what, "an int list", lit))
}

pub(crate) fn floats_arg(node: &Node, index: usize, what: &str) -> LowerResult<Vec<f64>> {
    let lit = literal(node, index, what)?;
    lit.as_floats()
        .map(<[f64]>::to_vec)
        .ok_or_else(|| wrong_type(node, what, "a float list", lit))
}

pub(crate) fn dtype_arg(node: &Node, index: usize, what: &str) -> LowerResult<DType> {
    let lit = literal(node, index, what)?;
    lit.as_dtype().ok_or_else(|| wrong_type(node, what, "a dtype", lit))
}

/// Scalar float, also accepted as a one-element list (tensor overloads)
pub(crate) fn scalar_float_arg(node: &Node, index: usize, what: &str) -> LowerResult<f64> {
    let lit = literal(node, index, what)?;
    match lit {
        Literal::Floats(v) if v.len() == 1 => Ok(v[0]),
        _ => lit.as_float().ok_or_else(|| wrong_type(node, what, "a scalar float", lit)),
    }
}

/// Scalar int, also accepted as a one-element list (tensor overloads)
pub(crate) fn scalar_int_arg(node: &Node, index: usize, what: &str) -> LowerResult<i64> {
    let lit = literal(node, index, what)?;
    match lit {
        Literal::Ints(v) if v.len() == 1 => Ok(v[0]),
        _ => lit.as_int().ok_or_else(|| wrong_type(node, what, "a scalar int", lit)),
    }
}

pub(crate) fn float_arg_or(node: &Node, index: usize, what: &str, default: f64) -> LowerResult<f64> {
    match node.arg(index) {
        None => Ok(default),
        Some(_) => {
            let lit = literal(node, index, what)?;
            lit.as_float().ok_or_else(|| wrong_type(node, what, "a float", lit))
        }
    }
}

pub(crate) fn bool_arg_or(node: &Node, index: usize, what: &str, default: bool) -> LowerResult<bool> {
    match node.arg(index) {
        None => Ok(default),
        Some(_) => {
            let lit = literal(node, index, what)?;
            lit.as_bool().ok_or_else(|| wrong_type(node, what, "a bool", lit))
        }
    }
}

/// The node's single declared output
pub(crate) fn output_spec(node: &Node) -> LowerResult<&TensorSpec> {
    node.output_spec().ok_or_else(|| {
        LoweringError::validation(
            &node.name,
            format!("expected exactly one output, node declares {}", node.outputs.len()),
        )
    })
}

/// Map `dim` into `[0, rank)`, accepting negative dims counted from the end
pub(crate) fn normalize_dim(node: &Node, dim: i64, rank: usize) -> LowerResult<usize> {
    let rank_i = rank as i64;
    if dim < -rank_i || dim >= rank_i {
        return Err(LoweringError::validation(
            &node.name,
            format!("dim {} is out of range for rank {}", dim, rank),
        ));
    }
    Ok(if dim < 0 { (dim + rank_i) as usize } else { dim as usize })
}

pub(crate) fn expect_dims(node: &Node, what: &str, got: &[usize], expected: &[usize]) -> LowerResult<()> {
    if got != expected {
        return Err(LoweringError::validation(
            &node.name,
            format!("{} dims {:?} do not match expected {:?}", what, got, expected),
        ));
    }
    Ok(())
}

pub(crate) fn expect_same_dtype(node: &Node, a: &TensorSpec, b: &TensorSpec) -> LowerResult<()> {
    if a.dtype != b.dtype {
        return Err(LoweringError::validation(
            &node.name,
            format!("dtype mismatch: {} vs {}", a.dtype, b.dtype),
        ));
    }
    Ok(())
}

/// Numpy-style broadcast of two shapes
pub(crate) fn broadcast_shapes(a: &[usize], b: &[usize]) -> Option<Vec<usize>> {
    let rank = a.len().max(b.len());
    let mut out = vec![0; rank];
    for i in 0..rank {
        let da = if i < rank - a.len() { 1 } else { a[i - (rank - a.len())] };
        let db = if i < rank - b.len() { 1 } else { b[i - (rank - b.len())] };
        out[i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => return None,
        };
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlg_common::NodeId;
    use dlg_graph::NodeRole;

    #[test]
    fn test_broadcast_shapes() {
        assert_eq!(broadcast_shapes(&[2, 3], &[3]), Some(vec![2, 3]));
        assert_eq!(broadcast_shapes(&[4, 1, 5], &[3, 1]), Some(vec![4, 3, 5]));
        assert_eq!(broadcast_shapes(&[], &[7]), Some(vec![7]));
        assert_eq!(broadcast_shapes(&[2, 3], &[2]), None);
    }

    #[test]
    fn test_normalize_dim() {
        let node = Node::new(NodeId(0), "softmax", NodeRole::CallFunction);
        assert_eq!(normalize_dim(&node, -1, 3).unwrap(), 2);
        assert_eq!(normalize_dim(&node, 0, 3).unwrap(), 0);
        assert!(normalize_dim(&node, 3, 3).is_err());
        assert!(normalize_dim(&node, -4, 3).is_err());
    }
}
