//! Common types used throughout the lowering pipeline
//!
//! This module defines data types that are shared across the graph model,
//! the backend builder and the rewrite passes: identifiers, dtypes, tensor
//! specs and literal arguments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value identifier in the lowered graph
pub type ValueId = u32;

/// Index into the constant pool
pub type ConstantId = u32;

/// Memory object identifier assigned by an upstream memory planner
pub type MemObjId = u32;

/// Stable handle for a node in the input graph.
///
/// Handles are assigned when the graph is constructed and are used as map
/// keys everywhere a node needs to be remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Element types understood by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Float32,
    Float16,
    Int8,
    #[serde(rename = "uint8")]
    UInt8,
    Int16,
    Int32,
    Int64,
    Bool,
}

impl DType {
    /// Size of one element in bytes
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Float16 | DType::Int16 => 2,
            DType::Float32 | DType::Int32 => 4,
            DType::Int64 => 8,
        }
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self, DType::Float32 | DType::Float16)
    }

    /// Integer range of a narrow (quantized) dtype, `None` for everything else
    pub fn quant_range(&self) -> Option<(i64, i64)> {
        match self {
            DType::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            DType::UInt8 => Some((u8::MIN as i64, u8::MAX as i64)),
            DType::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            _ => None,
        }
    }

    pub fn is_quantized(&self) -> bool {
        self.quant_range().is_some()
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Float32 => "float32",
            DType::Float16 => "float16",
            DType::Int8 => "int8",
            DType::UInt8 => "uint8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Bool => "bool",
        };
        write!(f, "{}", name)
    }
}

/// Declared type of one node output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorSpec {
    pub dtype: DType,
    pub dims: Vec<usize>,
    /// Shared memory object chosen by the planner; `None` means dedicated memory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_obj_id: Option<MemObjId>,
}

impl TensorSpec {
    pub fn new(dtype: DType, dims: Vec<usize>) -> Self {
        Self { dtype, dims, mem_obj_id: None }
    }

    pub fn with_mem_obj(mut self, mem_obj_id: MemObjId) -> Self {
        self.mem_obj_id = Some(mem_obj_id);
        self
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Element count, `None` if it overflows `usize`
    pub fn numel(&self) -> Option<usize> {
        checked_numel(&self.dims)
    }

    pub fn nbytes(&self) -> Option<usize> {
        self.numel()?.checked_mul(self.dtype.size_in_bytes())
    }
}

/// Product of `dims`, `None` on overflow
pub fn checked_numel(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.dtype)?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

/// Raw payload of a compile-time constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorData {
    pub dtype: DType,
    pub dims: Vec<usize>,
    pub bytes: Vec<u8>,
}

impl TensorData {
    pub fn new(dtype: DType, dims: Vec<usize>, bytes: Vec<u8>) -> Self {
        Self { dtype, dims, bytes }
    }

    /// Build a float32 payload from host values (little endian)
    pub fn from_f32(dims: Vec<usize>, values: &[f32]) -> Self {
        let bytes = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        Self::new(DType::Float32, dims, bytes)
    }

    /// Number of bytes `dtype x dims` calls for
    pub fn expected_len(&self) -> Option<usize> {
        checked_numel(&self.dims)?.checked_mul(self.dtype.size_in_bytes())
    }
}

/// Literal argument or backend parameter.
///
/// Literals never carry tensor payloads; constants are always referenced
/// through the constant pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    #[serde(rename = "dtype")]
    DType(DType),
    None,
}

impl Literal {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Floats accept integer literals too, the way the exporter writes `1` for `1.0`
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Float(v) => Some(*v),
            Literal::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Literal::Ints(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Literal::Floats(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_dtype(&self) -> Option<DType> {
        match self {
            Literal::DType(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Literal::None)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<Vec<i64>> for Literal {
    fn from(v: Vec<i64>) -> Self {
        Literal::Ints(v)
    }
}

impl From<Vec<f64>> for Literal {
    fn from(v: Vec<f64>) -> Self {
        Literal::Floats(v)
    }
}

impl From<DType> for Literal {
    fn from(d: DType) -> Self {
        Literal::DType(d)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Ints(v) => write!(f, "{:?}", v),
            Literal::Floats(v) => write!(f, "{:?}", v),
            Literal::DType(d) => write!(f, "{}", d),
            Literal::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dtype_sizes() {
        assert_eq!(DType::Float32.size_in_bytes(), 4);
        assert_eq!(DType::Int8.size_in_bytes(), 1);
        assert_eq!(DType::Int64.size_in_bytes(), 8);
    }

    #[test]
    fn test_quant_range() {
        assert_eq!(DType::Int8.quant_range(), Some((-128, 127)));
        assert_eq!(DType::UInt8.quant_range(), Some((0, 255)));
        assert_eq!(DType::Float32.quant_range(), None);
        assert!(!DType::Int32.is_quantized());
    }

    #[test]
    fn test_tensor_spec_display() {
        let spec = TensorSpec::new(DType::Float32, vec![1, 3, 224, 224]);
        assert_eq!(spec.to_string(), "float32[1, 3, 224, 224]");
        assert_eq!(spec.numel(), Some(3 * 224 * 224));
        assert_eq!(spec.nbytes(), Some(4 * 3 * 224 * 224));
    }

    #[test]
    fn test_sizes_overflow_to_none() {
        let spec = TensorSpec::new(DType::Float32, vec![usize::MAX, 2]);
        assert_eq!(spec.numel(), None);
        assert_eq!(spec.nbytes(), None);
        assert_eq!(TensorSpec::new(DType::Int64, vec![usize::MAX / 4]).nbytes(), None);
        assert_eq!(TensorSpec::new(DType::Int8, vec![4, 0]).numel(), Some(0));

        let data = TensorData::new(DType::Float32, vec![usize::MAX / 2], vec![]);
        assert_eq!(data.expected_len(), None);
    }

    #[test]
    fn test_literal_json_shape() {
        let json = serde_json::to_string(&Literal::Ints(vec![1, 0])).unwrap();
        assert_eq!(json, r#"{"ints":[1,0]}"#);
        let d: Literal = serde_json::from_str(r#"{"dtype":"int8"}"#).unwrap();
        assert_eq!(d, Literal::DType(DType::Int8));
        let n: Literal = serde_json::from_str(r#""none""#).unwrap();
        assert!(n.is_none());
    }

    #[test]
    fn test_from_f32_payload() {
        let data = TensorData::from_f32(vec![2], &[1.0, -2.0]);
        assert_eq!(data.expected_len(), Some(data.bytes.len()));
        assert_eq!(&data.bytes[0..4], &1.0f32.to_le_bytes());
    }
}
