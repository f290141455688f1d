//! Quantization attributes
//!
//! An upstream quantizer attaches these to a node's output metadata. They
//! describe how the logical (floating point) value is encoded in a narrow
//! integer dtype. The attribute record is fixed-schema; schema-driven
//! consumers look fields up by parameter name with [`QuantAttrs::get`].

use crate::types::{DType, Literal};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoding kinds produced by upstream quantizers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Per-tensor with scale/zero-point fixed at export time
    PerTensor,
    /// Per-tensor with scale/zero-point carried as tensors
    PerTensorTensor,
    /// One scale/zero-point per slice along `axis`
    PerChannel,
    PerToken,
    PerChannelGroup,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Encoding::PerTensor => "per_tensor",
            Encoding::PerTensorTensor => "per_tensor_tensor",
            Encoding::PerChannel => "per_channel",
            Encoding::PerToken => "per_token",
            Encoding::PerChannelGroup => "per_channel_group",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuantAttrs {
    pub encoding: Encoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_point: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scales: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_points: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DType>,
}

impl QuantAttrs {
    /// Per-tensor attributes with a fixed scale/zero-point
    pub fn per_tensor(scale: f64, zero_point: i64, dtype: DType) -> Self {
        Self {
            encoding: Encoding::PerTensor,
            scale: Some(scale),
            zero_point: Some(zero_point),
            scales: None,
            zero_points: None,
            axis: None,
            dtype: Some(dtype),
        }
    }

    pub fn per_channel(scales: Vec<f64>, zero_points: Vec<i64>, axis: i64, dtype: DType) -> Self {
        Self {
            encoding: Encoding::PerChannel,
            scale: None,
            zero_point: None,
            scales: Some(scales),
            zero_points: Some(zero_points),
            axis: Some(axis),
            dtype: Some(dtype),
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Look up an attribute by its schema parameter name
    pub fn get(&self, name: &str) -> Option<Literal> {
        match name {
            "scale" => self.scale.map(Literal::Float),
            "zero_point" => self.zero_point.map(Literal::Int),
            "scales" => self.scales.clone().map(Literal::Floats),
            "zero_points" => self.zero_points.clone().map(Literal::Ints),
            "axis" => self.axis.map(Literal::Int),
            "dtype" => self.dtype.map(Literal::DType),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_by_schema_name() {
        let attrs = QuantAttrs::per_tensor(0.5, 3, DType::Int8);
        assert_eq!(attrs.get("scale"), Some(Literal::Float(0.5)));
        assert_eq!(attrs.get("zero_point"), Some(Literal::Int(3)));
        assert_eq!(attrs.get("dtype"), Some(Literal::DType(DType::Int8)));
        assert_eq!(attrs.get("axis"), None);
        assert_eq!(attrs.get("quant_min"), None);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let json = r#"{"encoding":"per_tensor","scale":1.0,"foo":1}"#;
        assert!(serde_json::from_str::<QuantAttrs>(json).is_err());
    }

    #[test]
    fn test_encoding_names() {
        let attrs: QuantAttrs =
            serde_json::from_str(r#"{"encoding":"per_channel_group"}"#).unwrap();
        assert_eq!(attrs.encoding, Encoding::PerChannelGroup);
        assert_eq!(attrs.encoding.to_string(), "per_channel_group");
    }
}
