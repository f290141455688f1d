//! Quantize / dequantize operator schemas
//!
//! Fixed tables mapping an encoding kind to the operator that encodes or
//! decodes it, and that operator's parameter list after the value operand.
//! The boundary pass fills the parameters from a node's [`QuantAttrs`] in
//! exactly this order.

use dlg_common::{Encoding, Literal, LowerResult, LoweringError, QuantAttrs};

pub const QUANTIZE_PER_TENSOR: &str = "quantized_decomposed.quantize_per_tensor.default";
pub const QUANTIZE_PER_TENSOR_TENSOR: &str = "quantized_decomposed.quantize_per_tensor.tensor";
pub const QUANTIZE_PER_CHANNEL: &str = "quantized_decomposed.quantize_per_channel.default";
pub const DEQUANTIZE_PER_TENSOR: &str = "quantized_decomposed.dequantize_per_tensor.default";
pub const DEQUANTIZE_PER_TENSOR_TENSOR: &str = "quantized_decomposed.dequantize_per_tensor.tensor";
pub const DEQUANTIZE_PER_CHANNEL: &str = "quantized_decomposed.dequantize_per_channel.default";

/// One schema parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    /// Passed as a one-element tensor rather than a scalar
    pub tensor: bool,
}

const fn scalar(name: &'static str) -> Param {
    Param { name, tensor: false }
}

const fn tensor(name: &'static str) -> Param {
    Param { name, tensor: true }
}

const PER_TENSOR: &[Param] = &[scalar("scale"), scalar("zero_point"), scalar("dtype")];
const PER_TENSOR_TENSOR: &[Param] = &[tensor("scale"), tensor("zero_point"), scalar("dtype")];
const PER_CHANNEL: &[Param] = &[scalar("scales"), scalar("zero_points"), scalar("axis"), scalar("dtype")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QdqSchema {
    pub target: &'static str,
    pub params: &'static [Param],
}

impl QdqSchema {
    /// Encoding step for `encoding`
    pub fn encode(encoding: Encoding) -> LowerResult<Self> {
        let (target, params) = match encoding {
            Encoding::PerTensor => (QUANTIZE_PER_TENSOR, PER_TENSOR),
            Encoding::PerTensorTensor => (QUANTIZE_PER_TENSOR_TENSOR, PER_TENSOR_TENSOR),
            Encoding::PerChannel => (QUANTIZE_PER_CHANNEL, PER_CHANNEL),
            other => return Err(unsupported(other)),
        };
        Ok(Self { target, params })
    }

    /// Decoding step for `encoding`; both per-tensor kinds decode through
    /// the tensor overload
    pub fn decode(encoding: Encoding) -> LowerResult<Self> {
        let (target, params) = match encoding {
            Encoding::PerTensor | Encoding::PerTensorTensor => (DEQUANTIZE_PER_TENSOR_TENSOR, PER_TENSOR_TENSOR),
            Encoding::PerChannel => (DEQUANTIZE_PER_CHANNEL, PER_CHANNEL),
            other => return Err(unsupported(other)),
        };
        Ok(Self { target, params })
    }

    /// Operator parameters taken from `attrs`, in schema order
    pub fn params_from(&self, attrs: &QuantAttrs, node: &str) -> LowerResult<Vec<Literal>> {
        self.params
            .iter()
            .map(|param| {
                let value = attrs.get(param.name).ok_or_else(|| {
                    LoweringError::configuration(format!(
                        "`{}` has no quantization attribute `{}` required by {}",
                        node, param.name, self.target
                    ))
                })?;
                Ok(if param.tensor { as_tensor(value) } else { value })
            })
            .collect()
    }
}

fn unsupported(encoding: Encoding) -> LoweringError {
    LoweringError::UnsupportedEncoding { kind: encoding.to_string() }
}

fn as_tensor(value: Literal) -> Literal {
    match value {
        Literal::Float(v) => Literal::Floats(vec![v]),
        Literal::Int(v) => Literal::Ints(vec![v]),
        other => other,
    }
}
