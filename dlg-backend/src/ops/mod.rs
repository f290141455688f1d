//! Built-in operator lowering routines

mod elementwise;
mod helpers;
mod nn;
mod quant;
mod shape;

use crate::registry::RegistryBuilder;
use dlg_common::LowerResult;

pub use dlg_passes::schema::{
    DEQUANTIZE_PER_CHANNEL, DEQUANTIZE_PER_TENSOR, DEQUANTIZE_PER_TENSOR_TENSOR, QUANTIZE_PER_CHANNEL,
    QUANTIZE_PER_TENSOR, QUANTIZE_PER_TENSOR_TENSOR,
};
pub use elementwise::{lower_add, lower_mul, lower_relu};
pub use nn::{lower_linear, lower_softmax};
pub use quant::{
    lower_dequantize_per_channel, lower_dequantize_per_tensor, lower_quantize_per_channel,
    lower_quantize_per_tensor,
};
pub use shape::{lower_permute_copy, lower_view_copy};

pub const PERMUTE_COPY: &str = "aten.permute_copy.default";
pub const VIEW_COPY: &str = "aten.view_copy.default";
pub const ADD: &str = "aten.add.Tensor";
pub const MUL: &str = "aten.mul.Tensor";
pub const RELU: &str = "aten.relu.default";
pub const SOFTMAX: &str = "aten._softmax.default";
pub const LINEAR: &str = "aten.linear.default";

pub fn register_builtins(builder: &mut RegistryBuilder) -> LowerResult<()> {
    builder
        .register(PERMUTE_COPY, lower_permute_copy)?
        .register(VIEW_COPY, lower_view_copy)?
        .register(ADD, lower_add)?
        .register(MUL, lower_mul)?
        .register(RELU, lower_relu)?
        .register(SOFTMAX, lower_softmax)?
        .register(LINEAR, lower_linear)?
        .register(QUANTIZE_PER_TENSOR, lower_quantize_per_tensor)?
        .register(QUANTIZE_PER_TENSOR_TENSOR, lower_quantize_per_tensor)?
        .register(DEQUANTIZE_PER_TENSOR, lower_dequantize_per_tensor)?
        .register(DEQUANTIZE_PER_TENSOR_TENSOR, lower_dequantize_per_tensor)?
        .register(QUANTIZE_PER_CHANNEL, lower_quantize_per_channel)?
        .register(DEQUANTIZE_PER_CHANNEL, lower_dequantize_per_channel)?;
    Ok(())
}
