//! Reference quantization arithmetic
//!
//! The numeric meaning of the quantize/dequantize nodes the boundary pass
//! inserts. Delegates are expected to match these results; the functions are
//! used to check round-trip tolerances against an unlowered reference.

use dlg_common::{checked_numel, DType, LowerResult, LoweringError};

fn range(dtype: DType) -> LowerResult<(i64, i64)> {
    dtype
        .quant_range()
        .ok_or_else(|| LoweringError::configuration(format!("{} is not a quantized dtype", dtype)))
}

/// `clamp(round_half_even(x / scale) + zero_point, qmin, qmax)`
pub fn quantize(x: f64, scale: f64, zero_point: i64, dtype: DType) -> LowerResult<i64> {
    let (qmin, qmax) = range(dtype)?;
    // the cast saturates, so out-of-range inputs land on the clamp bounds
    let q = ((x / scale).round_ties_even() as i64).saturating_add(zero_point);
    Ok(q.clamp(qmin, qmax))
}

/// `(q - zero_point) * scale`
pub fn dequantize(q: i64, scale: f64, zero_point: i64) -> f64 {
    (q - zero_point) as f64 * scale
}

/// Logical values exactly representable at the ends of the quantized range
pub fn representable_range(scale: f64, zero_point: i64, dtype: DType) -> LowerResult<(f64, f64)> {
    let (qmin, qmax) = range(dtype)?;
    Ok((dequantize(qmin, scale, zero_point), dequantize(qmax, scale, zero_point)))
}

/// Channel of each flat element when slicing `dims` along `axis`
fn channel_of(dims: &[usize], axis: usize) -> impl Fn(usize) -> usize {
    let inner = dims[axis + 1..].iter().fold(1usize, |acc, &d| acc.saturating_mul(d));
    let channels = dims[axis];
    move |i| (i / inner) % channels
}

fn check_channels(len: usize, dims: &[usize], axis: usize, scales: &[f64], zero_points: &[i64]) -> LowerResult<()> {
    if checked_numel(dims) != Some(len) {
        return Err(LoweringError::configuration(format!(
            "{} elements do not fill dims {:?}",
            len, dims
        )));
    }
    if axis >= dims.len() {
        return Err(LoweringError::configuration(format!(
            "axis {} is out of range for dims {:?}",
            axis, dims
        )));
    }
    if scales.len() != dims[axis] || zero_points.len() != dims[axis] {
        return Err(LoweringError::configuration(format!(
            "{} scales and {} zero points for {} channels",
            scales.len(),
            zero_points.len(),
            dims[axis]
        )));
    }
    Ok(())
}

/// Quantize a row-major tensor with one scale/zero point per slice along `axis`
pub fn quantize_per_channel(
    data: &[f64],
    dims: &[usize],
    axis: usize,
    scales: &[f64],
    zero_points: &[i64],
    dtype: DType,
) -> LowerResult<Vec<i64>> {
    check_channels(data.len(), dims, axis, scales, zero_points)?;
    let channel = channel_of(dims, axis);
    data.iter()
        .enumerate()
        .map(|(i, &x)| {
            let c = channel(i);
            quantize(x, scales[c], zero_points[c], dtype)
        })
        .collect()
}

pub fn dequantize_per_channel(
    data: &[i64],
    dims: &[usize],
    axis: usize,
    scales: &[f64],
    zero_points: &[i64],
) -> LowerResult<Vec<f64>> {
    check_channels(data.len(), dims, axis, scales, zero_points)?;
    let channel = channel_of(dims, axis);
    Ok(data
        .iter()
        .enumerate()
        .map(|(i, &q)| {
            let c = channel(i);
            dequantize(q, scales[c], zero_points[c])
        })
        .collect())
}
