//! Constant pool
//!
//! Append-only store of constant payloads. Entries are deduplicated by node
//! identity only: the driver lowers each node once, so each constant node
//! appends exactly once, and two nodes with equal payloads get two entries.

use dlg_common::{ConstantId, LowerResult, LoweringError, TensorData};
use log::trace;

#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<TensorData>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload and return its 0-based index
    pub fn append(&mut self, payload: TensorData) -> LowerResult<ConstantId> {
        let expected = payload.expected_len().ok_or_else(|| {
            LoweringError::configuration(format!(
                "constant payload size {} x {:?} overflows",
                payload.dtype, payload.dims
            ))
        })?;
        if payload.bytes.len() != expected {
            return Err(LoweringError::configuration(format!(
                "constant payload has {} bytes, {} x {:?} needs {}",
                payload.bytes.len(),
                payload.dtype,
                payload.dims,
                expected
            )));
        }
        let index = self.entries.len() as ConstantId;
        trace!("ConstantPool: append #{} ({} bytes)", index, payload.bytes.len());
        self.entries.push(payload);
        Ok(index)
    }

    pub fn get(&self, index: ConstantId) -> Option<&TensorData> {
        self.entries.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<TensorData> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlg_common::DType;

    #[test]
    fn test_equal_payloads_get_distinct_indices() {
        let mut pool = ConstantPool::new();
        let data = TensorData::from_f32(vec![2], &[1.0, 2.0]);
        assert_eq!(pool.append(data.clone()).unwrap(), 0);
        assert_eq!(pool.append(data.clone()).unwrap(), 1);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(1), Some(&data));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut pool = ConstantPool::new();
        let bad = TensorData::new(DType::Float32, vec![2], vec![0; 7]);
        assert!(matches!(pool.append(bad), Err(LoweringError::Configuration { .. })));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_overflowing_dims_rejected() {
        let mut pool = ConstantPool::new();
        let bad = TensorData::new(DType::Float32, vec![usize::MAX, 2], vec![0; 4]);
        let err = pool.append(bad).unwrap_err();
        assert!(matches!(err, LoweringError::Configuration { .. }));
        assert!(err.to_string().contains("overflows"));
        assert!(pool.is_empty());
    }
}
