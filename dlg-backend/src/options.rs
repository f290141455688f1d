//! Lowering options

use dlg_common::DType;
use serde::{Deserialize, Serialize};

/// Options for lowering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoweringOptions {
    /// Version tag written into the lowered graph
    pub version: String,
    /// Value dtypes the target runtime accepts; `None` accepts all
    pub dtypes: Option<Vec<DType>>,
    /// Run the quantization boundary pass before lowering a program
    pub insert_io_qdq: bool,
}

impl Default for LoweringOptions {
    fn default() -> Self {
        Self {
            version: "0".to_string(),
            dtypes: None,
            insert_io_qdq: false,
        }
    }
}

impl LoweringOptions {
    pub fn supports(&self, dtype: DType) -> bool {
        self.dtypes.as_ref().map_or(true, |allowed| allowed.contains(&dtype))
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let opts = LoweringOptions::from_json(r#"{"dtypes": ["float32"]}"#).unwrap();
        assert_eq!(opts.version, "0");
        assert!(opts.supports(DType::Float32));
        assert!(!opts.supports(DType::Int8));
        assert!(!opts.insert_io_qdq);
        assert!(LoweringOptions::default().supports(DType::Int64));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(LoweringOptions::from_json(r#"{"bank_size": 4096}"#).is_err());
    }
}
