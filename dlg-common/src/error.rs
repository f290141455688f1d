//! Error handling for the lowering pipeline
//!
//! Every failure is fatal to the lowering call that raised it. Lowering is a
//! deterministic function of its input, so nothing is retried internally; the
//! "unsupported" family is structured so a caller can pick a different
//! partitioning and try again.

use crate::types::DType;
use thiserror::Error;

/// Main error type shared by every stage of the pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoweringError {
    #[error("Topology violation: value of `{node}` was used before it was produced")]
    TopologyViolation { node: String },

    #[error("Unsupported operator: {kind}")]
    UnsupportedOperator { kind: String },

    #[error("Unsupported node role `{role}` on `{node}`")]
    UnsupportedNodeRole { node: String, role: String },

    #[error("Unsupported quantization encoding: {kind}")]
    UnsupportedEncoding { kind: String },

    #[error("Unsupported dtype {dtype} for `{node}`")]
    UnsupportedDtype { node: String, dtype: DType },

    #[error("Invalid operator `{node}`: {constraint}")]
    OperatorValidation { node: String, constraint: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Node `{node}` declares no output spec")]
    MissingOutputSpec { node: String },

    #[error("Values for `{node}` were already allocated")]
    AlreadyAllocated { node: String },

    #[error("Invalid graph: {message}")]
    InvalidGraph { message: String },
}

/// Result type alias for lowering operations
pub type LowerResult<T> = Result<T, LoweringError>;

impl LoweringError {
    /// Create an operator validation error
    pub fn validation(node: impl Into<String>, constraint: impl Into<String>) -> Self {
        LoweringError::OperatorValidation {
            node: node.into(),
            constraint: constraint.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        LoweringError::Configuration { message: message.into() }
    }

    pub fn topology(node: impl Into<String>) -> Self {
        LoweringError::TopologyViolation { node: node.into() }
    }

    pub fn invalid_graph(message: impl Into<String>) -> Self {
        LoweringError::InvalidGraph { message: message.into() }
    }

    /// True for errors meaning "no handler for this kind", where the caller
    /// may retry with a different partitioning of the graph
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            LoweringError::UnsupportedOperator { .. }
                | LoweringError::UnsupportedNodeRole { .. }
                | LoweringError::UnsupportedEncoding { .. }
                | LoweringError::UnsupportedDtype { .. }
        )
    }
}
