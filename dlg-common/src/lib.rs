//! Delegate Graph Lowering - Common Types and Utilities
//!
//! This crate contains shared types, error definitions, and quantization
//! metadata used across all components of the delegate lowering pipeline.

pub mod error;
pub mod types;
pub mod quant;

pub use error::{LoweringError, LowerResult};
pub use types::*;
pub use quant::{Encoding, QuantAttrs};
