//! Delegate Graph Lowering - Graph Rewrite Passes
//!
//! Graph-to-graph passes applied before lowering.
//!
//! ## Architecture
//!
//! - `pass` - Pass trait, result and manager
//! - `insert_io_qdq` - Quantize/dequantize insertion at the graph boundary
//! - `schema` - Quantize/dequantize operator kinds and parameter schemas
//! - `qdq` - Reference quantization arithmetic

pub mod insert_io_qdq;
pub mod pass;
pub mod qdq;
pub mod schema;

pub use insert_io_qdq::{insert_io_qdq, InsertIoQdq};
pub use pass::{GraphPass, PassManager, PassResult};
pub use schema::QdqSchema;
