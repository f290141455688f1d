//! Delegate Graph Lowering - Upstream Graph Model
//!
//! This crate defines the dataflow graph handed to the lowering core by the
//! upstream exporter, and the oracle interface used to classify constants.
//!
//! ## Architecture
//!
//! - `node` - Node, role tags, arguments and fixed-schema metadata
//! - `graph` - Ordered node container and its builder
//! - `oracle` - Constant classification
//! - `program` - JSON interchange (graph + signature)

pub use self::node::{Arg, Node, NodeMeta, NodeRole};
pub use self::graph::{lit, Graph, GraphBuilder};
pub use self::oracle::{Classification, ConstantOracle, ExportSignature};
pub use self::program::Program;

mod node;
mod graph;
mod oracle;
mod program;
