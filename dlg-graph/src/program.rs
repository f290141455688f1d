//! Program interchange
//!
//! A program bundles the graph with the signature the classification oracle
//! needs. This is the JSON form the `dlgc` driver reads and writes.

use crate::graph::Graph;
use crate::oracle::ExportSignature;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub graph: Graph,
    #[serde(default)]
    pub signature: ExportSignature,
}

impl Program {
    pub fn new(graph: Graph, signature: ExportSignature) -> Self {
        Self { graph, signature }
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
