//! Graph-to-graph pass interface
//!
//! Passes never mutate their input. Each one builds a new [`Graph`] and
//! reports whether anything changed, so a failed pass leaves the caller's
//! graph exactly as it was.

use dlg_common::LowerResult;
use dlg_graph::{ConstantOracle, Graph};
use log::{debug, info};

/// Output of a pass run
#[derive(Debug, Clone, PartialEq)]
pub struct PassResult {
    pub graph: Graph,
    /// Whether the pass changed the graph
    pub modified: bool,
}

pub trait GraphPass: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, graph: &Graph, oracle: &dyn ConstantOracle) -> LowerResult<PassResult>;
}

/// Runs passes in insertion order, feeding each the previous result
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn GraphPass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, pass: impl GraphPass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn run(&self, graph: &Graph, oracle: &dyn ConstantOracle) -> LowerResult<PassResult> {
        let mut current = PassResult {
            graph: graph.clone(),
            modified: false,
        };
        for pass in &self.passes {
            let result = pass.run(&current.graph, oracle)?;
            debug!("PassManager: {} modified={}", pass.name(), result.modified);
            current = PassResult {
                graph: result.graph,
                modified: current.modified || result.modified,
            };
        }
        info!(
            "PassManager: ran {} passes, graph {}",
            self.passes.len(),
            if current.modified { "modified" } else { "unchanged" }
        );
        Ok(current)
    }
}
