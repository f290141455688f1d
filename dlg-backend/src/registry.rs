//! Node lowering registry
//!
//! Maps operator kinds to lowering routines. The registry is populated once
//! through [`RegistryBuilder`] and is immutable afterwards, so a single
//! registry can serve any number of independent lowering calls.
//!
//! A routine must, for its node:
//! - resolve every input through the context (never minting ids for inputs),
//! - request ids for the node's own outputs,
//! - validate operator arguments, failing with `OperatorValidation`,
//! - return a [`LoweredOp`] holding only value ids and literal parameters.

use crate::context::LowerCtx;
use crate::lowered::LoweredOp;
use dlg_common::{LowerResult, LoweringError};
use dlg_graph::Node;
use log::debug;
use std::collections::BTreeMap;

pub trait NodeLowering: Send + Sync {
    fn lower(&self, node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp>;
}

impl<F> NodeLowering for F
where
    F: Fn(&Node, &mut LowerCtx<'_>) -> LowerResult<LoweredOp> + Send + Sync,
{
    fn lower(&self, node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
        self(node, ctx)
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    routines: BTreeMap<String, Box<dyn NodeLowering>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `kind` with a routine; a kind can be registered only once
    pub fn register(&mut self, kind: &str, routine: impl NodeLowering + 'static) -> LowerResult<&mut Self> {
        if self.routines.contains_key(kind) {
            return Err(LoweringError::configuration(format!(
                "operator `{}` registered twice",
                kind
            )));
        }
        self.routines.insert(kind.to_string(), Box::new(routine));
        Ok(self)
    }

    /// Register the built-in operator routines
    pub fn with_builtins(mut self) -> LowerResult<Self> {
        crate::ops::register_builtins(&mut self)?;
        Ok(self)
    }

    pub fn build(self) -> Registry {
        Registry { routines: self.routines }
    }
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.routines.keys()).finish()
    }
}

pub struct Registry {
    routines: BTreeMap<String, Box<dyn NodeLowering>>,
}

impl Registry {
    /// Registry holding only the built-in routines
    pub fn with_builtins() -> LowerResult<Self> {
        Ok(RegistryBuilder::new().with_builtins()?.build())
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.routines.contains_key(kind)
    }

    /// Registered kinds in sorted order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.routines.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    /// Lower `node` with the routine registered for its target.
    ///
    /// The lookup happens before the routine runs, so an unsupported kind
    /// leaves the context untouched.
    pub fn dispatch(&self, node: &Node, ctx: &mut LowerCtx<'_>) -> LowerResult<LoweredOp> {
        let kind = node
            .target
            .as_deref()
            .ok_or_else(|| LoweringError::validation(&node.name, "compute node has no target"))?;
        let routine = self
            .routines
            .get(kind)
            .ok_or_else(|| LoweringError::UnsupportedOperator { kind: kind.to_string() })?;
        debug!("Registry: lowering `{}` with {}", node.name, kind);
        routine.lower(node, ctx)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.routines.keys()).finish()
    }
}
