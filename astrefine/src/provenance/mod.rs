//! Provenance: which IR construct each tree node was lowered from
//!
//! The map is produced by the lowering stage together with the tree and is
//! read-only for the refinement pipeline. Passes that reason about a node
//! look its origin up with [`Provenance::require`]; a missing entry means
//! lowering broke its contract and aborts the pipeline.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::NodeId;
use crate::error::{RefineError, Result};

/// Kind of IR instruction a node originates from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrOpcode {
    Br,
    Switch,
    ICmp,
    Call,
    Load,
    Store,
    Phi,
    Other(String),
}

/// Originating IR value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrValue {
    /// IR name, e.g. `%12` or `@g`
    pub name: String,
    pub opcode: IrOpcode,
}

impl IrValue {
    pub fn new(name: impl Into<String>, opcode: IrOpcode) -> Self {
        Self {
            name: name.into(),
            opcode,
        }
    }
}

impl std::fmt::Display for IrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.opcode {
            IrOpcode::Other(op) => write!(f, "{} ({})", self.name, op),
            op => write!(f, "{} ({:?})", self.name, op),
        }
    }
}

/// Node-to-IR association. Many nodes may share one IR value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Provenance {
    entries: HashMap<NodeId, IrValue>,
}

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: NodeId, value: IrValue) {
        self.entries.insert(node, value);
    }

    pub(crate) fn remove(&mut self, node: NodeId) {
        self.entries.remove(&node);
    }

    pub fn get(&self, node: NodeId) -> Option<&IrValue> {
        self.entries.get(&node)
    }

    /// Look up a node a pass must reason about
    pub fn require(&self, pass: &str, node: NodeId) -> Result<&IrValue> {
        self.get(node).ok_or_else(|| RefineError::missing_provenance(pass, node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(NodeId, IrValue)> for Provenance {
    fn from_iter<I: IntoIterator<Item = (NodeId, IrValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
