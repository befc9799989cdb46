//! Error types

use crate::ast::NodeId;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, RefineError>;

/// Fatal pipeline error.
///
/// Everything here means an invariant was broken (by the lowering stage or
/// by a pass) and the simplification stage cannot continue. Conditions the
/// pipeline absorbs, such as an unprovable query or a solver timeout, are
/// not represented here.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("{pass}: no provenance for node {node}")]
    MissingProvenance { pass: String, node: NodeId },

    #[error("substitution for node {node} proposed twice")]
    DuplicateSubstitution { node: NodeId },

    #[error("substitution target {node} is not a statement of the tree")]
    UnknownSubstitutionTarget { node: NodeId },

    #[error("substitution target {node} also appears inside another replacement")]
    ReentrantSubstitution { node: NodeId },

    #[error("node id {node} is used by more than one node")]
    DuplicateNodeId { node: NodeId },

    #[error("{pass}: no node ids left to allocate")]
    IdSpaceExhausted { pass: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },
}

impl RefineError {
    pub fn missing_provenance(pass: impl Into<String>, node: NodeId) -> Self {
        Self::MissingProvenance {
            pass: pass.into(),
            node,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Node the error is about, if any
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::MissingProvenance { node, .. }
            | Self::DuplicateSubstitution { node }
            | Self::UnknownSubstitutionTarget { node }
            | Self::ReentrantSubstitution { node }
            | Self::DuplicateNodeId { node } => Some(*node),
            Self::IdSpaceExhausted { .. } | Self::Config { .. } | Self::Io { .. } | Self::Parse { .. } => None,
        }
    }
}

impl From<std::io::Error> for RefineError {
    fn from(e: std::io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for RefineError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse_error(e.to_string())
    }
}

impl From<toml::de::Error> for RefineError {
    fn from(e: toml::de::Error) -> Self {
        Self::config(e.to_string())
    }
}
