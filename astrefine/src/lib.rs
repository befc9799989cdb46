//! astrefine
//!
//! Structural simplification of decompiled C-like syntax trees: dead
//! statement elimination, loop condition recovery and SMT-backed fusion of
//! `if` chains, driven to a fixed point.

pub mod ast;
pub mod error;
pub mod lowered;
pub mod pass;
pub mod provenance;
pub mod refine;
pub mod smt;

pub use ast::{NodeId, Stmt, Tree};
pub use error::{RefineError, Result};
pub use lowered::LoweredFunction;
pub use pass::{PassPipeline, PipelineConfig, PipelineStats};
