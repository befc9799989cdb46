//! Functions as handed over by the lowering stage

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::{NodeId, Stmt, Tree};
use crate::error::{RefineError, Result};
use crate::pass::{PassPipeline, PipelineStats};
use crate::provenance::Provenance;

/// A lowered function body together with its provenance map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoweredFunction {
    pub name: String,
    pub body: Stmt,
    #[serde(default)]
    pub provenance: Provenance,
}

impl LoweredFunction {
    pub fn new(name: impl Into<String>, body: Stmt, provenance: Provenance) -> Self {
        Self {
            name: name.into(),
            body,
            provenance,
        }
    }

    /// Parse a lowered function; node ids must be unique within the body
    pub fn from_json(source: &str) -> Result<Self> {
        let func: Self = serde_json::from_str(source)?;
        func.body.check_unique_ids()?;
        Ok(func)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| RefineError::io_error(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&source)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Run `pipeline` over the body in place
    pub fn refine(&mut self, pipeline: &mut PassPipeline) -> Result<PipelineStats> {
        let body = std::mem::replace(&mut self.body, Stmt::null(NodeId(0)));
        let mut tree = Tree::new(self.name.clone(), body);
        let result = pipeline.run(&mut tree, &self.provenance);
        self.body = tree.root;
        result
    }

    pub fn tree(&self) -> Tree {
        Tree::new(self.name.clone(), self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;
    use crate::pass::PipelineConfig;

    #[test]
    fn test_json_interchange() {
        let mut b = AstBuilder::new();
        let n = b.null();
        let ret = b.ret(None);
        let body = b.compound(vec![n, ret]);
        let func = LoweredFunction::new("f", body, b.into_provenance());

        let json = func.to_json().unwrap();
        assert_eq!(LoweredFunction::from_json(&json).unwrap(), func);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = LoweredFunction::from_json("{\"name\": 3}").unwrap_err();
        assert!(matches!(err, RefineError::Parse { .. }));
    }

    #[test]
    fn test_shared_node_id_rejected_on_load() {
        let mut b = AstBuilder::new();
        let c0 = b.eq_u32("x", 0);
        let mut c1 = b.eq_u32("x", 1);
        c1.id = c0.id;
        let s0 = b.call_stmt("a");
        let s1 = b.call_stmt("b");
        let if0 = b.if_stmt(c0, s0, None);
        let if1 = b.if_stmt(c1, s1, None);
        let body = b.compound(vec![if0, if1]);
        let json = LoweredFunction::new("f", body, b.into_provenance()).to_json().unwrap();

        let err = LoweredFunction::from_json(&json).unwrap_err();
        assert!(matches!(err, RefineError::DuplicateNodeId { .. }));
    }

    #[test]
    fn test_top_id_does_not_overflow() {
        let mut b = AstBuilder::new();
        let flag = b.var("done", crate::ast::Type::Bool);
        let brk = b.break_stmt();
        let test = b.if_stmt(flag, brk, None);
        let loop_body = b.compound(vec![test]);
        let one = b.uint(1);
        let lp = b.while_stmt(one, loop_body);
        let mut body = b.compound(vec![lp]);
        body.id = NodeId(u32::MAX);
        let json = LoweredFunction::new("f", body, b.into_provenance()).to_json().unwrap();
        let mut func = LoweredFunction::from_json(&json).unwrap();

        // the refined loop needs a synthesized `!` node
        let config = PipelineConfig::new().passes(vec![crate::pass::PassKind::LoopRefine]);
        let err = func.refine(&mut PassPipeline::from_config(&config)).unwrap_err();
        assert!(matches!(err, RefineError::IdSpaceExhausted { .. }));
    }

    #[test]
    fn test_refine_in_place() {
        let mut b = AstBuilder::new();
        let n = b.null();
        let ret = b.ret(None);
        let body = b.compound(vec![n, ret]);
        let mut func = LoweredFunction::new("f", body, b.into_provenance());

        let config = PipelineConfig::new().passes(vec![crate::pass::PassKind::DeadStmtElim]);
        let stats = func.refine(&mut PassPipeline::from_config(&config)).unwrap();
        assert!(stats.converged);
        assert_eq!(func.tree().to_string(), "void f(void) {\n    return;\n}\n");
    }
}
