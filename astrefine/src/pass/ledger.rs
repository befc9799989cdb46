//! Substitution ledger
//!
//! Proposed rewrites are collected while a pass walks the tree and applied
//! afterwards in one step. Application is all-or-nothing with respect to
//! validation: a ledger that breaks an invariant is rejected before the
//! tree is touched.

use std::collections::{HashMap, HashSet};

use crate::ast::{NodeId, Stmt, StmtKind, STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::error::{RefineError, Result};

/// Proposed fate of a statement
#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    /// Put this detached subtree in the statement's place
    Replace(Stmt),
    /// Drop the statement from its block, or leave `;` where a statement is required
    Remove,
}

/// Ledger of one pass invocation, keyed by the id of the statement to rewrite
#[derive(Debug, Default)]
pub struct Substitutions {
    entries: HashMap<NodeId, Substitution>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a substitution; each statement may be targeted once
    pub fn insert(&mut self, node: NodeId, sub: Substitution) -> Result<()> {
        if self.entries.contains_key(&node) {
            return Err(RefineError::DuplicateSubstitution { node });
        }
        self.entries.insert(node, sub);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the ledger against the tree it is about to rewrite.
    ///
    /// Every key must name a statement of the tree that is not inside the
    /// original subtree of another key, and no key may occur inside a
    /// replacement (a replacement may keep its own key's id at its root).
    pub fn validate(&self, root: &Stmt) -> Result<()> {
        let mut in_replacements = HashSet::new();
        for (key, sub) in &self.entries {
            if let Substitution::Replace(stmt) = sub {
                let mut ids = Vec::new();
                stmt.collect_ids(&mut ids);
                // Pre-order: the first id is the replacement's root
                let skip = usize::from(stmt.id == *key);
                in_replacements.extend(ids.into_iter().skip(skip));
            }
        }
        let mut keys: Vec<NodeId> = self.entries.keys().copied().collect();
        keys.sort();
        if let Some(node) = keys.iter().find(|k| in_replacements.contains(*k)) {
            return Err(RefineError::ReentrantSubstitution { node: *node });
        }

        let mut found = HashSet::new();
        self.find_targets(root, &mut found);
        if let Some(node) = keys.iter().find(|k| !found.contains(*k)) {
            return Err(RefineError::UnknownSubstitutionTarget { node: *node });
        }
        Ok(())
    }

    fn find_targets(&self, stmt: &Stmt, found: &mut HashSet<NodeId>) {
        if self.entries.contains_key(&stmt.id) {
            found.insert(stmt.id);
            // Keys below a rewritten node would never be reached
            return;
        }
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            for child in stmt.child_stmts() {
                self.find_targets(child, found);
            }
        })
    }

    /// Validate, then rewrite `root` in place. Returns the number of
    /// substitutions applied.
    pub fn apply(mut self, root: &mut Stmt) -> Result<usize> {
        if self.entries.is_empty() {
            return Ok(0);
        }
        self.validate(root)?;
        let count = self.entries.len();
        self.apply_slot(root);
        debug_assert!(self.entries.is_empty());
        Ok(count)
    }

    /// Rewrite a slot that must keep holding a statement
    fn apply_slot(&mut self, slot: &mut Stmt) {
        match self.entries.remove(&slot.id) {
            Some(Substitution::Replace(new)) => *slot = new,
            Some(Substitution::Remove) => *slot = Stmt::null(slot.id),
            None => self.apply_children(slot),
        }
    }

    fn apply_children(&mut self, stmt: &mut Stmt) {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || match &mut stmt.kind {
            StmtKind::Compound(body) => {
                let old = std::mem::take(body);
                for mut child in old {
                    match self.entries.remove(&child.id) {
                        Some(Substitution::Replace(new)) => body.push(new),
                        Some(Substitution::Remove) => {}
                        None => {
                            self.apply_children(&mut child);
                            body.push(child);
                        }
                    }
                }
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.apply_slot(then_branch);
                if let Some(e) = else_branch {
                    self.apply_slot(e);
                }
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => self.apply_slot(body),
            _ => {}
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstBuilder;

    /// { a(); { b(); } c(); } with handles on the interesting ids
    fn sample(b: &mut AstBuilder) -> (Stmt, NodeId, NodeId, NodeId) {
        let a = b.call_stmt("a");
        let bb = b.call_stmt("b");
        let b_id = bb.id;
        let inner = b.compound(vec![bb]);
        let inner_id = inner.id;
        let c = b.call_stmt("c");
        let c_id = c.id;
        (b.compound(vec![a, inner, c]), inner_id, b_id, c_id)
    }

    #[test]
    fn test_replace_and_remove_in_block() {
        let mut b = AstBuilder::new();
        let (mut root, inner_id, _, c_id) = sample(&mut b);
        let d = b.call_stmt("d");

        let mut ledger = Substitutions::new();
        ledger.insert(inner_id, Substitution::Replace(d)).unwrap();
        ledger.insert(c_id, Substitution::Remove).unwrap();
        assert_eq!(ledger.apply(&mut root).unwrap(), 2);

        assert_eq!(root.to_string(), "{\n    a();\n    d();\n}\n");
    }

    #[test]
    fn test_remove_in_required_slot_leaves_null() {
        let mut b = AstBuilder::new();
        let body = b.call_stmt("work");
        let body_id = body.id;
        let c = b.eq_u32("x", 0);
        let mut stmt = b.if_stmt(c, body, None);

        let mut ledger = Substitutions::new();
        ledger.insert(body_id, Substitution::Remove).unwrap();
        ledger.apply(&mut stmt).unwrap();
        assert_eq!(stmt.to_string(), "if (x == 0U)\n    ;\n");
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut ledger = Substitutions::new();
        ledger.insert(NodeId(3), Substitution::Remove).unwrap();
        let err = ledger.insert(NodeId(3), Substitution::Remove).unwrap_err();
        assert!(matches!(err, RefineError::DuplicateSubstitution { node: NodeId(3) }));
    }

    #[test]
    fn test_unknown_target_rejected_before_mutation() {
        let mut b = AstBuilder::new();
        let (mut root, _, _, c_id) = sample(&mut b);
        let before = root.clone();

        let mut ledger = Substitutions::new();
        ledger.insert(c_id, Substitution::Remove).unwrap();
        ledger.insert(NodeId(999), Substitution::Remove).unwrap();
        let err = ledger.apply(&mut root).unwrap_err();
        assert!(matches!(err, RefineError::UnknownSubstitutionTarget { node: NodeId(999) }));
        assert_eq!(root, before);
    }

    #[test]
    fn test_shadowed_key_is_unknown() {
        let mut b = AstBuilder::new();
        let (mut root, inner_id, b_id, _) = sample(&mut b);

        let mut ledger = Substitutions::new();
        ledger.insert(inner_id, Substitution::Remove).unwrap();
        ledger.insert(b_id, Substitution::Remove).unwrap();
        let err = ledger.apply(&mut root).unwrap_err();
        assert!(matches!(err, RefineError::UnknownSubstitutionTarget { .. }));
    }

    #[test]
    fn test_key_inside_other_replacement_rejected() {
        let mut b = AstBuilder::new();
        let (mut root, inner_id, _, c_id) = sample(&mut b);

        // Replace the inner block by a block that moves `c();` into it,
        // while also proposing to remove `c();`
        let moved = match &root.kind {
            StmtKind::Compound(body) => body[2].clone(),
            _ => unreachable!(),
        };
        let new_inner = Stmt::new(inner_id, StmtKind::Compound(vec![moved]));
        let mut ledger = Substitutions::new();
        ledger.insert(inner_id, Substitution::Replace(new_inner)).unwrap();
        ledger.insert(c_id, Substitution::Remove).unwrap();
        let err = ledger.apply(&mut root).unwrap_err();
        assert!(matches!(err, RefineError::ReentrantSubstitution { node } if node == c_id));
    }

    #[test]
    fn test_replacement_may_keep_its_own_id() {
        let mut b = AstBuilder::new();
        let (mut root, inner_id, _, _) = sample(&mut b);
        let e = b.call_stmt("e");
        let new_inner = Stmt::new(inner_id, StmtKind::Compound(vec![e]));

        let mut ledger = Substitutions::new();
        ledger.insert(inner_id, Substitution::Replace(new_inner)).unwrap();
        assert_eq!(ledger.apply(&mut root).unwrap(), 1);
        assert!(root.to_string().contains("e();"));
    }

    #[test]
    fn test_empty_ledger_is_noop() {
        let mut b = AstBuilder::new();
        let (mut root, _, _, _) = sample(&mut b);
        let before = root.clone();
        assert_eq!(Substitutions::new().apply(&mut root).unwrap(), 0);
        assert_eq!(root, before);
    }
}
