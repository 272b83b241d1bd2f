//! Precondition combinators
//!
//! A precondition is a single cheap, read-only scan that decides whether a
//! rule's rewrite traversal is worth running at all. Most rules fire on a
//! small fraction of inputs, so the scheduler consults preconditions before
//! every rewrite; `check` packages the same gate as a standalone rule
//! wrapper. Combinators short-circuit: `all` stops at the first miss, `any`
//! at the first hit.

use std::sync::Arc;

use revisor_core::{scan, Node, Scan, Tree};

use crate::rule::Rule;
use crate::scheduler::RuleContext;

/// Cheap read-only predicate over a whole tree.
pub trait Precondition: Send + Sync {
    /// One linear scan; `true` marks the tree as worth rewriting.
    fn holds(&self, tree: &Tree) -> bool;
}

struct FindScan<'p> {
    pred: &'p (dyn Fn(&Node) -> bool + Send + Sync),
    found: bool,
}

impl Scan for FindScan<'_> {
    fn visit(&mut self, node: &Node) -> bool {
        if (self.pred)(node) {
            self.found = true;
            return false;
        }
        true
    }
}

struct NodeScan<F> {
    pred: F,
}

impl<F> Precondition for NodeScan<F>
where
    F: Fn(&Node) -> bool + Send + Sync,
{
    fn holds(&self, tree: &Tree) -> bool {
        let mut finder = FindScan {
            pred: &self.pred,
            found: false,
        };
        scan(tree.root(), &mut finder);
        finder.found
    }
}

/// Precondition that holds when any node satisfies `pred`. Stops scanning
/// at the first hit.
pub fn node_scan(pred: impl Fn(&Node) -> bool + Send + Sync + 'static) -> Arc<dyn Precondition> {
    Arc::new(NodeScan { pred })
}

struct All(Vec<Arc<dyn Precondition>>);

impl Precondition for All {
    fn holds(&self, tree: &Tree) -> bool {
        self.0.iter().all(|p| p.holds(tree))
    }
}

struct Any(Vec<Arc<dyn Precondition>>);

impl Precondition for Any {
    fn holds(&self, tree: &Tree) -> bool {
        self.0.iter().any(|p| p.holds(tree))
    }
}

struct Not(Arc<dyn Precondition>);

impl Precondition for Not {
    fn holds(&self, tree: &Tree) -> bool {
        !self.0.holds(tree)
    }
}

/// Conjunction, short-circuiting at the first unmatched precondition.
pub fn all(preconditions: Vec<Arc<dyn Precondition>>) -> Arc<dyn Precondition> {
    Arc::new(All(preconditions))
}

/// Disjunction, short-circuiting at the first matched precondition.
pub fn any(preconditions: Vec<Arc<dyn Precondition>>) -> Arc<dyn Precondition> {
    Arc::new(Any(preconditions))
}

pub fn not(precondition: Arc<dyn Precondition>) -> Arc<dyn Precondition> {
    Arc::new(Not(precondition))
}

struct Checked {
    precondition: Arc<dyn Precondition>,
    rule: Arc<dyn Rule>,
}

impl Rule for Checked {
    fn name(&self) -> &'static str {
        self.rule.name()
    }

    fn description(&self) -> &'static str {
        self.rule.description()
    }

    fn effort(&self) -> crate::rule::Effort {
        self.rule.effort()
    }

    fn tags(&self) -> &'static [&'static str] {
        self.rule.tags()
    }

    fn rewrite(&self, tree: &Tree, ctx: &mut RuleContext) -> Tree {
        if !self.precondition.holds(tree) {
            return tree.clone();
        }
        self.rule.rewrite(tree, ctx)
    }
}

/// Gate `rule` behind `precondition`: when the scan leaves the tree
/// unmarked, the wrapped rule returns its input unchanged without the
/// transform's per-node logic ever running.
pub fn check(precondition: Arc<dyn Precondition>, rule: Arc<dyn Rule>) -> Arc<dyn Rule> {
    Arc::new(Checked { precondition, rule })
}
