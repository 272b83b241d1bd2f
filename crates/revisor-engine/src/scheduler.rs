//! Fixpoint rewrite scheduling
//!
//! One pass runs every registered rule (plus any rules deferred during the
//! pass) as a full traversal over the current tree. Passes repeat until no
//! rule changes the tree or the pass cap is hit; hitting the cap is
//! reported, never silently accepted. Rules are isolated: a panicking rule
//! costs only its own edit, not the run.

use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use revisor_core::{NodeId, Tree};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::rule::{Registry, Rule};
use crate::template::TemplateApplyError;

/// Default bound on rewrite passes per unit.
pub const DEFAULT_PASS_CAP: usize = 10;

/// Per-rule, per-traversal context: diagnostics sink and the deferral queue.
pub struct RuleContext {
    rule: &'static str,
    diagnostics: Vec<Diagnostic>,
    deferred: Vec<Arc<dyn Rule>>,
}

impl RuleContext {
    pub fn new(rule: &'static str) -> Self {
        Self {
            rule,
            diagnostics: Vec::new(),
            deferred: Vec::new(),
        }
    }

    /// Register `rule` to run as an additional full traversal over the
    /// resulting tree once the current traversal completes.
    pub fn defer_after_this_pass(&mut self, rule: Arc<dyn Rule>) {
        self.deferred.push(rule);
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Record an abandoned template application at `node`.
    pub fn template_failure(&mut self, node: NodeId, error: &TemplateApplyError) {
        warn!(rule = self.rule, %node, %error, "template application abandoned");
        self.report(
            Diagnostic::new(self.rule, DiagnosticKind::TemplateApply, error.to_string())
                .at(node),
        );
    }

    /// Record a structural violation (edit aimed at a node not in the tree).
    pub fn structural_violation(&mut self, node: NodeId, message: impl Into<String>) {
        self.report(
            Diagnostic::new(self.rule, DiagnosticKind::StructuralViolation, message).at(node),
        );
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Result of scheduling one compilation unit.
pub struct RunOutcome {
    pub tree: Tree,
    /// Whether any pass changed the tree.
    pub changed: bool,
    pub passes: usize,
    /// Fixpoint was not reached within the pass cap.
    pub cap_reached: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs rules over trees until a fixpoint.
pub struct Scheduler {
    rules: Vec<Arc<dyn Rule>>,
    pass_cap: usize,
}

impl Scheduler {
    pub fn new(rules: Vec<Arc<dyn Rule>>) -> Self {
        Self {
            rules,
            pass_cap: DEFAULT_PASS_CAP,
        }
    }

    /// A scheduler over a registry's rules; registration order is
    /// scheduling order.
    pub fn from_registry(registry: &Registry) -> Self {
        Self::new(registry.rules().to_vec())
    }

    pub fn with_pass_cap(mut self, cap: usize) -> Self {
        self.pass_cap = cap;
        self
    }

    /// Run to fixpoint over one unit.
    pub fn run(&self, tree: &Tree) -> RunOutcome {
        self.run_cancellable(tree, &AtomicBool::new(false))
    }

    /// Like [`run`](Self::run), but checks `cancel` at the start of every
    /// pass. Cancellation never interrupts a traversal mid-flight, so the
    /// returned tree is always a consistent version.
    pub fn run_cancellable(&self, tree: &Tree, cancel: &AtomicBool) -> RunOutcome {
        let mut current = tree.clone();
        let mut diagnostics = Vec::new();
        let mut passes = 0;
        let mut changed = false;
        let mut cap_reached = false;

        loop {
            if cancel.load(Ordering::Relaxed) {
                debug!(passes, "rewrite cancelled between passes");
                break;
            }
            if passes >= self.pass_cap {
                cap_reached = true;
                warn!(cap = self.pass_cap, "pass cap reached before fixpoint");
                diagnostics.push(Diagnostic::new(
                    "scheduler",
                    DiagnosticKind::PassCapReached,
                    format!("no fixpoint after {} passes", self.pass_cap),
                ));
                break;
            }

            let (next, pass_changed) = self.run_pass(&current, &mut diagnostics);
            passes += 1;
            debug!(passes, pass_changed, "rewrite pass finished");
            if !pass_changed {
                break;
            }
            changed = true;
            current = next;
        }

        RunOutcome {
            tree: current,
            changed,
            passes,
            cap_reached,
            diagnostics,
        }
    }

    /// Process independent units in parallel. Each unit's traversal stays
    /// single-threaded; only the immutable rules and caches are shared.
    pub fn run_units(&self, units: &[Tree]) -> Vec<RunOutcome> {
        units.par_iter().map(|unit| self.run(unit)).collect()
    }

    fn run_pass(&self, tree: &Tree, diagnostics: &mut Vec<Diagnostic>) -> (Tree, bool) {
        let mut queue: VecDeque<Arc<dyn Rule>> = self.rules.iter().cloned().collect();
        let mut queued: HashSet<&'static str> = queue.iter().map(|r| r.name()).collect();
        let mut current = tree.clone();
        let mut changed = false;

        while let Some(rule) = queue.pop_front() {
            let (next, rule_diags, deferred) = run_rule_isolated(&rule, &current);
            diagnostics.extend(rule_diags);
            for deferred_rule in deferred {
                // A rule deferred twice in one pass still runs once.
                if queued.insert(deferred_rule.name()) {
                    debug!(rule = deferred_rule.name(), "deferred after this pass");
                    queue.push_back(deferred_rule);
                }
            }
            if !next.same_as(&current) {
                changed = true;
                current = next;
            }
        }

        (current, changed)
    }
}

fn run_rule_isolated(
    rule: &Arc<dyn Rule>,
    tree: &Tree,
) -> (Tree, Vec<Diagnostic>, Vec<Arc<dyn Rule>>) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut ctx = RuleContext::new(rule.name());
        if let Some(precondition) = rule.precondition() {
            if !precondition.holds(tree) {
                return (tree.clone(), ctx);
            }
        }
        let next = rule.rewrite(tree, &mut ctx);
        (next, ctx)
    }));

    match outcome {
        Ok((next, ctx)) => (next, ctx.diagnostics, ctx.deferred),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "rule panicked".to_string());
            warn!(rule = rule.name(), %message, "rule isolated after panic");
            let diag = Diagnostic::new(rule.name(), DiagnosticKind::RulePanic, message);
            (tree.clone(), vec![diag], Vec::new())
        }
    }
}
