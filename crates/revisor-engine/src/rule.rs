//! Rule trait and catalog
//!
//! A rule is a named, stateless unit: an optional precondition plus a
//! rewrite. Rules never mutate a tree in place; `rewrite` returns a new
//! tree, or the input (reference-identical root) when nothing matched.

use std::sync::Arc;

use serde::Serialize;

use revisor_core::Tree;

use crate::precondition::Precondition;
use crate::scheduler::RuleContext;

/// Rough cost estimate shown in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

/// Catalog entry describing one rule; tags are opaque to the engine.
#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    pub name: String,
    pub description: String,
    pub effort: Effort,
    pub tags: Vec<String>,
}

/// A detect-and-rewrite transformation over one compilation unit.
pub trait Rule: Send + Sync {
    /// The unique identifier for this rule (e.g., "enum_equals")
    fn name(&self) -> &'static str;

    /// A short description of what this rule does
    fn description(&self) -> &'static str;

    fn effort(&self) -> Effort {
        Effort::Low
    }

    fn tags(&self) -> &'static [&'static str] {
        &[]
    }

    /// Cheap gate consulted by the scheduler before `rewrite`. Rules that
    /// fire rarely should provide one; the default gates nothing.
    fn precondition(&self) -> Option<Arc<dyn Precondition>> {
        None
    }

    /// Apply the transform, returning a new tree or the unchanged input.
    fn rewrite(&self, tree: &Tree, ctx: &mut RuleContext) -> Tree;
}

/// Registry of available rules, in registration order.
///
/// Registration order is also scheduling order when several rules match in
/// the same pass; the embedding tool fixes it by construction.
#[derive(Default)]
pub struct Registry {
    rules: Vec<Arc<dyn Rule>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// Catalog entries for external consumers (e.g. `--list-rules`).
    pub fn infos(&self) -> Vec<RuleInfo> {
        self.rules
            .iter()
            .map(|r| RuleInfo {
                name: r.name().to_string(),
                description: r.description().to_string(),
                effort: r.effort(),
                tags: r.tags().iter().map(|t| t.to_string()).collect(),
            })
            .collect()
    }
}
