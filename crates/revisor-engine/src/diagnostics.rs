//! Per-rule diagnostics
//!
//! A failing rule never blocks other rules or other compilation units; what
//! went wrong is recorded here and surfaced with the run outcome.

use serde::Serialize;

use revisor_core::NodeId;

/// What class of event a diagnostic records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A synthesized fragment failed to attribute; the edit was abandoned.
    TemplateApply,
    /// A rule asked for an edit at a node that is not in the tree.
    StructuralViolation,
    /// A rule panicked; the unit kept its pre-rule tree.
    RulePanic,
    /// The scheduler hit its pass cap before reaching a fixpoint.
    PassCapReached,
}

/// One recorded event, attributable to a rule and (usually) a node.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub rule: String,
    pub node: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(rule: &str, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            node: None,
            kind,
            message: message.into(),
        }
    }

    pub fn at(mut self, node: NodeId) -> Self {
        self.node = Some(node.to_string());
        self
    }
}
