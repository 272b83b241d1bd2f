//! Detect-and-rewrite engine over attributed syntax trees
//!
//! This crate layers rule machinery on top of [`revisor_core`]: signature
//! matchers pick out calls and declarations, preconditions gate whole
//! traversals, templates synthesize replacement fragments, and the
//! scheduler drives registered rules to a fixpoint per compilation unit.

pub mod diagnostics;
pub mod precondition;
pub mod rule;
pub mod scheduler;
pub mod signature;
pub mod template;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use precondition::{all, any, check, node_scan, not, Precondition};
pub use rule::{Effort, Registry, Rule, RuleInfo};
pub use scheduler::{RuleContext, RunOutcome, Scheduler, DEFAULT_PASS_CAP};
pub use signature::{MethodSignature, SignatureParseError};
pub use template::{
    compile, Coordinate, Template, TemplateApplyError, TemplateCompileError, TemplateParseError,
};
