//! revisor-core: Immutable syntax trees for rule-based rewriting
//!
//! This crate provides:
//! - `Node`/`Tree`: persistent, structurally shared syntax trees that
//!   round-trip their original formatting
//! - `Cursor`: traversal handle with ancestor access and scoped messages
//! - `Scan`/`Transform`: read-only and rebuilding traversals
//! - `TypeDescriptor`/`TypeEnv`: attributed type information and the
//!   assignability check
//! - `build`: node constructors standing in for the front-end contract

pub mod build;
pub mod cursor;
pub mod node;
pub mod print;
pub mod tree;
pub mod types;
pub mod visitor;

pub use cursor::{Cursor, MessageValue};
pub use node::{BinaryOp, Node, NodeId, NodeKind, Trivia, UnaryOp};
pub use print::print;
pub use tree::{ReplaceError, Tree};
pub use types::{is_assignable_to, TypeDescriptor, TypeEnv, TypeRef};
pub use visitor::{rewrite, scan, Scan, Step, Transform};
