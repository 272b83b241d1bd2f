//! Method signature matching
//!
//! A `MethodSignature` names a declaring type, a method name and a
//! positional parameter list; a trailing `..` accepts any remaining
//! arguments (including none). Matching is inherited by default: the
//! receiver's declared hierarchy may contain the declaring type anywhere.

use thiserror::Error;

use revisor_core::{Cursor, Node, NodeKind, Tree, TypeEnv, TypeRef};

/// Errors from [`MethodSignature::parse`]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureParseError {
    #[error("malformed signature `{0}`: expected `Declaring.Type.name(params)`")]
    Malformed(String),

    #[error("malformed signature `{0}`: `..` is only valid as the last parameter")]
    MisplacedWildcard(String),
}

/// A method signature predicate over call and declaration nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    declaring_type: String,
    name: String,
    params: Vec<String>,
    trailing_wildcard: bool,
    exact: bool,
}

impl MethodSignature {
    /// Parse a textual signature such as
    /// `java.lang.Enum.equals(java.lang.Object)` or
    /// `java.util.Arrays.asList(..)`.
    pub fn parse(text: &str) -> Result<Self, SignatureParseError> {
        let malformed = || SignatureParseError::Malformed(text.to_string());

        let (head, tail) = text.split_once('(').ok_or_else(malformed)?;
        let args = tail.strip_suffix(')').ok_or_else(malformed)?;
        let (declaring_type, name) = head.rsplit_once('.').ok_or_else(malformed)?;
        if declaring_type.is_empty() || name.is_empty() {
            return Err(malformed());
        }

        let mut params: Vec<String> = Vec::new();
        let mut trailing_wildcard = false;
        let args = args.trim();
        if !args.is_empty() {
            let pieces: Vec<&str> = args.split(',').map(str::trim).collect();
            for (i, piece) in pieces.iter().enumerate() {
                if *piece == ".." {
                    if i + 1 != pieces.len() {
                        return Err(SignatureParseError::MisplacedWildcard(text.to_string()));
                    }
                    trailing_wildcard = true;
                } else if piece.is_empty() {
                    return Err(malformed());
                } else {
                    params.push((*piece).to_string());
                }
            }
        }

        Ok(Self {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            params,
            trailing_wildcard,
            exact: false,
        })
    }

    /// Require the receiver's declared type to *be* the declaring type,
    /// rather than merely inherit from it.
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Match against a call or declaration at a cursor position.
    pub fn matches(&self, tree: &Tree, cursor: &Cursor<'_>) -> bool {
        match cursor.node().kind() {
            NodeKind::MethodCall { .. } => self.matches_call(tree, cursor.node()),
            NodeKind::MethodDecl { .. } => self.matches_decl_at(tree, cursor),
            _ => false,
        }
    }

    /// Match an invocation node: declaring type against the receiver's
    /// hierarchy, name exactly, argument types positionally.
    pub fn matches_call(&self, tree: &Tree, node: &Node) -> bool {
        let NodeKind::MethodCall { name } = node.kind() else {
            return false;
        };
        if name != &self.name {
            return false;
        }
        let Some(receiver) = node.child(0) else {
            return false;
        };
        if !self.declaring_matches(receiver.ty()) {
            return false;
        }
        let args: Vec<Option<&TypeRef>> =
            node.children()[1..].iter().map(|a| a.ty()).collect();
        self.params_match(tree.env(), &args)
    }

    /// Match a declaration node; the declaring type is the enclosing class.
    fn matches_decl_at(&self, tree: &Tree, cursor: &Cursor<'_>) -> bool {
        let node = cursor.node();
        let NodeKind::MethodDecl { name } = node.kind() else {
            return false;
        };
        if name != &self.name {
            return false;
        }
        let class = cursor.self_or_ancestor(|n| matches!(n.kind(), NodeKind::ClassDecl { .. }));
        let declared = class
            .and_then(|c| c.node().name().map(str::to_string))
            .and_then(|n| tree.env().lookup(&n))
            .map(TypeRef::Resolved);
        if !self.declaring_matches(declared.as_ref()) {
            return false;
        }
        let param_types: Vec<Option<&TypeRef>> = node
            .children()
            .iter()
            .filter(|c| matches!(c.kind(), NodeKind::ParamDecl { .. }))
            .map(|p| p.child(0).and_then(|t| t.ty()))
            .collect();
        self.params_match(tree.env(), &param_types)
    }

    fn declaring_matches(&self, ty: Option<&TypeRef>) -> bool {
        let Some(TypeRef::Resolved(desc)) = ty else {
            // Unknown receivers never match; a guessed match could rewrite
            // an unrelated method.
            return false;
        };
        if self.exact {
            desc.qualified_name() == self.declaring_type
        } else {
            desc.hierarchy_contains(&self.declaring_type)
        }
    }

    fn params_match(&self, env: &TypeEnv, args: &[Option<&TypeRef>]) -> bool {
        if self.trailing_wildcard {
            // The wildcard matches any remainder, including an empty one.
            if args.len() < self.params.len() {
                return false;
            }
        } else if args.len() != self.params.len() {
            return false;
        }
        for (param, arg) in self.params.iter().zip(args) {
            let Some(expected) = env.lookup(param) else {
                return false;
            };
            let Some(TypeRef::Resolved(actual)) = arg else {
                return false;
            };
            if !revisor_core::is_assignable_to(actual, &expected) {
                return false;
            }
        }
        true
    }
}
