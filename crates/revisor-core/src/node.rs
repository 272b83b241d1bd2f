//! Immutable syntax nodes with preserved formatting
//!
//! A `Node` is one syntax construct tagged by a closed `NodeKind`. Nodes are
//! immutable; edits build new nodes and share untouched children by `Arc`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::TypeRef;

/// Opaque, stable identity of a node within a tree.
///
/// Ids are not equality-significant: two structurally identical nodes may
/// carry different ids. Rebuilding a node (new children, new trivia) keeps
/// its id; freshly constructed nodes get a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    fn fresh() -> Self {
        NodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Formatting attached to a node: the whitespace and comments printed
/// immediately before and after its own text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trivia {
    pub leading: String,
    pub trailing: String,
}

impl Trivia {
    pub fn new(leading: impl Into<String>, trailing: impl Into<String>) -> Self {
        Self {
            leading: leading.into(),
            trailing: trailing.into(),
        }
    }

    pub fn leading(text: impl Into<String>) -> Self {
        Self::new(text, "")
    }

    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_empty()
    }
}

/// Binary operators understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// Whether the operator yields a boolean result.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::And
                | BinaryOp::Or
        )
    }
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
        }
    }
}

/// The closed set of syntax constructs.
///
/// Child layout is fixed per kind; the printer and traversal core match
/// exhaustively, so adding a kind is a compile-checked, total change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Compilation unit root; children are declarations.
    Unit,
    /// Children: annotations, then the member block.
    ClassDecl { name: String },
    /// Children: annotations, return type, parameter declarations, body block.
    MethodDecl { name: String },
    /// Children: the declared type.
    ParamDecl { name: String },
    /// Local variable declaration statement. Children: declared type, then
    /// an optional initializer expression.
    VarDecl { name: String },
    Annotation { name: String },
    /// Children: contained statements, in order.
    Block,
    /// Children: condition, then-branch, optional else-branch.
    If,
    /// Children: condition, body.
    While,
    /// Children: optional returned value.
    Return,
    /// Children: the wrapped expression.
    ExprStmt,
    /// Children: receiver, then arguments.
    MethodCall { name: String },
    /// Children: receiver.
    FieldAccess { name: String },
    Identifier { name: String },
    /// Verbatim literal text, quotes included for strings.
    Literal { text: String },
    /// Children: lhs, rhs.
    Binary { op: BinaryOp },
    /// Children: operand.
    Unary { op: UnaryOp },
    /// Children: lhs, rhs.
    Assign,
    /// Children: condition, then-value, else-value.
    Ternary,
    /// Children: constructed type, then arguments.
    New,
    /// Children: the wrapped expression.
    Paren,
    TypeName { name: String },
    /// Template slot bound at apply time; never present in a spliced tree.
    Placeholder {
        index: usize,
        expected: Option<String>,
    },
}

impl NodeKind {
    /// Short label used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Unit => "unit",
            NodeKind::ClassDecl { .. } => "class",
            NodeKind::MethodDecl { .. } => "method",
            NodeKind::ParamDecl { .. } => "param",
            NodeKind::VarDecl { .. } => "var",
            NodeKind::Annotation { .. } => "annotation",
            NodeKind::Block => "block",
            NodeKind::If => "if",
            NodeKind::While => "while",
            NodeKind::Return => "return",
            NodeKind::ExprStmt => "expr-stmt",
            NodeKind::MethodCall { .. } => "call",
            NodeKind::FieldAccess { .. } => "field",
            NodeKind::Identifier { .. } => "identifier",
            NodeKind::Literal { .. } => "literal",
            NodeKind::Binary { .. } => "binary",
            NodeKind::Unary { .. } => "unary",
            NodeKind::Assign => "assign",
            NodeKind::Ternary => "ternary",
            NodeKind::New => "new",
            NodeKind::Paren => "paren",
            NodeKind::TypeName { .. } => "type",
            NodeKind::Placeholder { .. } => "placeholder",
        }
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::VarDecl { .. }
                | NodeKind::If
                | NodeKind::While
                | NodeKind::Return
                | NodeKind::ExprStmt
                | NodeKind::Block
        )
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::MethodCall { .. }
                | NodeKind::FieldAccess { .. }
                | NodeKind::Identifier { .. }
                | NodeKind::Literal { .. }
                | NodeKind::Binary { .. }
                | NodeKind::Unary { .. }
                | NodeKind::Assign
                | NodeKind::Ternary
                | NodeKind::New
                | NodeKind::Paren
                | NodeKind::Placeholder { .. }
        )
    }

    /// The declared or referenced name, for kinds that carry one.
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeKind::ClassDecl { name }
            | NodeKind::MethodDecl { name }
            | NodeKind::ParamDecl { name }
            | NodeKind::VarDecl { name }
            | NodeKind::Annotation { name }
            | NodeKind::MethodCall { name }
            | NodeKind::FieldAccess { name }
            | NodeKind::Identifier { name }
            | NodeKind::TypeName { name } => Some(name),
            _ => None,
        }
    }
}

/// One immutable syntax element.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    trivia: Trivia,
    children: Vec<Arc<Node>>,
    ty: Option<TypeRef>,
}

impl Node {
    /// Create a node with a fresh id, empty trivia and no attribution.
    pub fn new(kind: NodeKind, children: Vec<Arc<Node>>) -> Self {
        Self {
            id: NodeId::fresh(),
            kind,
            trivia: Trivia::default(),
            children,
            ty: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn trivia(&self) -> &Trivia {
        &self.trivia
    }

    pub fn children(&self) -> &[Arc<Node>] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Arc<Node>> {
        self.children.get(index)
    }

    /// Attributed type of this node, if the front end resolved one.
    pub fn ty(&self) -> Option<&TypeRef> {
        self.ty.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.kind.name()
    }

    /// Rebuild with different children. Keeps id, trivia and attribution,
    /// so the result is "the same node, edited" for replacement purposes.
    pub fn with_children(&self, children: Vec<Arc<Node>>) -> Node {
        Node {
            id: self.id,
            kind: self.kind.clone(),
            trivia: self.trivia.clone(),
            children,
            ty: self.ty.clone(),
        }
    }

    pub fn with_trivia(mut self, trivia: Trivia) -> Node {
        self.trivia = trivia;
        self
    }

    pub fn with_leading(mut self, leading: impl Into<String>) -> Node {
        self.trivia.leading = leading.into();
        self
    }

    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Node {
        self.trivia.trailing = trailing.into();
        self
    }

    /// Append text to the trailing trivia, preserving what is already there.
    pub fn push_trailing(mut self, text: &str) -> Node {
        self.trivia.trailing.push_str(text);
        self
    }

    pub fn with_type(mut self, ty: TypeRef) -> Node {
        self.ty = Some(ty);
        self
    }

    /// Mark the node as typed but not resolvable by the front end.
    pub fn with_unresolved_type(mut self) -> Node {
        self.ty = Some(TypeRef::Unresolved);
        self
    }

    /// Deep copy with fresh ids throughout.
    ///
    /// Used when a captured subtree is spliced next to its original, so
    /// that ids stay unique within one tree.
    pub fn with_fresh_ids(&self) -> Node {
        let children = self
            .children
            .iter()
            .map(|c| Arc::new(c.with_fresh_ids()))
            .collect();
        Node {
            id: NodeId::fresh(),
            kind: self.kind.clone(),
            trivia: self.trivia.clone(),
            children,
            ty: self.ty.clone(),
        }
    }

    pub fn arc(self) -> Arc<Node> {
        Arc::new(self)
    }
}
