//! Node constructors
//!
//! The front end (out of scope here) produces attributed trees through these
//! constructors; tests and the template parser use them as well. Constructors
//! return owned `Node`s so callers can chain trivia and attribution before
//! wrapping them in `Arc`.

use std::sync::Arc;

use crate::node::{BinaryOp, Node, NodeKind, UnaryOp};

fn arcs(nodes: Vec<Node>) -> Vec<Arc<Node>> {
    nodes.into_iter().map(Arc::new).collect()
}

pub fn unit(decls: Vec<Node>) -> Node {
    Node::new(NodeKind::Unit, arcs(decls))
}

/// `class <name> { members }`; `members` becomes the body block's children.
pub fn class_decl(name: &str, annotations: Vec<Node>, body: Node) -> Node {
    let mut children = arcs(annotations);
    children.push(Arc::new(body));
    Node::new(
        NodeKind::ClassDecl {
            name: name.to_string(),
        },
        children,
    )
}

pub fn method_decl(
    name: &str,
    annotations: Vec<Node>,
    return_type: Node,
    params: Vec<Node>,
    body: Node,
) -> Node {
    let mut children = arcs(annotations);
    children.push(Arc::new(return_type));
    children.extend(arcs(params));
    children.push(Arc::new(body));
    Node::new(
        NodeKind::MethodDecl {
            name: name.to_string(),
        },
        children,
    )
}

pub fn param(name: &str, ty: Node) -> Node {
    Node::new(
        NodeKind::ParamDecl {
            name: name.to_string(),
        },
        vec![Arc::new(ty)],
    )
}

pub fn var_decl(name: &str, ty: Node, init: Option<Node>) -> Node {
    let mut children = vec![Arc::new(ty)];
    if let Some(init) = init {
        children.push(Arc::new(init));
    }
    Node::new(
        NodeKind::VarDecl {
            name: name.to_string(),
        },
        children,
    )
}

pub fn annotation(name: &str) -> Node {
    Node::new(
        NodeKind::Annotation {
            name: name.to_string(),
        },
        vec![],
    )
}

pub fn block(statements: Vec<Node>) -> Node {
    Node::new(NodeKind::Block, arcs(statements))
}

pub fn if_stmt(condition: Node, then_branch: Node, else_branch: Option<Node>) -> Node {
    let mut children = vec![Arc::new(condition), Arc::new(then_branch)];
    if let Some(else_branch) = else_branch {
        children.push(Arc::new(else_branch));
    }
    Node::new(NodeKind::If, children)
}

pub fn while_stmt(condition: Node, body: Node) -> Node {
    Node::new(NodeKind::While, vec![Arc::new(condition), Arc::new(body)])
}

pub fn ret(value: Option<Node>) -> Node {
    let children = match value {
        Some(v) => vec![Arc::new(v)],
        None => vec![],
    };
    Node::new(NodeKind::Return, children)
}

pub fn expr_stmt(expr: Node) -> Node {
    Node::new(NodeKind::ExprStmt, vec![Arc::new(expr)])
}

pub fn call(name: &str, receiver: Node, args: Vec<Node>) -> Node {
    let mut children = vec![Arc::new(receiver)];
    children.extend(arcs(args));
    Node::new(
        NodeKind::MethodCall {
            name: name.to_string(),
        },
        children,
    )
}

pub fn field(name: &str, receiver: Node) -> Node {
    Node::new(
        NodeKind::FieldAccess {
            name: name.to_string(),
        },
        vec![Arc::new(receiver)],
    )
}

pub fn ident(name: &str) -> Node {
    Node::new(
        NodeKind::Identifier {
            name: name.to_string(),
        },
        vec![],
    )
}

pub fn lit(text: &str) -> Node {
    Node::new(
        NodeKind::Literal {
            text: text.to_string(),
        },
        vec![],
    )
}

pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Node {
    Node::new(NodeKind::Binary { op }, vec![Arc::new(lhs), Arc::new(rhs)])
}

pub fn unary(op: UnaryOp, operand: Node) -> Node {
    Node::new(NodeKind::Unary { op }, vec![Arc::new(operand)])
}

pub fn assign(lhs: Node, rhs: Node) -> Node {
    Node::new(NodeKind::Assign, vec![Arc::new(lhs), Arc::new(rhs)])
}

pub fn ternary(condition: Node, then_value: Node, else_value: Node) -> Node {
    Node::new(
        NodeKind::Ternary,
        vec![Arc::new(condition), Arc::new(then_value), Arc::new(else_value)],
    )
}

pub fn new_expr(ty: Node, args: Vec<Node>) -> Node {
    let mut children = vec![Arc::new(ty)];
    children.extend(arcs(args));
    Node::new(NodeKind::New, children)
}

pub fn paren(inner: Node) -> Node {
    Node::new(NodeKind::Paren, vec![Arc::new(inner)])
}

pub fn type_name(name: &str) -> Node {
    Node::new(
        NodeKind::TypeName {
            name: name.to_string(),
        },
        vec![],
    )
}

pub fn placeholder(index: usize, expected: Option<String>) -> Node {
    Node::new(NodeKind::Placeholder { index, expected }, vec![])
}
