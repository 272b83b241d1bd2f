//! Tree serialization
//!
//! Printing reproduces the original text of any unmodified subtree: all
//! flexible whitespace lives in node trivia, while keyword/punctuation
//! skeletons are canonical per kind. The match below is exhaustive over
//! `NodeKind`, so a new kind cannot be forgotten here.

use std::fmt;

use crate::node::{Node, NodeKind};

/// Serialize a node (and its subtree) to source text.
pub fn print(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    out.push_str(&node.trivia().leading);
    let children = node.children();
    match node.kind() {
        NodeKind::Unit => {
            for child in children {
                write_node(child, out);
            }
        }
        NodeKind::ClassDecl { name } => {
            let (annotations, rest) = split_annotations(node);
            for anno in annotations {
                write_node(anno, out);
            }
            out.push_str("class ");
            out.push_str(name);
            for child in rest {
                write_node(child, out);
            }
        }
        NodeKind::MethodDecl { name } => {
            let (annotations, rest) = split_annotations(node);
            for anno in annotations {
                write_node(anno, out);
            }
            // rest: return type, parameters, body block
            let mut rest = rest.iter();
            if let Some(return_type) = rest.next() {
                write_node(return_type, out);
            }
            out.push(' ');
            out.push_str(name);
            out.push('(');
            let mut first = true;
            let mut body = None;
            for child in rest {
                if matches!(child.kind(), NodeKind::Block) {
                    body = Some(child);
                    continue;
                }
                if !first {
                    out.push(',');
                }
                first = false;
                write_node(child, out);
            }
            out.push(')');
            if let Some(body) = body {
                write_node(body, out);
            }
        }
        NodeKind::ParamDecl { name } => {
            if let Some(ty) = children.first() {
                write_node(ty, out);
            }
            out.push(' ');
            out.push_str(name);
        }
        NodeKind::VarDecl { name } => {
            if let Some(ty) = children.first() {
                write_node(ty, out);
            }
            out.push(' ');
            out.push_str(name);
            if let Some(init) = children.get(1) {
                out.push_str(" =");
                write_node(init, out);
            }
            out.push(';');
        }
        NodeKind::Annotation { name } => {
            out.push('@');
            out.push_str(name);
        }
        NodeKind::Block => {
            out.push('{');
            for child in children {
                write_node(child, out);
            }
            out.push('}');
        }
        NodeKind::If => {
            out.push_str("if (");
            if let Some(condition) = children.first() {
                write_node(condition, out);
            }
            out.push(')');
            if let Some(then_branch) = children.get(1) {
                write_node(then_branch, out);
            }
            if let Some(else_branch) = children.get(2) {
                out.push_str("else");
                write_node(else_branch, out);
            }
        }
        NodeKind::While => {
            out.push_str("while (");
            if let Some(condition) = children.first() {
                write_node(condition, out);
            }
            out.push(')');
            if let Some(body) = children.get(1) {
                write_node(body, out);
            }
        }
        NodeKind::Return => {
            out.push_str("return");
            if let Some(value) = children.first() {
                write_node(value, out);
            }
            out.push(';');
        }
        NodeKind::ExprStmt => {
            if let Some(expr) = children.first() {
                write_node(expr, out);
            }
            out.push(';');
        }
        NodeKind::MethodCall { name } => {
            if let Some(receiver) = children.first() {
                write_node(receiver, out);
            }
            out.push('.');
            out.push_str(name);
            out.push('(');
            if children.len() > 1 {
                write_separated(&children[1..], out);
            }
            out.push(')');
        }
        NodeKind::FieldAccess { name } => {
            if let Some(receiver) = children.first() {
                write_node(receiver, out);
            }
            out.push('.');
            out.push_str(name);
        }
        NodeKind::Identifier { name } => {
            out.push_str(name);
        }
        NodeKind::Literal { text } => {
            out.push_str(text);
        }
        NodeKind::Binary { op } => {
            if let Some(lhs) = children.first() {
                write_node(lhs, out);
            }
            out.push_str(op.symbol());
            if let Some(rhs) = children.get(1) {
                write_node(rhs, out);
            }
        }
        NodeKind::Unary { op } => {
            out.push_str(op.symbol());
            if let Some(operand) = children.first() {
                write_node(operand, out);
            }
        }
        NodeKind::Assign => {
            if let Some(lhs) = children.first() {
                write_node(lhs, out);
            }
            out.push('=');
            if let Some(rhs) = children.get(1) {
                write_node(rhs, out);
            }
        }
        NodeKind::Ternary => {
            if let Some(condition) = children.first() {
                write_node(condition, out);
            }
            out.push('?');
            if let Some(then_value) = children.get(1) {
                write_node(then_value, out);
            }
            out.push(':');
            if let Some(else_value) = children.get(2) {
                write_node(else_value, out);
            }
        }
        NodeKind::New => {
            out.push_str("new");
            if let Some(ty) = children.first() {
                write_node(ty, out);
            }
            out.push('(');
            if children.len() > 1 {
                write_separated(&children[1..], out);
            }
            out.push(')');
        }
        NodeKind::Paren => {
            out.push('(');
            if let Some(inner) = children.first() {
                write_node(inner, out);
            }
            out.push(')');
        }
        NodeKind::TypeName { name } => {
            out.push_str(name);
        }
        NodeKind::Placeholder { index, .. } => {
            // Only reachable when printing an unapplied template.
            out.push_str("${");
            out.push_str(&index.to_string());
            out.push('}');
        }
    }
    out.push_str(&node.trivia().trailing);
}

fn write_separated(nodes: &[std::sync::Arc<Node>], out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_node(node, out);
    }
}

fn split_annotations(node: &Node) -> (Vec<&std::sync::Arc<Node>>, Vec<&std::sync::Arc<Node>>) {
    node.children()
        .iter()
        .partition(|c| matches!(c.kind(), NodeKind::Annotation { .. }))
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&print(self))
    }
}
