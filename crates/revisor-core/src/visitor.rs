//! Tree traversals
//!
//! Two flavors: `Scan` is a read-only walk with early exit, used by cheap
//! preconditions; `Transform` is the rewriting walk, which rebuilds parents
//! from possibly-modified children (post-order) and preserves structural
//! sharing wherever nothing changed.

use std::sync::Arc;

use crate::cursor::Cursor;
use crate::node::Node;
use crate::tree::Tree;

/// Pre-visit decision for a rewriting traversal.
pub enum Step {
    Continue,
    /// Leave this subtree untouched and do not descend into it.
    Skip,
}

/// Read-only visitor. Return `false` to stop the scan early.
pub trait Scan {
    fn visit(&mut self, node: &Node) -> bool;
}

/// Run a read-only scan over a subtree, depth-first, pre-order.
pub fn scan(root: &Arc<Node>, scanner: &mut dyn Scan) {
    scan_node(root, scanner);
}

fn scan_node(node: &Arc<Node>, scanner: &mut dyn Scan) -> bool {
    if !scanner.visit(node) {
        return false;
    }
    for child in node.children() {
        if !scan_node(child, scanner) {
            return false;
        }
    }
    true
}

/// Rewriting visitor.
///
/// `enter` runs pre-order and may prune descent; `exit` runs post-order and
/// receives the node with its children already rewritten, returning the
/// node to put in the parent (the input itself when there is no match).
pub trait Transform {
    fn enter(&mut self, _cursor: &Cursor<'_>, _node: &Node) -> Step {
        Step::Continue
    }

    fn exit(&mut self, _cursor: &Cursor<'_>, node: Arc<Node>) -> Arc<Node> {
        node
    }
}

/// Run a rewriting traversal over a whole tree.
///
/// Returns the input tree (reference-identical root) when no visit changed
/// anything.
pub fn rewrite(tree: &Tree, transform: &mut dyn Transform) -> Tree {
    let cursor = Cursor::root(tree.root());
    let root = rewrite_node(&cursor, transform);
    if Arc::ptr_eq(&root, tree.root()) {
        tree.clone()
    } else {
        tree.with_root(root)
    }
}

fn rewrite_node(cursor: &Cursor<'_>, transform: &mut dyn Transform) -> Arc<Node> {
    let node = cursor.node().clone();
    if let Step::Skip = transform.enter(cursor, &node) {
        return node;
    }

    let mut new_children: Vec<Arc<Node>> = Vec::with_capacity(node.children().len());
    let mut changed = false;
    for index in 0..node.children().len() {
        let Some(child_cursor) = cursor.child(index) else {
            continue;
        };
        let new_child = rewrite_node(&child_cursor, transform);
        if !Arc::ptr_eq(&new_child, &node.children()[index]) {
            changed = true;
        }
        new_children.push(new_child);
    }

    let rebuilt = if changed {
        Arc::new(node.with_children(new_children))
    } else {
        node
    };
    transform.exit(cursor, rebuilt)
}
