//! Persistent trees with path-limited copy-on-write

use std::sync::Arc;

use thiserror::Error;

use crate::node::{Node, NodeId};
use crate::print::print;
use crate::types::TypeEnv;

/// Errors from structural edits
#[derive(Error, Debug)]
pub enum ReplaceError {
    #[error("no node {0} in tree")]
    UnknownId(NodeId),
}

/// The full syntax representation of one compilation unit.
///
/// A `Tree` is replaced wholesale on each successful edit; replacing a
/// descendant reallocates only the ancestors on the path to it, every
/// sibling subtree is shared by reference with the prior version.
#[derive(Debug, Clone)]
pub struct Tree {
    root: Arc<Node>,
    env: Arc<TypeEnv>,
}

impl Tree {
    pub fn new(root: Node, env: Arc<TypeEnv>) -> Self {
        Self {
            root: Arc::new(root),
            env,
        }
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    pub fn env(&self) -> &Arc<TypeEnv> {
        &self.env
    }

    /// Same unit, different root. Used by traversals that rebuilt the root.
    pub fn with_root(&self, root: Arc<Node>) -> Tree {
        Tree {
            root,
            env: self.env.clone(),
        }
    }

    /// Whether two trees are the same version (reference identity).
    pub fn same_as(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.find(id).is_some()
    }

    /// Locate a node by id, depth-first.
    pub fn find(&self, id: NodeId) -> Option<Arc<Node>> {
        find_in(&self.root, id)
    }

    /// Produce a new tree where the node at `id` is `replacement`.
    ///
    /// Only the ancestors of the edited node are reallocated; an unknown id
    /// is a structural violation and leaves every version untouched.
    pub fn replace(&self, id: NodeId, replacement: Node) -> Result<Tree, ReplaceError> {
        let replacement = Arc::new(replacement);
        match replace_in(&self.root, id, &replacement) {
            Some(root) => Ok(self.with_root(root)),
            None => Err(ReplaceError::UnknownId(id)),
        }
    }

    pub fn print(&self) -> String {
        print(&self.root)
    }
}

fn find_in(node: &Arc<Node>, id: NodeId) -> Option<Arc<Node>> {
    if node.id() == id {
        return Some(node.clone());
    }
    node.children().iter().find_map(|c| find_in(c, id))
}

fn replace_in(node: &Arc<Node>, id: NodeId, replacement: &Arc<Node>) -> Option<Arc<Node>> {
    if node.id() == id {
        return Some(replacement.clone());
    }
    for (index, child) in node.children().iter().enumerate() {
        if let Some(new_child) = replace_in(child, id, replacement) {
            let mut children = node.children().to_vec();
            children[index] = new_child;
            return Some(Arc::new(node.with_children(children)));
        }
    }
    None
}
