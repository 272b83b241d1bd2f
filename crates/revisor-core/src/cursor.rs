//! Traversal cursors with ancestor access and scoped messaging
//!
//! A `Cursor` pairs the node being visited with a borrow chain back to the
//! root, so upward queries are O(depth) and never re-scan the tree. Cursors
//! live only for the duration of one traversal; each level carries a small
//! key/value store used to pass signals between a node visit and later
//! visits of its still-pending descendants or its own post-visit step.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::node::{Node, NodeId};

/// Value shapes exchanged through cursor messages.
#[derive(Debug, Clone)]
pub enum MessageValue {
    Flag,
    Text(String),
    Index(usize),
    Node(Arc<Node>),
    Id(NodeId),
}

/// Ephemeral traversal handle.
pub struct Cursor<'a> {
    node: &'a Arc<Node>,
    parent: Option<&'a Cursor<'a>>,
    index: usize,
    messages: RefCell<HashMap<&'static str, MessageValue>>,
}

impl<'a> Cursor<'a> {
    /// Cursor at the root of a traversal.
    pub fn root(node: &'a Arc<Node>) -> Cursor<'a> {
        Cursor {
            node,
            parent: None,
            index: 0,
            messages: RefCell::new(HashMap::new()),
        }
    }

    /// Descend to the child at `index`. The child cursor borrows this one,
    /// so it cannot outlive the visit of this subtree.
    pub fn child(&self, index: usize) -> Option<Cursor<'_>> {
        let node = self.node.children().get(index)?;
        Some(Cursor {
            node,
            parent: Some(self),
            index,
            messages: RefCell::new(HashMap::new()),
        })
    }

    pub fn node(&self) -> &Arc<Node> {
        self.node
    }

    /// Position of this node among its parent's children (0 at the root).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parent(&self) -> Option<&Cursor<'_>> {
        self.parent
    }

    /// Walk upward until `pred` matches, starting at the parent.
    pub fn ancestor(&self, mut pred: impl FnMut(&Node) -> bool) -> Option<&Cursor<'_>> {
        let mut current = self.parent;
        while let Some(cursor) = current {
            if pred(cursor.node()) {
                return Some(cursor);
            }
            current = cursor.parent;
        }
        None
    }

    /// Like [`ancestor`](Self::ancestor) but also considers this level.
    pub fn self_or_ancestor(&self, mut pred: impl FnMut(&Node) -> bool) -> Option<&Cursor<'_>> {
        if pred(self.node()) {
            return Some(self);
        }
        self.ancestor(pred)
    }

    /// Record a message at this level, visible to this cursor's pending
    /// descendants and to its own post-visit step.
    pub fn set_message(&self, key: &'static str, value: MessageValue) {
        self.messages.borrow_mut().insert(key, value);
    }

    /// Look a message up at this level or any ancestor level.
    pub fn message(&self, key: &str) -> Option<MessageValue> {
        let mut current = Some(self);
        while let Some(cursor) = current {
            if let Some(value) = cursor.messages.borrow().get(key) {
                return Some(value.clone());
            }
            current = cursor.parent;
        }
        None
    }

    pub fn has_message(&self, key: &str) -> bool {
        self.message(key).is_some()
    }

    /// Remove and return a message, wherever in the chain it was set.
    pub fn take_message(&self, key: &str) -> Option<MessageValue> {
        let mut current = Some(self);
        while let Some(cursor) = current {
            if let Some(value) = cursor.messages.borrow_mut().remove(key) {
                return Some(value);
            }
            current = cursor.parent;
        }
        None
    }
}
