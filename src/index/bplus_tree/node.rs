use crate::entry::{Entry, upper_bound};
use crate::in_memory::NodeId;

/// Internal node entry. Every key in the subtree behind `child` is `<= key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Route<K> {
    pub key: K,
    pub child: NodeId,
}

#[derive(Debug)]
pub(crate) struct LeafNode<K, V> {
    pub entries: Vec<Entry<K, V>>,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
}

impl<K: Ord, V> LeafNode<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            prev: None,
            next: None,
        }
    }

    pub fn insert(&mut self, entry: Entry<K, V>) {
        let pos = upper_bound(&self.entries, entry.key());
        self.entries.insert(pos, entry);
    }

    pub fn max_key(&self) -> Option<&K> {
        self.entries.last().map(Entry::key)
    }
}

#[derive(Debug)]
pub(crate) struct InternalNode<K> {
    pub routes: Vec<Route<K>>,
}

impl<K: Ord> InternalNode<K> {
    /// Slot of the child to descend into: the first route whose key is
    /// `>= key`, or the last route if every routing key is smaller.
    pub fn route_for(&self, key: &K) -> usize {
        let pos = self.routes.partition_point(|r| r.key < *key);
        pos.min(self.routes.len().saturating_sub(1))
    }

    pub fn max_key(&self) -> Option<&K> {
        self.routes.last().map(|r| &r.key)
    }
}

#[derive(Debug)]
pub(crate) enum Node<K, V> {
    Leaf(LeafNode<K, V>),
    Internal(InternalNode<K>),
}

impl<K: Ord, V> Node<K, V> {
    pub fn len(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.entries.len(),
            Node::Internal(internal) => internal.routes.len(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Upper bound of every key stored below this node.
    pub fn max_key(&self) -> Option<&K> {
        match self {
            Node::Leaf(leaf) => leaf.max_key(),
            Node::Internal(internal) => internal.max_key(),
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafNode<K, V>> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Internal(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode<K, V>> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Internal(_) => None,
        }
    }

    pub fn as_internal(&self) -> Option<&InternalNode<K>> {
        match self {
            Node::Internal(internal) => Some(internal),
            Node::Leaf(_) => None,
        }
    }

    pub fn as_internal_mut(&mut self) -> Option<&mut InternalNode<K>> {
        match self {
            Node::Internal(internal) => Some(internal),
            Node::Leaf(_) => None,
        }
    }
}
