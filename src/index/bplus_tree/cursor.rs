use std::iter::FusedIterator;

use crate::in_memory::NodeId;
use crate::index::{Generation, IndexError};

use super::BPlusTree;

/// Detached position in the leaf sibling chain.
///
/// A [`Cursor`] does not borrow the tree, so the tree can be changed while a
/// cursor is alive. Every step compares the generation the cursor was created
/// at with the tree's current one and fails with
/// [`IndexError::ConcurrentModification`] after any structural change. The
/// cursor can be restarted with [`Cursor::reset`].
#[derive(Debug, Clone)]
pub struct Cursor {
    leaf: Option<NodeId>,
    pos: usize,
    generation: Generation,
}

impl Cursor {
    pub(crate) fn new<K: Ord + Clone, V>(tree: &BPlusTree<K, V>) -> Self {
        Self {
            leaf: Some(tree.leftmost_leaf()),
            pos: 0,
            generation: tree.generation(),
        }
    }

    pub fn reset<K: Ord + Clone, V>(&mut self, tree: &BPlusTree<K, V>) {
        *self = Self::new(tree);
    }

    /// Next entry in ascending key order, `Ok(None)` when the chain is
    /// exhausted.
    pub fn next_entry<'a, K: Ord + Clone, V>(
        &mut self,
        tree: &'a BPlusTree<K, V>,
    ) -> Result<Option<(&'a K, &'a V)>, IndexError> {
        self.generation.check(tree.generation())?;
        while let Some(id) = self.leaf {
            let leaf = tree.leaf(id);
            if let Some(entry) = leaf.entries.get(self.pos) {
                self.pos += 1;
                return Ok(Some(entry.as_pair()));
            }
            self.leaf = leaf.next;
            self.pos = 0;
        }
        Ok(None)
    }
}

/// Borrowing iterator over a [`BPlusTree`] in ascending key order.
///
/// The tree stays borrowed for the iterator's lifetime, so it cannot observe
/// a mutation.
pub struct Iter<'a, K, V> {
    tree: &'a BPlusTree<K, V>,
    leaf: Option<NodeId>,
    pos: usize,
    remaining: usize,
}

impl<'a, K: Ord + Clone, V> Iter<'a, K, V> {
    pub(crate) fn new(tree: &'a BPlusTree<K, V>) -> Self {
        Self {
            tree,
            leaf: Some(tree.leftmost_leaf()),
            pos: 0,
            remaining: tree.len(),
        }
    }
}

impl<'a, K: Ord + Clone, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.leaf {
            let leaf = self.tree.leaf(id);
            if let Some(entry) = leaf.entries.get(self.pos) {
                self.pos += 1;
                self.remaining -= 1;
                return Some(entry.as_pair());
            }
            self.leaf = leaf.next;
            self.pos = 0;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Ord + Clone, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K: Ord + Clone, V> FusedIterator for Iter<'_, K, V> {}
