use std::iter::FusedIterator;

use crate::in_memory::{Arena, NodeId};
use crate::index::{Generation, IndexError};

use super::node::{HashNode, Slot};
use super::{HashKey, HashTree, Side};

/// Depth-first position: left subtree before right, bucket entries in key
/// order.
#[derive(Debug, Clone)]
struct Walk {
    /// Nodes entered so far and the side each one visits next.
    stack: Vec<(NodeId, Option<Side>)>,
    bucket: Option<(NodeId, Side)>,
    pos: usize,
}

impl Walk {
    fn new(root: NodeId) -> Self {
        Self {
            stack: vec![(root, Some(Side::Left))],
            bucket: None,
            pos: 0,
        }
    }

    fn step<'a, K, V>(&mut self, nodes: &'a Arena<HashNode<K, V>>) -> Option<(&'a K, &'a V)> {
        loop {
            if let Some((node, side)) = self.bucket {
                let entry = nodes[node]
                    .slot(side)
                    .as_bucket()
                    .and_then(|entries| entries.get(self.pos));
                if let Some(entry) = entry {
                    self.pos += 1;
                    return Some(entry.as_pair());
                }
                self.bucket = None;
            }

            let frame = self.stack.last_mut()?;
            let node = frame.0;
            let Some(side) = frame.1 else {
                self.stack.pop();
                continue;
            };
            frame.1 = match side {
                Side::Left => Some(Side::Right),
                Side::Right => None,
            };
            match nodes[node].slot(side) {
                Slot::Bucket(_) => {
                    self.bucket = Some((node, side));
                    self.pos = 0;
                }
                Slot::Node(child) => self.stack.push((*child, Some(Side::Left))),
            }
        }
    }
}

/// Detached traversal of a [`HashTree`].
///
/// Same contract as the ordered index cursor: any insert, remove or clear
/// after creation makes [`Cursor::next_entry`] fail with
/// [`IndexError::ConcurrentModification`].
#[derive(Debug, Clone)]
pub struct Cursor {
    walk: Walk,
    generation: Generation,
}

impl Cursor {
    pub(crate) fn new<K: HashKey + Ord, V>(tree: &HashTree<K, V>) -> Self {
        Self {
            walk: Walk::new(tree.root),
            generation: tree.generation(),
        }
    }

    pub fn reset<K: HashKey + Ord, V>(&mut self, tree: &HashTree<K, V>) {
        *self = Self::new(tree);
    }

    pub fn next_entry<'a, K: HashKey + Ord, V>(
        &mut self,
        tree: &'a HashTree<K, V>,
    ) -> Result<Option<(&'a K, &'a V)>, IndexError> {
        self.generation.check(tree.generation())?;
        Ok(self.walk.step(&tree.nodes))
    }
}

/// Borrowing depth-first iterator over a [`HashTree`].
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<HashNode<K, V>>,
    walk: Walk,
    remaining: usize,
}

impl<'a, K: HashKey + Ord, V> Iter<'a, K, V> {
    pub(crate) fn new(tree: &'a HashTree<K, V>) -> Self {
        Self {
            nodes: &tree.nodes,
            walk: Walk::new(tree.root),
            remaining: tree.len(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.walk.step(self.nodes)?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}
