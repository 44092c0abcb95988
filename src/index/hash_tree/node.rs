use crate::entry::Entry;
use crate::in_memory::NodeId;

use super::Side;

/// Child position of a hash tree node: either a bucket of entries sorted by
/// key or a deeper node.
#[derive(Debug)]
pub(crate) enum Slot<K, V> {
    Bucket(Vec<Entry<K, V>>),
    Node(NodeId),
}

impl<K, V> Slot<K, V> {
    pub fn empty() -> Self {
        Slot::Bucket(Vec::new())
    }

    pub fn is_empty_bucket(&self) -> bool {
        matches!(self, Slot::Bucket(entries) if entries.is_empty())
    }

    pub fn as_bucket(&self) -> Option<&Vec<Entry<K, V>>> {
        match self {
            Slot::Bucket(entries) => Some(entries),
            Slot::Node(_) => None,
        }
    }

    pub fn as_bucket_mut(&mut self) -> Option<&mut Vec<Entry<K, V>>> {
        match self {
            Slot::Bucket(entries) => Some(entries),
            Slot::Node(_) => None,
        }
    }
}

/// Node that routes on the bit at `depth`.
#[derive(Debug)]
pub(crate) struct HashNode<K, V> {
    pub depth: u32,
    pub left: Slot<K, V>,
    pub right: Slot<K, V>,
}

impl<K, V> HashNode<K, V> {
    pub fn new(depth: u32) -> Self {
        Self {
            depth,
            left: Slot::empty(),
            right: Slot::empty(),
        }
    }

    pub fn slot(&self, side: Side) -> &Slot<K, V> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> &mut Slot<K, V> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Both children are empty buckets.
    pub fn is_vacant(&self) -> bool {
        self.left.is_empty_bucket() && self.right.is_empty_bucket()
    }
}
