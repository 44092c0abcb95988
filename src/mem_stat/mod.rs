use ordered_float::OrderedFloat;

use crate::entry::Entry;
use crate::in_memory::{Arena, NodeId};
use crate::index::bplus_tree::{Node, Route};
use crate::index::hash_tree::{HashKey, HashNode, Slot};
use crate::index::{BPlusTree, HashTree};

/// Heap footprint of a value. `heap_size` counts reserved memory, `used_size`
/// only the part holding live data. Inline size of the value itself is not
/// included.
pub trait MemStat {
    fn heap_size(&self) -> usize;
    fn used_size(&self) -> usize;
}

macro_rules! inline_mem_stat {
    ($($ty:ty),*) => {
        $(
            impl MemStat for $ty {
                fn heap_size(&self) -> usize {
                    0
                }
                fn used_size(&self) -> usize {
                    0
                }
            }
        )*
    };
}

inline_mem_stat!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char, (),
    NodeId
);

impl<T: MemStat> MemStat for OrderedFloat<T> {
    fn heap_size(&self) -> usize {
        self.0.heap_size()
    }
    fn used_size(&self) -> usize {
        self.0.used_size()
    }
}

impl MemStat for String {
    fn heap_size(&self) -> usize {
        self.capacity()
    }
    fn used_size(&self) -> usize {
        self.len()
    }
}

impl<T: MemStat> MemStat for Option<T> {
    fn heap_size(&self) -> usize {
        self.as_ref().map_or(0, |v| v.heap_size())
    }
    fn used_size(&self) -> usize {
        self.as_ref().map_or(0, |v| v.used_size())
    }
}

impl<T: MemStat> MemStat for Vec<T> {
    fn heap_size(&self) -> usize {
        self.capacity() * size_of::<T>() + self.iter().map(|v| v.heap_size()).sum::<usize>()
    }
    fn used_size(&self) -> usize {
        self.len() * size_of::<T>() + self.iter().map(|v| v.used_size()).sum::<usize>()
    }
}

impl<K: MemStat, V: MemStat> MemStat for Entry<K, V> {
    fn heap_size(&self) -> usize {
        self.key().heap_size() + self.value().heap_size()
    }
    fn used_size(&self) -> usize {
        self.key().used_size() + self.value().used_size()
    }
}

impl<K: MemStat> MemStat for Route<K> {
    fn heap_size(&self) -> usize {
        self.key.heap_size()
    }
    fn used_size(&self) -> usize {
        self.key.used_size()
    }
}

/// Slot table plus every live node. Free slots are reserved, not used.
impl<T: MemStat> MemStat for Arena<T> {
    fn heap_size(&self) -> usize {
        self.slot_capacity() * size_of::<Option<T>>()
            + self.iter().map(|(_, node)| node.heap_size()).sum::<usize>()
    }
    fn used_size(&self) -> usize {
        self.len() * size_of::<Option<T>>()
            + self.iter().map(|(_, node)| node.used_size()).sum::<usize>()
    }
}

impl<K: MemStat, V: MemStat> MemStat for Node<K, V> {
    fn heap_size(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.entries.heap_size(),
            Node::Internal(node) => node.routes.heap_size(),
        }
    }
    fn used_size(&self) -> usize {
        match self {
            Node::Leaf(leaf) => leaf.entries.used_size(),
            Node::Internal(node) => node.routes.used_size(),
        }
    }
}

impl<K: MemStat, V: MemStat> MemStat for Slot<K, V> {
    fn heap_size(&self) -> usize {
        match self {
            Slot::Bucket(entries) => entries.heap_size(),
            Slot::Node(_) => 0,
        }
    }
    fn used_size(&self) -> usize {
        match self {
            Slot::Bucket(entries) => entries.used_size(),
            Slot::Node(_) => 0,
        }
    }
}

impl<K: MemStat, V: MemStat> MemStat for HashNode<K, V> {
    fn heap_size(&self) -> usize {
        self.left.heap_size() + self.right.heap_size()
    }
    fn used_size(&self) -> usize {
        self.left.used_size() + self.right.used_size()
    }
}

impl<K, V> MemStat for BPlusTree<K, V>
where
    K: Ord + Clone + MemStat,
    V: MemStat,
{
    fn heap_size(&self) -> usize {
        self.nodes().heap_size()
    }
    fn used_size(&self) -> usize {
        self.nodes().used_size()
    }
}

impl<K, V> MemStat for HashTree<K, V>
where
    K: HashKey + Ord + MemStat,
    V: MemStat,
{
    fn heap_size(&self) -> usize {
        self.nodes().heap_size()
    }
    fn used_size(&self) -> usize {
        self.nodes().used_size()
    }
}
