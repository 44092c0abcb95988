pub mod config;
mod entry;
pub mod in_memory;
mod index;
pub mod lock;
pub mod mem_stat;

pub use entry::Entry;
pub use index::*;

pub mod prelude {
    pub use crate::config::{BPlusTreeConfig, BitDirection, HashTreeConfig};
    pub use crate::index::bplus_tree::{Cursor as OrderedCursor, Iter as OrderedIter};
    pub use crate::index::hash_tree::{Cursor as HashedCursor, Iter as HashedIter};
    pub use crate::lock::SharedIndex;
    pub use crate::mem_stat::MemStat;
    pub use crate::{
        BPlusTree, BitString, Entry, Generation, HashKey, HashTree, Index, IndexError, IndexInfo,
        IndexKind, Side,
    };
    pub use ordered_float::OrderedFloat;
}
