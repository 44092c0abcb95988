use derive_more::{Display, Error};

pub mod bplus_tree;
pub mod hash_tree;
mod info;

pub use bplus_tree::BPlusTree;
pub use hash_tree::{BitString, HashKey, HashTree, Side};
pub use info::{IndexInfo, IndexKind};

/// Capability set shared by the ordered and the hashed index, so a query
/// layer can build and probe either one through the same calls.
///
/// Missing keys are reported as `None`/`false`, not as errors.
pub trait Index<K, V> {
    fn insert(&mut self, key: K, value: V) -> Result<(), IndexError>;

    /// Value of the first entry stored under `key`.
    fn get(&self, key: &K) -> Result<Option<&V>, IndexError>;

    fn contains(&self, key: &K) -> Result<bool, IndexError> {
        Ok(self.get(key)?.is_some())
    }

    /// Removes exactly one entry stored under `key` and returns its value.
    fn remove(&mut self, key: &K) -> Result<Option<V>, IndexError>;

    fn height(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a K, &'a V)>
    where
        K: 'a,
        V: 'a;
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Key has no integer projection that fits the configured width.
    #[display("key cannot be represented with {} bits", bit_width)]
    InvalidKey { bit_width: u32 },

    /// A bucket still overflows after every key bit has been consumed.
    #[display(
        "all {} key bits consumed while bucket still overflows, increase bit width or bucket size",
        bit_width
    )]
    IndexExhausted { bit_width: u32 },

    /// Structure changed while a cursor was walking it.
    #[display(
        "index was modified during traversal (generation {} -> {})",
        expected,
        found
    )]
    ConcurrentModification { expected: u64, found: u64 },

    #[display("index invariant violated: {}", _0)]
    Corrupted(#[error(not(source))] String),
}

/// Counter of structural mutations, checked by cursors on every step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    pub(crate) fn check(self, current: Generation) -> Result<(), IndexError> {
        if self == current {
            Ok(())
        } else {
            Err(IndexError::ConcurrentModification {
                expected: self.0,
                found: current.0,
            })
        }
    }
}
