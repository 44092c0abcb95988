//! Construction-time configuration for both index structures.
//!
//! Out-of-range values are not rejected. They are clamped to documented
//! defaults by `effective()`, and every tree keeps (and exposes) only the
//! effective configuration it was built with.

use serde::{Deserialize, Serialize};

/// Configuration of the ordered index ([`BPlusTree`](crate::BPlusTree)).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BPlusTreeConfig {
    /// Maximum fan-out `n` of internal nodes.
    pub max_entries_per_node: usize,
    /// Fraction of `n` a leaf may hold before it splits, in `(0, 1)`.
    pub fill_factor: f64,
}

impl BPlusTreeConfig {
    pub const MIN_ENTRIES_PER_NODE: usize = 5;
    pub const DEFAULT_FILL_FACTOR: f64 = 0.75;

    pub fn new(max_entries_per_node: usize, fill_factor: f64) -> Self {
        Self {
            max_entries_per_node,
            fill_factor,
        }
    }

    /// Returns this configuration with out-of-range values replaced by
    /// defaults: `n < 5` becomes `5`, a fill factor outside of `(0, 1)` becomes
    /// `0.75`.
    pub fn effective(self) -> Self {
        self.clamp(true)
    }

    pub fn is_effective(&self) -> bool {
        *self == self.clamp(false)
    }

    fn clamp(self, log: bool) -> Self {
        let mut effective = self;
        if effective.max_entries_per_node < Self::MIN_ENTRIES_PER_NODE {
            if log {
                tracing::warn!(
                    "max_entries_per_node {} is below minimum, clamped to {}",
                    self.max_entries_per_node,
                    Self::MIN_ENTRIES_PER_NODE
                );
            }
            effective.max_entries_per_node = Self::MIN_ENTRIES_PER_NODE;
        }
        // `!(x > 0.0)` also catches NaN.
        if !(effective.fill_factor > 0.0 && effective.fill_factor < 1.0) {
            if log {
                tracing::warn!(
                    "fill_factor {} is out of (0, 1), clamped to {}",
                    self.fill_factor,
                    Self::DEFAULT_FILL_FACTOR
                );
            }
            effective.fill_factor = Self::DEFAULT_FILL_FACTOR;
        }
        effective
    }

    /// Integer thresholds derived from an effective configuration.
    pub(crate) fn thresholds(&self) -> Thresholds {
        let n = self.max_entries_per_node;
        let leaf_capacity = ((n as f64 * self.fill_factor).floor() as usize).max(1);
        let internal_capacity = n;
        let min_occupancy = ((1.0 - self.fill_factor) * n as f64).ceil() as usize;

        Thresholds {
            leaf_capacity,
            internal_capacity,
            leaf_min: min_occupancy.min((leaf_capacity + 1) / 2),
            // A non-root internal node always keeps a sibling to borrow from.
            internal_min: min_occupancy.min((internal_capacity + 1) / 2).max(2),
        }
    }
}

impl Default for BPlusTreeConfig {
    fn default() -> Self {
        Self {
            max_entries_per_node: Self::MIN_ENTRIES_PER_NODE,
            fill_factor: Self::DEFAULT_FILL_FACTOR,
        }
    }
}

/// Occupancy limits of B+ tree nodes.
///
/// A node splits when it holds more than its capacity and a non-root node
/// rebalances when it holds fewer than its minimum. Minimums never exceed half
/// of the capacity (rounded up), so two siblings that could not lend an entry
/// always fit into one node after a merge. Non-root internal nodes keep at
/// least two children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Thresholds {
    pub leaf_capacity: usize,
    pub internal_capacity: usize,
    pub leaf_min: usize,
    pub internal_min: usize,
}

/// End of the key's binary representation that the hashed index consumes
/// first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitDirection {
    /// Reads bits from the right end of the representation.
    #[default]
    LeastSignificantFirst,
    /// Reads bits from the left end of the representation.
    MostSignificantFirst,
}

/// Configuration of the hashed index ([`HashTree`](crate::HashTree)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashTreeConfig {
    /// Maximum number of entries a bucket holds before it splits.
    pub max_bucket_size: usize,
    /// Width of the key's binary representation.
    pub bit_width: u32,
    pub direction: BitDirection,
}

impl HashTreeConfig {
    pub const DEFAULT_BUCKET_SIZE: usize = 8;
    pub const MIN_BUCKET_SIZE: usize = 1;
    pub const DEFAULT_BIT_WIDTH: u32 = 32;
    pub const MAX_BIT_WIDTH: u32 = u64::BITS;

    pub fn new(max_bucket_size: usize) -> Self {
        Self {
            max_bucket_size,
            ..Default::default()
        }
    }

    pub fn with_bit_width(mut self, bit_width: u32) -> Self {
        self.bit_width = bit_width;
        self
    }

    pub fn with_direction(mut self, direction: BitDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Returns this configuration with out-of-range values replaced: an empty
    /// bucket size becomes `8`, a zero bit width becomes `32` and widths above
    /// `64` are cut down to `64`.
    pub fn effective(self) -> Self {
        self.clamp(true)
    }

    pub fn is_effective(&self) -> bool {
        *self == self.clamp(false)
    }

    fn clamp(self, log: bool) -> Self {
        let mut effective = self;
        if effective.max_bucket_size < Self::MIN_BUCKET_SIZE {
            if log {
                tracing::warn!(
                    "max_bucket_size {} is below minimum, clamped to {}",
                    self.max_bucket_size,
                    Self::DEFAULT_BUCKET_SIZE
                );
            }
            effective.max_bucket_size = Self::DEFAULT_BUCKET_SIZE;
        }
        if effective.bit_width == 0 {
            if log {
                tracing::warn!(
                    "bit_width 0 is not allowed, clamped to {}",
                    Self::DEFAULT_BIT_WIDTH
                );
            }
            effective.bit_width = Self::DEFAULT_BIT_WIDTH;
        } else if effective.bit_width > Self::MAX_BIT_WIDTH {
            if log {
                tracing::warn!(
                    "bit_width {} is above maximum, clamped to {}",
                    self.bit_width,
                    Self::MAX_BIT_WIDTH
                );
            }
            effective.bit_width = Self::MAX_BIT_WIDTH;
        }
        effective
    }
}

impl Default for HashTreeConfig {
    fn default() -> Self {
        Self {
            max_bucket_size: Self::DEFAULT_BUCKET_SIZE,
            bit_width: Self::DEFAULT_BIT_WIDTH,
            direction: BitDirection::default(),
        }
    }
}
