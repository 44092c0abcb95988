use std::fmt;

use crate::config::BitDirection;
use crate::index::IndexError;

/// Keys the hashed index can route: any integer that fits the configured bit
/// width.
pub trait HashKey {
    /// Low `width` bits of the key (`1..=64`), `None` if the key needs more
    /// than `width` bits. Signed keys are projected as two's complement.
    fn project(&self, width: u32) -> Option<u64>;
}

fn width_mask(width: u32) -> u64 {
    u64::MAX >> (u64::BITS - width)
}

macro_rules! unsigned_hash_key {
    ($($ty:ty),*) => {
        $(
            impl HashKey for $ty {
                fn project(&self, width: u32) -> Option<u64> {
                    let value = *self as u128;
                    (value >> width == 0).then_some(value as u64)
                }
            }
        )*
    };
}

macro_rules! signed_hash_key {
    ($($ty:ty),*) => {
        $(
            impl HashKey for $ty {
                fn project(&self, width: u32) -> Option<u64> {
                    let value = *self as i128;
                    let half = 1i128 << (width - 1);
                    (-half..half)
                        .contains(&value)
                        .then_some(value as u64 & width_mask(width))
                }
            }
        )*
    };
}

unsigned_hash_key!(u8, u16, u32, u64, u128, usize);
signed_hash_key!(i8, i16, i32, i64, i128, isize);

/// Child slot a bit routes to: `0` goes left, `1` goes right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    pub fn from_bit(bit: bool) -> Self {
        if bit { Side::Right } else { Side::Left }
    }
}

/// Fixed-width binary representation of a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BitString {
    bits: u64,
    width: u32,
}

impl BitString {
    /// Projects `key` onto `width` bits (`1..=64`). Fails with
    /// [`IndexError::InvalidKey`] for keys that need more than `width` bits,
    /// so signed keys must lie in `[-2^(width-1), 2^(width-1))`.
    pub fn from_key<K: HashKey + ?Sized>(key: &K, width: u32) -> Result<Self, IndexError> {
        debug_assert!(width > 0 && width <= u64::BITS);
        let bits = key
            .project(width)
            .ok_or(IndexError::InvalidKey { bit_width: width })?;
        Ok(Self { bits, width })
    }

    /// Bit consumed by a node at `depth`, that is after `depth` bits were
    /// already consumed from the `direction` end.
    pub fn bit(&self, depth: u32, direction: BitDirection) -> bool {
        debug_assert!(depth < self.width, "bit {depth} of a {} bit key", self.width);
        let shift = match direction {
            BitDirection::LeastSignificantFirst => depth,
            BitDirection::MostSignificantFirst => self.width - 1 - depth,
        };
        (self.bits >> shift) & 1 == 1
    }

    pub fn side(&self, depth: u32, direction: BitDirection) -> Side {
        Side::from_bit(self.bit(depth, direction))
    }

    /// Count of leading consumed bits two strings agree on.
    pub fn common_prefix(&self, other: &BitString, direction: BitDirection) -> u32 {
        let width = self.width.min(other.width);
        (0..width)
            .find(|depth| self.bit(*depth, direction) != other.bit(*depth, direction))
            .unwrap_or(width)
    }
}

impl fmt::Display for BitString {
    /// Most significant bit first, padded with zeros to the full width.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for shift in (0..self.width).rev() {
            let c = if (self.bits >> shift) & 1 == 1 { '1' } else { '0' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
