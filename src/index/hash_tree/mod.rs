//! Hashed index: binary trie over the bits of integer keys.
//!
//! A node at depth `d` routes a key on the key's bit `d`, counted from the
//! configured end of its fixed-width representation, `0` to the left slot and
//! `1` to the right one. A slot is either a bucket of at most `n` entries
//! kept sorted by key, or a deeper node. A bucket that receives its `n + 1`-th
//! entry is replaced by a node one level deeper and its entries are
//! redistributed on the next bit, recursively for any half that still
//! overflows. When the key bits run out before the entries can be told apart
//! the insert fails with [`IndexError::IndexExhausted`] and nothing changes.
//!
//! Removing the last entry from a node whose other slot is an empty bucket as
//! well turns the node back into an empty bucket of its parent. This happens
//! for that one node only and does not cascade further up.

mod bits;
mod cursor;
mod node;

use tracing::{debug, trace};

use crate::config::HashTreeConfig;
use crate::entry::{Entry, upper_bound};
use crate::in_memory::{Arena, NodeId};
use crate::index::{Generation, Index, IndexError};

pub use bits::{BitString, HashKey, Side};
pub use cursor::{Cursor, Iter};
pub(crate) use node::{HashNode, Slot};

/// Bucket a key routes to and the link that leads to its node.
struct Location {
    parent: Option<(NodeId, Side)>,
    node: NodeId,
    side: Side,
}

#[derive(Debug)]
pub struct HashTree<K, V> {
    nodes: Arena<HashNode<K, V>>,
    root: NodeId,
    config: HashTreeConfig,
    len: usize,
    generation: Generation,
}

impl<K: HashKey + Ord, V> Default for HashTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HashKey + Ord, V> HashTree<K, V> {
    pub fn new() -> Self {
        Self::with_config(HashTreeConfig::default())
    }

    /// Creates an empty tree, clamping the configuration with
    /// [`HashTreeConfig::effective`].
    pub fn with_config(config: HashTreeConfig) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.allocate(HashNode::new(0));
        Self {
            nodes,
            root,
            config: config.effective(),
            len: 0,
            generation: Generation::default(),
        }
    }

    pub fn config(&self) -> HashTreeConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn bucket_count(&self) -> usize {
        self.nodes
            .iter()
            .flat_map(|(_, node)| [&node.left, &node.right])
            .filter(|slot| matches!(slot, Slot::Bucket(_)))
            .count()
    }

    /// Fixed-width bit string of `key` under this tree's bit width.
    pub fn key_to_bits(&self, key: &K) -> Result<BitString, IndexError> {
        BitString::from_key(key, self.config.bit_width)
    }

    /// Longest root-to-bucket path counted in nodes, where a bucket directly
    /// under a node counts as one level.
    pub fn height(&self) -> usize {
        self.node_height(self.root)
    }

    fn node_height(&self, id: NodeId) -> usize {
        let node = &self.nodes[id];
        [&node.left, &node.right]
            .into_iter()
            .map(|slot| match slot {
                Slot::Bucket(_) => 1,
                Slot::Node(child) => 1 + self.node_height(*child),
            })
            .max()
            .unwrap_or(1)
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<(), IndexError> {
        let bits = self.key_to_bits(&key)?;
        let Location { node, side, .. } = self.locate(bits);

        let bucket = self.bucket(node, side);
        if bucket.len() >= self.config.max_bucket_size {
            let mut pending = bucket
                .iter()
                .map(|entry| self.key_to_bits(entry.key()))
                .collect::<Result<Vec<_>, _>>()?;
            pending.push(bits);
            self.ensure_splittable(&pending, self.nodes[node].depth + 1)?;
        }

        let bucket = self.bucket_mut(node, side);
        let pos = upper_bound(bucket, &key);
        bucket.insert(pos, Entry::new(key, value));
        self.len += 1;
        self.generation.bump();
        trace!(%bits, %node, "inserted");

        if self.bucket(node, side).len() > self.config.max_bucket_size {
            self.split_bucket(node, side)?;
        }
        Ok(())
    }

    /// Value of the first entry stored under `key`.
    pub fn get(&self, key: &K) -> Result<Option<&V>, IndexError> {
        let bits = self.key_to_bits(key)?;
        let Location { node, side, .. } = self.locate(bits);
        Ok(self
            .bucket(node, side)
            .iter()
            .find(|entry| entry.key() == key)
            .map(Entry::value))
    }

    pub fn contains(&self, key: &K) -> Result<bool, IndexError> {
        Ok(self.get(key)?.is_some())
    }

    /// Replaces the value of the first entry stored under `key`, returning the
    /// previous one.
    pub fn update(&mut self, key: &K, value: V) -> Result<Option<V>, IndexError> {
        let bits = self.key_to_bits(key)?;
        let Location { node, side, .. } = self.locate(bits);
        Ok(self
            .bucket_mut(node, side)
            .iter_mut()
            .find(|entry| entry.key() == key)
            .map(|entry| entry.replace_value(value)))
    }

    /// Removes the first entry stored under `key` and returns its value.
    pub fn remove(&mut self, key: &K) -> Result<Option<V>, IndexError> {
        let bits = self.key_to_bits(key)?;
        let Location { parent, node, side } = self.locate(bits);

        let bucket = self.bucket_mut(node, side);
        let Some(pos) = bucket.iter().position(|entry| entry.key() == key) else {
            return Ok(None);
        };
        let entry = bucket.remove(pos);
        self.len -= 1;
        self.generation.bump();

        if let Some((parent, parent_side)) = parent {
            if self.nodes[node].is_vacant() {
                self.nodes.release(node);
                *self.nodes[parent].slot_mut(parent_side) = Slot::empty();
                debug!(%node, %parent, "collapsed empty node");
            }
        }
        Ok(Some(entry.into_value()))
    }

    /// Sides taken from the root to the bucket `key` belongs to.
    pub fn path(&self, key: &K) -> Result<Vec<Side>, IndexError> {
        let bits = self.key_to_bits(key)?;
        let mut path = Vec::new();
        let mut current = self.root;
        loop {
            let node = &self.nodes[current];
            let side = bits.side(node.depth, self.config.direction);
            path.push(side);
            match node.slot(side) {
                Slot::Node(child) => current = *child,
                Slot::Bucket(_) => return Ok(path),
            }
        }
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.allocate(HashNode::new(0));
        self.len = 0;
        self.generation.bump();
    }

    /// Entries depth-first, left slot before right slot.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    pub fn cursor(&self) -> Cursor {
        Cursor::new(self)
    }

    /// Inserts every pair in order and stops at the first failure. Pairs
    /// inserted before the failure stay in the tree.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<(), IndexError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in iter {
            self.insert(key, value)?;
        }
        Ok(())
    }

    /// Checks node depths, bucket sizes and order, that every entry is stored
    /// in the bucket its bits route to, and the entry count.
    pub fn verify(&self) -> Result<(), IndexError> {
        let mut walk = VerifyWalk::default();
        self.verify_node(self.root, 0, &mut walk)?;

        if walk.entries != self.len {
            return Err(IndexError::Corrupted(format!(
                "tree counts {} entries but buckets hold {}",
                self.len, walk.entries
            )));
        }
        if walk.nodes != self.nodes.len() {
            return Err(IndexError::Corrupted(format!(
                "{} live nodes but {} reachable from the root",
                self.nodes.len(),
                walk.nodes
            )));
        }
        Ok(())
    }

    fn verify_node(&self, id: NodeId, depth: u32, walk: &mut VerifyWalk) -> Result<(), IndexError> {
        walk.nodes += 1;
        let node = &self.nodes[id];
        if node.depth != depth {
            return Err(IndexError::Corrupted(format!(
                "node {id} claims depth {} at depth {depth}",
                node.depth
            )));
        }
        if depth >= self.config.bit_width {
            return Err(IndexError::Corrupted(format!(
                "node {id} is deeper than the {} key bits",
                self.config.bit_width
            )));
        }

        for side in Side::BOTH {
            match node.slot(side) {
                Slot::Node(child) => self.verify_node(*child, depth + 1, walk)?,
                Slot::Bucket(entries) => {
                    if entries.len() > self.config.max_bucket_size {
                        return Err(IndexError::Corrupted(format!(
                            "bucket {side:?} of node {id} holds {} entries",
                            entries.len()
                        )));
                    }
                    if entries.windows(2).any(|w| w[0].key() > w[1].key()) {
                        return Err(IndexError::Corrupted(format!(
                            "bucket {side:?} of node {id} is out of order"
                        )));
                    }
                    for entry in entries {
                        let bits = self.key_to_bits(entry.key())?;
                        let location = self.locate(bits);
                        if location.node != id || location.side != side {
                            return Err(IndexError::Corrupted(format!(
                                "key {bits} is stored under node {id} but routes to node {}",
                                location.node
                            )));
                        }
                    }
                    walk.entries += entries.len();
                }
            }
        }
        Ok(())
    }

    fn locate(&self, bits: BitString) -> Location {
        let mut parent = None;
        let mut current = self.root;
        loop {
            let node = &self.nodes[current];
            let side = bits.side(node.depth, self.config.direction);
            match node.slot(side) {
                Slot::Node(child) => {
                    parent = Some((current, side));
                    current = *child;
                }
                Slot::Bucket(_) => {
                    return Location {
                        parent,
                        node: current,
                        side,
                    };
                }
            }
        }
    }

    fn bucket(&self, node: NodeId, side: Side) -> &Vec<Entry<K, V>> {
        self.nodes[node]
            .slot(side)
            .as_bucket()
            .unwrap_or_else(|| panic!("slot {side:?} of node {node} is not a bucket"))
    }

    fn bucket_mut(&mut self, node: NodeId, side: Side) -> &mut Vec<Entry<K, V>> {
        self.nodes[node]
            .slot_mut(side)
            .as_bucket_mut()
            .unwrap_or_else(|| panic!("slot {side:?} of node {node} is not a bucket"))
    }

    /// Fails if `keys`, placed into one node at `depth`, would keep
    /// overflowing until the key bits run out.
    fn ensure_splittable(&self, keys: &[BitString], depth: u32) -> Result<(), IndexError> {
        if depth >= self.config.bit_width {
            return Err(IndexError::IndexExhausted {
                bit_width: self.config.bit_width,
            });
        }
        let (left, right): (Vec<_>, Vec<_>) = keys
            .iter()
            .copied()
            .partition(|bits| bits.side(depth, self.config.direction) == Side::Left);
        for half in [left, right] {
            if half.len() > self.config.max_bucket_size {
                self.ensure_splittable(&half, depth + 1)?;
            }
        }
        Ok(())
    }

    /// Replaces the bucket at `side` of `node` with a node one level deeper.
    fn split_bucket(&mut self, node: NodeId, side: Side) -> Result<(), IndexError> {
        let depth = self.nodes[node].depth + 1;
        let sides = self
            .bucket(node, side)
            .iter()
            .map(|entry| Ok(self.key_to_bits(entry.key())?.side(depth, self.config.direction)))
            .collect::<Result<Vec<_>, IndexError>>()?;

        let entries = std::mem::take(self.bucket_mut(node, side));
        let mut child = HashNode::new(depth);
        for (entry, target) in entries.into_iter().zip(sides) {
            if let Slot::Bucket(bucket) = child.slot_mut(target) {
                bucket.push(entry);
            }
        }
        let overflowing: Vec<Side> = Side::BOTH
            .into_iter()
            .filter(|s| {
                child
                    .slot(*s)
                    .as_bucket()
                    .is_some_and(|b| b.len() > self.config.max_bucket_size)
            })
            .collect();

        let child = self.nodes.allocate(child);
        *self.nodes[node].slot_mut(side) = Slot::Node(child);
        debug!(%node, %child, depth, "bucket split");

        for side in overflowing {
            self.split_bucket(child, side)?;
        }
        Ok(())
    }

    pub(crate) fn nodes(&self) -> &Arena<HashNode<K, V>> {
        &self.nodes
    }
}

#[derive(Default)]
struct VerifyWalk {
    entries: usize,
    nodes: usize,
}

impl<K: HashKey + Ord, V> Index<K, V> for HashTree<K, V> {
    fn insert(&mut self, key: K, value: V) -> Result<(), IndexError> {
        HashTree::insert(self, key, value)
    }

    fn get(&self, key: &K) -> Result<Option<&V>, IndexError> {
        HashTree::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Result<Option<V>, IndexError> {
        HashTree::remove(self, key)
    }

    fn height(&self) -> usize {
        HashTree::height(self)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a K, &'a V)>
    where
        K: 'a,
        V: 'a,
    {
        HashTree::iter(self)
    }
}

impl<'a, K: HashKey + Ord, V> IntoIterator for &'a HashTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
