//! Ordered index: B+ tree with a doubly linked leaf chain.
//!
//! Leaves hold the entries sorted by key (duplicates allowed), internal nodes
//! hold `(routing key, child)` pairs where the routing key is an upper bound of
//! every key in the child. A search takes the first route whose key is `>=`
//! the search key, or the last route when none qualifies, and then walks the
//! leaf chain forward while the key can still show up.
//!
//! Leaves split once they hold more than `floor(n * ff)` entries, internal
//! nodes once they hold more than `n` routes. Splits propagate upward and
//! grow the tree by one level when the root splits. Deletion rebalances an
//! underflowing node by borrowing from an adjacent sibling that can spare an
//! entry, otherwise by merging with it, and shrinks the tree when the root is
//! left with a single child.

mod cursor;
mod node;

use tracing::{debug, trace};

use crate::config::{BPlusTreeConfig, Thresholds};
use crate::entry::{Entry, lower_bound};
use crate::in_memory::{Arena, NodeId};
use crate::index::{Generation, Index, IndexError};

pub use cursor::{Cursor, Iter};
pub(crate) use node::{InternalNode, LeafNode, Node, Route};

/// Root-to-node path: every internal node passed and the slot taken in it.
type Path = Vec<(NodeId, usize)>;

/// Entry or route moved between two siblings while rebalancing.
enum Moved<K, V> {
    Entry(Entry<K, V>),
    Route(Route<K>),
}

#[derive(Debug)]
pub struct BPlusTree<K, V> {
    nodes: Arena<Node<K, V>>,
    root: NodeId,
    config: BPlusTreeConfig,
    thresholds: Thresholds,
    len: usize,
    generation: Generation,
}

impl<K: Ord + Clone, V> Default for BPlusTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V> BPlusTree<K, V> {
    pub fn new() -> Self {
        Self::with_config(BPlusTreeConfig::default())
    }

    /// Creates an empty tree. Out-of-range configuration values are clamped,
    /// see [`BPlusTreeConfig::effective`].
    pub fn with_config(config: BPlusTreeConfig) -> Self {
        let config = config.effective();
        let mut nodes = Arena::new();
        let root = nodes.allocate(Node::Leaf(LeafNode::new()));
        Self {
            nodes,
            root,
            config,
            thresholds: config.thresholds(),
            len: 0,
            generation: Generation::default(),
        }
    }

    /// Configuration the tree actually runs with.
    pub fn config(&self) -> BPlusTreeConfig {
        self.config
    }

    /// Maximum entries a leaf holds before it splits.
    pub fn leaf_capacity(&self) -> usize {
        self.thresholds.leaf_capacity
    }

    /// Minimum entries a non-root leaf holds after a deletion.
    pub fn leaf_min_occupancy(&self) -> usize {
        self.thresholds.leaf_min
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

    /// Number of levels from the root to the leaves, `1` for a lone root leaf.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Internal(node) = &self.nodes[current] {
            current = node.routes[0].child;
            height += 1;
        }
        height
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|(_, node)| node.is_leaf()).count()
    }

    pub fn insert(&mut self, key: K, value: V) {
        let mut path = Path::new();
        let mut current = self.root;
        while let Node::Internal(node) = &mut self.nodes[current] {
            let slot = node.route_for(&key);
            let route = &mut node.routes[slot];
            // Only the last route can be below the key, keep it an upper bound.
            if route.key < key {
                route.key = key.clone();
            }
            path.push((current, slot));
            current = route.child;
        }

        self.leaf_mut(current).insert(Entry::new(key, value));
        self.len += 1;
        self.generation.bump();
        self.split_overflowing(current, path);
    }

    /// Value of the first entry stored under `key` in ascending order.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut current = Some(self.find_leaf(key));
        while let Some(id) = current {
            let leaf = self.leaf(id);
            let pos = lower_bound(&leaf.entries, key);
            if let Some(entry) = leaf.entries.get(pos) {
                return (entry.key() == key).then(|| entry.value());
            }
            current = leaf.next;
        }
        None
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Values of every entry stored under `key`, in chain order.
    pub fn get_all(&self, key: &K) -> Vec<&V> {
        let mut values = Vec::new();
        let mut current = Some(self.find_leaf(key));
        while let Some(id) = current {
            let leaf = self.leaf(id);
            let start = lower_bound(&leaf.entries, key);
            for entry in &leaf.entries[start..] {
                if entry.key() != key {
                    return values;
                }
                values.push(entry.value());
            }
            current = leaf.next;
        }
        values
    }

    /// Replaces the value of the first entry stored under `key` and returns
    /// the previous one. The tree shape does not change.
    pub fn update(&mut self, key: &K, value: V) -> Option<V> {
        let (_, leaf, pos) = self.find_first(key)?;
        Some(self.leaf_mut(leaf).entries[pos].replace_value(value))
    }

    /// Removes the first entry stored under `key` and returns its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (path, leaf, pos) = self.find_first(key)?;
        let entry = self.leaf_mut(leaf).entries.remove(pos);
        self.len -= 1;
        self.generation.bump();
        self.rebalance(leaf, path);
        Some(entry.into_value())
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        let mut current = Some(self.rightmost_leaf());
        while let Some(id) = current {
            let leaf = self.leaf(id);
            if let Some(entry) = leaf.entries.last() {
                return Some(entry.as_pair());
            }
            current = leaf.prev;
        }
        None
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.allocate(Node::Leaf(LeafNode::new()));
        self.len = 0;
        self.generation.bump();
    }

    /// Entries in ascending key order, following the leaf chain.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self)
    }

    /// Detached traversal that fails once the tree is structurally modified.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self)
    }

    /// Checks ordering, balance, occupancy, routing bounds, the leaf chain
    /// and the entry count.
    pub fn verify(&self) -> Result<(), IndexError> {
        let mut walk = VerifyWalk {
            leaf_depth: None,
            leaves: Vec::new(),
            entries: 0,
            nodes: 0,
        };
        self.verify_node(self.root, 1, None, None, true, &mut walk)?;

        if walk.entries != self.len {
            return Err(IndexError::Corrupted(format!(
                "tree counts {} entries but leaves hold {}",
                self.len, walk.entries
            )));
        }

        let mut prev = None;
        let mut current = Some(self.leftmost_leaf());
        for expected in &walk.leaves {
            let Some(id) = current else {
                return Err(IndexError::Corrupted(format!(
                    "leaf chain ends before leaf {expected}"
                )));
            };
            if id != *expected {
                return Err(IndexError::Corrupted(format!(
                    "leaf chain visits {id} where {expected} was expected"
                )));
            }
            let leaf = self.leaf(id);
            if leaf.prev != prev {
                return Err(IndexError::Corrupted(format!(
                    "leaf {id} has a broken back link"
                )));
            }
            prev = Some(id);
            current = leaf.next;
        }
        if let Some(id) = current {
            return Err(IndexError::Corrupted(format!(
                "leaf chain continues to unreachable leaf {id}"
            )));
        }
        if self.nodes.len() != walk.nodes {
            return Err(IndexError::Corrupted(format!(
                "{} live nodes but {} reachable from the root",
                self.nodes.len(),
                walk.nodes
            )));
        }
        Ok(())
    }

    pub(crate) fn leaf(&self, id: NodeId) -> &LeafNode<K, V> {
        self.nodes[id]
            .as_leaf()
            .unwrap_or_else(|| panic!("node {id} is not a leaf"))
    }

    fn leaf_mut(&mut self, id: NodeId) -> &mut LeafNode<K, V> {
        self.nodes[id]
            .as_leaf_mut()
            .unwrap_or_else(|| panic!("node {id} is not a leaf"))
    }

    fn internal(&self, id: NodeId) -> &InternalNode<K> {
        self.nodes[id]
            .as_internal()
            .unwrap_or_else(|| panic!("node {id} is not internal"))
    }

    fn internal_mut(&mut self, id: NodeId) -> &mut InternalNode<K> {
        self.nodes[id]
            .as_internal_mut()
            .unwrap_or_else(|| panic!("node {id} is not internal"))
    }

    pub(crate) fn nodes(&self) -> &Arena<Node<K, V>> {
        &self.nodes
    }

    pub(crate) fn leftmost_leaf(&self) -> NodeId {
        let mut current = self.root;
        while let Node::Internal(node) = &self.nodes[current] {
            current = node.routes[0].child;
        }
        current
    }

    fn rightmost_leaf(&self) -> NodeId {
        let mut current = self.root;
        while let Node::Internal(node) = &self.nodes[current] {
            current = node.routes[node.routes.len() - 1].child;
        }
        current
    }

    /// Leaf the routing keys lead to. The first entry `>= key` is in this
    /// leaf or in one of its successors.
    fn find_leaf(&self, key: &K) -> NodeId {
        let mut current = self.root;
        while let Node::Internal(node) = &self.nodes[current] {
            current = node.routes[node.route_for(key)].child;
        }
        current
    }

    /// Locates the first entry stored under `key` together with the path to
    /// its leaf.
    fn find_first(&self, key: &K) -> Option<(Path, NodeId, usize)> {
        let mut path = Path::new();
        let mut current = self.root;
        while let Node::Internal(node) = &self.nodes[current] {
            let slot = node.route_for(key);
            path.push((current, slot));
            current = node.routes[slot].child;
        }

        loop {
            let leaf = self.leaf(current);
            let pos = lower_bound(&leaf.entries, key);
            if let Some(entry) = leaf.entries.get(pos) {
                return (entry.key() == key).then_some((path, current, pos));
            }
            current = self.next_leaf(&mut path)?;
        }
    }

    /// Moves `path` from the current leaf to the next one in key order.
    fn next_leaf(&self, path: &mut Path) -> Option<NodeId> {
        while let Some((node, slot)) = path.pop() {
            let routes = &self.internal(node).routes;
            if slot + 1 < routes.len() {
                path.push((node, slot + 1));
                let mut current = routes[slot + 1].child;
                while let Node::Internal(inner) = &self.nodes[current] {
                    path.push((current, 0));
                    current = inner.routes[0].child;
                }
                return Some(current);
            }
        }
        None
    }

    fn max_key_of(&self, id: NodeId) -> K {
        self.nodes[id]
            .max_key()
            .cloned()
            .expect("split and rebalanced nodes are never empty")
    }

    fn overflows(&self, id: NodeId) -> bool {
        match &self.nodes[id] {
            Node::Leaf(leaf) => leaf.entries.len() > self.thresholds.leaf_capacity,
            Node::Internal(node) => node.routes.len() > self.thresholds.internal_capacity,
        }
    }

    fn underflows(&self, id: NodeId) -> bool {
        match &self.nodes[id] {
            Node::Leaf(leaf) => leaf.entries.len() < self.thresholds.leaf_min,
            Node::Internal(node) => node.routes.len() < self.thresholds.internal_min,
        }
    }

    fn can_lend(&self, id: NodeId) -> bool {
        match &self.nodes[id] {
            Node::Leaf(leaf) => leaf.entries.len() > self.thresholds.leaf_min,
            Node::Internal(node) => node.routes.len() > self.thresholds.internal_min,
        }
    }

    /// Splits `current` and its ancestors while they overflow.
    fn split_overflowing(&mut self, mut current: NodeId, mut path: Path) {
        while self.overflows(current) {
            let right = self.split_node(current);
            let left_key = self.max_key_of(current);
            let right_key = self.max_key_of(right);

            match path.pop() {
                Some((parent, slot)) => {
                    let routes = &mut self.internal_mut(parent).routes;
                    routes[slot].key = left_key;
                    routes.insert(
                        slot + 1,
                        Route {
                            key: right_key,
                            child: right,
                        },
                    );
                    current = parent;
                }
                None => {
                    let root = InternalNode {
                        routes: vec![
                            Route {
                                key: left_key,
                                child: current,
                            },
                            Route {
                                key: right_key,
                                child: right,
                            },
                        ],
                    };
                    self.root = self.nodes.allocate(Node::Internal(root));
                    debug!(root = %self.root, height = self.height(), "root split");
                    return;
                }
            }
        }
    }

    /// Moves the upper half of `id` into a new right sibling and returns it.
    fn split_node(&mut self, id: NodeId) -> NodeId {
        let right_node = match &mut self.nodes[id] {
            Node::Leaf(leaf) => {
                let mid = leaf.entries.len() / 2;
                Node::Leaf(LeafNode {
                    entries: leaf.entries.split_off(mid),
                    prev: Some(id),
                    next: leaf.next,
                })
            }
            Node::Internal(node) => {
                let mid = node.routes.len() / 2;
                Node::Internal(InternalNode {
                    routes: node.routes.split_off(mid),
                })
            }
        };
        let next = right_node.as_leaf().map(|leaf| leaf.next);
        let right = self.nodes.allocate(right_node);

        match next {
            Some(next) => {
                self.leaf_mut(id).next = Some(right);
                if let Some(next) = next {
                    self.leaf_mut(next).prev = Some(right);
                }
                trace!(left = %id, %right, "leaf split");
            }
            None => trace!(left = %id, %right, "internal node split"),
        }
        right
    }

    /// Restores minimum occupancy from `current` up to the root.
    fn rebalance(&mut self, mut current: NodeId, mut path: Path) {
        while let Some((parent, slot)) = path.pop() {
            if !self.underflows(current) {
                return;
            }

            let routes = &self.internal(parent).routes;
            let left = slot.checked_sub(1).map(|s| routes[s].child);
            let right = routes.get(slot + 1).map(|r| r.child);

            if left.is_some_and(|l| self.can_lend(l)) {
                self.borrow_from_left(parent, slot);
                return;
            }
            if right.is_some_and(|r| self.can_lend(r)) {
                self.borrow_from_right(parent, slot);
                return;
            }
            if left.is_some() {
                self.merge_children(parent, slot - 1);
            } else if right.is_some() {
                self.merge_children(parent, slot);
            } else {
                // Non-root internal nodes keep at least two children, so
                // only a root child can be an only child.
                return;
            }
            current = parent;
        }
        self.collapse_root();
    }

    fn borrow_from_left(&mut self, parent: NodeId, slot: usize) {
        let routes = &self.internal(parent).routes;
        let (left, current) = (routes[slot - 1].child, routes[slot].child);

        let moved = self.take_last(left);
        match (&mut self.nodes[current], moved) {
            (Node::Leaf(leaf), Moved::Entry(entry)) => leaf.entries.insert(0, entry),
            (Node::Internal(node), Moved::Route(route)) => node.routes.insert(0, route),
            _ => unreachable!("siblings are on the same level"),
        }

        let left_key = self.max_key_of(left);
        self.internal_mut(parent).routes[slot - 1].key = left_key;
        trace!(from = %left, to = %current, "borrowed from left sibling");
    }

    fn borrow_from_right(&mut self, parent: NodeId, slot: usize) {
        let routes = &self.internal(parent).routes;
        let (current, right) = (routes[slot].child, routes[slot + 1].child);

        let moved = self.take_first(right);
        match (&mut self.nodes[current], moved) {
            (Node::Leaf(leaf), Moved::Entry(entry)) => leaf.entries.push(entry),
            (Node::Internal(node), Moved::Route(route)) => node.routes.push(route),
            _ => unreachable!("siblings are on the same level"),
        }

        let current_key = self.max_key_of(current);
        self.internal_mut(parent).routes[slot].key = current_key;
        trace!(from = %right, to = %current, "borrowed from right sibling");
    }

    fn take_last(&mut self, id: NodeId) -> Moved<K, V> {
        match &mut self.nodes[id] {
            Node::Leaf(leaf) => Moved::Entry(leaf.entries.pop().expect("lender is not empty")),
            Node::Internal(node) => Moved::Route(node.routes.pop().expect("lender is not empty")),
        }
    }

    fn take_first(&mut self, id: NodeId) -> Moved<K, V> {
        match &mut self.nodes[id] {
            Node::Leaf(leaf) => Moved::Entry(leaf.entries.remove(0)),
            Node::Internal(node) => Moved::Route(node.routes.remove(0)),
        }
    }

    /// Merges the child at `left_slot + 1` into the child at `left_slot`.
    fn merge_children(&mut self, parent: NodeId, left_slot: usize) {
        let routes = &self.internal(parent).routes;
        let (left, right) = (routes[left_slot].child, routes[left_slot + 1].child);

        let right_node = self.nodes.release(right);
        let next = match (&mut self.nodes[left], right_node) {
            (Node::Leaf(leaf), Node::Leaf(mut absorbed)) => {
                leaf.entries.append(&mut absorbed.entries);
                leaf.next = absorbed.next;
                absorbed.next
            }
            (Node::Internal(node), Node::Internal(mut absorbed)) => {
                node.routes.append(&mut absorbed.routes);
                None
            }
            _ => unreachable!("siblings are on the same level"),
        };
        if let Some(next) = next {
            self.leaf_mut(next).prev = Some(left);
        }

        let routes = &mut self.internal_mut(parent).routes;
        let removed = routes.remove(left_slot + 1);
        routes[left_slot].key = removed.key;
        trace!(%left, %right, "merged siblings");
    }

    /// Replaces an internal root that is left with a single child by that
    /// child.
    fn collapse_root(&mut self) {
        while let Node::Internal(root) = &self.nodes[self.root] {
            if root.routes.len() != 1 {
                break;
            }
            let child = root.routes[0].child;
            self.nodes.release(self.root);
            self.root = child;
            debug!(root = %self.root, height = self.height(), "root collapsed");
        }
    }

    fn verify_node<'a>(
        &'a self,
        id: NodeId,
        depth: usize,
        lower: Option<&'a K>,
        upper: Option<&'a K>,
        is_root: bool,
        walk: &mut VerifyWalk,
    ) -> Result<(), IndexError> {
        walk.nodes += 1;
        let node = &self.nodes[id];
        let (capacity, min) = if node.is_leaf() {
            (self.thresholds.leaf_capacity, self.thresholds.leaf_min)
        } else {
            (self.thresholds.internal_capacity, self.thresholds.internal_min)
        };
        if node.len() > capacity {
            return Err(IndexError::Corrupted(format!(
                "node {id} holds {} entries, capacity is {capacity}",
                node.len()
            )));
        }
        if !is_root && node.len() < min {
            return Err(IndexError::Corrupted(format!(
                "node {id} holds {} entries, minimum is {min}",
                node.len()
            )));
        }

        match node {
            Node::Leaf(leaf) => {
                match walk.leaf_depth {
                    None => walk.leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(IndexError::Corrupted(format!(
                            "leaf {id} at depth {depth}, other leaves at depth {expected}"
                        )));
                    }
                    Some(_) => {}
                }
                if leaf.entries.windows(2).any(|w| w[0].key() > w[1].key()) {
                    return Err(IndexError::Corrupted(format!(
                        "leaf {id} entries are out of order"
                    )));
                }
                let out_of_range = leaf.entries.iter().any(|e| {
                    lower.is_some_and(|l| e.key() < l) || upper.is_some_and(|u| e.key() > u)
                });
                if out_of_range {
                    return Err(IndexError::Corrupted(format!(
                        "leaf {id} holds a key outside of its routing range"
                    )));
                }
                walk.leaves.push(id);
                walk.entries += leaf.entries.len();
            }
            Node::Internal(internal) => {
                if internal.routes.is_empty() {
                    return Err(IndexError::Corrupted(format!(
                        "internal node {id} has no children"
                    )));
                }
                let mut child_lower = lower;
                for route in &internal.routes {
                    if child_lower.is_some_and(|l| route.key < *l)
                        || upper.is_some_and(|u| route.key > *u)
                    {
                        return Err(IndexError::Corrupted(format!(
                            "internal node {id} routing keys are out of order"
                        )));
                    }
                    self.verify_node(
                        route.child,
                        depth + 1,
                        child_lower,
                        Some(&route.key),
                        false,
                        walk,
                    )?;
                    child_lower = Some(&route.key);
                }
            }
        }
        Ok(())
    }
}

struct VerifyWalk {
    leaf_depth: Option<usize>,
    leaves: Vec<NodeId>,
    entries: usize,
    nodes: usize,
}

impl<K: Ord + Clone, V> Index<K, V> for BPlusTree<K, V> {
    fn insert(&mut self, key: K, value: V) -> Result<(), IndexError> {
        BPlusTree::insert(self, key, value);
        Ok(())
    }

    fn get(&self, key: &K) -> Result<Option<&V>, IndexError> {
        Ok(BPlusTree::get(self, key))
    }

    fn remove(&mut self, key: &K) -> Result<Option<V>, IndexError> {
        Ok(BPlusTree::remove(self, key))
    }

    fn height(&self) -> usize {
        BPlusTree::height(self)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn iter<'a>(&'a self) -> impl Iterator<Item = (&'a K, &'a V)>
    where
        K: 'a,
        V: 'a,
    {
        BPlusTree::iter(self)
    }
}

impl<K: Ord + Clone, V> Extend<(K, V)> for BPlusTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord + Clone, V> FromIterator<(K, V)> for BPlusTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<'a, K: Ord + Clone, V> IntoIterator for &'a BPlusTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
