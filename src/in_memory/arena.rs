use std::fmt;
use std::ops::{Index, IndexMut};

/// Stable handle of a node stored in an [`Arena`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(u32);

impl NodeId {
    /// # Panics
    ///
    /// Panics if `index` does not fit a `u32` handle.
    fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).expect("arena exceeds u32::MAX slots"))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Slot storage for tree nodes.
///
/// Parents refer to their children through [`NodeId`] handles, so replacing a
/// child is a handle reassignment in the parent and no node ever points back
/// to its owner. Released slots are reused by later allocations.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<NodeId>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn allocate(&mut self, node: T) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            id
        } else {
            let id = NodeId::from_index(self.slots.len());
            self.slots.push(Some(node));
            id
        }
    }

    /// Takes the node out of its slot and marks the slot as reusable.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a live node.
    pub fn release(&mut self, id: NodeId) -> T {
        let node = self
            .slots
            .get_mut(id.index())
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("release of dangling node handle {id}"));
        self.free.push(id);
        node
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Count of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count of allocated slots, live or free.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (NodeId::from_index(i), node)))
    }
}

impl<T> Index<NodeId> for Arena<T> {
    type Output = T;

    fn index(&self, id: NodeId) -> &T {
        self.get(id)
            .unwrap_or_else(|| panic!("dangling node handle {id}"))
    }
}

impl<T> IndexMut<NodeId> for Arena<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("dangling node handle {id}"))
    }
}
