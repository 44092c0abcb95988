//! Shared ownership of an index across threads.
//!
//! The index structures themselves are single-writer. [`SharedIndex`] puts
//! one behind a `parking_lot` read-write lock: any number of readers, or one
//! writer, at a time.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::index::{Index, IndexError};

#[derive(Debug)]
pub struct SharedIndex<I> {
    inner: Arc<RwLock<I>>,
}

impl<I> Clone for SharedIndex<I> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<I: Default> Default for SharedIndex<I> {
    fn default() -> Self {
        Self::new(I::default())
    }
}

impl<I> SharedIndex<I> {
    pub fn new(index: I) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, I> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, I> {
        self.inner.write()
    }

    /// Returns the index if this is the last handle, otherwise gives the
    /// handle back.
    pub fn into_inner(self) -> Result<I, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }

    pub fn insert<K, V>(&self, key: K, value: V) -> Result<(), IndexError>
    where
        I: Index<K, V>,
    {
        self.inner.write().insert(key, value)
    }

    pub fn get_cloned<K, V: Clone>(&self, key: &K) -> Result<Option<V>, IndexError>
    where
        I: Index<K, V>,
    {
        Ok(self.inner.read().get(key)?.cloned())
    }

    pub fn remove<K, V>(&self, key: &K) -> Result<Option<V>, IndexError>
    where
        I: Index<K, V>,
    {
        self.inner.write().remove(key)
    }

    /// Every entry in traversal order, collected under one read lock.
    pub fn snapshot<K: Clone, V: Clone>(&self) -> Vec<(K, V)>
    where
        I: Index<K, V>,
    {
        let guard = self.inner.read();
        <I as Index<K, V>>::iter(&guard)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
