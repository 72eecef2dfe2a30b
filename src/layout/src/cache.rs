use std::fmt::Debug;
use std::hash::Hash;

use derivative::Derivative;
use fnv::FnvHashMap;
use parking_lot::Mutex;

/// A cache whose committed entries are read without synchronization.
/// New entries go to a locked staging area until `commit` is called.
///
/// Layout computation recurses into the cache, so the lock is never
/// held while a value is being built. When two threads race on the
/// same key, the first value to be staged wins and both callers
/// receive it.
#[derive(Derivative)]
#[derivative(Debug(bound = "FnvHashMap<K, V>: Debug"))]
pub(crate) struct StagedCache<K, V> {
    committed: FnvHashMap<K, V>,
    staged: Mutex<FnvHashMap<K, V>>,
}

impl<K, V> Default for StagedCache<K, V> {
    fn default() -> Self {
        StagedCache {
            committed: Default::default(),
            staged: Default::default(),
        }
    }
}

impl<K, V> StagedCache<K, V> {
    pub(crate) fn new() -> Self {
        Default::default()
    }
}

impl<K, V> StagedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn get_committed(&self, key: &K) -> Option<&V> {
        self.committed.get(key)
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        if let Some(val) = self.get_committed(key) {
            return Some(val.clone());
        }
        self.staged.lock().get(key).cloned()
    }

    /// Commits all staged additions.
    pub(crate) fn commit(&mut self) {
        self.committed.extend(std::mem::take(self.staged.get_mut()));
    }

    pub(crate) fn staged_len(&self) -> usize {
        self.staged.lock().len()
    }

    pub(crate) fn len(&self) -> usize {
        self.committed.len() + self.staged_len()
    }

    pub(crate) fn get_or_try_insert_with<E>(
        &self,
        key: &K,
        f: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(val) = self.get(key) {
            return Ok(val);
        }
        let val = f()?;
        let mut staged = self.staged.lock();
        Ok(staged.entry(key.clone()).or_insert(val).clone())
    }
}
