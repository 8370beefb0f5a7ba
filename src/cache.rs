//! A small bounded cache of per-entry-point scopes.
//!
//! Computing a [`Scope`] walks the reachable call graph of an entry point.
//! Tasks of the same entry point usually run close together, so the engine
//! keeps the most recent scopes around, evicting the oldest one once the cache
//! holds as many scopes as there are workers.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use crate::{entrypoint::EntryPoint, facts::Scope, Result};

/// A FIFO cache of [`Scope`]s keyed by entry point.
///
/// A miss recomputes the scope outside of the lock; two tasks missing at the
/// same time both compute it and the second insert is ignored.
#[derive(Debug)]
pub struct ContextCache {
    capacity: usize,
    entries: Mutex<VecDeque<(EntryPoint, Arc<Scope>)>>,
}

impl ContextCache {
    /// Creates a cache holding at most `capacity` scopes (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ContextCache {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Returns the scope of `entry_point`, computing it with `compute` on a
    /// miss.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the cache mutex is poisoned.
    pub fn get_or_insert_with<F>(&self, entry_point: &EntryPoint, compute: F) -> Result<Arc<Scope>>
    where
        F: FnOnce() -> Scope,
    {
        if let Some(scope) = self.get(entry_point)? {
            return Ok(scope);
        }

        let scope = Arc::new(compute());
        let mut entries = lock!(self.entries);
        if let Some((_, existing)) = entries.iter().find(|(ep, _)| ep == entry_point) {
            return Ok(Arc::clone(existing));
        }
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back((entry_point.clone(), Arc::clone(&scope)));
        Ok(scope)
    }

    /// Returns the cached scope of `entry_point`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the cache mutex is poisoned.
    pub fn get(&self, entry_point: &EntryPoint) -> Result<Option<Arc<Scope>>> {
        let entries = lock!(self.entries);
        Ok(entries
            .iter()
            .find(|(ep, _)| ep == entry_point)
            .map(|(_, scope)| Arc::clone(scope)))
    }

    /// Returns the number of cached scopes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the cache mutex is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(lock!(self.entries).len())
    }

    /// Returns the maximum number of cached scopes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::part::MethodId;

    fn scope(name: &str) -> Scope {
        Scope {
            entry: MethodId::new(name),
            methods: BTreeSet::new(),
        }
    }

    #[test]
    fn test_hit_does_not_recompute() {
        let cache = ContextCache::new(2);
        let ep = EntryPoint::new("<A: void a()>", "IA$Stub");
        cache.get_or_insert_with(&ep, || scope("a")).unwrap();
        let hit = cache
            .get_or_insert_with(&ep, || panic!("scope recomputed"))
            .unwrap();
        assert_eq!(hit.entry.as_str(), "a");
    }

    #[test]
    fn test_evicts_oldest() {
        let cache = ContextCache::new(2);
        let eps: Vec<EntryPoint> = (0..3)
            .map(|i| EntryPoint::new(format!("<A: void m{i}()>").as_str(), "IA$Stub"))
            .collect();
        for (i, ep) in eps.iter().enumerate() {
            cache.get_or_insert_with(ep, || scope(&i.to_string())).unwrap();
        }
        assert_eq!(cache.len().unwrap(), 2);
        assert!(cache.get(&eps[0]).unwrap().is_none());
        assert!(cache.get(&eps[2]).unwrap().is_some());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache = ContextCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }
}
