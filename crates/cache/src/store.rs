//! In-memory resource store

use std::collections::HashMap;

use parking_lot::RwLock;
use twingate_core::ResourceFilter;

use crate::Identifiable;

/// Resources keyed by id. Reads share the lock; writes are exclusive.
#[derive(Debug)]
pub(crate) struct ResourceStore<T> {
    entries: RwLock<HashMap<String, T>>,
}

impl<T> Default for ResourceStore<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Identifiable> ResourceStore<T> {
    pub(crate) fn get(&self, id: &str) -> Option<T> {
        self.entries.read().get(id).cloned()
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.entries.read().contains_key(id)
    }

    pub(crate) fn insert(&self, resource: T) {
        self.entries
            .write()
            .insert(resource.id().to_string(), resource);
    }

    /// Upsert every resource under one write lock, returning how many were written.
    pub(crate) fn insert_many(&self, resources: impl IntoIterator<Item = T>) -> usize {
        let mut entries = self.entries.write();
        let mut written = 0;
        for resource in resources {
            entries.insert(resource.id().to_string(), resource);
            written += 1;
        }
        written
    }

    pub(crate) fn remove(&self, id: &str) -> Option<T> {
        self.entries.write().remove(id)
    }

    pub(crate) fn clear(&self) {
        self.entries.write().clear();
    }

    pub(crate) fn matching(&self, filter: &ResourceFilter) -> Vec<T> {
        self.entries
            .read()
            .values()
            .filter(|resource| resource.matches(filter))
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Res(&'static str, u32);

    impl Identifiable for Res {
        fn id(&self) -> &str {
            self.0
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_upsert_and_remove() {
        let store = ResourceStore::default();
        assert_eq!(store.insert_many([Res("a", 1), Res("b", 1)]), 2);
        store.insert(Res("a", 2));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a"), Some(Res("a", 2)));
        assert_eq!(store.remove("b"), Some(Res("b", 1)));
        assert!(!store.contains("b"));

        store.clear();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_reads_are_copies() {
        let store = ResourceStore::default();
        store.insert(Res("a", 1));
        let mut copy = store.get("a").unwrap();
        copy.1 = 9;
        assert_eq!(store.get("a"), Some(Res("a", 1)));
    }

    #[test]
    fn test_matching() {
        let store = ResourceStore::default();
        store.insert_many([Res("alpha", 0), Res("beta", 0), Res("alps", 0)]);
        let mut names: Vec<_> = store
            .matching(&ResourceFilter::by_name("al").with_filter_by(twingate_core::FilterBy::Prefix))
            .into_iter()
            .map(|r| r.0)
            .collect();
        names.sort_unstable();
        assert_eq!(names, vec!["alpha", "alps"]);
    }
}
