//! Outcome of a cache lookup.

use std::sync::Arc;

use twingate_core::Error;

/// Result of [`BatchingCache::get`](crate::BatchingCache::get).
///
/// Only `Found` carries a resource. The other variants tell a caller why the
/// cache could not answer, so it can decide whether to read the resource
/// directly.
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    /// The resource was in the store or arrived with a bulk read.
    Found(T),
    /// A bulk read completed and did not contain the id.
    Absent,
    /// The cache did not fetch: no reader, disabled, not running, or the
    /// window held fewer ids than the minimum batch size.
    Skipped,
    /// The bulk read for the id's window failed.
    Failed(Arc<Error>),
}

impl<T> Lookup<T> {
    /// Whether a resource was returned.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Borrow the resource, if found.
    #[must_use]
    pub fn as_found(&self) -> Option<&T> {
        match self {
            Self::Found(resource) => Some(resource),
            _ => None,
        }
    }

    /// The resource, if found.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(resource) => Some(resource),
            _ => None,
        }
    }

    /// The bulk read error, if the lookup failed.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    /// `None` becomes [`Lookup::Absent`].
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Self::Found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let found = Lookup::Found(7);
        assert!(found.is_found());
        assert_eq!(found.as_found(), Some(&7));
        assert_eq!(found.into_option(), Some(7));

        let failed: Lookup<i32> = Lookup::Failed(Arc::new(Error::mutation("nope")));
        assert!(!failed.is_found());
        assert!(failed.error().is_some());
        assert_eq!(failed.into_option(), None);

        assert!(Lookup::<i32>::Skipped.error().is_none());
    }

    #[test]
    fn test_from_option() {
        assert!(matches!(Lookup::from(Some("a")), Lookup::Found("a")));
        assert!(matches!(Lookup::<&str>::from(None), Lookup::Absent));
    }
}
