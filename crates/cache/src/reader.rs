//! Resource and bulk reader traits

use std::collections::BTreeMap;

use async_trait::async_trait;
use twingate_core::{RequestContext, ResourceFilter, Result};

static NO_TAGS: BTreeMap<String, String> = BTreeMap::new();

/// A resource that can live in a [`BatchingCache`](crate::BatchingCache).
///
/// `id()` is the store key. `name()` and `tags()` feed filter matching and
/// default to empty for resources that carry neither.
pub trait Identifiable: Clone + Send + Sync + 'static {
    /// Stable identifier of the resource.
    fn id(&self) -> &str;

    /// Display name of the resource.
    fn name(&self) -> &str {
        ""
    }

    /// Tags of the resource.
    fn tags(&self) -> &BTreeMap<String, String> {
        &NO_TAGS
    }

    /// Whether the resource passes `filter`.
    fn matches(&self, filter: &ResourceFilter) -> bool {
        filter.matches(self.name(), self.tags())
    }
}

/// Bulk read of every resource of one type.
///
/// The cache never reads single resources; misses are answered from whole
/// collections returned here.
#[async_trait]
pub trait BulkReader<T: Identifiable>: Send + Sync {
    /// Read the full collection.
    async fn read_all(&self, ctx: &RequestContext) -> Result<Vec<T>>;

    /// Read the resources matching `filter`.
    ///
    /// The default reads everything and filters locally; readers backed by
    /// a query that filters server-side should override it.
    async fn read_filtered(&self, ctx: &RequestContext, filter: &ResourceFilter) -> Result<Vec<T>> {
        let resources = self.read_all(ctx).await?;
        Ok(resources
            .into_iter()
            .filter(|resource| resource.matches(filter))
            .collect())
    }
}
