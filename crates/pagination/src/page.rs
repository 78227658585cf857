//! GraphQL connection page types.

use std::future::Future;

use serde::{Deserialize, Serialize};
use twingate_core::{RequestContext, Result, Variables};

use crate::{PageAccumulator, PaginationConfig};

/// Cursor state reported with every page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether the server has another page after this one.
    #[serde(default)]
    pub has_next_page: bool,
    /// Opaque cursor to resume from; `null` on empty connections.
    #[serde(default)]
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Page info of a final page.
    #[must_use]
    pub fn last() -> Self {
        Self::default()
    }

    /// Page info announcing another page after `cursor`.
    #[must_use]
    pub fn next(cursor: impl Into<String>) -> Self {
        Self {
            has_next_page: true,
            end_cursor: Some(cursor.into()),
        }
    }

    /// The end cursor, or `""` when the server sent none.
    #[must_use]
    pub fn cursor(&self) -> &str {
        self.end_cursor.as_deref().unwrap_or_default()
    }
}

/// One page of a connection: its edges plus [`PageInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Cursor state of this page
    #[serde(default)]
    pub page_info: PageInfo,
    /// Items of this page, in server order
    #[serde(default)]
    pub edges: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            page_info: PageInfo::default(),
            edges: Vec::new(),
        }
    }
}

impl<T> Page<T> {
    /// Create a page from its parts.
    #[must_use]
    pub fn new(edges: Vec<T>, page_info: PageInfo) -> Self {
        Self { page_info, edges }
    }

    /// A final page.
    #[must_use]
    pub fn last(edges: Vec<T>) -> Self {
        Self::new(edges, PageInfo::last())
    }

    /// A page followed by another one at `cursor`.
    #[must_use]
    pub fn with_next(edges: Vec<T>, cursor: impl Into<String>) -> Self {
        Self::new(edges, PageInfo::next(cursor))
    }

    /// Drain the remaining pages and return every item.
    ///
    /// Convenience over [`PageAccumulator::fetch_pages`] for callers that treat
    /// any page failure as a failure of the whole list.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`PageAccumulator::fetch_pages`]; items
    /// gathered before it are dropped.
    pub async fn fetch_all<F, Fut>(
        self,
        ctx: &RequestContext,
        variables: &Variables,
        config: &PaginationConfig,
        fetch_next: F,
    ) -> Result<Vec<T>>
    where
        F: FnMut(RequestContext, Variables, String) -> Fut,
        Fut: Future<Output = Result<Self>>,
    {
        let mut accumulator = PageAccumulator::with_config(self, config);
        accumulator.fetch_pages(ctx, variables, fetch_next).await?;
        Ok(accumulator.into_items())
    }
}
