//! Cursor-following accumulation of connection pages.

use std::future::Future;

use tracing::{debug, warn};
use twingate_core::{Error, RequestContext, Result, Variables};

use crate::{Page, PageInfo, PaginationConfig};

/// Accumulates the items of a paginated list query.
///
/// The caller performs the first query itself and seeds the accumulator with
/// that page; [`fetch_pages`](Self::fetch_pages) then follows cursors for
/// pages 2..N. Items are kept in arrival order and are never rolled back: after
/// an error, [`items`](Self::items) holds everything fetched before it.
#[derive(Debug, Clone)]
pub struct PageAccumulator<T> {
    items: Vec<T>,
    page_info: PageInfo,
    pages_fetched: usize,
    max_pages: Option<usize>,
}

impl<T> PageAccumulator<T> {
    /// Seed the accumulator with the first page, using the default page cap.
    #[must_use]
    pub fn new(first: Page<T>) -> Self {
        Self::with_config(first, &PaginationConfig::default())
    }

    /// Seed the accumulator with the first page, taking the page cap from `config`.
    #[must_use]
    pub fn with_config(first: Page<T>, config: &PaginationConfig) -> Self {
        Self {
            items: first.edges,
            page_info: first.page_info,
            pages_fetched: 1,
            max_pages: config.max_pages,
        }
    }

    /// Override the page cap.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Follow cursors until the server reports no further page.
    ///
    /// `fetch_next` receives the context, the extra variables and the cursor
    /// of the last page, and returns the next page. Pages are requested
    /// strictly one after another.
    ///
    /// # Errors
    ///
    /// Stops at the first failure, keeping the items gathered so far:
    /// - [`Error::PageFetch`] wrapping the callback's error
    /// - [`Error::Cancelled`] if `ctx` is cancelled before a page is requested
    /// - [`Error::PageLimitExceeded`] if the page cap is reached while the
    ///   server still reports more pages
    pub async fn fetch_pages<F, Fut>(
        &mut self,
        ctx: &RequestContext,
        variables: &Variables,
        mut fetch_next: F,
    ) -> Result<()>
    where
        F: FnMut(RequestContext, Variables, String) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        while self.page_info.has_next_page {
            if let Some(max_pages) = self.max_pages.filter(|max| self.pages_fetched >= *max) {
                warn!(
                    operation = ctx.operation(),
                    max_pages,
                    items = self.items.len(),
                    "Page cap reached while the server still reports more pages"
                );
                return Err(Error::PageLimitExceeded { max_pages });
            }

            if ctx.is_cancelled() {
                debug!(
                    operation = ctx.operation(),
                    pages = self.pages_fetched,
                    "Pagination cancelled"
                );
                return Err(Error::cancelled(ctx.operation()));
            }

            let page = self.pages_fetched + 1;
            let cursor = self.page_info.cursor().to_string();
            let next = match fetch_next(ctx.clone(), variables.clone(), cursor).await {
                Ok(next) => next,
                Err(e) => {
                    warn!(
                        operation = ctx.operation(),
                        page,
                        items = self.items.len(),
                        error = %e,
                        "Failed to fetch page"
                    );
                    return Err(Error::page_fetch(page, e));
                }
            };

            debug!(
                operation = ctx.operation(),
                page,
                items = next.edges.len(),
                has_next_page = next.page_info.has_next_page,
                "Fetched page"
            );

            self.items.extend(next.edges);
            self.page_info = next.page_info;
            self.pages_fetched = page;
        }

        Ok(())
    }

    /// Items accumulated so far.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the accumulator, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Cursor state of the last page received.
    #[must_use]
    pub fn page_info(&self) -> &PageInfo {
        &self.page_info
    }

    /// Pages received so far, the seeding page included.
    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Whether the server reported a further page that has not been fetched.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.page_info.has_next_page
    }
}
