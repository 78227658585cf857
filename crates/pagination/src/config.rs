//! Pagination configuration

use serde::{Deserialize, Serialize};
use twingate_core::config::env_or;
use twingate_core::{Error, Result, Variables};

/// Environment variable overriding [`PaginationConfig::page_limit`].
pub const ENV_PAGE_LIMIT: &str = "TWINGATE_PAGE_LIMIT";

/// Environment variable overriding [`PaginationConfig::max_pages`]; `0` disables the cap.
pub const ENV_MAX_PAGES: &str = "TWINGATE_MAX_PAGES";

const DEFAULT_PAGE_LIMIT: usize = 50;
const DEFAULT_MAX_PAGES: usize = 10_000;

/// Settings applied to every paginated list query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Number of items requested per page.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Upper bound on pages fetched for one list, including the first.
    /// `None` follows cursors for as long as the server reports more pages.
    #[serde(default = "default_max_pages")]
    pub max_pages: Option<usize>,
}

fn default_page_limit() -> usize {
    DEFAULT_PAGE_LIMIT
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_pages() -> Option<usize> {
    Some(DEFAULT_MAX_PAGES)
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            max_pages: default_max_pages(),
        }
    }
}

impl PaginationConfig {
    /// Defaults overridden by `TWINGATE_PAGE_LIMIT` and `TWINGATE_MAX_PAGES`.
    #[must_use]
    pub fn from_env() -> Self {
        let max_pages = env_or(ENV_MAX_PAGES, DEFAULT_MAX_PAGES);
        Self {
            page_limit: env_or(ENV_PAGE_LIMIT, DEFAULT_PAGE_LIMIT),
            max_pages: (max_pages > 0).then_some(max_pages),
        }
    }

    /// Set the page size.
    #[must_use]
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// Set or remove the page cap.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Check the configuration for values the API would reject.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a zero page limit or a zero page cap.
    pub fn validate(&self) -> Result<()> {
        if self.page_limit == 0 {
            return Err(Error::configuration("page_limit must be greater than zero"));
        }
        if self.max_pages == Some(0) {
            return Err(Error::configuration(
                "max_pages must be greater than zero (use None for no cap)",
            ));
        }
        Ok(())
    }

    /// Variables for the first page of a list query whose cursor variable is `cursor_name`.
    #[must_use]
    pub fn first_page_variables(&self, cursor_name: &str) -> Variables {
        Variables::new()
            .cursor(cursor_name, None)
            .page_limit(self.page_limit)
    }
}
