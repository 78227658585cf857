//! Cursor pagination for GraphQL connection queries.
//!
//! List queries return a first page through the caller's normal query path;
//! [`PageAccumulator`] then drains the remaining pages by calling a
//! caller-supplied "next page" function with the last end cursor.
//!
//! ```ignore
//! use twingate_pagination::{Page, PageAccumulator, PaginationConfig};
//!
//! let first: Page<Connector> = client.read_connectors(&ctx, &vars).await?;
//! let mut acc = PageAccumulator::with_config(first, &config);
//! acc.fetch_pages(&ctx, &vars, |ctx, vars, cursor| {
//!     client.read_connectors_after(ctx, vars, cursor)
//! })
//! .await?;
//! let connectors = acc.into_items();
//! ```

mod accumulator;
mod config;
mod page;

pub use accumulator::PageAccumulator;
pub use config::{ENV_MAX_PAGES, ENV_PAGE_LIMIT, PaginationConfig};
pub use page::{Page, PageInfo};
