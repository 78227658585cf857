//! Shared building blocks for the twingate-rs crates.
//!
//! - [`Error`] / [`Result`]: the error taxonomy of API calls, pagination and caching
//! - [`RequestContext`]: operation name, caller tag, correlation id and cancellation
//! - [`Variables`]: the GraphQL variable bag passed to queries and page callbacks
//! - [`ResourceFilter`]: name/tag matching shared by list queries and the cache
//! - [`config`]: environment override helpers
//! - [`tracing`]: subscriber setup for embedding processes

pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod tracing;
pub mod variables;

pub use context::{CACHE_CALLER, RequestContext};
pub use error::{Error, Result};
pub use filter::{FilterBy, ResourceFilter};
pub use variables::Variables;
