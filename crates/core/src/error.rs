//! Error types shared by the twingate-rs crates

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using the crate-wide error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by API calls, pagination and the resource cache.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// An API operation on a resource failed.
    #[error(
        "failed to {operation} {resource}{}",
        api_suffix(id.as_deref(), name.as_deref(), message.as_deref())
    )]
    #[diagnostic(code(twingate::api::operation_failed))]
    Api {
        /// Operation that failed (e.g. "read", "create")
        operation: String,
        /// Resource kind the operation targeted (e.g. "connector")
        resource: String,
        /// Identifier of the targeted resource, if known
        id: Option<String>,
        /// Name of the targeted resource, if known
        name: Option<String>,
        /// Underlying failure description
        message: Option<String>,
    },

    /// The server answered with a non-success HTTP status.
    #[error("request {request_uri} failed, status {status}, body {body}")]
    #[diagnostic(code(twingate::api::http))]
    Http {
        /// Request URI
        request_uri: String,
        /// HTTP status code
        status: u16,
        /// Response body, lossily decoded
        body: String,
    },

    /// A mutation returned `ok: false`.
    #[error("{message}")]
    #[diagnostic(code(twingate::api::mutation))]
    Mutation {
        /// Error message reported by the mutation payload
        message: String,
    },

    /// Fetching a follow-up page failed.
    #[error("failed to fetch page {page}: {source}")]
    #[diagnostic(
        code(twingate::pagination::page_fetch),
        help("Items from earlier pages are kept on the accumulator")
    )]
    PageFetch {
        /// 1-based number of the page that failed
        page: usize,
        /// The error returned by the page callback
        #[source]
        source: Box<Error>,
    },

    /// The server never stopped reporting further pages.
    #[error("pagination stopped after {max_pages} pages: server still reports more pages")]
    #[diagnostic(
        code(twingate::pagination::page_limit),
        help("Raise `max_pages` or check the backend's cursor handling")
    )]
    PageLimitExceeded {
        /// The configured page cap
        max_pages: usize,
    },

    /// The request context was cancelled.
    #[error("operation '{operation}' was cancelled")]
    #[diagnostic(code(twingate::cancelled))]
    Cancelled {
        /// Operation that observed the cancellation
        operation: String,
    },

    /// Invalid configuration value.
    #[error("configuration error: {message}")]
    #[diagnostic(code(twingate::config))]
    Configuration {
        /// Description of the invalid value
        message: String,
    },

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(twingate::serialization))]
    Serialization(#[from] serde_json::Error),
}

fn api_suffix(id: Option<&str>, name: Option<&str>, message: Option<&str>) -> String {
    let mut suffix = String::new();
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        suffix.push_str(" with id ");
        suffix.push_str(id);
    }
    if let Some(name) = name.filter(|name| !name.is_empty()) {
        suffix.push_str(" with name ");
        suffix.push_str(name);
    }
    if let Some(message) = message {
        suffix.push_str(": ");
        suffix.push_str(message);
    }
    suffix
}

impl Error {
    /// Create an API error for `operation` on `resource`.
    #[must_use]
    pub fn api(operation: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            resource: resource.into(),
            id: None,
            name: None,
            message: None,
        }
    }

    /// Attach the target resource id to an [`Error::Api`]. Other variants are returned unchanged.
    #[must_use]
    pub fn with_id(mut self, value: impl Into<String>) -> Self {
        if let Self::Api { id, .. } = &mut self {
            *id = Some(value.into());
        }
        self
    }

    /// Attach the target resource name to an [`Error::Api`].
    #[must_use]
    pub fn with_name(mut self, value: impl Into<String>) -> Self {
        if let Self::Api { name, .. } = &mut self {
            *name = Some(value.into());
        }
        self
    }

    /// Attach the underlying cause to an [`Error::Api`].
    #[must_use]
    pub fn with_message(mut self, value: impl std::fmt::Display) -> Self {
        if let Self::Api { message, .. } = &mut self {
            *message = Some(value.to_string());
        }
        self
    }

    /// Create an HTTP error from a response.
    #[must_use]
    pub fn http(request_uri: impl Into<String>, status: u16, body: &[u8]) -> Self {
        Self::Http {
            request_uri: request_uri.into(),
            status,
            body: String::from_utf8_lossy(body).into_owned(),
        }
    }

    /// Create a mutation error.
    #[must_use]
    pub fn mutation(message: impl Into<String>) -> Self {
        Self::Mutation {
            message: message.into(),
        }
    }

    /// Wrap a page callback failure.
    #[must_use]
    pub fn page_fetch(page: usize, source: Self) -> Self {
        Self::PageFetch {
            page,
            source: Box::new(source),
        }
    }

    /// Create a cancellation error.
    #[must_use]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether retrying the failed call later could succeed.
    ///
    /// Rate limiting and server-side failures are transient; everything else
    /// (bad input, cancellation, runaway pagination) is not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::PageFetch { source, .. } => source.is_retryable(),
            Self::Api { .. }
            | Self::Mutation { .. }
            | Self::PageLimitExceeded { .. }
            | Self::Cancelled { .. }
            | Self::Configuration { .. }
            | Self::Serialization(_) => false,
        }
    }
}
