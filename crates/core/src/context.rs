//! Request-scoped context threaded through API calls.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Caller tag used for reads issued by the resource cache itself.
pub const CACHE_CALLER: &str = "cache";

/// Context carried by every API call: which operation is running, who issued
/// it, the correlation id sent to the server, and a cancellation token.
///
/// Cloning is cheap; clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    operation: Option<Arc<str>>,
    caller: Option<Arc<str>>,
    correlation_id: Uuid,
    cancel: CancellationToken,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    /// Create a root context with a fresh correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            operation: None,
            caller: None,
            correlation_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the operation name (e.g. `readConnectors`).
    #[must_use]
    pub fn with_operation(mut self, operation: impl AsRef<str>) -> Self {
        self.operation = Some(Arc::from(operation.as_ref()));
        self
    }

    /// Set the caller tag (e.g. [`CACHE_CALLER`]).
    #[must_use]
    pub fn with_caller(mut self, caller: impl AsRef<str>) -> Self {
        self.caller = Some(Arc::from(caller.as_ref()));
        self
    }

    /// Use an explicit correlation id instead of the generated one.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Derive a context whose cancellation follows this one but can also be
    /// cancelled on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            caller: self.caller.clone(),
            correlation_id: self.correlation_id,
            cancel: self.cancel.child_token(),
        }
    }

    /// Operation name, or `"unknown"` if none was set.
    #[must_use]
    pub fn operation(&self) -> &str {
        self.operation.as_deref().unwrap_or("unknown")
    }

    /// Caller tag, if any.
    #[must_use]
    pub fn caller(&self) -> Option<&str> {
        self.caller.as_deref()
    }

    /// Correlation id sent with every request of this context.
    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Cancel this context and all of its children.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the context has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The underlying token, for `select!`-style waiting.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.operation(), "unknown");
        assert!(ctx.caller().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_builders() {
        let id = Uuid::new_v4();
        let ctx = RequestContext::new()
            .with_operation("readGroups")
            .with_caller(CACHE_CALLER)
            .with_correlation_id(id);

        assert_eq!(ctx.operation(), "readGroups");
        assert_eq!(ctx.caller(), Some("cache"));
        assert_eq!(ctx.correlation_id(), id);
    }

    #[test]
    fn test_clones_share_cancellation() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_child_follows_parent_but_not_reverse() {
        let parent = RequestContext::new().with_operation("readResources");
        let child = parent.child();
        assert_eq!(child.operation(), "readResources");
        assert_eq!(child.correlation_id(), parent.correlation_id());

        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }
}
