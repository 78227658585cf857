//! GraphQL query variables.
//!
//! [`Variables`] is the key/value bag sent alongside every query. It is built
//! with chained options and handed to page callbacks as their extra parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Variable name holding the page size of list queries.
pub const PAGE_LIMIT: &str = "pageLimit";

/// Variable name holding the id of the queried entity.
pub const ID: &str = "id";

/// A bag of GraphQL variables.
///
/// ```
/// use twingate_core::Variables;
///
/// let vars = Variables::new()
///     .id("UmVzb3VyY2U6MQ==")
///     .cursor("afterAccess", None)
///     .page_limit(50);
///
/// assert_eq!(vars.get_str("id"), Some("UmVzb3VyY2U6MQ=="));
/// assert!(vars.get("afterAccess").is_some_and(serde_json::Value::is_null));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(Map<String, Value>);

impl Variables {
    /// Create an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `id` variable.
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.named_id(ID, id)
    }

    /// Set an id-typed variable under a custom name.
    #[must_use]
    pub fn named_id(mut self, name: &str, id: impl Into<String>) -> Self {
        self.0.insert(name.to_string(), Value::String(id.into()));
        self
    }

    /// Set a list of ids.
    #[must_use]
    pub fn ids<I, S>(mut self, name: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = ids.into_iter().map(|id| Value::String(id.into())).collect();
        self.0.insert(name.to_string(), Value::Array(ids));
        self
    }

    /// Set `name` to `value` when it is present; `None` leaves the bag untouched.
    #[must_use]
    pub fn var(mut self, name: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(value) = value {
            self.0.insert(name.to_string(), value.into());
        }
        self
    }

    /// Set `name` to `value`, sending an explicit `null` for zero values
    /// (empty strings, `0`, `false`, empty lists and objects).
    #[must_use]
    pub fn nullable(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        let value = if is_zero(&value) { Value::Null } else { value };
        self.0.insert(name.to_string(), value);
        self
    }

    /// Set a pagination cursor; `None` requests the first page.
    #[must_use]
    pub fn cursor(mut self, name: &str, cursor: Option<&str>) -> Self {
        let value = cursor.map_or(Value::Null, |c| Value::String(c.to_string()));
        self.0.insert(name.to_string(), value);
        self
    }

    /// Set the page size of list queries.
    #[must_use]
    pub fn page_limit(mut self, limit: usize) -> Self {
        self.0.insert(PAGE_LIMIT.to_string(), Value::from(limit));
        self
    }

    /// Return a copy of `self` overlaid with every entry of `other`.
    #[must_use]
    pub fn merged_with(&self, other: &Self) -> Self {
        let mut merged = self.clone();
        for (key, value) in &other.0 {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Insert or replace a single variable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Look up a string variable.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The variables as a JSON map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}
