//! Name and tag filters used by list data sources and cache matching.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a filter's name is compared against a resource name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterBy {
    /// Names must be equal.
    #[default]
    Exact,
    /// Resource name contains the filter name.
    Contains,
    /// Resource name does not contain the filter name.
    Exclude,
    /// Resource name starts with the filter name.
    Prefix,
    /// Resource name ends with the filter name.
    Suffix,
    /// Filter name is a regular expression matched against the resource name.
    Regexp,
    /// A rule that cannot be evaluated locally.
    Unsupported(String),
}

impl FilterBy {
    /// Parse a data-source attribute suffix such as `_contains`.
    ///
    /// The empty suffix means an exact match.
    #[must_use]
    pub fn from_suffix(suffix: &str) -> Self {
        match suffix {
            "" => Self::Exact,
            "_contains" => Self::Contains,
            "_exclude" => Self::Exclude,
            "_prefix" => Self::Prefix,
            "_suffix" => Self::Suffix,
            "_regexp" => Self::Regexp,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Whether this rule can be evaluated without calling the API.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

/// Filter over resource names and tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFilter {
    /// Name to compare against; empty matches every name.
    #[serde(default)]
    pub name: String,
    /// Comparison rule for `name`.
    #[serde(default)]
    pub filter_by: FilterBy,
    /// Tags that must all be present with equal values.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ResourceFilter {
    /// Filter on an exact name.
    #[must_use]
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the comparison rule.
    #[must_use]
    pub fn with_filter_by(mut self, filter_by: FilterBy) -> Self {
        self.filter_by = filter_by;
        self
    }

    /// Require a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Whether the filter places no constraint at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.tags.is_empty() && self.filter_by.is_supported()
    }

    /// Whether a resource with `name` and `tags` passes the filter.
    ///
    /// Unsupported rules never match so that callers fall back to the API.
    #[must_use]
    pub fn matches(&self, name: &str, tags: &BTreeMap<String, String>) -> bool {
        if !self.filter_by.is_supported() {
            return false;
        }

        let tags_match = self
            .tags
            .iter()
            .all(|(key, value)| tags.get(key) == Some(value));
        if !tags_match {
            return false;
        }

        if self.name.is_empty() {
            return true;
        }

        match &self.filter_by {
            FilterBy::Exact => name == self.name,
            FilterBy::Contains => name.contains(&self.name),
            FilterBy::Exclude => !name.contains(&self.name),
            FilterBy::Prefix => name.starts_with(&self.name),
            FilterBy::Suffix => name.ends_with(&self.name),
            FilterBy::Regexp => match Regex::new(&self.name) {
                Ok(re) => re.is_match(name),
                Err(e) => {
                    tracing::debug!(pattern = %self.name, error = %e, "Invalid name filter regexp");
                    false
                }
            },
            FilterBy::Unsupported(_) => false,
        }
    }
}
