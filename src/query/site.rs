//! Site records: free-form key/value maps describing one queryable property.
//!
//! A site carries its identifier (under a configurable key, `"site"` by
//! default), an optional base `url` for absolute-URL dimensions, optional
//! thresholds (`min_impressions`, `max_position`, `min_pv`, `min_cv`), and any
//! other keys a query references through `site.<key>` indirection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::frame::Value;

/// One entry in the caller's site table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Site {
    entries: BTreeMap<String, Value>,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builders have no effect until used"]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The site's identifier under `item_key`, rendered as display text.
    pub fn identifier(&self, item_key: &str) -> Option<String> {
        self.get(item_key).map(Value::to_string)
    }

    /// Base URL for absolute-URL dimensions, when configured and non-empty.
    pub fn base_url(&self) -> Option<&str> {
        match self.get("url") {
            Some(Value::Str(url)) if !url.is_empty() => Some(url),
            _ => None,
        }
    }

    /// A numeric threshold such as `min_impressions`, when present.
    pub fn threshold(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }
}

/// Which sites of the table a run covers.
#[derive(Debug, Clone)]
pub enum SiteFilter {
    /// Sites whose identifier is in the list.
    Ids(Vec<String>),
    /// Sites a predicate accepts.
    Where(fn(&Site) -> bool),
}

impl SiteFilter {
    pub fn ids<S: Into<String>>(ids: impl IntoIterator<Item = S>) -> Self {
        SiteFilter::Ids(ids.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, site: &Site, item_key: &str) -> bool {
        match self {
            SiteFilter::Ids(ids) => site
                .identifier(item_key)
                .is_some_and(|id| ids.iter().any(|allowed| *allowed == id)),
            SiteFilter::Where(predicate) => predicate(site),
        }
    }
}
