//! File-backed query source.
//!
//! `FixtureSource` serves recorded results from `<dir>/<site_id>.json`, each
//! file holding an array of entries keyed by the resolved filter pair:
//!
//! ```json
//! [
//!   { "frame": { "columns": [ { "name": "date", "values": ["2024-01-01"] } ] } },
//!   { "filter_m": "eventName==purchase", "frame": { "columns": [] } }
//! ]
//! ```
//!
//! It backs the CLI's offline runs and the integration tests; a missing file
//! or entry surfaces as a [`SourceError`], which exercises the same
//! degradation path a failing network backend would.

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Deserialize;

use crate::frame::Frame;
use crate::query::resolve::ResolvedFilter;
use crate::query::site::Site;
use crate::query::source::{QuerySource, SourceCall, SourceError};

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    #[serde(default)]
    filter_d: Option<String>,
    #[serde(default)]
    filter_m: Option<String>,
    frame: Frame,
}

fn parse_fixture(json: &str) -> Result<Vec<FixtureEntry>, SourceError> {
    Ok(serde_json::from_str(json)?)
}

fn select_entry<'a>(
    entries: &'a [FixtureEntry],
    filter: &ResolvedFilter,
) -> Option<&'a FixtureEntry> {
    entries
        .iter()
        .find(|e| e.filter_d == filter.filter_d && e.filter_m == filter.filter_m)
}

/// A [`QuerySource`] reading per-site JSON files from a directory.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    dir: PathBuf,
    item_key: String,
}

impl FixtureSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            item_key: "site".to_string(),
        }
    }

    /// Which site key names the fixture file (default `"site"`).
    #[must_use = "builders have no effect until used"]
    pub fn with_item_key(mut self, item_key: impl Into<String>) -> Self {
        self.item_key = item_key.into();
        self
    }
}

impl QuerySource for FixtureSource {
    fn fetch(&self, site: &Site, call: &SourceCall) -> Result<Frame, SourceError> {
        let id = site
            .identifier(&self.item_key)
            .unwrap_or_else(|| "unknown".to_string());
        let path = self.dir.join(format!("{id}.json"));
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SourceError::MissingFixture { site: id })
            }
            Err(e) => return Err(e.into()),
        };
        let entries = parse_fixture(&text)?;
        let entry = select_entry(&entries, &call.filter).ok_or_else(|| {
            SourceError::NoMatchingEntry {
                filter_d: call.filter.filter_d.clone(),
                filter_m: call.filter.filter_m.clone(),
            }
        })?;

        let mut frame = entry.frame.clone();
        if let Some(limit) = call.limit {
            if frame.len() > limit {
                frame = frame.take_rows(&(0..limit).collect::<Vec<_>>());
            }
        }
        Ok(frame)
    }
}
