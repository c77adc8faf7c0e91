//! Query-string normalization.
//!
//! Search terms arrive with incidental whitespace differences ("foo  bar",
//! "foo bar", "foobar" on some surfaces). Normalization buckets rows whose
//! term differs only by whitespace and shows one representative spelling,
//! picked from the row that carries the most evidence.

use std::collections::HashMap;

use crate::frame::{GroupKey, Value};
use crate::report::{GroupOptions, ReportError, ReportFrame, ReportResult};

/// How whitespace is folded when building the bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMode {
    /// Remove every whitespace character ("foo bar" and "foobar" bucket
    /// together).
    #[default]
    RemoveAll,
    /// Trim and collapse runs of whitespace to a single space.
    Collapse,
}

impl NormalizeMode {
    fn apply(self, s: &str) -> String {
        match self {
            NormalizeMode::RemoveAll => s.chars().filter(|c| !c.is_whitespace()).collect(),
            NormalizeMode::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }
}

/// Options for [`ReportFrame::normalize_queries`].
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until used"]
pub struct NormalizeOptions {
    column: String,
    mode: NormalizeMode,
    prefer_by: String,
    group: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            column: "query".to_string(),
            mode: NormalizeMode::RemoveAll,
            prefer_by: "impressions".to_string(),
            group: true,
        }
    }
}

impl NormalizeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn with_mode(mut self, mode: NormalizeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Pick the representative spelling from the row with the best value of
    /// this column (highest, or lowest for policy lower-is-better columns).
    pub fn with_prefer_by(mut self, prefer_by: impl Into<String>) -> Self {
        self.prefer_by = prefer_by.into();
        self
    }

    /// With `false`, only attach a `<column>_normalized` key column instead of
    /// collapsing the buckets.
    pub fn with_group(mut self, group: bool) -> Self {
        self.group = group;
        self
    }
}

impl ReportFrame {
    /// Bucket rows of `column` whose values differ only by whitespace.
    ///
    /// With `group: true` (the default) the buckets collapse: metrics
    /// aggregate per the container's policy and the visible value of `column`
    /// becomes the spelling from the bucket's best row by `prefer_by` (ties
    /// keep the earlier row). With `group: false` the rows stay and a
    /// `<column>_normalized` dimension column is attached.
    ///
    /// Applying the same normalization twice is a no-op after the first.
    pub fn normalize_queries(&self, options: &NormalizeOptions) -> ReportResult<ReportFrame> {
        if !options.group {
            return self.attach_key(options);
        }
        if self.is_empty() {
            return Ok(self.clone());
        }

        let display = self.frame().values(&options.column)?;
        let prefer = self.frame().values(&options.prefer_by)?;
        if !prefer.iter().any(|v| v.is_numeric()) || prefer.iter().any(|v| !v.is_null() && !v.is_numeric()) {
            return Err(ReportError::NotNumeric(options.prefer_by.clone()));
        }
        let lower_better = self.policy().is_lower_better(&options.prefer_by);

        let other_dims: Vec<&[Value]> = self
            .dimensions()
            .iter()
            .filter(|d| *d != &options.column)
            .map(|d| self.frame().values(d))
            .collect::<Result<_, _>>()?;

        // Best row per bucket; a candidate replaces only by being strictly
        // better, so ties keep the earlier row.
        let mut best: HashMap<Vec<GroupKey>, usize> = HashMap::new();
        let keys: Vec<Vec<GroupKey>> = (0..self.len())
            .map(|row| bucket_key(row, &other_dims, display, options.mode))
            .collect();
        for (row, key) in keys.iter().enumerate() {
            match best.get(key) {
                None => {
                    best.insert(key.clone(), row);
                }
                Some(&current) => {
                    if beats(&prefer[row], &prefer[current], lower_better) {
                        best.insert(key.clone(), row);
                    }
                }
            }
        }

        let representative: Vec<Value> = keys
            .iter()
            .map(|key| display[best[key]].clone())
            .collect();
        let mut frame = self.frame().clone();
        frame.set_values(&options.column, representative)?;
        self.derive(frame, self.dimensions().to_vec())
            .group(&GroupOptions::new())
    }

    fn attach_key(&self, options: &NormalizeOptions) -> ReportResult<ReportFrame> {
        let key_name = format!("{}_normalized", options.column);
        let keys: Vec<Value> = self
            .frame()
            .values(&options.column)?
            .iter()
            .map(|v| match v {
                Value::Str(s) => Value::Str(options.mode.apply(s)),
                other => other.clone(),
            })
            .collect();
        let mut frame = self.frame().clone();
        if frame.has_column(&key_name) {
            frame.set_values(&key_name, keys)?;
        } else {
            frame.push_column(key_name.clone(), keys)?;
        }
        let mut dimensions = self.dimensions().to_vec();
        if !dimensions.contains(&key_name) {
            dimensions.push(key_name);
        }
        Ok(self.derive(frame, dimensions))
    }
}

fn bucket_key(
    row: usize,
    other_dims: &[&[Value]],
    display: &[Value],
    mode: NormalizeMode,
) -> Vec<GroupKey> {
    let mut key: Vec<GroupKey> = other_dims.iter().map(|col| col[row].group_key()).collect();
    key.push(match &display[row] {
        Value::Str(s) => GroupKey::Str(mode.apply(s)),
        other => other.group_key(),
    });
    key
}

fn beats(candidate: &Value, current: &Value, lower_better: bool) -> bool {
    let (Some(candidate), Some(current)) = (candidate.as_f64(), current.as_f64()) else {
        return current.as_f64().is_none() && candidate.as_f64().is_some();
    };
    if lower_better {
        candidate < current
    } else {
        candidate > current
    }
}
