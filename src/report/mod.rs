//! Immutable report containers.
//!
//! A [`ReportFrame`] wraps a [`Frame`] together with the names of its
//! dimension columns and an [`AggregatePolicy`]. Every transform borrows the
//! container and returns a fresh one, so call sites chain freely and an error
//! partway through a chain leaves the original untouched:
//!
//! ```text
//! report.decode("page")?.remove_params("page", &[])?.aggregate(&["page"])?
//! ```
//!
//! Layout:
//! - `mod.rs`       container, structural ops (select/drop/rename/sort/...)
//! - `aggregate.rs` group-by engine and aggregation policy
//! - `transform.rs` per-column value transforms (decode, replace, ...)
//! - `normalize.rs` query-string normalization
//! - `category.rs`  rule-based categorization
//! - `threshold.rs` click/impression floors
//! - `op.rs`        transforms as data, for conditional application

pub mod aggregate;
pub mod category;
pub mod normalize;
pub mod op;
pub mod threshold;
pub mod transform;

use std::fmt;

use thiserror::Error;

use crate::classify::ColumnClassifier;
use crate::frame::{Frame, FrameError, Value};

pub use aggregate::{AggregateMethod, AggregatePolicy};
pub use category::{CategoryOptions, CategoryRule};
pub use normalize::{NormalizeMode, NormalizeOptions};
pub use op::TransformOp;
pub use threshold::{ClickFilter, ImpressionFilter};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("dimension `{0}` is not a column of the frame")]
    UnknownDimension(String),

    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("column `{0}` contains non-numeric values")]
    NotNumeric(String),
}

pub type ReportResult<T> = Result<T, ReportError>;

// =============================================================================
// Options
// =============================================================================

/// Options for [`ReportFrame::group`].
#[derive(Debug, Clone, Default)]
#[must_use = "builders have no effect until used"]
pub struct GroupOptions {
    by: Option<Vec<String>>,
    metrics: Option<Vec<String>>,
    method: AggregateMethod,
}

impl GroupOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Group on these columns instead of the container's dimensions.
    pub fn with_by<S: Into<String>>(mut self, by: impl IntoIterator<Item = S>) -> Self {
        self.by = Some(by.into_iter().map(Into::into).collect());
        self
    }

    /// Aggregate only these metric columns. Names that are not columns of the
    /// frame are silently dropped.
    pub fn with_metrics<S: Into<String>>(mut self, metrics: impl IntoIterator<Item = S>) -> Self {
        self.metrics = Some(metrics.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_method(mut self, method: AggregateMethod) -> Self {
        self.method = method;
        self
    }
}

// =============================================================================
// Container
// =============================================================================

/// A frame plus the classification of its columns into dimensions and metrics.
///
/// `dimensions` is always a subset of the frame's columns; constructors
/// enforce it and transforms maintain it (a transform that removes a dimension
/// column also removes it from `dimensions`).
#[derive(Debug, Clone)]
pub struct ReportFrame {
    frame: Frame,
    dimensions: Vec<String>,
    policy: AggregatePolicy,
}

impl ReportFrame {
    /// Wrap a frame, auto-detecting its dimension columns.
    pub fn new(frame: Frame) -> Self {
        let dimensions = ColumnClassifier::default().detect(&frame, None);
        Self {
            frame,
            dimensions,
            policy: AggregatePolicy::default(),
        }
    }

    /// Wrap a frame with an explicit dimension list.
    pub fn with_dimensions<S: AsRef<str>>(frame: Frame, dimensions: &[S]) -> ReportResult<Self> {
        let dimensions: Vec<String> = dimensions.iter().map(|s| s.as_ref().to_string()).collect();
        check_dimensions(&frame, &dimensions)?;
        Ok(Self {
            frame,
            dimensions,
            policy: AggregatePolicy::default(),
        })
    }

    #[must_use = "builders have no effect until used"]
    pub fn with_policy(mut self, policy: AggregatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Successor container carrying this one's policy.
    pub(crate) fn derive(&self, frame: Frame, dimensions: Vec<String>) -> ReportFrame {
        ReportFrame {
            frame,
            dimensions,
            policy: self.policy.clone(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }

    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }

    /// Non-dimension columns, in column order.
    pub fn metrics(&self) -> Vec<&str> {
        self.frame
            .names()
            .into_iter()
            .filter(|name| !self.dimensions.iter().any(|d| d == name))
            .collect()
    }

    pub fn policy(&self) -> &AggregatePolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    // =========================================================================
    // Grouping
    // =========================================================================

    /// Group-by over the current dimensions (or `options.by`), aggregating
    /// metric columns per the container's policy.
    ///
    /// The result's dimensions are exactly the grouping keys used.
    pub fn group(&self, options: &GroupOptions) -> ReportResult<ReportFrame> {
        let by = match &options.by {
            Some(by) => by.clone(),
            None => self.dimensions.clone(),
        };
        let metrics: Vec<String> = match &options.metrics {
            Some(requested) => requested
                .iter()
                .filter(|name| self.frame.has_column(name))
                .cloned()
                .collect(),
            None => self
                .metrics()
                .into_iter()
                .filter(|name| !by.iter().any(|b| b == name))
                .map(String::from)
                .collect(),
        };
        let grouped =
            aggregate::group_frame(&self.frame, &by, &metrics, options.method, &self.policy)?;
        Ok(self.derive(grouped, by))
    }

    /// Group on `by` and re-declare the dimensions as exactly `by`.
    pub fn aggregate<S: AsRef<str>>(&self, by: &[S]) -> ReportResult<ReportFrame> {
        self.group(&GroupOptions::new().with_by(by.iter().map(|s| s.as_ref().to_string())))
    }

    // =========================================================================
    // Structural transforms
    // =========================================================================

    /// Keep only `columns`, in the given order. Dimensions narrow to the kept
    /// set, keeping their declared order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> ReportResult<ReportFrame> {
        let names: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
        let frame = self.frame.select(&names)?;
        let dimensions = self
            .dimensions
            .iter()
            .filter(|d| names.contains(&d.as_str()))
            .cloned()
            .collect();
        Ok(self.derive(frame, dimensions))
    }

    pub fn drop<S: AsRef<str>>(&self, columns: &[S]) -> ReportResult<ReportFrame> {
        let mut frame = self.frame.clone();
        for column in columns {
            let name = column.as_ref();
            if !frame.has_column(name) {
                return Err(FrameError::UnknownColumn(name.to_string()).into());
            }
            frame.drop_column(name);
        }
        let dimensions = self
            .dimensions
            .iter()
            .filter(|d| !columns.iter().any(|c| c.as_ref() == d.as_str()))
            .cloned()
            .collect();
        Ok(self.derive(frame, dimensions))
    }

    pub fn rename(&self, from: &str, to: &str) -> ReportResult<ReportFrame> {
        let mut frame = self.frame.clone();
        frame.rename_column(from, to)?;
        let dimensions = self
            .dimensions
            .iter()
            .map(|d| if d == from { to.to_string() } else { d.clone() })
            .collect();
        Ok(self.derive(frame, dimensions))
    }

    /// First `n` rows (all of them when `n` exceeds the length).
    pub fn head(&self, n: usize) -> ReportFrame {
        let take: Vec<usize> = (0..self.frame.len().min(n)).collect();
        self.derive(self.frame.take_rows(&take), self.dimensions.clone())
    }

    /// Stable multi-key sort. `ascending` pairs with `by` positionally and
    /// defaults to ascending for any unpaired key.
    pub fn sort<S: AsRef<str>>(&self, by: &[S], ascending: &[bool]) -> ReportResult<ReportFrame> {
        let keys: Vec<(&str, bool)> = by
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_ref(), ascending.get(i).copied().unwrap_or(true)))
            .collect();
        let frame = self.frame.sort_rows(&keys)?;
        Ok(self.derive(frame, self.dimensions.clone()))
    }

    /// Replace nulls in every dimension column with `"(not set)"`.
    ///
    /// Never fails: dimensions are columns by invariant, and a container with
    /// zero rows simply has nothing to fill.
    pub fn fill(&self) -> ReportResult<ReportFrame> {
        self.fill_with(&Value::from("(not set)"), None)
    }

    /// Replace nulls with `value` in `columns` (the dimension columns when
    /// `None`).
    pub fn fill_with(&self, value: &Value, columns: Option<&[String]>) -> ReportResult<ReportFrame> {
        let mut frame = self.frame.clone();
        let targets = columns.unwrap_or(&self.dimensions);
        for name in targets {
            frame = frame.map_column(name, |v| {
                if v.is_null() {
                    value.clone()
                } else {
                    v.clone()
                }
            })?;
        }
        Ok(self.derive(frame, self.dimensions.clone()))
    }
}

impl fmt::Display for ReportFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.frame.fmt(f)
    }
}

pub(crate) fn check_dimensions(frame: &Frame, dimensions: &[String]) -> ReportResult<()> {
    for dim in dimensions {
        if !frame.has_column(dim) {
            return Err(ReportError::UnknownDimension(dim.clone()));
        }
    }
    Ok(())
}
