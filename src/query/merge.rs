//! Stitching fetched frames back together.
//!
//! Within one site, each call group contributes the same dimension columns
//! and its own metric columns; groups are joined on the dimension aliases.
//! Across sites, frames are concatenated under a site-identifier tag. In both
//! directions a metric hole means "nothing observed" and becomes zero, while
//! a dimension hole stays null for `fill` to label.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::frame::{Frame, FrameResult, GroupKey, Value};
use crate::query::resolve::{ResolvedDimension, ResolvedMetric};
use crate::query::QueryResult;

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap());

/// How call groups of one site join on the dimension aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Union of dimension combinations, zero-filling metrics absent on one
    /// side.
    #[default]
    Outer,
    /// Only combinations present in the first metric group.
    Left,
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "outer" => Ok(MergeMode::Outer),
            "left" => Ok(MergeMode::Left),
            other => Err(format!("unknown merge mode `{other}` (expected outer or left)")),
        }
    }
}

/// Shape one fetched frame to the call's aliases: rename backend fields,
/// add missing dimension columns as null and missing metric columns as zero,
/// then project to the requested columns in order.
pub(crate) fn normalize_group(
    fetched: &Frame,
    dimensions: &[ResolvedDimension],
    metrics: &[ResolvedMetric],
) -> QueryResult<Frame> {
    let mut frame = fetched.clone();
    let len = frame.len();

    let renames = dimensions
        .iter()
        .map(|d| (d.field.as_str(), d.alias.as_str()))
        .chain(metrics.iter().map(|m| (m.field.as_str(), m.alias.as_str())));
    for (field, alias) in renames {
        if field != alias && frame.has_column(field) && !frame.has_column(alias) {
            frame.rename_column(field, alias)?;
        }
    }

    for dimension in dimensions {
        if !frame.has_column(&dimension.alias) {
            frame.push_column(dimension.alias.clone(), vec![Value::Null; len])?;
        }
    }
    for metric in metrics {
        if !frame.has_column(&metric.alias) {
            frame.push_column(metric.alias.clone(), vec![Value::Int(0); len])?;
        }
    }

    let order: Vec<&str> = dimensions
        .iter()
        .map(|d| d.alias.as_str())
        .chain(metrics.iter().map(|m| m.alias.as_str()))
        .collect();
    Ok(frame.select(&order)?)
}

/// Join relative URL values onto the site's base URL. Values that already
/// carry a scheme, nulls, and empty strings pass through.
pub(crate) fn absolutize(frame: &Frame, alias: &str, base_url: &str) -> FrameResult<Frame> {
    let base = base_url.trim_end_matches('/');
    frame.map_column(alias, |v| match v {
        Value::Str(path) if !path.is_empty() && !SCHEME_RE.is_match(path) => {
            if path.starts_with('/') {
                Value::Str(format!("{base}{path}"))
            } else {
                Value::Str(format!("{base}/{path}"))
            }
        }
        other => other.clone(),
    })
}

/// Join one site's normalized call-group frames on its dimension aliases.
pub(crate) fn join_groups(
    frames: &[Frame],
    dimensions: &[String],
    mode: MergeMode,
) -> QueryResult<Frame> {
    let mut iter = frames.iter();
    let Some(first) = iter.next() else {
        return Ok(Frame::with_names(dimensions));
    };
    let mut acc = first.clone();
    for frame in iter {
        acc = join_pair(&acc, frame, dimensions, mode)?;
    }
    Ok(acc)
}

fn row_key(frame: &Frame, dimensions: &[String], row: usize) -> Vec<GroupKey> {
    dimensions
        .iter()
        .map(|d| frame.cell(d, row).group_key())
        .collect()
}

fn join_pair(
    left: &Frame,
    right: &Frame,
    dimensions: &[String],
    mode: MergeMode,
) -> QueryResult<Frame> {
    let right_metrics: Vec<String> = right
        .names()
        .into_iter()
        .filter(|name| !dimensions.iter().any(|d| d == name))
        .map(String::from)
        .collect();

    let mut right_index: HashMap<Vec<GroupKey>, usize> = HashMap::new();
    for row in (0..right.len()).rev() {
        // Reverse insertion so the first occurrence of a key wins.
        right_index.insert(row_key(right, dimensions, row), row);
    }
    let mut used = vec![false; right.len()];

    let left_names = left.names();
    let mut columns: Vec<(String, Vec<Value>)> = left_names
        .iter()
        .map(|n| (n.to_string(), Vec::new()))
        .chain(right_metrics.iter().map(|n| (n.clone(), Vec::new())))
        .collect();
    let left_width = left_names.len();

    for row in 0..left.len() {
        for (name, values) in columns.iter_mut().take(left_width) {
            values.push(left.cell(name, row));
        }
        let matched = right_index.get(&row_key(left, dimensions, row)).copied();
        if let Some(r) = matched {
            used[r] = true;
        }
        for (name, values) in columns.iter_mut().skip(left_width) {
            values.push(match matched {
                Some(r) => right.cell(name, r),
                None => Value::Int(0),
            });
        }
    }

    if mode == MergeMode::Outer {
        for row in 0..right.len() {
            if used[row] {
                continue;
            }
            for (name, values) in columns.iter_mut().take(left_width) {
                if dimensions.iter().any(|d| d == name) {
                    values.push(right.cell(name, row));
                } else {
                    values.push(Value::Int(0));
                }
            }
            for (name, values) in columns.iter_mut().skip(left_width) {
                values.push(right.cell(name, row));
            }
        }
    }

    Ok(Frame::from_columns(columns)?)
}

/// Concatenate per-site frames, unioning columns in first-seen order.
pub(crate) fn concat_frames(
    frames: &[Frame],
    is_dimension: impl Fn(&str) -> bool,
) -> QueryResult<Frame> {
    let mut names: Vec<String> = Vec::new();
    for frame in frames {
        for name in frame.names() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
    }

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    for frame in frames {
        for (column, name) in columns.iter_mut().zip(&names) {
            match frame.values(name) {
                Ok(values) => column.extend(values.iter().cloned()),
                Err(_) => {
                    let fill = if is_dimension(name) {
                        Value::Null
                    } else {
                        Value::Int(0)
                    };
                    column.extend(std::iter::repeat_n(fill, frame.len()));
                }
            }
        }
    }

    Ok(Frame::from_columns(
        names.into_iter().zip(columns).collect::<Vec<_>>(),
    )?)
}
