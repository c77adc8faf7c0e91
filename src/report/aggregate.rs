//! Group-by engine with aggregation-aware column policies.
//!
//! Plain metric columns sum. Rate/rank columns declared on the policy are
//! aggregated as Σ(value·weight)/Σ(weight), and ratio columns are recomputed
//! from their aggregated numerator and denominator. A plain average of
//! per-row ratios is not invariant under grouping and is never used.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::frame::{Frame, FrameResult, GroupKey, Value};

/// How plain (non-policy) metric columns are combined within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateMethod {
    #[default]
    Sum,
    Mean,
    Max,
    Min,
}

/// Per-column aggregation declarations.
///
/// The default policy carries the conventions of the supported backends:
/// `position` is a rank averaged by `impressions`, `ctr` is recomputed from
/// `clicks / impressions`, and `position` ranks lower-is-better (consulted by
/// `normalize_queries` when picking a representative row).
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatePolicy {
    weighted_by: HashMap<String, String>,
    ratio_of: HashMap<String, (String, String)>,
    lower_is_better: HashSet<String>,
}

impl Default for AggregatePolicy {
    fn default() -> Self {
        let mut weighted_by = HashMap::new();
        weighted_by.insert("position".to_string(), "impressions".to_string());

        let mut ratio_of = HashMap::new();
        ratio_of.insert(
            "ctr".to_string(),
            ("clicks".to_string(), "impressions".to_string()),
        );

        let mut lower_is_better = HashSet::new();
        lower_is_better.insert("position".to_string());

        Self {
            weighted_by,
            ratio_of,
            lower_is_better,
        }
    }
}

impl AggregatePolicy {
    /// A policy with no declarations at all; every metric column sums.
    pub fn plain() -> Self {
        Self {
            weighted_by: HashMap::new(),
            ratio_of: HashMap::new(),
            lower_is_better: HashSet::new(),
        }
    }

    /// Declare `column` as a weighted mean over `weight`.
    pub fn weighted(mut self, column: impl Into<String>, weight: impl Into<String>) -> Self {
        self.weighted_by.insert(column.into(), weight.into());
        self
    }

    /// Declare `column` as `numerator / denominator`, recomputed after
    /// aggregation.
    pub fn ratio(
        mut self,
        column: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
    ) -> Self {
        self.ratio_of
            .insert(column.into(), (numerator.into(), denominator.into()));
        self
    }

    /// Declare that smaller values of `column` are better (rank semantics).
    pub fn prefer_lower(mut self, column: impl Into<String>) -> Self {
        self.lower_is_better.insert(column.into());
        self
    }

    pub fn weight_for(&self, column: &str) -> Option<&str> {
        self.weighted_by.get(column).map(String::as_str)
    }

    pub fn ratio_for(&self, column: &str) -> Option<(&str, &str)> {
        self.ratio_of
            .get(column)
            .map(|(n, d)| (n.as_str(), d.as_str()))
    }

    pub fn is_lower_better(&self, column: &str) -> bool {
        self.lower_is_better.contains(column)
    }
}

/// Group `frame` on `by`, aggregating `metrics` per the policy.
///
/// Groups appear in first-seen row order. A zero-row input returns a zero-row
/// frame that still declares `by` and `metrics` as columns.
pub(crate) fn group_frame(
    frame: &Frame,
    by: &[String],
    metrics: &[String],
    method: AggregateMethod,
    policy: &AggregatePolicy,
) -> FrameResult<Frame> {
    let declared: Vec<&str> = by
        .iter()
        .chain(metrics.iter())
        .map(String::as_str)
        .collect();
    if frame.is_empty() {
        return Ok(Frame::with_names(&declared));
    }

    let key_columns: Vec<&[Value]> = by
        .iter()
        .map(|name| frame.values(name))
        .collect::<FrameResult<_>>()?;

    // First-seen ordering: group ordinal + one representative row per group.
    let mut ordinals: HashMap<Vec<GroupKey>, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for row in 0..frame.len() {
        let key: Vec<GroupKey> = key_columns.iter().map(|c| c[row].group_key()).collect();
        let next = groups.len();
        let ordinal = *ordinals.entry(key).or_insert(next);
        if ordinal == groups.len() {
            groups.push(Vec::new());
        }
        groups[ordinal].push(row);
    }

    let mut out = Frame::new();
    for (name, column) in by.iter().zip(&key_columns) {
        let values = groups.iter().map(|rows| column[rows[0]].clone()).collect();
        out.push_column(name.clone(), values)?;
    }

    for metric in metrics {
        let values = if let Some((numerator, denominator)) = policy.ratio_for(metric) {
            if frame.has_column(numerator) && frame.has_column(denominator) {
                recompute_ratio(frame, numerator, denominator, &groups)?
            } else {
                aggregate_plain(frame.values(metric)?, &groups, method)
            }
        } else if let Some(weight) = policy.weight_for(metric) {
            if frame.has_column(weight) {
                weighted_mean(frame.values(metric)?, frame.values(weight)?, &groups)
            } else {
                aggregate_plain(frame.values(metric)?, &groups, method)
            }
        } else {
            aggregate_plain(frame.values(metric)?, &groups, method)
        };
        out.push_column(metric.clone(), values)?;
    }

    Ok(out)
}

/// Σ(value·weight) / Σ(weight) per group. Rows missing either side contribute
/// nothing; a group with zero total weight yields Null.
fn weighted_mean(values: &[Value], weights: &[Value], groups: &[Vec<usize>]) -> Vec<Value> {
    groups
        .iter()
        .map(|rows| {
            let mut numerator = 0.0;
            let mut total_weight = 0.0;
            for &row in rows {
                if let (Some(v), Some(w)) = (values[row].as_f64(), weights[row].as_f64()) {
                    numerator += v * w;
                    total_weight += w;
                }
            }
            if total_weight == 0.0 {
                Value::Null
            } else {
                Value::Float(numerator / total_weight)
            }
        })
        .collect()
}

/// Σ(numerator) / Σ(denominator) per group; zero denominator yields Null.
fn recompute_ratio(
    frame: &Frame,
    numerator: &str,
    denominator: &str,
    groups: &[Vec<usize>],
) -> FrameResult<Vec<Value>> {
    let numerators = frame.values(numerator)?;
    let denominators = frame.values(denominator)?;
    Ok(groups
        .iter()
        .map(|rows| {
            let num: f64 = rows.iter().filter_map(|&r| numerators[r].as_f64()).sum();
            let den: f64 = rows.iter().filter_map(|&r| denominators[r].as_f64()).sum();
            if den == 0.0 {
                Value::Null
            } else {
                Value::Float(num / den)
            }
        })
        .collect())
}

fn aggregate_plain(values: &[Value], groups: &[Vec<usize>], method: AggregateMethod) -> Vec<Value> {
    groups
        .iter()
        .map(|rows| {
            let numeric: Vec<&Value> = rows
                .iter()
                .map(|&r| &values[r])
                .filter(|v| v.is_numeric())
                .collect();
            if numeric.is_empty() {
                return Value::Null;
            }
            match method {
                AggregateMethod::Sum => sum_values(&numeric),
                AggregateMethod::Mean => {
                    let total: f64 = numeric.iter().filter_map(|v| v.as_f64()).sum();
                    Value::Float(total / numeric.len() as f64)
                }
                AggregateMethod::Max => numeric
                    .iter()
                    .max_by(|a, b| a.total_cmp(b))
                    .map(|v| (*v).clone())
                    .unwrap_or(Value::Null),
                AggregateMethod::Min => numeric
                    .iter()
                    .min_by(|a, b| a.total_cmp(b))
                    .map(|v| (*v).clone())
                    .unwrap_or(Value::Null),
            }
        })
        .collect()
}

/// Integer sums stay Int; any Float contribution promotes the sum to Float.
fn sum_values(values: &[&Value]) -> Value {
    let all_int = values.iter().all(|v| matches!(v, Value::Int(_)));
    if all_int {
        Value::Int(values.iter().filter_map(|v| v.as_i64()).sum())
    } else {
        Value::Float(values.iter().filter_map(|v| v.as_f64()).sum())
    }
}
