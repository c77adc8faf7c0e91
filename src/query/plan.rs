//! Call planning.
//!
//! Metrics whose resolved filters are value-equal can ride the same backend
//! call; partitioning them up front is what keeps a many-metric query at a
//! handful of calls per site. Groups keep the order the first member metric
//! appeared in.

use std::collections::HashSet;

use crate::query::resolve::{ResolvedDimension, ResolvedFilter, ResolvedMetric};
use crate::query::{QueryError, QueryResult};

/// One backend call's worth of metrics for a site.
#[derive(Debug, Clone, PartialEq)]
pub struct CallGroup {
    pub filter: ResolvedFilter,
    pub metrics: Vec<ResolvedMetric>,
}

/// Partition metrics into call groups by resolved-filter equality, after
/// checking that every output alias is unique.
pub fn plan_calls(
    dimensions: &[ResolvedDimension],
    metrics: &[(ResolvedMetric, ResolvedFilter)],
) -> QueryResult<Vec<CallGroup>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let aliases = dimensions
        .iter()
        .map(|d| d.alias.as_str())
        .chain(metrics.iter().map(|(m, _)| m.alias.as_str()));
    for alias in aliases {
        if !seen.insert(alias) {
            return Err(QueryError::DuplicateAlias(alias.to_string()));
        }
    }

    let mut groups: Vec<CallGroup> = Vec::new();
    for (metric, filter) in metrics {
        match groups.iter_mut().find(|group| group.filter == *filter) {
            Some(group) => group.metrics.push(metric.clone()),
            None => groups.push(CallGroup {
                filter: filter.clone(),
                metrics: vec![metric.clone()],
            }),
        }
    }
    Ok(groups)
}
