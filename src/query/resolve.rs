//! Per-site resolution of field references and filters.
//!
//! Resolution replaces every `site.<key>` indirection with the owning site's
//! value for that key, producing plain strings the planner and backends work
//! with. Each site resolves independently; a missing key is a configuration
//! error naming both the key and the site, and aborts the run.

use crate::frame::Value;
use crate::query::site::Site;
use crate::query::spec::{DimensionSpec, FieldRef, MetricSpec};
use crate::query::{QueryError, QueryResult};

/// A dimension with its backend field fixed for one site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedDimension {
    pub field: String,
    pub alias: String,
    pub absolute: bool,
}

/// A metric with its backend field fixed for one site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedMetric {
    pub field: String,
    pub alias: String,
}

/// A pair of filter expressions with every indirection substituted.
///
/// Value equality of resolved filters is what the planner groups calls by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResolvedFilter {
    pub filter_d: Option<String>,
    pub filter_m: Option<String>,
}

/// Resolves specs against one site.
pub struct Resolver<'a> {
    site: &'a Site,
    item_key: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(site: &'a Site, item_key: &'a str) -> Self {
        Self { site, item_key }
    }

    /// Substitute a field reference, rendering the site's value as text.
    pub fn resolve_field(&self, field: &FieldRef) -> QueryResult<String> {
        match field {
            FieldRef::Literal(name) => Ok(name.clone()),
            FieldRef::SiteKey(key) => {
                self.site
                    .get(key)
                    .map(Value::to_string)
                    .ok_or_else(|| QueryError::MissingSiteKey {
                        key: key.clone(),
                        site: self
                            .site
                            .identifier(self.item_key)
                            .unwrap_or_else(|| "?".to_string()),
                    })
            }
        }
    }

    fn resolve_optional(&self, field: Option<&FieldRef>) -> QueryResult<Option<String>> {
        field.map(|f| self.resolve_field(f)).transpose()
    }

    /// The run-level filter pair, with indirections substituted.
    pub fn resolve_global_filter(
        &self,
        filter_d: Option<&str>,
        filter_m: Option<&str>,
    ) -> QueryResult<ResolvedFilter> {
        Ok(ResolvedFilter {
            filter_d: self.resolve_optional(filter_d.map(FieldRef::parse).as_ref())?,
            filter_m: self.resolve_optional(filter_m.map(FieldRef::parse).as_ref())?,
        })
    }

    pub fn resolve_dimensions(
        &self,
        specs: &[DimensionSpec],
    ) -> QueryResult<Vec<ResolvedDimension>> {
        specs
            .iter()
            .map(|spec| {
                Ok(ResolvedDimension {
                    field: self.resolve_field(&spec.field)?,
                    alias: spec.alias.clone(),
                    absolute: spec.absolute,
                })
            })
            .collect()
    }

    /// Resolve metrics along with their effective filters. A metric without
    /// an explicit filter inherits the global one side by side, so a metric
    /// whose explicit filter equals the global filter lands in the same call
    /// group as unfiltered metrics.
    pub fn resolve_metrics(
        &self,
        specs: &[MetricSpec],
        global: &ResolvedFilter,
    ) -> QueryResult<Vec<(ResolvedMetric, ResolvedFilter)>> {
        specs
            .iter()
            .map(|spec| {
                let metric = ResolvedMetric {
                    field: self.resolve_field(&spec.field)?,
                    alias: spec.alias.clone(),
                };
                let filter = ResolvedFilter {
                    filter_d: self
                        .resolve_optional(spec.filter_d.as_ref())?
                        .or_else(|| global.filter_d.clone()),
                    filter_m: self
                        .resolve_optional(spec.filter_m.as_ref())?
                        .or_else(|| global.filter_m.clone()),
                };
                Ok((metric, filter))
            })
            .collect()
    }
}
