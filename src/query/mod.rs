//! Multi-site query orchestration.
//!
//! One logical query fans out per site and comes back as one container:
//!
//! ```text
//! sites ──▶ Resolver ──▶ plan_calls ──▶ QuerySource::fetch (per CallGroup)
//!                                            │
//!              ReportFrame ◀── concat ◀── join groups (per site)
//! ```
//!
//! Resolution and planning errors are configuration mistakes and abort the
//! run; a backend failure is downgraded per site to an empty contribution so
//! one broken property does not sink a fleet-wide report.
//!
//! Layout:
//! - `spec.rs`    field references and dimension/metric specs
//! - `site.rs`    site records and site filters
//! - `resolve.rs` per-site `site.<key>` substitution
//! - `plan.rs`    call-group partitioning
//! - `merge.rs`   join within a site, concat across sites
//! - `source.rs`  the backend trait seam
//! - `fixture.rs` file-backed source for offline runs and tests

pub mod fixture;
pub mod merge;
pub mod plan;
pub mod resolve;
pub mod site;
pub mod source;
pub mod spec;

use thiserror::Error;
use tracing::{debug, warn};

use crate::frame::{Frame, FrameError, Value};
use crate::report::{ReportError, ReportFrame};

pub use fixture::FixtureSource;
pub use merge::MergeMode;
pub use plan::CallGroup;
pub use resolve::{ResolvedDimension, ResolvedFilter, ResolvedMetric, Resolver};
pub use site::{Site, SiteFilter};
pub use source::{QuerySource, SourceCall, SourceError};
pub use spec::{DimensionInput, DimensionSpec, FieldRef, MetricInput, MetricSpec};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("site `{site}` has no key `{key}`")]
    MissingSiteKey { key: String, site: String },

    #[error("site at position {index} has no identifier key `{item_key}`")]
    MissingIdentifier { item_key: String, index: usize },

    #[error("duplicate output alias `{0}`")]
    DuplicateAlias(String),

    #[error("unsupported option `{option}` in {context} spec")]
    UnsupportedOption {
        option: String,
        context: &'static str,
    },

    #[error("metrics must be all plain names or all full specs, not a mix")]
    MixedMetricFormat,

    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

pub type QueryResult<T> = Result<T, QueryError>;

// =============================================================================
// Options
// =============================================================================

/// Options for [`Runner::run`] and [`Runner::run_all`].
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until used"]
pub struct RunOptions {
    item_key: String,
    item_filter: Option<SiteFilter>,
    merge: MergeMode,
    filter_d: Option<String>,
    filter_m: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    limit: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            item_key: "site".to_string(),
            item_filter: None,
            merge: MergeMode::default(),
            filter_d: None,
            filter_m: None,
            start_date: None,
            end_date: None,
            limit: None,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Site-table key that carries each site's identifier.
    pub fn with_item_key(mut self, item_key: impl Into<String>) -> Self {
        self.item_key = item_key.into();
        self
    }

    /// Restrict a `run_all` to a subset of the site table.
    pub fn with_item_filter(mut self, filter: SiteFilter) -> Self {
        self.item_filter = Some(filter);
        self
    }

    pub fn with_merge(mut self, merge: MergeMode) -> Self {
        self.merge = merge;
        self
    }

    /// Run-level dimension filter; `site.<key>` indirection allowed.
    pub fn with_filter_d(mut self, filter: impl Into<String>) -> Self {
        self.filter_d = Some(filter.into());
        self
    }

    /// Run-level metric filter; `site.<key>` indirection allowed.
    pub fn with_filter_m(mut self, filter: impl Into<String>) -> Self {
        self.filter_m = Some(filter.into());
        self
    }

    pub fn with_start_date(mut self, start_date: impl Into<String>) -> Self {
        self.start_date = Some(start_date.into());
        self
    }

    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn item_key(&self) -> &str {
        &self.item_key
    }
}

// =============================================================================
// Runner
// =============================================================================

/// Orchestrates queries against an injected backend.
pub struct Runner<'a, S: QuerySource> {
    source: &'a S,
}

impl<'a, S: QuerySource> Runner<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Run one site's query: resolve, plan, fetch each call group, and join
    /// the results on the dimension aliases.
    ///
    /// Backend failures propagate here; the per-site downgrade belongs to
    /// [`Runner::run_all`].
    pub fn run(
        &self,
        site: &Site,
        dimensions: &[DimensionInput],
        metrics: &[MetricInput],
        options: &RunOptions,
    ) -> QueryResult<ReportFrame> {
        let dim_specs = spec::dimension_specs(dimensions);
        let metric_specs = spec::metric_specs(metrics)?;
        let frame = self.run_site(site, &dim_specs, &metric_specs, options)?;
        let dim_aliases: Vec<String> = dim_specs.iter().map(|d| d.alias.clone()).collect();
        Ok(ReportFrame::with_dimensions(frame, &dim_aliases)?)
    }

    /// Fan a query out over the site table and stitch the results into one
    /// container, tagging each row with its site identifier under the
    /// `item_key` column.
    ///
    /// The tag column is not part of the resulting dimensions, so downstream
    /// grouping spans sites by default. Sites that produce no rows are absent
    /// from the result; every requested dimension alias is still declared, so
    /// chained transforms never trip over a missing column.
    pub fn run_all(
        &self,
        sites: &[Site],
        dimensions: &[DimensionInput],
        metrics: &[MetricInput],
        options: &RunOptions,
    ) -> QueryResult<ReportFrame> {
        let dim_specs = spec::dimension_specs(dimensions);
        let metric_specs = spec::metric_specs(metrics)?;
        let dim_aliases: Vec<String> = dim_specs.iter().map(|d| d.alias.clone()).collect();

        let mut per_site: Vec<Frame> = Vec::new();
        for (index, site) in sites.iter().enumerate() {
            if let Some(filter) = &options.item_filter {
                if !filter.allows(site, &options.item_key) {
                    continue;
                }
            }
            let id = site.identifier(&options.item_key).ok_or_else(|| {
                QueryError::MissingIdentifier {
                    item_key: options.item_key.clone(),
                    index,
                }
            })?;

            let frame = match self.run_site(site, &dim_specs, &metric_specs, options) {
                Ok(frame) => frame,
                Err(QueryError::Source(e)) => {
                    warn!(site = %id, error = %e, "backend call failed, site contributes no rows");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if frame.is_empty() {
                debug!(site = %id, "no rows");
                continue;
            }

            let mut tagged = Frame::new();
            tagged.push_column(
                options.item_key.clone(),
                vec![Value::from(id.as_str()); frame.len()],
            )?;
            for column in frame.columns() {
                tagged.push_column(column.name.clone(), column.values.clone())?;
            }
            per_site.push(tagged);
        }

        let mut merged = merge::concat_frames(&per_site, |name| {
            name == options.item_key || dim_aliases.iter().any(|d| d == name)
        })?;

        // With zero contributing sites the requested shape is still declared.
        let rows = merged.len();
        if !merged.has_column(&options.item_key) {
            merged.push_column(options.item_key.clone(), vec![Value::Null; rows])?;
        }
        for alias in &dim_aliases {
            if !merged.has_column(alias) {
                merged.push_column(alias.clone(), vec![Value::Null; rows])?;
            }
        }
        for metric in &metric_specs {
            if !merged.has_column(&metric.alias) {
                merged.push_column(metric.alias.clone(), vec![Value::Int(0); rows])?;
            }
        }

        Ok(ReportFrame::with_dimensions(merged, &dim_aliases)?)
    }

    fn run_site(
        &self,
        site: &Site,
        dim_specs: &[DimensionSpec],
        metric_specs: &[MetricSpec],
        options: &RunOptions,
    ) -> QueryResult<Frame> {
        let resolver = Resolver::new(site, &options.item_key);
        let global = resolver
            .resolve_global_filter(options.filter_d.as_deref(), options.filter_m.as_deref())?;
        let resolved_dims = resolver.resolve_dimensions(dim_specs)?;
        let resolved_metrics = resolver.resolve_metrics(metric_specs, &global)?;
        let groups = plan::plan_calls(&resolved_dims, &resolved_metrics)?;

        let label = site
            .identifier(&options.item_key)
            .unwrap_or_else(|| "?".to_string());
        let mut frames = Vec::with_capacity(groups.len());
        for group in &groups {
            debug!(
                site = %label,
                filter_d = ?group.filter.filter_d,
                filter_m = ?group.filter.filter_m,
                metrics = group.metrics.len(),
                "planned call"
            );
            let call = SourceCall {
                dimensions: resolved_dims.clone(),
                metrics: group.metrics.clone(),
                filter: group.filter.clone(),
                start_date: options.start_date.clone(),
                end_date: options.end_date.clone(),
                limit: options.limit,
            };
            let fetched = self.source.fetch(site, &call)?;
            debug!(site = %label, rows = fetched.len(), "fetched");

            let mut normalized = merge::normalize_group(&fetched, &resolved_dims, &group.metrics)?;
            if let Some(base) = site.base_url() {
                for dim in resolved_dims.iter().filter(|d| d.absolute) {
                    normalized = merge::absolutize(&normalized, &dim.alias, base)?;
                }
            }
            frames.push(normalized);
        }

        let dim_aliases: Vec<String> = resolved_dims.iter().map(|d| d.alias.clone()).collect();
        merge::join_groups(&frames, &dim_aliases, options.merge)
    }
}
