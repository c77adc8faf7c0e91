//! Transforms as data.
//!
//! [`TransformOp`] is a closed enum over every container transform, so a
//! conditionally-applied step is an ordinary value: misspelling an operation
//! or its parameters is a compile error, not a runtime lookup failure.

use crate::frame::Value;
use crate::query::site::Site;
use crate::report::threshold::{ClickFilter, ImpressionFilter};
use crate::report::{
    CategoryOptions, CategoryRule, GroupOptions, NormalizeOptions, ReportFrame, ReportResult,
};

/// One container transform and its parameters.
#[derive(Debug, Clone)]
pub enum TransformOp {
    Decode {
        column: String,
        group: bool,
    },
    RemoveParams {
        column: String,
        keep: Vec<String>,
        group: bool,
    },
    RemoveFragment {
        column: String,
        group: bool,
    },
    Lower {
        column: String,
        group: bool,
    },
    NormalizeQueries(NormalizeOptions),
    Classify {
        dimension: String,
        rules: Vec<CategoryRule>,
        options: CategoryOptions,
    },
    Group(GroupOptions),
    Aggregate {
        by: Vec<String>,
    },
    Fill {
        value: Value,
        columns: Option<Vec<String>>,
    },
    ToInt {
        columns: Vec<String>,
        fill_value: Option<Value>,
    },
    Replace {
        column: String,
        pattern: String,
        replacement: String,
        regex: bool,
    },
    Sort {
        by: Vec<String>,
        ascending: Vec<bool>,
    },
    FilterClicks(ClickFilter),
    FilterImpressions {
        min: Option<f64>,
        max: Option<f64>,
        sites: Option<Vec<Site>>,
        site_key: String,
        keep_clicked: bool,
    },
    Select {
        columns: Vec<String>,
    },
    Drop {
        columns: Vec<String>,
    },
    Rename {
        from: String,
        to: String,
    },
    Head {
        n: usize,
    },
}

impl ReportFrame {
    /// Apply one [`TransformOp`].
    pub fn apply(&self, op: &TransformOp) -> ReportResult<ReportFrame> {
        match op {
            TransformOp::Decode { column, group } => self.decode(column, *group),
            TransformOp::RemoveParams {
                column,
                keep,
                group,
            } => self.remove_params(column, keep, *group),
            TransformOp::RemoveFragment { column, group } => self.remove_fragment(column, *group),
            TransformOp::Lower { column, group } => self.lower(column, *group),
            TransformOp::NormalizeQueries(options) => self.normalize_queries(options),
            TransformOp::Classify {
                dimension,
                rules,
                options,
            } => self.classify(dimension, rules, options),
            TransformOp::Group(options) => self.group(options),
            TransformOp::Aggregate { by } => self.aggregate(by),
            TransformOp::Fill { value, columns } => self.fill_with(value, columns.as_deref()),
            TransformOp::ToInt {
                columns,
                fill_value,
            } => self.to_int(columns, fill_value.as_ref()),
            TransformOp::Replace {
                column,
                pattern,
                replacement,
                regex,
            } => self.replace(column, pattern, replacement, *regex),
            TransformOp::Sort { by, ascending } => self.sort(by, ascending),
            TransformOp::FilterClicks(options) => self.filter_clicks(options),
            TransformOp::FilterImpressions {
                min,
                max,
                sites,
                site_key,
                keep_clicked,
            } => {
                let mut options = ImpressionFilter::new()
                    .with_site_key(site_key.clone())
                    .with_keep_clicked(*keep_clicked);
                if let Some(min) = min {
                    options = options.with_min(*min);
                }
                if let Some(max) = max {
                    options = options.with_max(*max);
                }
                if let Some(sites) = sites {
                    options = options.with_sites(sites);
                }
                self.filter_impressions(&options)
            }
            TransformOp::Select { columns } => self.select(columns),
            TransformOp::Drop { columns } => self.drop(columns),
            TransformOp::Rename { from, to } => self.rename(from, to),
            TransformOp::Head { n } => Ok(self.head(*n)),
        }
    }

    /// Apply `op` only when `condition` holds; otherwise return an unchanged
    /// copy.
    pub fn apply_if(&self, condition: bool, op: &TransformOp) -> ReportResult<ReportFrame> {
        if condition {
            self.apply(op)
        } else {
            Ok(self.clone())
        }
    }

    /// Apply `op` only when the predicate accepts the current container.
    pub fn apply_when(
        &self,
        predicate: impl FnOnce(&ReportFrame) -> bool,
        op: &TransformOp,
    ) -> ReportResult<ReportFrame> {
        self.apply_if(predicate(self), op)
    }
}
