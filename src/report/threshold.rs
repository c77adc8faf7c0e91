//! Row thresholds over click and impression counts.
//!
//! Reporting rows below an impression floor are noise, except for rows that
//! already converted: `keep_clicked` protects any row with a truthy click
//! count from the floor. Thresholds resolve per row: an explicit bound wins,
//! otherwise the owning site's configured floor applies, otherwise the row
//! passes.

use crate::frame::Value;
use crate::query::site::Site;
use crate::report::{ReportFrame, ReportResult};

/// Options for [`ReportFrame::filter_clicks`].
#[derive(Debug, Clone, Copy, Default)]
#[must_use = "builders have no effect until used"]
pub struct ClickFilter {
    min: Option<f64>,
    max: Option<f64>,
}

impl ClickFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

/// Options for [`ReportFrame::filter_impressions`].
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until used"]
pub struct ImpressionFilter<'a> {
    min: Option<f64>,
    max: Option<f64>,
    sites: Option<&'a [Site]>,
    site_key: String,
    keep_clicked: bool,
}

impl Default for ImpressionFilter<'_> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            sites: None,
            site_key: "site".to_string(),
            keep_clicked: false,
        }
    }
}

impl<'a> ImpressionFilter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Resolve per-row floors from this site table's `min_impressions`
    /// values, matching rows to sites by the `site_key` column.
    pub fn with_sites(mut self, sites: &'a [Site]) -> Self {
        self.sites = Some(sites);
        self
    }

    pub fn with_site_key(mut self, site_key: impl Into<String>) -> Self {
        self.site_key = site_key.into();
        self
    }

    /// Keep rows whose `clicks` value is truthy (or missing) regardless of
    /// the floor.
    pub fn with_keep_clicked(mut self, keep_clicked: bool) -> Self {
        self.keep_clicked = keep_clicked;
        self
    }
}

impl ReportFrame {
    /// Keep rows whose `clicks` value lies within the given bounds. A frame
    /// without a `clicks` column passes through unchanged.
    pub fn filter_clicks(&self, options: &ClickFilter) -> ReportResult<ReportFrame> {
        if !self.frame().has_column("clicks") {
            return Ok(self.clone());
        }
        let clicks = self.frame().values("clicks")?;
        let mask: Vec<bool> = clicks
            .iter()
            .map(|v| within(v.as_f64(), options.min, options.max))
            .collect();
        Ok(self.derive(self.frame().filter_rows(&mask), self.dimensions().to_vec()))
    }

    /// Keep rows whose `impressions` value meets the resolved floor (and
    /// optional ceiling).
    ///
    /// The floor for a row is the explicit `min` when given, otherwise the
    /// `min_impressions` of the site whose identifier matches the row's
    /// `site_key` cell. Rows with no resolvable floor pass. With
    /// `keep_clicked`, rows whose `clicks` value is truthy are kept
    /// unconditionally, and so are rows whose `clicks` value is missing. A
    /// frame without an `impressions` column passes through unchanged.
    pub fn filter_impressions(&self, options: &ImpressionFilter<'_>) -> ReportResult<ReportFrame> {
        if !self.frame().has_column("impressions") {
            return Ok(self.clone());
        }
        let impressions = self.frame().values("impressions")?;
        let clicks = if self.frame().has_column("clicks") {
            Some(self.frame().values("clicks")?)
        } else {
            None
        };
        let row_sites = if options.min.is_none() && options.sites.is_some() {
            self.frame().values(&options.site_key).ok()
        } else {
            None
        };

        let mask: Vec<bool> = (0..self.len())
            .map(|row| {
                if options.keep_clicked {
                    match clicks.map(|c| &c[row]) {
                        Some(Value::Null) => return true,
                        Some(v) if v.is_truthy() => return true,
                        _ => {}
                    }
                }
                let min = options.min.or_else(|| {
                    let sites = options.sites?;
                    let id = row_sites.map(|col| col[row].to_string())?;
                    sites
                        .iter()
                        .find(|site| site.identifier(&options.site_key).as_deref() == Some(&id))
                        .and_then(|site| site.threshold("min_impressions"))
                });
                within(impressions[row].as_f64(), min, options.max)
            })
            .collect();
        Ok(self.derive(self.frame().filter_rows(&mask), self.dimensions().to_vec()))
    }
}

/// Bounds check; an unset bound always passes, a missing value fails any set
/// bound.
fn within(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    match (value, min, max) {
        (_, None, None) => true,
        (None, _, _) => false,
        (Some(v), min, max) => min.is_none_or(|m| v >= m) && max.is_none_or(|m| v <= m),
    }
}
