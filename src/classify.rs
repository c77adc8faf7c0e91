//! Column classification: dimensions vs. metrics.
//!
//! Metric columns must be aggregatable by default, but some dimensions
//! (calendar buckets like `yearMonth`) are numerically typed and must not be
//! reclassified as metrics merely because of type. The classifier therefore
//! checks a fixed allowlist of known dimension names before falling back to
//! the numeric-type heuristic, and an explicit dimension list always wins.

use std::collections::HashSet;

use crate::frame::Frame;

/// Dimension names recognized regardless of value type. Covers the calendar
/// buckets and categorical fields of the supported reporting backends.
const KNOWN_DIMENSIONS: &[&str] = &[
    // calendar buckets (often numeric-typed)
    "date",
    "dateHour",
    "day",
    "week",
    "month",
    "year",
    "yearMonth",
    "year_month",
    "yearWeek",
    // search performance
    "query",
    "page",
    "country",
    "device",
    "searchAppearance",
    // web analytics
    "hostname",
    "landingPage",
    "pagePath",
    "pageTitle",
    "sessionSource",
    "sessionMedium",
    "sessionCampaignName",
    "sessionDefaultChannelGroup",
    "source",
    "medium",
    "campaign",
    "channel",
    "city",
    "region",
    "browser",
    "operatingSystem",
    "platform",
    "eventName",
];

/// Decides which columns of a frame are dimensions.
#[derive(Debug, Clone)]
pub struct ColumnClassifier {
    known: HashSet<String>,
}

impl Default for ColumnClassifier {
    fn default() -> Self {
        Self {
            known: KNOWN_DIMENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ColumnClassifier {
    /// Classifier with a custom allowlist instead of the built-in one.
    pub fn with_known<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Extend the allowlist.
    pub fn add_known(mut self, name: impl Into<String>) -> Self {
        self.known.insert(name.into());
        self
    }

    pub fn is_known_dimension(&self, name: &str) -> bool {
        self.known.contains(name)
    }

    /// Dimension columns of `frame`, in column order.
    ///
    /// An explicit list is authoritative and returned verbatim. Otherwise a
    /// column is a dimension when its name is allowlisted or its values are
    /// not uniformly numeric; all-null columns count as dimensions (nothing
    /// proves they aggregate).
    pub fn detect(&self, frame: &Frame, explicit: Option<&[String]>) -> Vec<String> {
        if let Some(explicit) = explicit {
            return explicit.to_vec();
        }

        frame
            .columns()
            .iter()
            .filter(|c| self.is_known_dimension(&c.name) || !c.is_numeric())
            .map(|c| c.name.clone())
            .collect()
    }
}
