//! Rule-based categorization of dimension values.
//!
//! Rules are ordered and the first match wins, so put the specific ones
//! before the catch-alls. Re-running the same rules over an already labeled
//! frame reproduces the same labels.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::frame::Value;
use crate::report::{GroupOptions, ReportError, ReportFrame, ReportResult};

/// One labeling rule: a substring or regex pattern and the category it maps
/// to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub pattern: String,
    pub category: String,
    #[serde(default)]
    pub regex: bool,
}

impl CategoryRule {
    /// Substring match.
    pub fn literal(pattern: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            category: category.into(),
            regex: false,
        }
    }

    /// Unanchored regex match.
    pub fn regex(pattern: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            category: category.into(),
            regex: true,
        }
    }
}

enum Matcher {
    Literal(String),
    Regex(Regex),
}

impl Matcher {
    fn compile(rule: &CategoryRule) -> ReportResult<Self> {
        if rule.regex {
            let re = Regex::new(&rule.pattern).map_err(|source| ReportError::Pattern {
                pattern: rule.pattern.clone(),
                source,
            })?;
            Ok(Matcher::Regex(re))
        } else {
            Ok(Matcher::Literal(rule.pattern.clone()))
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            Matcher::Literal(pattern) => text.contains(pattern.as_str()),
            Matcher::Regex(re) => re.is_match(text),
        }
    }
}

/// Options for [`ReportFrame::classify`].
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until used"]
pub struct CategoryOptions {
    by: Option<String>,
    output: Option<String>,
    default_category: String,
    group: bool,
}

impl Default for CategoryOptions {
    fn default() -> Self {
        Self {
            by: None,
            output: None,
            default_category: "(other)".to_string(),
            group: false,
        }
    }
}

impl CategoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match rules against this column instead of the one being labeled.
    pub fn with_by(mut self, by: impl Into<String>) -> Self {
        self.by = Some(by.into());
        self
    }

    /// Name of the label column (default `<dimension>_category`).
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Label for rows no rule matches.
    pub fn with_default(mut self, default_category: impl Into<String>) -> Self {
        self.default_category = default_category.into();
        self
    }

    /// Aggregate on the current dimensions plus the label column afterwards.
    pub fn with_group(mut self, group: bool) -> Self {
        self.group = group;
        self
    }
}

impl ReportFrame {
    /// Label rows of `dimension` by the first matching rule, writing the
    /// label into a new dimension column.
    ///
    /// Null match values take the default label. The label column joins the
    /// container's dimensions; with `group: true` the frame is then
    /// re-aggregated on dimensions plus the label.
    pub fn classify(
        &self,
        dimension: &str,
        rules: &[CategoryRule],
        options: &CategoryOptions,
    ) -> ReportResult<ReportFrame> {
        let match_column = options.by.as_deref().unwrap_or(dimension);
        let output = options
            .output
            .clone()
            .unwrap_or_else(|| format!("{dimension}_category"));

        let matchers: Vec<(Matcher, &str)> = rules
            .iter()
            .map(|rule| Matcher::compile(rule).map(|m| (m, rule.category.as_str())))
            .collect::<ReportResult<_>>()?;

        let labels: Vec<Value> = self
            .frame()
            .values(match_column)?
            .iter()
            .map(|v| {
                let text = match v {
                    Value::Null => return Value::from(options.default_category.as_str()),
                    Value::Str(s) => s.clone(),
                    other => other.to_string(),
                };
                matchers
                    .iter()
                    .find(|(m, _)| m.matches(&text))
                    .map(|(_, category)| Value::from(*category))
                    .unwrap_or_else(|| Value::from(options.default_category.as_str()))
            })
            .collect();

        let mut frame = self.frame().clone();
        if frame.has_column(&output) {
            frame.set_values(&output, labels)?;
        } else {
            frame.push_column(output.clone(), labels)?;
        }
        let mut dimensions = self.dimensions().to_vec();
        if !dimensions.contains(&output) {
            dimensions.push(output);
        }

        let labeled = self.derive(frame, dimensions);
        if options.group {
            labeled.group(&GroupOptions::new())
        } else {
            Ok(labeled)
        }
    }
}
