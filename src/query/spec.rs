//! Dimension and metric specifications.
//!
//! A spec names a backend field and the output alias it lands under. Fields
//! may be per-site indirections written `site.<key>`; the sigil is parsed
//! once here into [`FieldRef`], so later stages match on a sum type instead
//! of re-inspecting string prefixes.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::query::{QueryError, QueryResult};

const SITE_PREFIX: &str = "site.";

// =============================================================================
// Field references
// =============================================================================

/// A backend field name, either literal or looked up per site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldRef {
    Literal(String),
    SiteKey(String),
}

impl FieldRef {
    /// Parse the `site.<key>` sigil; anything else is a literal field.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(SITE_PREFIX) {
            Some(key) if !key.is_empty() => FieldRef::SiteKey(key.to_string()),
            _ => FieldRef::Literal(raw.to_string()),
        }
    }

    /// The alias a spec gets when none is given: the literal name, or the
    /// bare key with the sigil stripped.
    pub fn default_alias(&self) -> &str {
        match self {
            FieldRef::Literal(name) => name,
            FieldRef::SiteKey(key) => key,
        }
    }

    pub fn as_site_key(&self) -> Option<&str> {
        match self {
            FieldRef::SiteKey(key) => Some(key),
            FieldRef::Literal(_) => None,
        }
    }
}

impl From<String> for FieldRef {
    fn from(raw: String) -> Self {
        FieldRef::parse(&raw)
    }
}

impl From<FieldRef> for String {
    fn from(field: FieldRef) -> Self {
        field.to_string()
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Literal(name) => write!(f, "{name}"),
            FieldRef::SiteKey(key) => write!(f, "{SITE_PREFIX}{key}"),
        }
    }
}

// =============================================================================
// Specs
// =============================================================================

/// One requested dimension column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSpec {
    pub field: FieldRef,
    pub alias: String,
    /// Join relative values onto the site's base URL.
    pub absolute: bool,
}

impl DimensionSpec {
    pub fn new(field: &str) -> Self {
        let field = FieldRef::parse(field);
        let alias = field.default_alias().to_string();
        Self {
            field,
            alias,
            absolute: false,
        }
    }

    #[must_use = "builders have no effect until used"]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    #[must_use = "builders have no effect until used"]
    pub fn with_absolute(mut self, absolute: bool) -> Self {
        self.absolute = absolute;
        self
    }

    /// Parse a JSON object spec, rejecting option keys this crate does not
    /// support.
    pub fn from_json(value: &Json) -> QueryResult<Self> {
        match value {
            Json::String(name) => Ok(Self::new(name)),
            Json::Object(map) => {
                let mut field = None;
                let mut alias = None;
                let mut absolute = false;
                for (key, value) in map {
                    match key.as_str() {
                        "field" => field = value.as_str().map(String::from),
                        "alias" => alias = value.as_str().map(String::from),
                        "absolute" => absolute = value.as_bool().unwrap_or(false),
                        other => {
                            return Err(QueryError::UnsupportedOption {
                                option: other.to_string(),
                                context: "dimension",
                            })
                        }
                    }
                }
                let field = field
                    .ok_or_else(|| QueryError::InvalidSpec("dimension spec needs a `field`".into()))?;
                let mut spec = Self::new(&field).with_absolute(absolute);
                if let Some(alias) = alias {
                    spec = spec.with_alias(alias);
                }
                Ok(spec)
            }
            _ => Err(QueryError::InvalidSpec(
                "dimension spec must be a string or an object".into(),
            )),
        }
    }
}

/// One requested metric column, with optional per-metric filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSpec {
    pub field: FieldRef,
    pub alias: String,
    pub filter_d: Option<FieldRef>,
    pub filter_m: Option<FieldRef>,
}

impl MetricSpec {
    pub fn new(field: &str) -> Self {
        let field = FieldRef::parse(field);
        let alias = field.default_alias().to_string();
        Self {
            field,
            alias,
            filter_d: None,
            filter_m: None,
        }
    }

    #[must_use = "builders have no effect until used"]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    #[must_use = "builders have no effect until used"]
    pub fn with_filter_d(mut self, filter: &str) -> Self {
        self.filter_d = Some(FieldRef::parse(filter));
        self
    }

    #[must_use = "builders have no effect until used"]
    pub fn with_filter_m(mut self, filter: &str) -> Self {
        self.filter_m = Some(FieldRef::parse(filter));
        self
    }

    /// Parse a JSON object spec. Only `filter_d` and `filter_m` options
    /// exist; anything else fails naming the option.
    pub fn from_json(value: &Json) -> QueryResult<Self> {
        match value {
            Json::String(name) => Ok(Self::new(name)),
            Json::Object(map) => {
                let mut field = None;
                let mut alias = None;
                let mut filter_d = None;
                let mut filter_m = None;
                for (key, value) in map {
                    match key.as_str() {
                        "field" => field = value.as_str().map(String::from),
                        "alias" => alias = value.as_str().map(String::from),
                        "filter_d" => filter_d = value.as_str().map(String::from),
                        "filter_m" => filter_m = value.as_str().map(String::from),
                        other => {
                            return Err(QueryError::UnsupportedOption {
                                option: other.to_string(),
                                context: "metric",
                            })
                        }
                    }
                }
                let field = field
                    .ok_or_else(|| QueryError::InvalidSpec("metric spec needs a `field`".into()))?;
                let mut spec = Self::new(&field);
                if let Some(alias) = alias {
                    spec = spec.with_alias(alias);
                }
                if let Some(filter) = filter_d {
                    spec = spec.with_filter_d(&filter);
                }
                if let Some(filter) = filter_m {
                    spec = spec.with_filter_m(&filter);
                }
                Ok(spec)
            }
            _ => Err(QueryError::InvalidSpec(
                "metric spec must be a string or an object".into(),
            )),
        }
    }
}

// =============================================================================
// Caller inputs
// =============================================================================

/// A requested dimension: a bare name or a full spec.
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionInput {
    Name(String),
    Spec(DimensionSpec),
}

impl From<&str> for DimensionInput {
    fn from(name: &str) -> Self {
        DimensionInput::Name(name.to_string())
    }
}

impl From<String> for DimensionInput {
    fn from(name: String) -> Self {
        DimensionInput::Name(name)
    }
}

impl From<DimensionSpec> for DimensionInput {
    fn from(spec: DimensionSpec) -> Self {
        DimensionInput::Spec(spec)
    }
}

/// A requested metric: a bare name or a full spec.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricInput {
    Name(String),
    Spec(MetricSpec),
}

impl From<&str> for MetricInput {
    fn from(name: &str) -> Self {
        MetricInput::Name(name.to_string())
    }
}

impl From<String> for MetricInput {
    fn from(name: String) -> Self {
        MetricInput::Name(name)
    }
}

impl From<MetricSpec> for MetricInput {
    fn from(spec: MetricSpec) -> Self {
        MetricInput::Spec(spec)
    }
}

/// Expand dimension inputs into full specs. Bare names and full specs may
/// mix freely here.
pub fn dimension_specs(inputs: &[DimensionInput]) -> Vec<DimensionSpec> {
    inputs
        .iter()
        .map(|input| match input {
            DimensionInput::Name(name) => DimensionSpec::new(name),
            DimensionInput::Spec(spec) => spec.clone(),
        })
        .collect()
}

/// Expand metric inputs into full specs. One call must use one format: a mix
/// of bare names and full specs is rejected rather than silently coerced.
pub fn metric_specs(inputs: &[MetricInput]) -> QueryResult<Vec<MetricSpec>> {
    let names = inputs
        .iter()
        .filter(|i| matches!(i, MetricInput::Name(_)))
        .count();
    if names != 0 && names != inputs.len() {
        return Err(QueryError::MixedMetricFormat);
    }
    Ok(inputs
        .iter()
        .map(|input| match input {
            MetricInput::Name(name) => MetricSpec::new(name),
            MetricInput::Spec(spec) => spec.clone(),
        })
        .collect())
}
