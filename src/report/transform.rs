//! Per-column value transforms.
//!
//! String transforms touch only `Str` cells; nulls and numerics pass through
//! unchanged, so a transform chain never turns absence into a value by
//! accident. Each URL/text transform takes a `group` flag that immediately
//! re-aggregates on the current dimensions, collapsing rows the normalization
//! made identical.

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::frame::Value;
use crate::report::{GroupOptions, ReportError, ReportFrame, ReportResult};

impl ReportFrame {
    /// Percent-decode a column (`%2F` becomes `/`). Invalid UTF-8 sequences
    /// decode lossily rather than failing the chain.
    pub fn decode(&self, column: &str, group: bool) -> ReportResult<ReportFrame> {
        self.map_str(column, group, |s| {
            percent_decode_str(s).decode_utf8_lossy().into_owned()
        })
    }

    /// Strip query-string parameters from a URL column, keeping only the
    /// names in `keep` (in their original order). With an empty keep list the
    /// whole query string goes. Fragments are untouched.
    pub fn remove_params<S: AsRef<str>>(
        &self,
        column: &str,
        keep: &[S],
        group: bool,
    ) -> ReportResult<ReportFrame> {
        let keep: Vec<&str> = keep.iter().map(AsRef::as_ref).collect();
        self.map_str(column, group, |s| strip_params(s, &keep))
    }

    /// Strip `#fragment` from a URL column.
    pub fn remove_fragment(&self, column: &str, group: bool) -> ReportResult<ReportFrame> {
        self.map_str(column, group, |s| match s.find('#') {
            Some(pos) => s[..pos].to_string(),
            None => s.to_string(),
        })
    }

    /// Lowercase a column.
    pub fn lower(&self, column: &str, group: bool) -> ReportResult<ReportFrame> {
        self.map_str(column, group, str::to_lowercase)
    }

    /// Replace occurrences of `pattern` with `replacement` in a column.
    ///
    /// With `regex: true` the pattern is a regular expression and the
    /// replacement may reference capture groups (`$1`, `$name`); otherwise
    /// both are literal text.
    pub fn replace(
        &self,
        column: &str,
        pattern: &str,
        replacement: &str,
        regex: bool,
    ) -> ReportResult<ReportFrame> {
        if regex {
            let re = Regex::new(pattern).map_err(|source| ReportError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;
            self.map_str(column, false, |s| re.replace_all(s, replacement).into_owned())
        } else {
            self.map_str(column, false, |s| s.replace(pattern, replacement))
        }
    }

    /// Coerce metric columns to integers, truncating toward zero. Nulls are
    /// filled with `fill_value` first when given; a null without a fill value
    /// or a non-numeric cell fails the chain.
    pub fn to_int<S: AsRef<str>>(
        &self,
        columns: &[S],
        fill_value: Option<&Value>,
    ) -> ReportResult<ReportFrame> {
        let mut frame = self.frame().clone();
        for column in columns {
            let name = column.as_ref();
            let coerced: Vec<Value> = frame
                .values(name)?
                .iter()
                .map(|v| {
                    let v = match (v, fill_value) {
                        (Value::Null, Some(fill)) => fill,
                        _ => v,
                    };
                    match v {
                        Value::Int(i) => Ok(Value::Int(*i)),
                        Value::Float(f) if f.is_finite() => Ok(Value::Int(*f as i64)),
                        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                        _ => Err(ReportError::NotNumeric(name.to_string())),
                    }
                })
                .collect::<ReportResult<_>>()?;
            frame.set_values(name, coerced)?;
        }
        Ok(self.derive(frame, self.dimensions().to_vec()))
    }

    fn map_str(
        &self,
        column: &str,
        group: bool,
        f: impl Fn(&str) -> String,
    ) -> ReportResult<ReportFrame> {
        let frame = self.frame().map_column(column, |v| match v {
            Value::Str(s) => Value::Str(f(s)),
            other => other.clone(),
        })?;
        let mapped = self.derive(frame, self.dimensions().to_vec());
        if group {
            mapped.group(&GroupOptions::new())
        } else {
            Ok(mapped)
        }
    }
}

fn strip_params(url: &str, keep: &[&str]) -> String {
    let (head, fragment) = match url.find('#') {
        Some(pos) => (&url[..pos], Some(&url[pos..])),
        None => (url, None),
    };
    let stripped = match head.find('?') {
        Some(pos) => {
            let path = &head[..pos];
            let kept: Vec<&str> = head[pos + 1..]
                .split('&')
                .filter(|param| {
                    let name = param.split('=').next().unwrap_or(param);
                    keep.contains(&name)
                })
                .collect();
            if kept.is_empty() {
                path.to_string()
            } else {
                format!("{path}?{}", kept.join("&"))
            }
        }
        None => head.to_string(),
    };
    match fragment {
        Some(fragment) => format!("{stripped}{fragment}"),
        None => stripped,
    }
}
