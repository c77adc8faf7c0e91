//! Ordered, column-major tabular results.
//!
//! A [`Frame`] is the unified shape every backend call produces and every
//! transform consumes: a sequence of named columns, each holding one value per
//! record. Column order and row order are preserved for reproducibility.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value::Value;

/// Errors from structural frame operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("Duplicate column: '{0}'")]
    DuplicateColumn(String),

    #[error("Column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    #[error("Row has {actual} values, frame has {expected} columns")]
    RowArity { expected: usize, actual: usize },
}

pub type FrameResult<T> = Result<T, FrameError>;

/// A named column of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// True when every non-null value is numeric and at least one value is.
    pub fn is_numeric(&self) -> bool {
        let mut seen = false;
        for v in &self.values {
            match v {
                Value::Null => {}
                v if v.is_numeric() => seen = true,
                _ => return false,
            }
        }
        seen
    }
}

/// An ordered collection of equal-length named columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<Column>,
}

impl Frame {
    /// An empty frame with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty frame that declares the given columns (zero rows).
    pub fn with_names<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            columns: names
                .iter()
                .map(|n| Column::new(n.as_ref(), Vec::new()))
                .collect(),
        }
    }

    /// Build a frame from (name, values) pairs, validating shape.
    pub fn from_columns<I, S>(columns: I) -> FrameResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let mut frame = Frame::new();
        for (name, values) in columns {
            frame.push_column(name, values)?;
        }
        Ok(frame)
    }

    /// Append a column. Fails on duplicate names or mismatched length.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> FrameResult<()> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        if !self.columns.is_empty() && values.len() != self.len() {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.push(Column::new(name, values));
        Ok(())
    }

    /// Append one row, positionally.
    pub fn push_row(&mut self, row: Vec<Value>) -> FrameResult<()> {
        if row.len() != self.width() {
            return Err(FrameError::RowArity {
                expected: self.width(),
                actual: row.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        Ok(())
    }

    /// Number of rows.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Values of a column, or an error naming the missing column.
    pub fn values(&self, name: &str) -> FrameResult<&[Value]> {
        self.column(name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| FrameError::UnknownColumn(name.to_string()))
    }

    /// One cell; Null when the row index is out of bounds.
    pub fn cell(&self, name: &str, row: usize) -> Value {
        self.column(name)
            .and_then(|c| c.values.get(row).cloned())
            .unwrap_or(Value::Null)
    }

    /// One row, positionally, cloned.
    pub fn row(&self, index: usize) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| c.values.get(index).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Project (and reorder) to the named columns.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> FrameResult<Frame> {
        let mut out = Frame::new();
        for name in names {
            let column = self
                .column(name.as_ref())
                .ok_or_else(|| FrameError::UnknownColumn(name.as_ref().to_string()))?;
            out.push_column(column.name.clone(), column.values.clone())?;
        }
        Ok(out)
    }

    /// Rename a column in place. Renaming onto an existing name fails.
    pub fn rename_column(&mut self, from: &str, to: &str) -> FrameResult<()> {
        if from == to {
            return Ok(());
        }
        if self.has_column(to) {
            return Err(FrameError::DuplicateColumn(to.to_string()));
        }
        let index = self
            .column_index(from)
            .ok_or_else(|| FrameError::UnknownColumn(from.to_string()))?;
        self.columns[index].name = to.to_string();
        Ok(())
    }

    /// Drop a column if present.
    pub fn drop_column(&mut self, name: &str) {
        self.columns.retain(|c| c.name != name);
    }

    /// New frame keeping rows where `mask` is true. The mask must cover every
    /// row; extra entries are ignored.
    pub fn filter_rows(&self, mask: &[bool]) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = c
                    .values
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(v, _)| v.clone())
                    .collect();
                Column::new(c.name.clone(), values)
            })
            .collect();
        Frame { columns }
    }

    /// New frame with rows in the given order (indices may repeat).
    pub fn take_rows(&self, indices: &[usize]) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let values = indices
                    .iter()
                    .map(|&i| c.values.get(i).cloned().unwrap_or(Value::Null))
                    .collect();
                Column::new(c.name.clone(), values)
            })
            .collect();
        Frame { columns }
    }

    /// Stable multi-key sort. Each key is `(column, ascending)`.
    pub fn sort_rows(&self, keys: &[(&str, bool)]) -> FrameResult<Frame> {
        let mut key_columns = Vec::with_capacity(keys.len());
        for (name, ascending) in keys {
            key_columns.push((self.values(name)?, *ascending));
        }

        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            for (values, ascending) in &key_columns {
                let ord = values[a].total_cmp(&values[b]);
                let ord = if *ascending { ord } else { ord.reverse() };
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });

        Ok(self.take_rows(&order))
    }

    /// Replace a column's values via a mapping function, returning a new frame.
    pub fn map_column<F>(&self, name: &str, f: F) -> FrameResult<Frame>
    where
        F: Fn(&Value) -> Value,
    {
        let index = self
            .column_index(name)
            .ok_or_else(|| FrameError::UnknownColumn(name.to_string()))?;
        let mut out = self.clone();
        out.columns[index].values = self.columns[index].values.iter().map(f).collect();
        Ok(out)
    }

    /// Replace an existing column's values wholesale.
    pub fn set_values(&mut self, name: &str, values: Vec<Value>) -> FrameResult<()> {
        let expected = self.len();
        let index = self
            .column_index(name)
            .ok_or_else(|| FrameError::UnknownColumn(name.to_string()))?;
        if values.len() != expected {
            return Err(FrameError::LengthMismatch {
                column: name.to_string(),
                expected,
                actual: values.len(),
            });
        }
        self.columns[index].values = values;
        Ok(())
    }
}

impl fmt::Display for Frame {
    /// Aligned text table: headers, then rows. Numeric columns are
    /// right-aligned, everything else left-aligned.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "(empty frame)");
        }

        let rendered: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| c.values.iter().map(|v| v.to_string()).collect())
            .collect();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .zip(&rendered)
            .map(|(c, cells)| {
                cells
                    .iter()
                    .map(String::len)
                    .chain(std::iter::once(c.name.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let numeric: Vec<bool> = self.columns.iter().map(Column::is_numeric).collect();

        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, "  ")?;
            }
            write!(f, "{:<width$}", column.name, width = widths[i])?;
        }
        for row in 0..self.len() {
            writeln!(f)?;
            for i in 0..self.columns.len() {
                if i > 0 {
                    write!(f, "  ")?;
                }
                let cell = &rendered[i][row];
                if numeric[i] {
                    write!(f, "{:>width$}", cell, width = widths[i])?;
                } else {
                    write!(f, "{:<width$}", cell, width = widths[i])?;
                }
            }
        }
        Ok(())
    }
}
