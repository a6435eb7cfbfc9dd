//! In-memory tabular dataset and per-column type inference.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Build a number cell, demoting non-finite input to `Missing`.
    pub fn number(n: f64) -> Self {
        if n.is_finite() {
            Self::Number(n)
        } else {
            Self::Missing
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Type a raw textual cell: empty is missing, a finite number is numeric.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Display form used for counting, classification and CSV output.
    ///
    /// Integral numbers render without a fractional part.
    pub fn display(&self) -> String {
        match self {
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
            Self::Missing => String::new(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Missing,
            serde_json::Value::Number(n) => n.as_f64().map(Self::number).unwrap_or(Self::Missing),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Bool(b) => Self::Text(b.to_string()),
            other => Self::Text(other.to_string()),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

static MISSING: Value = Value::Missing;

/// Cell `idx` of a row. Cells past the end of a short row read as `Missing`.
pub fn cell(row: &[Value], idx: usize) -> &Value {
    row.get(idx).unwrap_or(&MISSING)
}

/// Inferred data type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every non-missing value is a number.
    Numeric,
    /// At least one non-missing value is text.
    Text,
    /// No non-missing values at all.
    Empty,
}

/// Infer the kind of a column from its values.
pub fn infer_column_kind<'a>(values: impl IntoIterator<Item = &'a Value>) -> ColumnKind {
    let mut has_number = false;
    for v in values {
        match v {
            Value::Text(_) => return ColumnKind::Text,
            Value::Number(_) => has_number = true,
            Value::Missing => {}
        }
    }
    if has_number {
        ColumnKind::Numeric
    } else {
        ColumnKind::Empty
    }
}

/// Ordered rows over a fixed set of named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, padding short rows with `Missing`.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Missing);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a dataset from named columns of equal length.
    pub fn from_columns(columns: Vec<(&str, Vec<Value>)>) -> Self {
        let names = columns.iter().map(|(n, _)| n.to_string()).collect();
        let height = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let rows = (0..height)
            .map(|i| {
                columns
                    .iter()
                    .map(|(_, vals)| vals.get(i).cloned().unwrap_or(Value::Missing))
                    .collect()
            })
            .collect();
        Self {
            columns: names,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of a column in row order.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| cell(row, idx))
    }

    pub fn column_kind(&self, idx: usize) -> ColumnKind {
        infer_column_kind(self.column_values(idx))
    }

    /// Indices of columns of the given kind, in column order.
    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<usize> {
        (0..self.columns.len())
            .filter(|&i| self.column_kind(i) == kind)
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<usize> {
        self.columns_of_kind(ColumnKind::Numeric)
    }

    pub fn text_columns(&self) -> Vec<usize> {
        self.columns_of_kind(ColumnKind::Text)
    }

    /// Non-missing numbers of a column in row order.
    pub fn numeric_values(&self, idx: usize) -> Vec<f64> {
        self.column_values(idx).filter_map(Value::as_number).collect()
    }

    /// Display strings of the non-missing values of a column, in row order.
    pub fn text_values(&self, idx: usize) -> Vec<String> {
        self.column_values(idx)
            .filter(|v| !v.is_missing())
            .map(Value::display)
            .collect()
    }

    pub fn non_missing_count(&self, idx: usize) -> usize {
        self.column_values(idx).filter(|v| !v.is_missing()).count()
    }

    /// Number of distinct non-missing values in a column.
    pub fn distinct_count(&self, idx: usize) -> usize {
        self.column_values(idx)
            .filter(|v| !v.is_missing())
            .map(Value::display)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Missing-value count per column, in column order.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let missing = self.column_values(i).filter(|v| v.is_missing()).count();
                (name.clone(), missing)
            })
            .collect()
    }

    /// Pad short rows with `Missing` and cut long ones to the column count.
    pub fn pad_rows(&mut self) {
        let width = self.columns.len();
        for row in self.rows.iter_mut() {
            row.resize(width, Value::Missing);
        }
    }

    /// Drop rows whose every value is missing. Returns how many were dropped.
    pub fn drop_empty_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| row.iter().any(|v| !v.is_missing()));
        before - self.rows.len()
    }

    /// New dataset made of the given rows (repeats allowed) in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Keep only rows for which `keep(index)` is true. Returns how many were removed.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(usize) -> bool) -> usize {
        let before = self.rows.len();
        let mut idx = 0;
        self.rows.retain(|_| {
            let k = keep(idx);
            idx += 1;
            k
        });
        before - self.rows.len()
    }

    /// Serialize to CSV with a header row. Output is deterministic for equal datasets.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_csv_line(&mut out, self.columns.iter().map(String::as_str));
        for row in &self.rows {
            let cells: Vec<String> = (0..self.columns.len())
                .map(|i| cell(row, i).display())
                .collect();
            push_csv_line(&mut out, cells.iter().map(String::as_str));
        }
        out
    }
}

fn push_csv_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    let mut first = true;
    for cell in cells {
        if !first {
            out.push(',');
        }
        first = false;
        if cell.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cells() {
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse(" 42 "), Value::Number(42.0));
        assert_eq!(Value::parse("3.5"), Value::Number(3.5));
        assert_eq!(Value::parse("inf"), Value::text("inf"));
        assert_eq!(Value::parse("Alice"), Value::text("Alice"));
    }

    #[test]
    fn test_display_integral_numbers() {
        assert_eq!(Value::Number(30.0).display(), "30");
        assert_eq!(Value::Number(2.5).display(), "2.5");
        assert_eq!(Value::Number(-4.0).display(), "-4");
    }

    #[test]
    fn test_infer_column_kind() {
        let nums = [Value::Number(1.0), Value::Missing, Value::Number(2.0)];
        assert_eq!(infer_column_kind(&nums), ColumnKind::Numeric);
        let mixed = [Value::Number(1.0), Value::text("x")];
        assert_eq!(infer_column_kind(&mixed), ColumnKind::Text);
        let empty = [Value::Missing, Value::Missing];
        assert_eq!(infer_column_kind(&empty), ColumnKind::Empty);
    }

    #[test]
    fn test_json_values() {
        assert_eq!(Value::from(serde_json::json!(null)), Value::Missing);
        assert_eq!(Value::from(serde_json::json!(7)), Value::Number(7.0));
        assert_eq!(Value::from(serde_json::json!(true)), Value::text("true"));
    }

    #[test]
    fn test_drop_empty_rows_and_retain() {
        let mut ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![Value::Missing, Value::Missing],
                vec![Value::Number(1.0), Value::Missing],
                vec![Value::Number(2.0), Value::text("x")],
            ],
        );
        assert_eq!(ds.drop_empty_rows(), 1);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.retain_rows(|i| i == 1), 1);
        assert_eq!(ds.rows[0][1], Value::text("x"));
    }

    #[test]
    fn test_ragged_rows_read_as_missing_and_pad() {
        let mut ds = Dataset::from_columns(vec![
            ("a", vec![Value::Number(1.0), Value::Number(2.0)]),
            ("b", vec![Value::text("x"), Value::text("y")]),
        ]);
        ds.rows[1].truncate(1);
        ds.rows[0].push(Value::text("extra"));
        assert_eq!(cell(&ds.rows[1], 1), &Value::Missing);
        assert_eq!(ds.missing_counts()[1], ("b".to_string(), 1));

        ds.pad_rows();
        assert!(ds.rows.iter().all(|r| r.len() == 2));
        assert_eq!(ds.rows[1][1], Value::Missing);
    }

    #[test]
    fn test_to_csv_quotes_when_needed() {
        let ds = Dataset::from_columns(vec![
            ("name", vec![Value::text("Smith, J"), Value::text("say \"hi\"")]),
            ("n", vec![Value::Number(1.0), Value::Missing]),
        ]);
        assert_eq!(
            ds.to_csv(),
            "name,n\n\"Smith, J\",1\n\"say \"\"hi\"\"\",\n"
        );
    }

    #[test]
    fn test_distinct_and_missing_counts() {
        let ds = Dataset::from_columns(vec![(
            "g",
            vec![Value::text("M"), Value::text("F"), Value::text("M"), Value::Missing],
        )]);
        assert_eq!(ds.distinct_count(0), 2);
        assert_eq!(ds.missing_counts(), vec![("g".to_string(), 1)]);
        assert_eq!(ds.non_missing_count(0), 3);
    }
}
