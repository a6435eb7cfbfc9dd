//! Stage 1: fill missing cells.

use crate::data::stats;
use crate::data::{ColumnKind, Dataset, Value};
use crate::error::BiasError;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Fill value for columns with no values at all.
pub const PLACEHOLDER: &str = "Unknown";

/// Most frequent value; ties resolve to the smallest display form.
fn mode(dataset: &Dataset, idx: usize) -> Option<Value> {
    let mut counts: HashMap<String, (usize, &Value)> = HashMap::new();
    for v in dataset.column_values(idx).filter(|v| !v.is_missing()) {
        counts.entry(v.display()).or_insert((0, v)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(ka, (ca, _)), (kb, (cb, _))| ca.cmp(cb).then_with(|| kb.cmp(ka)))
        .map(|(_, (_, v))| v.clone())
}

fn fill_value(dataset: &Dataset, idx: usize) -> Result<Value, BiasError> {
    match dataset.column_kind(idx) {
        ColumnKind::Numeric => stats::median(&dataset.numeric_values(idx))
            .map(Value::number)
            .ok_or_else(|| BiasError::pipeline("median undefined")),
        ColumnKind::Text => Ok(mode(dataset, idx).unwrap_or_else(|| Value::text(PLACEHOLDER))),
        ColumnKind::Empty => Ok(Value::text(PLACEHOLDER)),
    }
}

/// Numeric columns take their median, others their mode, empty columns the
/// placeholder. Returns the number of cells filled.
pub fn impute_missing(dataset: &mut Dataset) -> usize {
    dataset.pad_rows();
    let mut filled = 0;
    for idx in 0..dataset.column_count() {
        let missing = dataset.column_values(idx).filter(|v| v.is_missing()).count();
        if missing == 0 {
            continue;
        }
        let value = match fill_value(dataset, idx) {
            Ok(v) => v,
            Err(e) => {
                warn!(column = %dataset.columns[idx], error = %e, "Could not impute column");
                continue;
            }
        };
        debug!(column = %dataset.columns[idx], missing, fill = %value.display(), "Imputing");
        for slot in dataset.rows.iter_mut().filter_map(|row| row.get_mut(idx)) {
            if slot.is_missing() {
                *slot = value.clone();
            }
        }
        filled += missing;
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_median_and_text_mode() {
        let mut ds = Dataset::from_columns(vec![
            (
                "n",
                vec![Value::Number(1.0), Value::Missing, Value::Number(3.0), Value::Number(10.0)],
            ),
            (
                "t",
                vec![Value::text("b"), Value::text("a"), Value::Missing, Value::text("a")],
            ),
        ]);
        assert_eq!(impute_missing(&mut ds), 2);
        assert_eq!(ds.rows[1][0], Value::Number(3.0));
        assert_eq!(ds.rows[2][1], Value::text("a"));
    }

    #[test]
    fn test_mode_tie_takes_smallest() {
        let mut ds = Dataset::from_columns(vec![(
            "t",
            vec![Value::text("z"), Value::text("m"), Value::Missing],
        )]);
        impute_missing(&mut ds);
        assert_eq!(ds.rows[2][0], Value::text("m"));
    }

    #[test]
    fn test_empty_column_gets_placeholder() {
        let mut ds = Dataset::from_columns(vec![
            ("id", vec![Value::Number(1.0), Value::Number(2.0)]),
            ("notes", vec![Value::Missing, Value::Missing]),
        ]);
        assert_eq!(impute_missing(&mut ds), 2);
        assert_eq!(ds.rows[0][1], Value::text(PLACEHOLDER));
    }

    #[test]
    fn test_short_rows_are_padded_and_filled() {
        let mut ds = Dataset::from_columns(vec![
            ("n", vec![Value::Number(1.0), Value::Number(3.0), Value::Number(5.0)]),
            ("t", vec![Value::text("a"), Value::text("a"), Value::text("b")]),
        ]);
        ds.rows[2].truncate(1);
        assert_eq!(impute_missing(&mut ds), 1);
        assert_eq!(ds.rows[2], vec![Value::Number(5.0), Value::text("a")]);
    }

    #[test]
    fn test_idempotent() {
        let mut ds = Dataset::from_columns(vec![
            ("n", vec![Value::Number(2.0), Value::Missing, Value::Number(4.0)]),
            ("t", vec![Value::Missing, Value::text("x"), Value::text("y")]),
        ]);
        impute_missing(&mut ds);
        let once = ds.clone();
        assert_eq!(impute_missing(&mut ds), 0);
        assert_eq!(ds, once);
    }
}
