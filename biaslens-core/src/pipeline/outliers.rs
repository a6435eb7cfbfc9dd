//! Stage 4: drop rows with extreme numeric values.

use crate::data::{Dataset, Value, cell};
use crate::data::stats::IqrBounds;
use tracing::{debug, info};

const MULTIPLIER: f64 = 2.5;
const MIN_VALUES: usize = 20;
/// Removals at or above this share of the current rows are skipped.
const MAX_REMOVAL_SHARE: f64 = 0.15;

/// Remove rows outside `[Q1 - 2.5 IQR, Q3 + 2.5 IQR]`, one numeric column at a
/// time. Columns with 20 or fewer values or zero spread are left alone.
pub fn remove_outliers(dataset: &mut Dataset) -> usize {
    let mut removed_total = 0;
    for idx in dataset.numeric_columns() {
        let values = dataset.numeric_values(idx);
        if values.len() <= MIN_VALUES {
            continue;
        }
        let Some(bounds) = IqrBounds::compute(&values, MULTIPLIER) else {
            continue;
        };
        if bounds.iqr() <= 0.0 {
            continue;
        }

        let outlier = |row: &[Value]| cell(row, idx).as_number().is_some_and(|x| bounds.is_outlier(x));
        let count = dataset.rows.iter().filter(|r| outlier(r.as_slice())).count();
        let rows = dataset.row_count();
        if count == 0 || count as f64 >= rows as f64 * MAX_REMOVAL_SHARE {
            debug!(column = %dataset.columns[idx], outliers = count, "No outliers removed");
            continue;
        }
        let flags: Vec<bool> = dataset.rows.iter().map(|r| outlier(r.as_slice())).collect();
        let removed = dataset.retain_rows(|i| !flags[i]);
        info!(column = %dataset.columns[idx], removed, "Removed outliers");
        removed_total += removed;
    }
    removed_total
}
