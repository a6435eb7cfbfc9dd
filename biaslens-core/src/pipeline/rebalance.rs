//! Stage 2: rebalance demographic groups by seeded resampling.

use crate::analysis::{is_demographic_column, value_counts};
use crate::data::{Dataset, cell};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::{SliceRandom, index};
use std::collections::HashMap;
use tracing::info;

const MIN_GROUPS: usize = 2;
const MAX_GROUPS: usize = 15;
const RATIO_THRESHOLD: f64 = 1.5;
const MIN_LIFT: usize = 5;
const MAX_UPSAMPLE: usize = 3;

/// Per-group row count the column is resampled towards.
///
/// Midpoint of the smallest and the (floored) mean group, but never fewer
/// than the smallest group plus five.
pub fn target_count(counts: &[usize]) -> usize {
    let min = counts.iter().copied().min().unwrap_or(0);
    let avg = counts.iter().sum::<usize>() / counts.len().max(1);
    ((min + avg) / 2).max(min + MIN_LIFT)
}

/// Resample one column's groups. Returns false when the column does not
/// qualify.
fn balance_column(dataset: &mut Dataset, idx: usize, rng: &mut StdRng) -> bool {
    let counts = value_counts(dataset, idx);
    if !(MIN_GROUPS..=MAX_GROUPS).contains(&counts.len()) {
        return false;
    }
    let max = counts[0].1;
    let min = counts[counts.len() - 1].1;
    let ratio = max as f64 / min as f64;
    if ratio <= RATIO_THRESHOLD {
        return false;
    }
    let sizes: Vec<usize> = counts.iter().map(|(_, c)| *c).collect();
    let target = target_count(&sizes);

    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut unlabeled = Vec::new();
    for (i, row) in dataset.rows.iter().enumerate() {
        let value = cell(row, idx);
        if value.is_missing() {
            unlabeled.push(i);
        } else {
            groups.entry(value.display()).or_default().push(i);
        }
    }

    let mut selected = Vec::with_capacity(target * counts.len() + unlabeled.len());
    for (value, _) in &counts {
        let Some(members) = groups.get(value) else {
            continue;
        };
        let len = members.len();
        if len > target {
            selected.extend(index::sample(rng, len, target).into_iter().map(|i| members[i]));
        } else if len < target {
            let n = target.min(len * MAX_UPSAMPLE);
            selected.extend((0..n).map(|_| members[rng.gen_range(0..len)]));
        } else {
            selected.extend_from_slice(members);
        }
    }
    selected.extend(unlabeled);
    selected.shuffle(rng);

    info!(
        column = %dataset.columns[idx],
        ratio = %format!("{ratio:.2}"),
        target,
        rows = selected.len(),
        "Balanced demographic column"
    );
    *dataset = dataset.select_rows(&selected);
    true
}

/// Rebalance every qualifying demographic column in order, each on the
/// dataset as left by the previous one. Returns the number balanced.
pub fn rebalance_demographics(dataset: &mut Dataset, rng: &mut StdRng) -> usize {
    let mut balanced = 0;
    for idx in 0..dataset.column_count() {
        if is_demographic_column(&dataset.columns[idx]) && balance_column(dataset, idx, rng) {
            balanced += 1;
        }
    }
    balanced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use rand::SeedableRng;

    fn gender(m: usize, f: usize) -> Dataset {
        let mut values = vec![Value::text("M"); m];
        values.extend(vec![Value::text("F"); f]);
        let ids = (0..m + f).map(|i| Value::Number(i as f64)).collect();
        Dataset::from_columns(vec![("gender", values), ("id", ids)])
    }

    #[test]
    fn test_target_count() {
        // avg 50, min 10: midpoint 30
        assert_eq!(target_count(&[90, 10]), 30);
        // min + 5 floor
        assert_eq!(target_count(&[12, 8]), 13);
    }

    #[test]
    fn test_ninety_ten_rebalanced() {
        let mut ds = gender(90, 10);
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(rebalance_demographics(&mut ds, &mut rng), 1);
        let counts = value_counts(&ds, 0);
        // M downsampled to 30, F upsampled to min(30, 3 * 10)
        assert_eq!(ds.row_count(), 60);
        assert!(counts.iter().all(|(_, c)| *c == 30));
    }

    #[test]
    fn test_upsample_capped_at_three_times() {
        let mut ds = gender(200, 5);
        let mut rng = StdRng::seed_from_u64(1);
        rebalance_demographics(&mut ds, &mut rng);
        let counts: HashMap<String, usize> = value_counts(&ds, 0).into_iter().collect();
        // target = (5 + 102) / 2 = 53
        assert_eq!(counts["M"], 53);
        assert_eq!(counts["F"], 15);
    }

    #[test]
    fn test_mild_imbalance_untouched() {
        let mut ds = gender(55, 45);
        let before = ds.clone();
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(rebalance_demographics(&mut ds, &mut rng), 0);
        assert_eq!(ds, before);
    }

    #[test]
    fn test_short_rows_count_as_unlabeled() {
        let mut ds = Dataset::from_columns(vec![
            ("id", (0..100).map(|i| Value::Number(i as f64)).collect()),
            (
                "gender",
                (0..100)
                    .map(|i| Value::text(if i < 90 { "M" } else { "F" }))
                    .collect(),
            ),
        ]);
        ds.rows[0].truncate(1);
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(rebalance_demographics(&mut ds, &mut rng), 1);
        // 89 M and 10 F: target (10 + 49) / 2 = 29, plus the unlabeled row
        assert_eq!(ds.row_count(), 59);
    }

    #[test]
    fn test_seeded_result_is_reproducible() {
        let run = |seed| {
            let mut ds = gender(90, 10);
            let mut rng = StdRng::seed_from_u64(seed);
            rebalance_demographics(&mut ds, &mut rng);
            ds
        };
        assert_eq!(run(7), run(7));
    }
}
