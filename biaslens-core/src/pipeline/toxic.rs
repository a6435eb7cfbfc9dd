//! Stage 3: drop rows whose text a classifier marks toxic.

use crate::budget::Budget;
use crate::classify::{ClassifierCapability, FailureLog, truncate_chars};
use crate::data::{Dataset, cell};
use rand::rngs::StdRng;
use rand::seq::index;
use std::collections::HashSet;
use tracing::{debug, info, warn};

const MAX_COLUMNS: usize = 5;
const MIN_VALUES: usize = 50;
const SAMPLE_SIZE: usize = 150;
const MIN_CHARS: usize = 10;
const MAX_CHARS: usize = 1000;
const CLASSIFY_CHARS: usize = 500;
const TOXIC_THRESHOLD: f64 = 0.6;
/// Removals at or above this share of the current rows are skipped.
const MAX_REMOVAL_SHARE: f64 = 0.4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToxicFilterOutcome {
    pub removed: usize,
    /// The budget ran out before every column was checked.
    pub interrupted: bool,
}

/// Sample rows of a column and return those classified toxic.
async fn toxic_rows(
    dataset: &Dataset,
    idx: usize,
    capability: &ClassifierCapability,
    rng: &mut StdRng,
    failures: &mut FailureLog,
) -> Vec<usize> {
    let rows = dataset.row_count();
    let sample = index::sample(rng, rows, SAMPLE_SIZE.min(rows)).into_vec();
    let column = &dataset.columns[idx];
    let mut toxic = Vec::new();
    for row in sample {
        let Some(values) = dataset.rows.get(row) else {
            continue;
        };
        let text = cell(values, idx).display();
        let len = text.chars().count();
        if len <= MIN_CHARS || len >= MAX_CHARS {
            continue;
        }
        match capability
            .classify_toxicity(truncate_chars(&text, CLASSIFY_CHARS))
            .await
        {
            Ok(c) if c.is_toxic(TOXIC_THRESHOLD) => toxic.push(row),
            Ok(_) => {}
            Err(e) => failures.record(column, &e),
        }
    }
    toxic
}

/// Check at most the first five text columns holding more than 50 values.
///
/// A column's toxic rows are removed only when they are fewer than 40% of
/// the current rows.
pub async fn filter_toxic_rows(
    dataset: &mut Dataset,
    capability: &ClassifierCapability,
    rng: &mut StdRng,
    budget: &Budget,
) -> ToxicFilterOutcome {
    let mut outcome = ToxicFilterOutcome::default();
    if !capability.is_available() {
        info!("Toxicity classifier unavailable; skipping toxic content filter");
        return outcome;
    }

    let columns: Vec<usize> = dataset.text_columns().into_iter().take(MAX_COLUMNS).collect();
    let mut failures = FailureLog::default();
    for idx in columns {
        if budget.is_exhausted() {
            warn!("Work budget exhausted during toxic content filter");
            outcome.interrupted = true;
            break;
        }
        if dataset.non_missing_count(idx) <= MIN_VALUES {
            continue;
        }
        let toxic = toxic_rows(dataset, idx, capability, rng, &mut failures).await;
        let rows = dataset.row_count();
        if toxic.is_empty() || toxic.len() as f64 >= rows as f64 * MAX_REMOVAL_SHARE {
            debug!(column = %dataset.columns[idx], toxic = toxic.len(), "No toxic rows removed");
            continue;
        }
        let drop: HashSet<usize> = toxic.into_iter().collect();
        let removed = dataset.retain_rows(|i| !drop.contains(&i));
        info!(column = %dataset.columns[idx], removed, "Removed toxic rows");
        outcome.removed += removed;
    }
    outcome
}
