//! Stage 5: drop exact duplicate rows, then shuffle.

use crate::data::Dataset;
use crate::error::BiasError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

/// Drop rows identical to an earlier row in every cell. First occurrences are kept.
pub fn drop_duplicates(dataset: &mut Dataset) -> Result<usize, BiasError> {
    let keys = dataset
        .rows
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    let mut seen = HashSet::with_capacity(keys.len());
    let keep: Vec<bool> = keys.into_iter().map(|k| seen.insert(k)).collect();
    Ok(dataset.retain_rows(|i| keep[i]))
}

pub fn shuffle_rows(dataset: &mut Dataset, rng: &mut StdRng) {
    dataset.rows.shuffle(rng);
}
