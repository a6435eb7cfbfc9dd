//! Demographic imbalance in protected-attribute columns.

use super::{collect_column_records, is_demographic_column, value_counts};
use crate::data::Dataset;
use crate::error::BiasError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Columns with more distinct values than this are not treated as categorical.
const MAX_CATEGORIES: usize = 20;
/// A column is flagged when one value holds more than this share.
const IMBALANCE_THRESHOLD: f64 = 0.70;
const MAX_DETAILS: usize = 10;
const DISTRIBUTION_TOP: usize = 5;

/// Share of one value within a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueProportion {
    pub value: String,
    pub proportion: f64,
}

/// One flagged demographic column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnImbalanceRecord {
    pub column: String,
    pub max_proportion: f64,
    /// Largest over smallest group share.
    pub imbalance_ratio: f64,
    pub severity: f64,
    /// Top value shares, most frequent first.
    pub distribution: Vec<ValueProportion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemographicReport {
    pub score: f64,
    /// Every flagged column, most severe first.
    pub imbalanced_columns: Vec<String>,
    pub demographic_columns_found: Vec<String>,
    /// The most severe flagged columns.
    pub imbalance_details: Vec<ColumnImbalanceRecord>,
    pub details: String,
}

/// Severity of a column whose largest group holds `max_proportion`.
pub fn imbalance_severity(max_proportion: f64) -> f64 {
    ((max_proportion - 0.5) * 200.0).clamp(0.0, 100.0)
}

fn analyze_column(
    dataset: &Dataset,
    idx: usize,
) -> Result<Option<ColumnImbalanceRecord>, BiasError> {
    let name = dataset
        .columns
        .get(idx)
        .ok_or_else(|| BiasError::analysis(format!("column index {idx} out of range")))?;

    let counts = value_counts(dataset, idx);
    if counts.len() > MAX_CATEGORIES {
        debug!(column = %name, distinct = counts.len(), "Skipping non-categorical column");
        return Ok(None);
    }
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    if total == 0 {
        return Ok(None);
    }

    let proportions: Vec<ValueProportion> = counts
        .iter()
        .map(|(value, count)| ValueProportion {
            value: value.clone(),
            proportion: *count as f64 / total as f64,
        })
        .collect();
    let max_proportion = proportions[0].proportion;
    let min_proportion = proportions[proportions.len() - 1].proportion;
    if !max_proportion.is_finite() || min_proportion <= 0.0 {
        return Err(BiasError::analysis(format!(
            "degenerate distribution in '{name}'"
        )));
    }
    if max_proportion <= IMBALANCE_THRESHOLD {
        return Ok(None);
    }

    Ok(Some(ColumnImbalanceRecord {
        column: name.clone(),
        max_proportion,
        imbalance_ratio: max_proportion / min_proportion,
        severity: imbalance_severity(max_proportion),
        distribution: proportions.into_iter().take(DISTRIBUTION_TOP).collect(),
    }))
}

/// Score protected-attribute imbalance.
///
/// Columns are selected by name only. Each categorical column whose largest
/// group exceeds 70% is flagged with severity `(max - 0.5) * 200`; the score is
/// the mean severity of flagged columns.
pub fn detect_demographic_bias(dataset: &Dataset) -> DemographicReport {
    let demographic: Vec<usize> = (0..dataset.column_count())
        .filter(|&i| is_demographic_column(&dataset.columns[i]))
        .collect();
    let found: Vec<String> = demographic
        .iter()
        .map(|&i| dataset.columns[i].clone())
        .collect();

    if demographic.is_empty() {
        return DemographicReport {
            details: "No demographic columns detected in dataset".to_string(),
            ..DemographicReport::default()
        };
    }

    let mut records = collect_column_records(dataset, &demographic, |idx| analyze_column(dataset, idx));

    let score = if records.is_empty() {
        0.0
    } else {
        (records.iter().map(|r| r.severity).sum::<f64>() / records.len() as f64).min(100.0)
    };
    records.sort_by(|a, b| b.severity.total_cmp(&a.severity));

    let details = format!(
        "Found {} demographic columns, {} show significant imbalance",
        found.len(),
        records.len()
    );
    DemographicReport {
        score,
        imbalanced_columns: records.iter().map(|r| r.column.clone()).collect(),
        demographic_columns_found: found,
        imbalance_details: records.into_iter().take(MAX_DETAILS).collect(),
        details,
    }
}
