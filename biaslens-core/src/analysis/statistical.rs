//! Skew and outlier prevalence in numeric columns.

use super::collect_column_records;
use crate::data::Dataset;
use crate::data::stats::{self, IqrBounds};
use crate::error::BiasError;
use serde::{Deserialize, Serialize};

const MIN_VALUES: usize = 10;
const OUTLIER_MULTIPLIER: f64 = 1.5;
const REPORT_THRESHOLD: f64 = 20.0;
const SKEW_THRESHOLD: f64 = 1.0;
const MAX_DETAILS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatRecord {
    pub column: String,
    pub skewness: f64,
    pub kurtosis: f64,
    pub outlier_percentage: f64,
    pub bias_score: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
}

impl ColumnStatRecord {
    pub fn is_skewed(&self) -> bool {
        self.skewness.abs() > SKEW_THRESHOLD
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticalReport {
    pub score: f64,
    /// Retained columns with |skewness| > 1, highest bias first.
    pub skewed_columns: Vec<String>,
    pub numeric_columns_found: Vec<String>,
    /// The most biased retained columns.
    pub statistical_details: Vec<ColumnStatRecord>,
    pub details: String,
}

/// Bias contribution of one column: mean of the skew and outlier components,
/// each capped at 50.
pub fn column_bias_score(skewness: f64, outlier_percentage: f64) -> f64 {
    let skew = (skewness.abs() * 10.0).min(50.0);
    let outliers = (outlier_percentage * 2.0).min(50.0);
    (skew + outliers) / 2.0
}

fn analyze_column(dataset: &Dataset, idx: usize) -> Result<Option<ColumnStatRecord>, BiasError> {
    let values = dataset.numeric_values(idx);
    if values.len() < MIN_VALUES {
        return Ok(None);
    }
    let column = &dataset.columns[idx];
    let bounds = IqrBounds::compute(&values, OUTLIER_MULTIPLIER)
        .ok_or_else(|| BiasError::analysis(format!("no quartiles for '{column}'")))?;
    let outlier_percentage = bounds.count_outliers(&values) as f64 / values.len() as f64 * 100.0;
    let skewness = stats::skewness(&values);
    let bias_score = column_bias_score(skewness, outlier_percentage);
    if !bias_score.is_finite() {
        return Err(BiasError::analysis(format!("non-finite bias score for '{column}'")));
    }
    if bias_score <= REPORT_THRESHOLD {
        return Ok(None);
    }

    let missing_stat = || BiasError::analysis(format!("summary statistics undefined for '{column}'"));
    Ok(Some(ColumnStatRecord {
        column: column.clone(),
        skewness,
        kurtosis: stats::kurtosis(&values),
        outlier_percentage,
        bias_score,
        mean: stats::mean(&values).ok_or_else(missing_stat)?,
        median: stats::median(&values).ok_or_else(missing_stat)?,
        std: stats::std_dev(&values).ok_or_else(missing_stat)?,
    }))
}

/// Score skew and outlier prevalence over numeric columns with at least 10
/// values. Columns scoring 20 or less are not retained.
pub fn detect_statistical_bias(dataset: &Dataset) -> StatisticalReport {
    let numeric = dataset.numeric_columns();
    if numeric.is_empty() {
        return StatisticalReport {
            details: "No numeric columns found for statistical analysis".to_string(),
            ..StatisticalReport::default()
        };
    }

    let mut records = collect_column_records(dataset, &numeric, |idx| analyze_column(dataset, idx));

    let score = if records.is_empty() {
        0.0
    } else {
        (records.iter().map(|r| r.bias_score).sum::<f64>() / records.len() as f64).min(100.0)
    };
    records.sort_by(|a, b| b.bias_score.total_cmp(&a.bias_score));

    StatisticalReport {
        score,
        skewed_columns: records
            .iter()
            .filter(|r| r.is_skewed())
            .map(|r| r.column.clone())
            .collect(),
        numeric_columns_found: numeric.iter().map(|&i| dataset.columns[i].clone()).collect(),
        details: format!(
            "Analyzed {} numeric columns, {} show statistical irregularities",
            numeric.len(),
            records.len()
        ),
        statistical_details: records.into_iter().take(MAX_DETAILS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn numbers(name: &str, values: &[f64]) -> Dataset {
        Dataset::from_columns(vec![(name, values.iter().map(|&v| Value::Number(v)).collect())])
    }

    #[test]
    fn test_single_extreme_outlier_is_skewed() {
        let mut values = vec![5.0; 19];
        values.push(1000.0);
        let report = detect_statistical_bias(&numbers("amount", &values));
        assert_eq!(report.skewed_columns, vec!["amount"]);
        let record = &report.statistical_details[0];
        assert!(record.skewness > 1.0);
        assert!((record.outlier_percentage - 5.0).abs() < 1e-9);
        assert!(report.score > 0.0 && report.score <= 100.0);
    }

    #[test]
    fn test_uniform_column_not_retained() {
        let values: Vec<f64> = (1..=20).map(f64::from).collect();
        let report = detect_statistical_bias(&numbers("x", &values));
        assert_eq!(report.numeric_columns_found, vec!["x"]);
        assert!(report.statistical_details.is_empty());
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn test_short_column_skipped() {
        let report = detect_statistical_bias(&numbers("x", &[1.0, 2.0, 3.0, 500.0]));
        assert!(report.statistical_details.is_empty());
    }

    #[test]
    fn test_column_bias_score_caps() {
        assert_eq!(column_bias_score(-10.0, 80.0), 50.0);
        assert_eq!(column_bias_score(2.0, 0.0), 10.0);
    }

    #[test]
    fn test_text_only_dataset() {
        let ds = Dataset::from_columns(vec![("t", vec![Value::text("a"); 12])]);
        let report = detect_statistical_bias(&ds);
        assert!(report.details.contains("No numeric columns"));
    }

    fn skewed(extreme: f64) -> Vec<Value> {
        let mut values = vec![Value::Number(5.0); 19];
        values.push(Value::Number(extreme));
        values
    }

    #[test]
    fn test_details_keep_ten_columns() {
        let names: Vec<String> = (0..12).map(|k| format!("amount_{k}")).collect();
        let ds = Dataset::from_columns(
            names
                .iter()
                .enumerate()
                .map(|(k, n)| (n.as_str(), skewed(1000.0 + k as f64)))
                .collect(),
        );
        let report = detect_statistical_bias(&ds);
        assert_eq!(report.skewed_columns.len(), 12);
        assert_eq!(report.statistical_details.len(), 10);
    }

    #[test]
    fn test_failing_column_does_not_drop_others() {
        let ds = Dataset::from_columns(vec![("a", skewed(1000.0)), ("b", skewed(900.0))]);
        let records = collect_column_records(&ds, &[0, 1], |idx| {
            if idx == 0 {
                Err(BiasError::analysis("no quartiles"))
            } else {
                analyze_column(&ds, idx)
            }
        });
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].column, "b");
    }
}
