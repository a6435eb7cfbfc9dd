//! Bias analyzers, the aggregate scorer, and the recommendation generator.

pub mod demographic;
pub mod recommend;
pub mod score;
pub mod statistical;
pub mod text;

use crate::data::Dataset;
use crate::error::BiasError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

pub use demographic::{ColumnImbalanceRecord, DemographicReport, detect_demographic_bias};
pub use recommend::generate_recommendations;
pub use score::overall_bias_score;
pub use statistical::{ColumnStatRecord, StatisticalReport, detect_statistical_bias};
pub use text::{TextBiasReport, ToxicExample, detect_text_bias};

/// Protected-attribute keywords matched against column names.
pub const DEMOGRAPHIC_KEYWORDS: &[&str] = &[
    "gender",
    "sex",
    "race",
    "ethnicity",
    "age",
    "religion",
    "nationality",
    "disability",
    "orientation",
    "marital",
    "veteran",
    "color",
    "national_origin",
    "ancestry",
];

/// Case-insensitive substring match of a column name against the keyword set.
///
/// Only the name is inspected, never the values.
pub fn is_demographic_column(name: &str) -> bool {
    let lower = name.to_lowercase();
    DEMOGRAPHIC_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Value frequencies of a column, most frequent first.
///
/// Missing values are excluded. Ties keep first-appearance order.
pub fn value_counts(dataset: &Dataset, idx: usize) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for v in dataset.column_values(idx).filter(|v| !v.is_missing()) {
        let key = v.display();
        let entry = counts.entry(key.clone()).or_insert(0);
        if *entry == 0 {
            order.push(key);
        }
        *entry += 1;
    }
    let mut out: Vec<(String, usize)> = order
        .into_iter()
        .map(|k| {
            let c = counts[&k];
            (k, c)
        })
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

/// Run `analyze` on each listed column and keep the records it yields.
///
/// A column that fails is logged and skipped; the other columns still report.
pub(crate) fn collect_column_records<T>(
    dataset: &Dataset,
    columns: &[usize],
    mut analyze: impl FnMut(usize) -> Result<Option<T>, BiasError>,
) -> Vec<T> {
    let mut records = Vec::new();
    for &idx in columns {
        match analyze(idx) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                let column = dataset.columns.get(idx).map_or("", String::as_str);
                warn!(column, error = %e, "Could not analyze column");
            }
        }
    }
    records
}

/// Overall score plus the three sub-reports. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasReport {
    pub overall_score: f64,
    pub demographic: DemographicReport,
    pub text: TextBiasReport,
    pub statistical: StatisticalReport,
}

impl BiasReport {
    pub fn new(
        demographic: DemographicReport,
        text: TextBiasReport,
        statistical: StatisticalReport,
    ) -> Self {
        let overall_score = overall_bias_score(&demographic, &text, &statistical);
        Self {
            overall_score,
            demographic,
            text,
            statistical,
        }
    }

    pub fn recommendations(&self) -> Vec<String> {
        generate_recommendations(
            self.overall_score,
            &self.demographic,
            &self.text,
            &self.statistical,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    #[test]
    fn test_keyword_match_is_case_insensitive_substring() {
        assert!(is_demographic_column("Gender"));
        assert!(is_demographic_column("applicant_RACE"));
        assert!(is_demographic_column("page_views")); // "age" substring
        assert!(!is_demographic_column("income"));
        assert!(!is_demographic_column("zip"));
    }

    #[test]
    fn test_value_counts_order() {
        let ds = Dataset::from_columns(vec![(
            "c",
            vec![
                Value::text("b"),
                Value::text("a"),
                Value::text("a"),
                Value::text("b"),
                Value::text("c"),
                Value::Missing,
            ],
        )]);
        assert_eq!(
            value_counts(&ds, 0),
            vec![("b".to_string(), 2), ("a".to_string(), 2), ("c".to_string(), 1)]
        );
    }

    #[test]
    fn test_failing_column_keeps_other_records() {
        let ds = Dataset::from_columns(vec![
            ("a", vec![Value::Number(1.0)]),
            ("b", vec![Value::Number(2.0)]),
            ("c", vec![Value::Number(3.0)]),
        ]);
        let records = collect_column_records(&ds, &[0, 1, 2], |idx| {
            if idx == 1 {
                Err(BiasError::analysis("degenerate column"))
            } else {
                Ok(Some(ds.columns[idx].clone()))
            }
        });
        assert_eq!(records, vec!["a", "c"]);
    }
}
