//! Toxic-content prevalence in text columns.

use crate::budget::Budget;
use crate::classify::{ClassifierCapability, FailureLog, truncate_chars};
use crate::data::Dataset;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Values classified per column, taken positionally from the top.
const SAMPLE_PER_COLUMN: usize = 100;
const MIN_CHARS: usize = 3;
const MAX_CLASSIFY_CHARS: usize = 500;
const TOXIC_THRESHOLD: f64 = 0.5;
const MAX_EXAMPLES: usize = 50;
const EXAMPLE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToxicExample {
    pub column: String,
    pub text: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBiasReport {
    pub score: f64,
    pub toxic_texts: Vec<ToxicExample>,
    pub text_columns_found: Vec<String>,
    pub texts_analyzed: usize,
    pub toxic_count: usize,
    pub details: String,
    /// Set when the work budget ran out before every column was read.
    #[serde(default)]
    pub partial: bool,
}

impl TextBiasReport {
    fn note(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
            ..Self::default()
        }
    }
}

/// Score toxic-content prevalence.
///
/// Degrades to a zero score with a note when the toxicity classifier is
/// unavailable. Failed or timed-out items count as analyzed but not toxic.
pub async fn detect_text_bias(
    dataset: &Dataset,
    capability: &ClassifierCapability,
    budget: &Budget,
) -> TextBiasReport {
    let text_columns = dataset.text_columns();
    let found: Vec<String> = text_columns
        .iter()
        .map(|&i| dataset.columns[i].clone())
        .collect();
    if !capability.is_available() {
        return TextBiasReport {
            text_columns_found: found,
            ..TextBiasReport::note("Text classification model not available")
        };
    }
    if text_columns.is_empty() {
        return TextBiasReport::note("No text columns found for analysis");
    }

    let mut report = TextBiasReport {
        text_columns_found: found,
        ..TextBiasReport::default()
    };
    let mut failures = FailureLog::default();

    for idx in text_columns {
        if budget.is_exhausted() {
            warn!(analyzed = report.texts_analyzed, "Work budget exhausted during text analysis");
            report.partial = true;
            break;
        }
        let column = &dataset.columns[idx];
        let sample: Vec<String> = dataset
            .text_values(idx)
            .into_iter()
            .take(SAMPLE_PER_COLUMN)
            .collect();
        debug!(column = %column, sampled = sample.len(), "Classifying column");

        for value in &sample {
            report.texts_analyzed += 1;
            if value.trim().chars().count() < MIN_CHARS {
                continue;
            }
            let text = truncate_chars(value, MAX_CLASSIFY_CHARS);
            match capability.classify_toxicity(text).await {
                Ok(c) if c.is_toxic(TOXIC_THRESHOLD) => {
                    report.toxic_count += 1;
                    if report.toxic_texts.len() < MAX_EXAMPLES {
                        report.toxic_texts.push(ToxicExample {
                            column: column.clone(),
                            text: truncate_chars(value, EXAMPLE_CHARS).to_string(),
                            confidence: c.score,
                        });
                    }
                }
                Ok(_) => {}
                Err(e) => failures.record(column, &e),
            }
        }
    }

    report.score = if report.texts_analyzed == 0 {
        0.0
    } else {
        (report.toxic_count as f64 / report.texts_analyzed as f64 * 200.0).min(100.0)
    };
    report.details = format!(
        "Analyzed {} text samples from {} columns, found {} potentially toxic texts",
        report.texts_analyzed,
        report.text_columns_found.len(),
        report.toxic_count
    );
    info!(
        analyzed = report.texts_analyzed,
        toxic = report.toxic_count,
        failures = failures.count(),
        "Text bias analysis complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::testing::{MarkerClassifier, marker_capability};
    use crate::classify::{ClassifierCapability, TextClassifier};
    use crate::data::Value;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn comments(values: &[&str]) -> Dataset {
        Dataset::from_columns(vec![(
            "comment",
            values.iter().map(|v| Value::text(*v)).collect(),
        )])
    }

    #[tokio::test]
    async fn test_unavailable_capability_scores_zero() {
        let ds = comments(&["this is BAD stuff", "fine"]);
        let report =
            detect_text_bias(&ds, &ClassifierCapability::unavailable(), &Budget::unlimited()).await;
        assert_eq!(report.score, 0.0);
        assert!(report.toxic_texts.is_empty());
        assert!(report.details.contains("not available"));
        assert_eq!(report.text_columns_found, vec!["comment"]);
        assert_eq!(report.texts_analyzed, 0);
    }

    #[tokio::test]
    async fn test_score_is_twice_the_toxic_rate() {
        let ds = comments(&["BAD one", "BAD two", "clean one", "clean two", "clean three"]);
        let cap = marker_capability("BAD", 0.9);
        let report = detect_text_bias(&ds, &cap, &Budget::unlimited()).await;
        assert_eq!(report.texts_analyzed, 5);
        assert_eq!(report.toxic_count, 2);
        assert!((report.score - 80.0).abs() < 1e-9);
        assert_eq!(report.toxic_texts[0].column, "comment");
    }

    #[tokio::test]
    async fn test_low_confidence_is_not_toxic() {
        let ds = comments(&["BAD one", "BAD two"]);
        let report =
            detect_text_bias(&ds, &marker_capability("BAD", 0.5), &Budget::unlimited()).await;
        assert_eq!(report.toxic_count, 0);
        assert_eq!(report.score, 0.0);
    }

    #[tokio::test]
    async fn test_only_first_hundred_values_sampled() {
        let mut values = vec!["clean text"; 100];
        values.extend(vec!["BAD text"; 50]);
        let ds = comments(&values);
        let report =
            detect_text_bias(&ds, &marker_capability("BAD", 0.9), &Budget::unlimited()).await;
        assert_eq!(report.texts_analyzed, 100);
        assert_eq!(report.toxic_count, 0);
    }

    #[tokio::test]
    async fn test_examples_capped_and_score_clamped() {
        let ds = comments(&vec!["BAD BAD BAD"; 80]);
        let report =
            detect_text_bias(&ds, &marker_capability("BAD", 0.9), &Budget::unlimited()).await;
        assert_eq!(report.toxic_count, 80);
        assert_eq!(report.toxic_texts.len(), 50);
        assert_eq!(report.score, 100.0);
    }

    #[tokio::test]
    async fn test_short_values_are_not_classified() {
        let c = Arc::new(MarkerClassifier::new("BAD", 0.9));
        let dynamic: Arc<dyn TextClassifier> = c.clone();
        let cap = ClassifierCapability::new(Some(dynamic), None, Duration::from_secs(1));
        let ds = comments(&["ok", "BAD content here"]);
        detect_text_bias(&ds, &cap, &Budget::unlimited()).await;
        assert_eq!(c.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_are_skipped() {
        let mut c = MarkerClassifier::new("BAD", 0.9);
        c.fail_on = Some("boom");
        let dynamic: Arc<dyn TextClassifier> = Arc::new(c);
        let cap = ClassifierCapability::new(Some(dynamic), None, Duration::from_secs(1));
        let ds = comments(&["boom goes it", "BAD thing", "fine thing"]);
        let report = detect_text_bias(&ds, &cap, &Budget::unlimited()).await;
        assert_eq!(report.texts_analyzed, 3);
        assert_eq!(report.toxic_count, 1);
    }

    #[tokio::test]
    async fn test_exhausted_budget_marks_partial() {
        let ds = comments(&["BAD one", "clean"]);
        let report =
            detect_text_bias(&ds, &marker_capability("BAD", 0.9), &Budget::until(Instant::now()))
                .await;
        assert!(report.partial);
        assert_eq!(report.texts_analyzed, 0);
        assert_eq!(report.score, 0.0);
    }

    #[tokio::test]
    async fn test_numeric_only_dataset_has_no_text_columns() {
        let ds = Dataset::from_columns(vec![("n", vec![Value::Number(1.0); 5])]);
        let report =
            detect_text_bias(&ds, &marker_capability("BAD", 0.9), &Budget::unlimited()).await;
        assert!(report.text_columns_found.is_empty());
        assert_eq!(report.score, 0.0);
    }
}
