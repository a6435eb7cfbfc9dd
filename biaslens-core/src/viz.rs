//! Chart-ready descriptive aggregates.
//!
//! Each aggregate is built independently. A failure in one leaves that
//! aggregate empty, adds a note, and never blocks the others.

use crate::analysis::value_counts;
use crate::classify::{ClassifierCapability, FailureLog, Sentiment, truncate_chars};
use crate::config::VisualizationConfig;
use crate::data::stats::{self, Histogram};
use crate::data::{Dataset, Value};
use crate::error::BiasError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MAX_CATEGORICAL_COLUMNS: usize = 20;
const MAX_CORRELATION_COLUMNS: usize = 50;
const MAX_TEXT_COLUMNS: usize = 10;
const TEXT_VALUES_PER_COLUMN: usize = 50;
const MIN_TEXT_CHARS: usize = 3;
const MAX_CLASSIFY_CHARS: usize = 500;
const TOXIC_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnHistogram {
    pub column: String,
    pub bin_edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl ColumnHistogram {
    fn new(column: &str, histogram: Histogram) -> Self {
        Self {
            column: column.to_string(),
            bin_edges: histogram.bin_edges,
            counts: histogram.counts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalDistribution {
    pub column: String,
    pub values: Vec<CategoryCount>,
}

/// Pearson correlation between two numeric columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnToxicity {
    pub column: String,
    pub toxic_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentDistribution {
    fn add(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStats {
    pub text_columns: Vec<String>,
    /// Character-length histograms.
    pub length_histograms: Vec<ColumnHistogram>,
    /// Empty when the toxicity classifier is unavailable.
    pub toxicity_by_column: Vec<ColumnToxicity>,
    /// Present only when the sentiment classifier is available.
    pub sentiment_distribution: Option<SentimentDistribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationAggregate {
    pub numeric_histograms: Vec<ColumnHistogram>,
    pub categorical_distributions: Vec<CategoricalDistribution>,
    pub correlation_edges: Vec<CorrelationEdge>,
    pub text_stats: TextStats,
    pub missing_values: Vec<MissingCount>,
    /// Diagnostics for aggregates that could not be built.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Equal-width histogram per numeric column.
pub fn numeric_histograms(dataset: &Dataset, bins: usize) -> Result<Vec<ColumnHistogram>, BiasError> {
    let mut out = Vec::new();
    for idx in dataset.numeric_columns() {
        let values = dataset.numeric_values(idx);
        if values.is_empty() {
            continue;
        }
        out.push(ColumnHistogram::new(&dataset.columns[idx], stats::histogram(&values, bins)?));
    }
    Ok(out)
}

/// Top-N value frequencies for the first 20 text columns. Missing values are
/// not counted.
pub fn categorical_distributions(dataset: &Dataset, top_n: usize) -> Vec<CategoricalDistribution> {
    let columns = dataset.text_columns();
    if columns.len() > MAX_CATEGORICAL_COLUMNS {
        debug!(columns = columns.len(), limit = MAX_CATEGORICAL_COLUMNS, "Limiting categorical distributions");
    }
    columns
        .into_iter()
        .take(MAX_CATEGORICAL_COLUMNS)
        .map(|idx| CategoricalDistribution {
            column: dataset.columns[idx].clone(),
            values: value_counts(dataset, idx)
                .into_iter()
                .take(top_n)
                .map(|(label, count)| CategoryCount { label, count })
                .collect(),
        })
        .collect()
}

/// The `top_k` strongest absolute correlations among the first 50 numeric
/// columns. Undefined correlations are dropped; ties keep pair order.
pub fn correlation_edges(dataset: &Dataset, top_k: usize) -> Vec<CorrelationEdge> {
    let columns: Vec<usize> = dataset
        .numeric_columns()
        .into_iter()
        .take(MAX_CORRELATION_COLUMNS)
        .collect();
    if columns.len() < 2 {
        return Vec::new();
    }
    let series: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|&idx| dataset.column_values(idx).map(Value::as_number).collect())
        .collect();

    let mut edges = Vec::new();
    for i in 0..columns.len() {
        for j in i + 1..columns.len() {
            if let Some(weight) = stats::pearson(&series[i], &series[j]) {
                edges.push(CorrelationEdge {
                    source: dataset.columns[columns[i]].clone(),
                    target: dataset.columns[columns[j]].clone(),
                    weight,
                });
            }
        }
    }
    edges.sort_by(|a, b| b.weight.abs().total_cmp(&a.weight.abs()));
    edges.truncate(top_k);
    edges
}

/// Length histograms for the first 10 text columns, plus toxicity counts and
/// a sentiment distribution over the first 50 values of each when the
/// classifiers are available.
pub async fn text_stats(
    dataset: &Dataset,
    capability: &ClassifierCapability,
    bins: usize,
) -> Result<TextStats, BiasError> {
    let columns: Vec<usize> = dataset.text_columns().into_iter().take(MAX_TEXT_COLUMNS).collect();
    let mut out = TextStats {
        text_columns: columns.iter().map(|&i| dataset.columns[i].clone()).collect(),
        ..TextStats::default()
    };
    let mut sentiment = capability
        .sentiment_available()
        .then(SentimentDistribution::default);
    let mut failures = FailureLog::default();

    for idx in columns {
        let column = &dataset.columns[idx];
        let texts = dataset.text_values(idx);
        let lengths: Vec<f64> = texts.iter().map(|t| t.chars().count() as f64).collect();
        if !lengths.is_empty() {
            out.length_histograms
                .push(ColumnHistogram::new(column, stats::histogram(&lengths, bins)?));
        }

        let sample: Vec<&str> = texts
            .iter()
            .take(TEXT_VALUES_PER_COLUMN)
            .filter(|t| t.chars().count() >= MIN_TEXT_CHARS)
            .map(|t| truncate_chars(t, MAX_CLASSIFY_CHARS))
            .collect();

        if capability.is_available() {
            let mut toxic_count = 0;
            for text in &sample {
                match capability.classify_toxicity(text).await {
                    Ok(c) if c.is_toxic(TOXIC_THRESHOLD) => toxic_count += 1,
                    Ok(_) => {}
                    Err(e) => failures.record(column, &e),
                }
            }
            out.toxicity_by_column.push(ColumnToxicity {
                column: column.clone(),
                toxic_count,
            });
        }

        if let Some(dist) = sentiment.as_mut() {
            for text in &sample {
                match capability.classify_sentiment(text).await {
                    Ok(c) => dist.add(c.sentiment()),
                    Err(e) => failures.record(column, &e),
                }
            }
        }
    }

    out.sentiment_distribution = sentiment.filter(|_| !out.text_columns.is_empty());
    Ok(out)
}

pub fn missing_values(dataset: &Dataset) -> Vec<MissingCount> {
    dataset
        .missing_counts()
        .into_iter()
        .map(|(column, missing)| MissingCount { column, missing })
        .collect()
}

/// Builds every aggregate for a dataset.
#[derive(Debug, Clone)]
pub struct VisualizationAggregator {
    config: VisualizationConfig,
}

impl VisualizationAggregator {
    pub fn new(config: VisualizationConfig) -> Self {
        Self { config }
    }

    pub async fn build(
        &self,
        dataset: &Dataset,
        capability: &ClassifierCapability,
    ) -> VisualizationAggregate {
        let mut notes = Vec::new();
        let numeric_histograms = numeric_histograms(dataset, self.config.histogram_bins)
            .unwrap_or_else(|e| isolate("numeric histograms", e, &mut notes));
        let text_stats = text_stats(dataset, capability, self.config.histogram_bins)
            .await
            .unwrap_or_else(|e| isolate("text statistics", e, &mut notes));

        VisualizationAggregate {
            numeric_histograms,
            categorical_distributions: categorical_distributions(dataset, self.config.top_n),
            correlation_edges: correlation_edges(dataset, self.config.top_k),
            text_stats,
            missing_values: missing_values(dataset),
            notes,
        }
    }
}

fn isolate<T: Default>(aggregate: &str, error: BiasError, notes: &mut Vec<String>) -> T {
    warn!(aggregate, error = %error, "Could not build aggregate");
    notes.push(format!("{aggregate} unavailable: {error}"));
    T::default()
}
