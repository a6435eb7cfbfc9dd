//! Request orchestration: validate, analyze, clean, persist, aggregate.

use crate::analysis::{
    BiasReport, detect_demographic_bias, detect_statistical_bias, detect_text_bias,
};
use crate::budget::Budget;
use crate::classify::ClassifierCapability;
use crate::config::BiasConfig;
use crate::data::stats::IqrBounds;
use crate::data::{Dataset, validate_for_analysis};
use crate::error::BiasError;
use crate::pipeline::{CleaningJob, CleaningPipeline, StageCounters};
use crate::store::ArtifactStore;
use crate::viz::{MissingCount, VisualizationAggregate, VisualizationAggregator, missing_values};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

const PRE_CLEAN_OUTLIER_MULTIPLIER: f64 = 1.5;
const SUMMARY_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
}

impl DatasetInfo {
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            rows: dataset.row_count(),
            columns: dataset.column_count(),
            column_names: dataset.columns.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierCount {
    pub column: String,
    pub outliers: usize,
}

/// Result of analyzing a dataset as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasAnalysis {
    pub dataset_info: DatasetInfo,
    pub report: BiasReport,
    pub recommendations: Vec<String>,
    pub visualization: VisualizationAggregate,
    pub summary: String,
    pub analyzed_at: DateTime<Utc>,
}

/// Result of cleaning a dataset and analyzing the cleaned copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAnalysis {
    pub job_id: Uuid,
    /// Shape of the input before cleaning.
    pub original_info: DatasetInfo,
    /// Shape of the cleaned dataset.
    pub dataset_info: DatasetInfo,
    pub missing_values: Vec<MissingCount>,
    pub outliers: Vec<OutlierCount>,
    pub counters: StageCounters,
    pub content_hash: String,
    pub report: BiasReport,
    pub recommendations: Vec<String>,
    pub visualization: VisualizationAggregate,
    pub summary: String,
    pub analyzed_at: DateTime<Utc>,
}

/// 1.5x IQR outlier count per numeric column. Zero-spread columns count zero.
pub fn outlier_counts(dataset: &Dataset) -> Vec<OutlierCount> {
    dataset
        .numeric_columns()
        .into_iter()
        .filter_map(|idx| {
            let values = dataset.numeric_values(idx);
            let bounds = IqrBounds::compute(&values, PRE_CLEAN_OUTLIER_MULTIPLIER)?;
            let outliers = if bounds.iqr() > 0.0 {
                bounds.count_outliers(&values)
            } else {
                0
            };
            Some(OutlierCount {
                column: dataset.columns[idx].clone(),
                outliers,
            })
        })
        .collect()
}

fn join_recommendations(recommendations: &[String]) -> String {
    let head: Vec<&str> = recommendations
        .iter()
        .take(SUMMARY_RECOMMENDATIONS)
        .map(String::as_str)
        .collect();
    let ellipsis = if recommendations.len() > SUMMARY_RECOMMENDATIONS {
        "..."
    } else {
        ""
    };
    format!("{}{ellipsis}", head.join("; "))
}

/// Analyzers, pipeline and aggregator bound to one configuration and one
/// classification capability.
#[derive(Debug, Clone)]
pub struct BiasEngine {
    config: BiasConfig,
    capability: ClassifierCapability,
}

impl BiasEngine {
    pub fn new(config: BiasConfig, capability: ClassifierCapability) -> Self {
        Self { config, capability }
    }

    /// Build the engine, detecting the configured classifiers once.
    pub async fn from_config(config: BiasConfig) -> Self {
        let capability = ClassifierCapability::detect(&config.classifier).await;
        Self::new(config, capability)
    }

    pub fn config(&self) -> &BiasConfig {
        &self.config
    }

    pub fn capability(&self) -> &ClassifierCapability {
        &self.capability
    }

    /// Run the three analyzers and combine them.
    pub async fn report(&self, dataset: &Dataset, budget: &Budget) -> BiasReport {
        let demographic = detect_demographic_bias(dataset);
        let text = detect_text_bias(dataset, &self.capability, budget).await;
        let statistical = detect_statistical_bias(dataset);
        let report = BiasReport::new(demographic, text, statistical);
        info!(
            overall = %format!("{:.2}", report.overall_score),
            demographic = %format!("{:.1}", report.demographic.score),
            text = %format!("{:.1}", report.text.score),
            statistical = %format!("{:.1}", report.statistical.score),
            "Bias scores computed"
        );
        report
    }

    /// Analyze a dataset without modifying it.
    pub async fn analyze(&self, dataset: &Dataset, budget: &Budget) -> Result<BiasAnalysis, BiasError> {
        validate_for_analysis(dataset, &self.config.input)?;
        info!(rows = dataset.row_count(), columns = dataset.column_count(), "Analyzing dataset");
        let report = self.report(dataset, budget).await;
        let recommendations = report.recommendations();
        let visualization = self.aggregator().build(dataset, &self.capability).await;
        let summary = format!(
            "Analyzed {} records across {} columns. Overall bias score is {:.2}/100. \
             Detected demographics: {:?}. Text columns analyzed: {:?}. Recommendations: {}",
            dataset.row_count(),
            dataset.column_count(),
            report.overall_score,
            report.demographic.demographic_columns_found,
            report.text.text_columns_found,
            join_recommendations(&recommendations),
        );
        Ok(BiasAnalysis {
            dataset_info: DatasetInfo::of(dataset),
            report,
            recommendations,
            visualization,
            summary,
            analyzed_at: Utc::now(),
        })
    }

    /// Run the cleaning pipeline without persisting anything.
    pub async fn clean(&self, dataset: &Dataset, budget: &Budget) -> Result<CleaningJob, BiasError> {
        validate_for_analysis(dataset, &self.config.input)?;
        Ok(CleaningPipeline::new(&self.config.pipeline)
            .run(dataset, &self.capability, budget)
            .await)
    }

    /// Clean a dataset, persist the cleaned CSV under a new job id, and
    /// analyze the cleaned copy.
    pub async fn analyze_and_clean(
        &self,
        dataset: &Dataset,
        store: &dyn ArtifactStore,
        budget: &Budget,
    ) -> Result<CleaningAnalysis, BiasError> {
        validate_for_analysis(dataset, &self.config.input)?;
        info!(rows = dataset.row_count(), columns = dataset.column_count(), "Cleaning and analyzing dataset");
        let missing = missing_values(dataset);
        let outliers = outlier_counts(dataset);

        let job = CleaningPipeline::new(&self.config.pipeline)
            .run(dataset, &self.capability, budget)
            .await;
        let cleaned = &job.dataset;
        let report = self.report(cleaned, budget).await;
        let recommendations = report.recommendations();

        store.put(job.job_id, job.to_csv().as_bytes()).await?;

        let visualization = self.aggregator().build(cleaned, &self.capability).await;
        let summary = format!(
            "Analyzed {} records across {} columns. Bias score: {:.2}/100. \
             Missing values: {}. Outliers detected: {}. Demographics: {:?}. \
             Text columns: {:?}. Recommendations: {}",
            dataset.row_count(),
            dataset.column_count(),
            report.overall_score,
            missing.iter().map(|m| m.missing).sum::<usize>(),
            outliers.iter().map(|o| o.outliers).sum::<usize>(),
            report.demographic.demographic_columns_found,
            report.text.text_columns_found,
            join_recommendations(&recommendations),
        );
        info!(job_id = %job.job_id, rows = cleaned.row_count(), "Cleaning analysis complete");

        Ok(CleaningAnalysis {
            job_id: job.job_id,
            original_info: DatasetInfo::of(dataset),
            dataset_info: DatasetInfo::of(cleaned),
            missing_values: missing,
            outliers,
            counters: job.counters.clone(),
            content_hash: job.content_hash.clone(),
            report,
            recommendations,
            visualization,
            summary,
            analyzed_at: Utc::now(),
        })
    }

    fn aggregator(&self) -> VisualizationAggregator {
        VisualizationAggregator::new(self.config.visualization.clone())
    }
}
