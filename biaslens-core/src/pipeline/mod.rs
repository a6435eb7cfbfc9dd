//! Five-stage deterministic debiasing pipeline.
//!
//! Stages run strictly in order on a private copy of the input:
//! imputation, demographic rebalancing, toxic content filtering, outlier
//! removal, then deduplication with a final shuffle. Every random draw comes
//! from one seeded generator, so the same input and seed always produce the
//! same cleaned dataset.

pub mod dedup;
pub mod impute;
pub mod outliers;
pub mod rebalance;
pub mod toxic;

use crate::budget::Budget;
use crate::classify::ClassifierCapability;
use crate::config::PipelineConfig;
use crate::data::Dataset;
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

pub const STAGE_COUNT: usize = 5;
/// Share of the original rows the cleaned dataset is expected to keep.
const ROW_FLOOR: f64 = 0.6;

/// What each stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounters {
    /// Rows after dropping all-missing rows.
    pub original_rows: usize,
    pub empty_rows_dropped: usize,
    pub cells_imputed: usize,
    pub columns_balanced: usize,
    pub toxic_rows_removed: usize,
    pub outliers_removed: usize,
    pub duplicates_removed: usize,
    pub final_rows: usize,
    /// Final rows fell below 60% of the original. Reported, not enforced.
    pub floor_breached: bool,
    pub stages_completed: usize,
    /// The work budget ran out before every stage finished.
    pub partial: bool,
}

impl StageCounters {
    /// Percentage of the original rows that were removed.
    pub fn removal_percentage(&self) -> f64 {
        if self.original_rows == 0 {
            return 0.0;
        }
        (self.original_rows as f64 - self.final_rows as f64) / self.original_rows as f64 * 100.0
    }
}

/// A finished cleaning run. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningJob {
    pub job_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub dataset: Dataset,
    pub counters: StageCounters,
    /// Hex SHA-256 of the CSV serialization.
    pub content_hash: String,
}

impl CleaningJob {
    fn new(dataset: Dataset, counters: StageCounters) -> Self {
        let content_hash = hex_sha256(dataset.to_csv().as_bytes());
        Self {
            job_id: Uuid::new_v4(),
            created_at: Utc::now(),
            dataset,
            counters,
            content_hash,
        }
    }

    /// CSV bytes persisted as the job artifact.
    pub fn to_csv(&self) -> String {
        self.dataset.to_csv()
    }
}

pub(crate) fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    seed: u64,
}

impl CleaningPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_seed(config.seed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Clean a copy of `dataset`. The input is never modified.
    ///
    /// Stage-level failures are logged and skipped. When the budget runs out
    /// the remaining stages are skipped and the job is flagged partial.
    pub async fn run(
        &self,
        dataset: &Dataset,
        capability: &ClassifierCapability,
        budget: &Budget,
    ) -> CleaningJob {
        let mut data = dataset.clone();
        data.pad_rows();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut counters = StageCounters {
            empty_rows_dropped: data.drop_empty_rows(),
            ..StageCounters::default()
        };
        counters.original_rows = data.row_count();
        info!(rows = counters.original_rows, seed = self.seed, "Starting cleaning pipeline");

        'stages: {
            if exhausted(budget, &mut counters) {
                break 'stages;
            }
            counters.cells_imputed = impute::impute_missing(&mut data);
            counters.stages_completed += 1;

            if exhausted(budget, &mut counters) {
                break 'stages;
            }
            counters.columns_balanced = rebalance::rebalance_demographics(&mut data, &mut rng);
            counters.stages_completed += 1;

            if exhausted(budget, &mut counters) {
                break 'stages;
            }
            let outcome = toxic::filter_toxic_rows(&mut data, capability, &mut rng, budget).await;
            counters.toxic_rows_removed = outcome.removed;
            if outcome.interrupted {
                counters.partial = true;
                break 'stages;
            }
            counters.stages_completed += 1;

            if exhausted(budget, &mut counters) {
                break 'stages;
            }
            counters.outliers_removed = outliers::remove_outliers(&mut data);
            counters.stages_completed += 1;

            if exhausted(budget, &mut counters) {
                break 'stages;
            }
            match dedup::drop_duplicates(&mut data) {
                Ok(n) => counters.duplicates_removed = n,
                Err(e) => warn!(error = %e, "Deduplication failed; keeping duplicates"),
            }
            dedup::shuffle_rows(&mut data, &mut rng);
            counters.stages_completed += 1;
        }

        counters.final_rows = data.row_count();
        let floor = (counters.original_rows as f64 * ROW_FLOOR) as usize;
        if counters.final_rows < floor {
            warn!(
                final_rows = counters.final_rows,
                original_rows = counters.original_rows,
                "Cleaning removed more than 40% of rows"
            );
            counters.floor_breached = true;
        }
        info!(
            original = counters.original_rows,
            cleaned = counters.final_rows,
            removed_pct = %format!("{:.1}", counters.removal_percentage()),
            toxic = counters.toxic_rows_removed,
            outliers = counters.outliers_removed,
            duplicates = counters.duplicates_removed,
            "Cleaning pipeline complete"
        );
        CleaningJob::new(data, counters)
    }
}

fn exhausted(budget: &Budget, counters: &mut StageCounters) -> bool {
    if budget.is_exhausted() {
        warn!(stages_completed = counters.stages_completed, "Work budget exhausted; returning partial cleaning result");
        counters.partial = true;
        true
    } else {
        false
    }
}
