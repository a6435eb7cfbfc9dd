//! # biaslens-core: Dataset Bias Analysis and Debiasing
//!
//! This crate scores a tabular dataset for fairness-relevant bias, turns the
//! scores into recommendations, and can produce a cleaned copy together with
//! chart-ready aggregates.
//!
//! ## Components
//!
//! 1. **Analyzers** - demographic imbalance, toxic text prevalence, numeric skew and outliers
//! 2. **Scoring** - unweighted aggregate score and a fixed-order recommendation table
//! 3. **Pipeline** - five seeded stages producing a reproducible cleaned dataset
//! 4. **Visualization** - histograms, distributions, correlations and text statistics
//!
//! Text classification is consumed through [`classify::ClassifierCapability`],
//! built once and passed into every call that needs it.

// Foundation
pub mod budget;
pub mod config;
pub mod error;

// Data
pub mod data;

// Classification
pub mod classify;

// Analysis & cleaning
pub mod analysis;
pub mod pipeline;
pub mod viz;

// Persistence & orchestration
pub mod engine;
pub mod store;

// Re-exports
pub use analysis::BiasReport;
pub use budget::Budget;
pub use classify::ClassifierCapability;
pub use config::{BiasConfig, ClassifierBackend, ConfigOverrides, load_config};
pub use data::{Dataset, Value};
pub use engine::{BiasAnalysis, BiasEngine, CleaningAnalysis};
pub use error::BiasError;
pub use pipeline::{CleaningJob, CleaningPipeline, StageCounters};
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore};
pub use viz::VisualizationAggregate;
