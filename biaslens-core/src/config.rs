//! Configuration types for biaslens.
//!
//! Settings are resolved with `figment`: defaults, then one TOML file, then
//! `BIASLENS_` environment variables, then command-line overrides.

use crate::error::BiasError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BiasConfig {
    /// Dataset admission limits.
    #[serde(default)]
    pub input: InputConfig,
    /// Debiasing pipeline settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Text classification capability.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Chart aggregate sizes.
    #[serde(default)]
    pub visualization: VisualizationConfig,
    /// Cleaned dataset artifact storage.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Dataset admission limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Minimum number of rows for a meaningful analysis.
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
    /// Minimum number of columns for a meaningful analysis.
    #[serde(default = "default_min_columns")]
    pub min_columns: usize,
    /// Maximum accepted file size in MB.
    #[serde(default = "default_max_file_mb")]
    pub max_file_size_mb: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            min_rows: default_min_rows(),
            min_columns: default_min_columns(),
            max_file_size_mb: default_max_file_mb(),
        }
    }
}

fn default_min_rows() -> usize {
    5
}

fn default_min_columns() -> usize {
    2
}

fn default_max_file_mb() -> u64 {
    50
}

/// Debiasing pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Seed shared by every sampling and shuffling step.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

/// Which classifier backs the text capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierBackend {
    /// Offline keyword lexicon.
    Lexicon,
    /// Remote classification service reached over HTTP.
    Http,
    /// No classifier; text-dependent scores degrade to zero.
    #[serde(rename = "none")]
    Disabled,
}

/// Text classification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_backend")]
    pub backend: ClassifierBackend,
    /// Base URL of the classification service (`http` backend only).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_classifier_timeout")]
    pub timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: None,
            timeout_ms: default_classifier_timeout(),
        }
    }
}

fn default_backend() -> ClassifierBackend {
    ClassifierBackend::Lexicon
}

fn default_classifier_timeout() -> u64 {
    5_000
}

/// Visualization aggregate sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default = "default_bins")]
    pub histogram_bins: usize,
    /// Values kept per categorical distribution.
    #[serde(default = "default_top")]
    pub top_n: usize,
    /// Correlation edges kept.
    #[serde(default = "default_top")]
    pub top_k: usize,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            histogram_bins: default_bins(),
            top_n: default_top(),
            top_k: default_top(),
        }
    }
}

fn default_bins() -> usize {
    10
}

fn default_top() -> usize {
    20
}

/// Artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one cleaned CSV per job.
    #[serde(default = "default_jobs_dir")]
    pub jobs_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            jobs_dir: default_jobs_dir(),
        }
    }
}

fn default_jobs_dir() -> PathBuf {
    PathBuf::from(".biaslens/jobs")
}

/// Command-line values layered over every other source. `None` leaves the
/// lower layers untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Read this file instead of the workspace or user config file.
    pub config_file: Option<PathBuf>,
    pub seed: Option<u64>,
    pub classifier: Option<ClassifierBackend>,
    pub jobs_dir: Option<PathBuf>,
}

impl std::str::FromStr for ClassifierBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lexicon" => Ok(Self::Lexicon),
            "http" => Ok(Self::Http),
            "none" => Ok(Self::Disabled),
            other => Err(format!("unknown classifier backend '{other}' (lexicon, http, none)")),
        }
    }
}

/// The single config file to read: an explicit path, else the workspace
/// `.biaslens/config.toml`, else the user's `config.toml`.
fn config_file(
    workspace: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<Option<PathBuf>, BiasError> {
    if let Some(path) = &overrides.config_file {
        if !path.is_file() {
            return Err(BiasError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.clone()));
    }
    let workspace_file = workspace.map(|ws| ws.join(".biaslens").join("config.toml"));
    let user_file = directories::ProjectDirs::from("dev", "biaslens", "biaslens")
        .map(|dirs| dirs.config_dir().join("config.toml"));
    Ok([workspace_file, user_file]
        .into_iter()
        .flatten()
        .find(|p| p.is_file()))
}

/// Resolve the effective configuration.
///
/// Layers, lowest first: built-in defaults, one config file, `BIASLENS_`
/// environment variables (`__` between section and key), command-line
/// overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<BiasConfig, BiasError> {
    let mut figment = Figment::from(Serialized::defaults(BiasConfig::default()));
    if let Some(path) = config_file(workspace, overrides)? {
        debug!(path = %path.display(), "Reading config file");
        figment = figment.merge(Toml::file(path));
    }

    // BIASLENS_CLASSIFIER__BACKEND=none, BIASLENS_PIPELINE__SEED=7
    figment = figment.merge(Env::prefixed("BIASLENS_").split("__"));

    if let Some(seed) = overrides.seed {
        figment = figment.merge(Serialized::default("pipeline.seed", seed));
    }
    if let Some(backend) = overrides.classifier {
        figment = figment.merge(Serialized::default("classifier.backend", backend));
    }
    if let Some(dir) = &overrides.jobs_dir {
        figment = figment.merge(Serialized::default("storage.jobs_dir", dir));
    }

    figment
        .extract()
        .map_err(|e| BiasError::Config(e.to_string()))
}
