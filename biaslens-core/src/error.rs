//! Error types for the biaslens-core crate.

use thiserror::Error;

/// Top-level error type for bias analysis and cleaning.
///
/// Only dataset-level failures (`Input`, `Storage`, `NotFound`, `Config`, `Io`)
/// abort a request. Column- and item-level failures (`Analysis`, `Pipeline`,
/// `Classifier`, `Timeout`) are logged and skipped by the component that hit them.
#[derive(Debug, Error)]
pub enum BiasError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Classification capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BiasError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether this error aborts the whole request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Input(_)
                | Self::Storage(_)
                | Self::NotFound(_)
                | Self::AlreadyExists(_)
                | Self::Config(_)
                | Self::Io(_)
        )
    }

    /// Short message safe to hand back to a caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::Input(msg) => msg.clone(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::AlreadyExists(_) | Self::Storage(_) | Self::Io(_) => {
                "Could not store or read the cleaned dataset".to_string()
            }
            Self::Config(_) => "Service is misconfigured".to_string(),
            _ => "Analysis failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(BiasError::input("empty").is_fatal());
        assert!(BiasError::storage("disk full").is_fatal());
        assert!(!BiasError::analysis("bad column").is_fatal());
        assert!(!BiasError::Timeout("slow".into()).is_fatal());
    }

    #[test]
    fn test_public_message_hides_internals() {
        let err = BiasError::storage("/var/lib/jobs/x.tmp: permission denied");
        assert!(!err.public_message().contains("/var/lib"));

        let err = BiasError::input("Dataset too small (3 rows)");
        assert_eq!(err.public_message(), "Dataset too small (3 rows)");
    }
}
