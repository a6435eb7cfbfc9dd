//! Text classification capability consumed by the text analyzer, the toxic
//! content filter, and the text statistics aggregate.
//!
//! Classifiers are black boxes mapping a string to `(label, confidence)`.
//! Availability is detected once when the capability is built; every call
//! runs under a per-call timeout.

pub mod http;
pub mod lexicon;

use crate::config::{ClassifierBackend, ClassifierConfig};
use crate::error::BiasError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub use http::HttpClassifier;
pub use lexicon::LexiconClassifier;

/// Label and confidence returned by a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    /// Toxic label with confidence strictly above `threshold`.
    pub fn is_toxic(&self, threshold: f64) -> bool {
        self.label.eq_ignore_ascii_case("toxic") && self.score > threshold
    }

    pub fn sentiment(&self) -> Sentiment {
        let label = self.label.to_lowercase();
        if label.contains("pos") {
            Sentiment::Positive
        } else if label.contains("neg") {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

/// Classifier family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierTask {
    /// Binary toxic / not-toxic.
    Toxicity,
    /// Positive / negative / neutral.
    Sentiment,
}

impl ClassifierTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toxicity => "toxicity",
            Self::Sentiment => "sentiment",
        }
    }
}

/// Three-bucket sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// A text classifier backend.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    fn name(&self) -> &str;
    async fn is_available(&self) -> bool;
    async fn classify(&self, text: &str) -> Result<Classification, BiasError>;
}

/// Toxicity and sentiment classifiers, each possibly absent.
#[derive(Clone)]
pub struct ClassifierCapability {
    toxicity: Option<Arc<dyn TextClassifier>>,
    sentiment: Option<Arc<dyn TextClassifier>>,
    timeout: Duration,
}

impl std::fmt::Debug for ClassifierCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierCapability")
            .field("toxicity", &self.toxicity.as_ref().map(|c| c.name().to_string()))
            .field("sentiment", &self.sentiment.as_ref().map(|c| c.name().to_string()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClassifierCapability {
    pub fn new(
        toxicity: Option<Arc<dyn TextClassifier>>,
        sentiment: Option<Arc<dyn TextClassifier>>,
        timeout: Duration,
    ) -> Self {
        Self {
            toxicity,
            sentiment,
            timeout,
        }
    }

    /// Capability with no classifiers at all.
    pub fn unavailable() -> Self {
        Self::new(None, None, Duration::from_secs(5))
    }

    /// Build the configured backends and check their availability once.
    pub async fn detect(config: &ClassifierConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        let (toxicity, sentiment) = match config.backend {
            ClassifierBackend::Disabled => {
                warn!("Text classifiers disabled; text bias scores will be zero");
                return Self::new(None, None, timeout);
            }
            ClassifierBackend::Lexicon => {
                let toxicity: Arc<dyn TextClassifier> =
                    Arc::new(LexiconClassifier::new(ClassifierTask::Toxicity));
                let sentiment: Arc<dyn TextClassifier> =
                    Arc::new(LexiconClassifier::new(ClassifierTask::Sentiment));
                (toxicity, sentiment)
            }
            ClassifierBackend::Http => {
                let Some(endpoint) = config.endpoint.as_deref() else {
                    warn!("HTTP classifier selected without an endpoint; classifiers disabled");
                    return Self::new(None, None, timeout);
                };
                let built = HttpClassifier::new(endpoint, ClassifierTask::Toxicity, timeout).and_then(
                    |t| Ok((t, HttpClassifier::new(endpoint, ClassifierTask::Sentiment, timeout)?)),
                );
                match built {
                    Ok((t, s)) => {
                        let toxicity: Arc<dyn TextClassifier> = Arc::new(t);
                        let sentiment: Arc<dyn TextClassifier> = Arc::new(s);
                        (toxicity, sentiment)
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not build HTTP classifier");
                        return Self::new(None, None, timeout);
                    }
                }
            }
        };

        let toxicity = keep_if_available(toxicity).await;
        let sentiment = keep_if_available(sentiment).await;
        info!(
            toxicity = toxicity.is_some(),
            sentiment = sentiment.is_some(),
            "Text classifiers detected"
        );
        Self::new(toxicity, sentiment, timeout)
    }

    /// Whether toxicity classification is available.
    pub fn is_available(&self) -> bool {
        self.toxicity.is_some()
    }

    pub fn sentiment_available(&self) -> bool {
        self.sentiment.is_some()
    }

    pub async fn classify_toxicity(&self, text: &str) -> Result<Classification, BiasError> {
        match &self.toxicity {
            Some(c) => self.call(c.as_ref(), text).await,
            None => Err(BiasError::CapabilityUnavailable(
                "toxicity classifier not loaded".into(),
            )),
        }
    }

    pub async fn classify_sentiment(&self, text: &str) -> Result<Classification, BiasError> {
        match &self.sentiment {
            Some(c) => self.call(c.as_ref(), text).await,
            None => Err(BiasError::CapabilityUnavailable(
                "sentiment classifier not loaded".into(),
            )),
        }
    }

    async fn call(&self, c: &dyn TextClassifier, text: &str) -> Result<Classification, BiasError> {
        match tokio::time::timeout(self.timeout, c.classify(text)).await {
            Ok(result) => result,
            Err(_) => Err(BiasError::Timeout(format!(
                "{} did not answer within {}ms",
                c.name(),
                self.timeout.as_millis()
            ))),
        }
    }
}

async fn keep_if_available(c: Arc<dyn TextClassifier>) -> Option<Arc<dyn TextClassifier>> {
    if c.is_available().await {
        Some(c)
    } else {
        warn!(classifier = c.name(), "Classifier unavailable");
        None
    }
}

/// Classification failures are logged on the first and every Nth occurrence.
const FAILURE_LOG_EVERY: usize = 20;

/// Counts item-level classification failures and logs them in batches.
#[derive(Debug, Default)]
pub struct FailureLog {
    count: usize,
}

impl FailureLog {
    pub fn record(&mut self, column: &str, error: &BiasError) {
        self.count += 1;
        if self.count == 1 || self.count % FAILURE_LOG_EVERY == 0 {
            warn!(column = %column, failures = self.count, error = %error, "Text classification failed");
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
