//! Remote classification service reached over HTTP.
//!
//! Request: `POST {endpoint}/classify` with `{"task": "toxicity", "text": "..."}`.
//! Response: `{"label": "...", "score": 0.93}` or a one-element array of that.
//! Availability: `GET {endpoint}/health` returns a success status.

use super::{Classification, ClassifierTask, TextClassifier};
use crate::error::BiasError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    task: ClassifierTask,
    name: String,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, task: ClassifierTask, timeout: Duration) -> Result<Self, BiasError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(3))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            task,
            name: format!("http-{}", task.as_str()),
        })
    }

    fn parse_response(body: &Value) -> Result<Classification, BiasError> {
        let item = match body {
            Value::Array(items) => items
                .first()
                .ok_or_else(|| BiasError::classifier("empty classification array"))?,
            other => other,
        };
        let label = item
            .get("label")
            .and_then(Value::as_str)
            .ok_or_else(|| BiasError::classifier("response has no label"))?;
        let score = item.get("score").and_then(Value::as_f64).unwrap_or(0.0);
        Ok(Classification::new(label.to_lowercase(), score.clamp(0.0, 1.0)))
    }
}

#[async_trait]
impl TextClassifier for HttpClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        self.client
            .get(&url)
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn classify(&self, text: &str) -> Result<Classification, BiasError> {
        let url = format!("{}/classify", self.endpoint);
        debug!(url = %url, task = self.task.as_str(), "Sending classification request");
        let response = self
            .client
            .post(&url)
            .json(&json!({ "task": self.task.as_str(), "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BiasError::classifier(format!(
                "classification service returned {status}"
            )));
        }
        let body: Value = response.json().await?;
        Self::parse_response(&body)
    }
}
