//! Candidate classification provider
//!
//! The provider receives a profile screenshot and a natural-language question
//! and answers whether the profile matches, plus an auxiliary category used to
//! pick the greeting.

pub mod error;

pub use error::ClassifierError;

use crate::config::ClassifierConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request sent to the provider
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationRequest {
    /// Base64-encoded PNG of the candidate's profile
    pub image_base64: String,

    /// Target-audience description phrased as a yes/no question
    pub question: String,
}

/// Provider answer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Verdict {
    #[serde(rename = "match")]
    pub is_match: bool,

    #[serde(default)]
    pub category: Option<String>,
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Verdict, ClassifierError>;
}

/// Classifier backed by an HTTP endpoint with bearer-key auth
pub struct HttpClassifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpClassifier {
    pub fn new(config: &ClassifierConfig, api_key: &str) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Verdict, ClassifierError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout(self.timeout_secs)
                } else {
                    ClassifierError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ClassifierError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| ClassifierError::Malformed(e.to_string()))
    }
}
