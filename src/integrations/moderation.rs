use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::config::ModerationConfig;
use crate::error::{AppError, AppResult};

/// Third-party content-safety check. Callers treat transport failures as
/// "allow" - moderation is advisory, not a write barrier.
#[async_trait]
pub trait ContentFilter: Send + Sync {
    async fn is_safe(&self, text: &str) -> AppResult<bool>;
}

/// REST client for the hosted moderation API.
pub struct ModerationClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ModerationVerdict {
    safe: bool,
    #[serde(default)]
    confidence: f64,
}

impl ModerationClient {
    pub fn new(url: String, api_key: String) -> Self {
        Self {
            client: super::HTTP_CLIENT.clone(),
            url,
            api_key,
        }
    }
}

#[async_trait]
impl ContentFilter for ModerationClient {
    async fn is_safe(&self, text: &str) -> AppResult<bool> {
        let response = self
            .client
            .post(&self.url)
            .header("X-API-Key", &self.api_key)
            .json(&serde_json::json!({
                "text": text,
                "context": "comment",
            }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("moderation request failed: {}", e)))?;

        let verdict: ModerationVerdict = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("moderation response malformed: {}", e)))?;

        // High-confidence "safe" verdicts are suspiciously absolute and get
        // re-flagged upstream; mirror that threshold here.
        Ok(verdict.safe && verdict.confidence <= 0.95)
    }
}

/// Filter used when no API key is configured; allows everything.
pub struct DisabledFilter;

#[async_trait]
impl ContentFilter for DisabledFilter {
    async fn is_safe(&self, _text: &str) -> AppResult<bool> {
        Ok(true)
    }
}

pub fn from_config(config: &ModerationConfig) -> Arc<dyn ContentFilter> {
    match &config.api_key {
        Some(key) => Arc::new(ModerationClient::new(config.url.clone(), key.clone())),
        None => {
            tracing::warn!("MODERATION_API_KEY not set, content filtering disabled");
            Arc::new(DisabledFilter)
        }
    }
}
