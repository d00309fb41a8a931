use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::RealtimeConfig;
use crate::error::{AppError, AppResult};
use crate::models::UserSummary;

/// Denormalized copy of a notification pushed to the realtime channel for
/// live badge updates. The relational row is authoritative; this is a
/// best-effort UI convenience (the two writes are not transactional).
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeNotification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub sender: Option<UserSummary>,
    pub receiver: UserSummary,
    #[serde(rename = "postId")]
    pub post_id: Option<String>,
    #[serde(rename = "commentId")]
    pub comment_id: Option<String>,
    #[serde(rename = "communityId")]
    pub community_id: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

#[async_trait]
pub trait RealtimePublisher: Send + Sync {
    /// Push a notification copy onto the channel keyed by recipient id.
    async fn push(&self, receiver_id: i64, payload: &RealtimeNotification) -> AppResult<()>;
}

/// REST publisher for a Firebase-style realtime database: each push is a
/// POST under `notifications/<receiver id>`.
pub struct RestRealtimePublisher {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RestRealtimePublisher {
    pub fn new(base_url: String, auth_token: Option<String>) -> Self {
        Self {
            client: super::HTTP_CLIENT.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }
}

#[async_trait]
impl RealtimePublisher for RestRealtimePublisher {
    async fn push(&self, receiver_id: i64, payload: &RealtimeNotification) -> AppResult<()> {
        let mut url = format!("{}/notifications/{}.json", self.base_url, receiver_id);
        if let Some(token) = &self.auth_token {
            url = format!("{}?auth={}", url, token);
        }

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("realtime push failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "realtime push rejected: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Publisher used when no realtime backend is configured (and in tests).
pub struct NoopPublisher;

#[async_trait]
impl RealtimePublisher for NoopPublisher {
    async fn push(&self, _receiver_id: i64, _payload: &RealtimeNotification) -> AppResult<()> {
        Ok(())
    }
}

pub fn from_config(config: &RealtimeConfig) -> Arc<dyn RealtimePublisher> {
    match &config.url {
        Some(url) => Arc::new(RestRealtimePublisher::new(
            url.clone(),
            config.auth_token.clone(),
        )),
        None => Arc::new(NoopPublisher),
    }
}
