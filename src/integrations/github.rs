use serde::Deserialize;

use crate::config::GithubConfig;
use crate::error::{AppError, AppResult};

/// GitHub OAuth code exchange and profile fetch.
pub struct GithubOAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Clone)]
pub struct GithubProfile {
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl GithubOAuth {
    pub fn from_config(config: &GithubConfig) -> Option<Self> {
        match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) => Some(Self {
                client: super::HTTP_CLIENT.clone(),
                client_id: id.clone(),
                client_secret: secret.clone(),
            }),
            _ => None,
        }
    }

    pub async fn exchange_code(&self, code: &str) -> AppResult<String> {
        let response: TokenResponse = self
            .client
            .post("https://github.com/login/oauth/access_token")
            .header("Accept", "application/json")
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "code": code,
            }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("GitHub token exchange failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("GitHub token response malformed: {}", e)))?;

        response
            .access_token
            .ok_or_else(|| AppError::Unauthorized("GitHub auth failed".to_string()))
    }

    /// Fetch the user record and email list in parallel and pick the primary
    /// verified address.
    pub async fn fetch_profile(&self, access_token: &str) -> AppResult<GithubProfile> {
        let user_req = self
            .client
            .get("https://api.github.com/user")
            .header("Authorization", format!("Bearer {}", access_token))
            .header("User-Agent", "drifnet")
            .send();
        let emails_req = self
            .client
            .get("https://api.github.com/user/emails")
            .header("Authorization", format!("Bearer {}", access_token))
            .header("User-Agent", "drifnet")
            .send();

        let (user_res, emails_res) = tokio::try_join!(user_req, emails_req)
            .map_err(|e| AppError::Upstream(format!("GitHub profile fetch failed: {}", e)))?;

        let user: GithubUser = user_res
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("GitHub user response malformed: {}", e)))?;
        let emails: Vec<GithubEmail> = emails_res.json().await.unwrap_or_default();

        let email = emails
            .iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email.clone())
            .or(user.email.clone())
            .ok_or_else(|| {
                AppError::BadRequest("Could not retrieve user email".to_string())
            })?;

        Ok(GithubProfile {
            email,
            name: user.name.unwrap_or(user.login),
            avatar_url: user.avatar_url,
        })
    }
}
