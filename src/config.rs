use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub moderation: ModerationConfig,
    pub realtime: RealtimeConfig,
    pub mail: MailConfig,
    pub media: MediaConfig,
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public origin of the frontend, used for OAuth redirects.
    pub app_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub session_ttl_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub url: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub smtp_url: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub dir: String,
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/drifnet.db".to_string()),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
                app_url: env::var("APP_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "drifnet-dev-secret".to_string()),
                session_ttl_days: 7,
            },
            cache: CacheConfig {
                capacity: env::var("CACHE_CAPACITY")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .unwrap_or(1000),
            },
            moderation: ModerationConfig {
                url: env::var("MODERATION_API_URL")
                    .unwrap_or_else(|_| "https://moderateapi.com/api/v1/moderate".to_string()),
                api_key: env::var("MODERATION_API_KEY").ok(),
            },
            realtime: RealtimeConfig {
                url: env::var("REALTIME_URL").ok(),
                auth_token: env::var("REALTIME_AUTH_TOKEN").ok(),
            },
            mail: MailConfig {
                smtp_url: env::var("SMTP_URL").ok(),
                from: env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "DrifNet <no-reply@drifnet.app>".to_string()),
            },
            media: MediaConfig {
                dir: env::var("MEDIA_DIR").unwrap_or_else(|_| "data/media".to_string()),
                public_base_url: env::var("MEDIA_BASE_URL")
                    .unwrap_or_else(|_| "/media".to_string()),
            },
            github: GithubConfig {
                client_id: env::var("GITHUB_CLIENT_ID").ok(),
                client_secret: env::var("GITHUB_CLIENT_SECRET").ok(),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
