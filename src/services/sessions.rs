// Session-cookie authentication. One active session per user: login evicts
// the user's previous sessions and inserts the new one in a single
// transaction (the original read-then-delete-then-create dance had a race
// window under concurrent logins).

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{map_session_row, Database};
use crate::error::{AppError, AppResult};
use crate::id_gen::IdGenerator;
use crate::models::{now_millis, SessionRow};

pub const SESSION_COOKIE: &str = "drifnet_session";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct SessionService {
    db: Arc<Database>,
    ids: Arc<IdGenerator>,
    jwt_secret: String,
    ttl_days: i64,
}

impl SessionService {
    pub fn new(db: Arc<Database>, ids: Arc<IdGenerator>, jwt_secret: String, ttl_days: i64) -> Self {
        Self {
            db,
            ids,
            jwt_secret,
            ttl_days,
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_days * 24 * 60 * 60
    }

    /// Evict any existing sessions for the user and create a fresh one.
    /// Returns the signed token to set as the cookie value.
    pub async fn create_session(
        &self,
        user_id: i64,
        ip_address: &str,
        user_agent: &str,
    ) -> AppResult<(SessionRow, String)> {
        let jti = Uuid::new_v4().to_string();
        let now = now_millis();
        let expires_at = now + self.ttl_days * MILLIS_PER_DAY;

        let claims = Claims {
            sub: user_id.to_string(),
            jti: jti.clone(),
            iat: now / 1000,
            exp: expires_at / 1000,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("failed to sign session token: {}", e)))?;

        let session = SessionRow {
            id: self.ids.next_id(),
            user_id,
            jti,
            token: token.clone(),
            device_id: Uuid::new_v4().to_string(),
            user_agent: user_agent.to_string(),
            ip_address: ip_address.to_string(),
            created_at: now,
            expires_at,
        };

        let mut tx = self.db.begin_transaction().await?;
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO sessions
               (id, user_id, jti, token, device_id, user_agent, ip_address, created_at, expires_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.jti)
        .bind(&session.token)
        .bind(&session.device_id)
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("failed to commit session transaction: {}", e))
        })?;

        self.db.invalidate_sessions().await;
        self.db.cache_session(session.clone()).await;

        Ok((session, token))
    }

    /// Verify a token signature and check the backing session row still
    /// exists and has not expired. Returns the user id on success.
    pub async fn validate_token(&self, token: &str) -> AppResult<Option<i64>> {
        let claims = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        ) {
            Ok(data) => data.claims,
            Err(err) => {
                tracing::debug!("session token rejected: {}", err);
                return Ok(None);
            }
        };

        let session = match self.find_by_jti(&claims.jti).await? {
            Some(session) => session,
            None => return Ok(None),
        };
        if session.expires_at <= now_millis() {
            return Ok(None);
        }

        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthorized("malformed session subject".to_string()))?;
        if user_id != session.user_id {
            return Ok(None);
        }
        Ok(Some(user_id))
    }

    async fn find_by_jti(&self, jti: &str) -> AppResult<Option<SessionRow>> {
        if let Some(session) = self.db.cached_session(jti).await {
            return Ok(Some(session));
        }

        let row = sqlx::query("SELECT * FROM sessions WHERE jti = ?")
            .bind(jti)
            .fetch_optional(self.db.pool())
            .await?;

        if let Some(row) = row {
            let session = map_session_row(&row);
            self.db.cache_session(session.clone()).await;
            Ok(Some(session))
        } else {
            Ok(None)
        }
    }

    /// Sign-out: drop every session the user holds.
    pub async fn destroy_for_user(&self, user_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        self.db.invalidate_sessions().await;
        Ok(())
    }

    /// Count of live sessions, used by tests to assert the single-session
    /// invariant.
    pub async fn active_session_count(&self, user_id: i64) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.get("n"))
    }
}
