// Database - SQLite-backed relational store for the social graph.
// Raw SQL through a shared connection pool; schema is created at startup.

use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cache::Cache;
use crate::error::{AppError, AppResult};
use crate::models::{
    CommentRow, CommunityRow, EngagementKind, NotificationKind, NotificationRow, PostRow,
    SessionRow, UserRow, UserSummary, Visibility,
};

pub struct Database {
    pool: SqlitePool,
    user_cache: Arc<Mutex<Cache<i64, UserSummary>>>,
    session_cache: Arc<Mutex<Cache<String, SessionRow>>>,
}

impl Database {
    pub async fn new(database_url: &str, cache_capacity: usize) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // An in-memory database lives and dies with its connection, so the
        // pool must pin a single connection and never let it idle out.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        Ok(Database {
            pool,
            user_cache: Arc::new(Mutex::new(Cache::new(cache_capacity))),
            session_cache: Arc::new(Mutex::new(Cache::new(cache_capacity))),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin_transaction(&self) -> Result<sqlx::Transaction<'_, sqlx::Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT,
                img_url TEXT,
                designation TEXT,
                account_type TEXT NOT NULL DEFAULT 'PUBLIC',
                is_verified INTEGER NOT NULL DEFAULT 0,
                verification_code TEXT,
                verification_expires_at INTEGER,
                reset_code TEXT,
                reset_expires_at INTEGER,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                jti TEXT NOT NULL UNIQUE,
                token TEXT NOT NULL,
                device_id TEXT NOT NULL,
                user_agent TEXT NOT NULL,
                ip_address TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS follows (
                id INTEGER PRIMARY KEY,
                follower_id INTEGER NOT NULL,
                following_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE(follower_id, following_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS communities (
                id INTEGER PRIMARY KEY,
                owner_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                img_url TEXT,
                banner_url TEXT,
                community_type TEXT NOT NULL DEFAULT 'PUBLIC',
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS community_members (
                id INTEGER PRIMARY KEY,
                community_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                last_active_at INTEGER,
                created_at INTEGER NOT NULL,
                UNIQUE(community_id, user_id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                community_id INTEGER,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                img_urls TEXT NOT NULL DEFAULT '[]',
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY,
                post_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                parent_comment_id INTEGER,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS engagements (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                post_id INTEGER NOT NULL,
                comment_id INTEGER,
                kind TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY,
                kind TEXT NOT NULL,
                sender_id INTEGER,
                receiver_id INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'UNREAD',
                post_id INTEGER,
                comment_id INTEGER,
                community_id INTEGER,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY,
                reason TEXT NOT NULL,
                reported_user_id INTEGER NOT NULL,
                post_id INTEGER,
                comment_id INTEGER,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS deletions (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                post_id INTEGER,
                comment_id INTEGER,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        // One engagement row per (user, post) at post level and per
        // (user, comment) at comment level; a plain UNIQUE would treat NULL
        // comment ids as distinct.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_engagements_post
             ON engagements(user_id, post_id) WHERE comment_id IS NULL",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS ux_engagements_comment
             ON engagements(user_id, comment_id) WHERE comment_id IS NOT NULL",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_follows_following ON follows(following_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_members_user ON community_members(user_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_community ON posts(community_id, created_at)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id, created_at)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, parent_comment_id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_engagements_post ON engagements(post_id, kind)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_notifications_receiver
             ON notifications(receiver_id, created_at)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_deletions_post ON deletions(post_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_deletions_comment ON deletions(comment_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Database health check failed: {}", e)))?;
        Ok(())
    }

    // ---- shared lookups -------------------------------------------------

    pub async fn get_user(&self, id: i64) -> AppResult<Option<UserRow>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| map_user_row(&r)).transpose()
    }

    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<UserRow>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| map_user_row(&r)).transpose()
    }

    /// id/name/avatar lookup, LRU-cached. Invalidate on any user update.
    pub async fn user_summary(&self, id: i64) -> AppResult<Option<UserSummary>> {
        {
            let mut cache = self.user_cache.lock().await;
            if let Some(summary) = cache.get(&id).cloned() {
                return Ok(Some(summary));
            }
        }

        let row = sqlx::query("SELECT id, name, img_url FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            let summary = UserSummary {
                id: row.get("id"),
                name: row.get("name"),
                img_url: row.get("img_url"),
            };
            self.user_cache.lock().await.insert(id, summary.clone());
            Ok(Some(summary))
        } else {
            Ok(None)
        }
    }

    pub async fn invalidate_user(&self, id: i64) {
        self.user_cache.lock().await.remove(&id);
    }

    pub async fn cached_session(&self, jti: &str) -> Option<SessionRow> {
        self.session_cache.lock().await.get(&jti.to_string()).cloned()
    }

    pub async fn cache_session(&self, session: SessionRow) {
        self.session_cache
            .lock()
            .await
            .insert(session.jti.clone(), session);
    }

    pub async fn invalidate_sessions(&self) {
        // Eviction deletes by user id, not jti, so drop the whole cache.
        self.session_cache.lock().await.clear();
    }

    pub async fn get_community(&self, id: i64) -> AppResult<Option<CommunityRow>> {
        let row = sqlx::query("SELECT * FROM communities WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| map_community_row(&r)).transpose()
    }

    pub async fn get_post(&self, id: i64) -> AppResult<Option<PostRow>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| map_post_row(&r)))
    }

    pub async fn get_comment(&self, id: i64) -> AppResult<Option<CommentRow>> {
        let row = sqlx::query("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| map_comment_row(&r)))
    }

    // ---- relationship predicates ---------------------------------------

    pub async fn follow_exists(&self, follower_id: i64, following_id: i64) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM follows WHERE follower_id = ? AND following_id = ? LIMIT 1",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn membership_exists(&self, user_id: i64, community_id: i64) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM community_members WHERE user_id = ? AND community_id = ? LIMIT 1",
        )
        .bind(user_id)
        .bind(community_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Is there an unread pending request of `kind` from `sender` to
    /// `receiver` (optionally scoped to a community)?
    pub async fn pending_request_exists(
        &self,
        sender_id: i64,
        receiver_id: i64,
        kind: NotificationKind,
        community_id: Option<i64>,
    ) -> AppResult<bool> {
        let row = match community_id {
            Some(cid) => {
                sqlx::query(
                    "SELECT 1 FROM notifications
                     WHERE sender_id = ? AND receiver_id = ? AND kind = ? AND status = 'UNREAD'
                       AND community_id = ? LIMIT 1",
                )
                .bind(sender_id)
                .bind(receiver_id)
                .bind(kind.as_str())
                .bind(cid)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT 1 FROM notifications
                     WHERE sender_id = ? AND receiver_id = ? AND kind = ? AND status = 'UNREAD'
                     LIMIT 1",
                )
                .bind(sender_id)
                .bind(receiver_id)
                .bind(kind.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(row.is_some())
    }

    /// Has `sender` an unread JOIN_REQUEST_COMMUNITY pending for this
    /// community (regardless of who owns it now)?
    pub async fn pending_join_request_exists(
        &self,
        sender_id: i64,
        community_id: i64,
    ) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM notifications
             WHERE sender_id = ? AND community_id = ? AND kind = 'JOIN_REQUEST_COMMUNITY'
               AND status = 'UNREAD' LIMIT 1",
        )
        .bind(sender_id)
        .bind(community_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    // ---- engagement helpers --------------------------------------------

    /// Top-level LIKE count for a post.
    pub async fn post_like_count(&self, post_id: i64) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM engagements
             WHERE post_id = ? AND comment_id IS NULL AND kind = 'LIKE'",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }

    /// Top-level (non-reply) comment count for a post.
    pub async fn post_comment_count(&self, post_id: i64) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM comments
             WHERE post_id = ? AND parent_comment_id IS NULL",
        )
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("n"))
    }

    /// The viewer's post-level engagement, if any.
    pub async fn viewer_engagement(
        &self,
        post_id: i64,
        user_id: i64,
    ) -> AppResult<Option<EngagementKind>> {
        let row = sqlx::query(
            "SELECT kind FROM engagements
             WHERE post_id = ? AND user_id = ? AND comment_id IS NULL LIMIT 1",
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|r| EngagementKind::parse(r.get::<String, _>("kind").as_str())))
    }
}

// ---- row mapping --------------------------------------------------------

pub fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<UserRow> {
    let account_type: String = row.get("account_type");
    Ok(UserRow {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        img_url: row.get("img_url"),
        designation: row.get("designation"),
        account_type: Visibility::parse(&account_type).ok_or_else(|| {
            AppError::Internal(format!("unknown account type: {}", account_type))
        })?,
        is_verified: row.get::<i64, _>("is_verified") != 0,
        verification_code: row.get("verification_code"),
        verification_expires_at: row.get("verification_expires_at"),
        reset_code: row.get("reset_code"),
        reset_expires_at: row.get("reset_expires_at"),
        created_at: row.get("created_at"),
    })
}

pub fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> SessionRow {
    SessionRow {
        id: row.get("id"),
        user_id: row.get("user_id"),
        jti: row.get("jti"),
        token: row.get("token"),
        device_id: row.get("device_id"),
        user_agent: row.get("user_agent"),
        ip_address: row.get("ip_address"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

pub fn map_community_row(row: &sqlx::sqlite::SqliteRow) -> AppResult<CommunityRow> {
    let community_type: String = row.get("community_type");
    Ok(CommunityRow {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        description: row.get("description"),
        img_url: row.get("img_url"),
        banner_url: row.get("banner_url"),
        community_type: Visibility::parse(&community_type).ok_or_else(|| {
            AppError::Internal(format!("unknown community type: {}", community_type))
        })?,
        created_at: row.get("created_at"),
    })
}

pub fn map_post_row(row: &sqlx::sqlite::SqliteRow) -> PostRow {
    let img_urls: String = row.get("img_urls");
    PostRow {
        id: row.get("id"),
        user_id: row.get("user_id"),
        community_id: row.get("community_id"),
        title: row.get("title"),
        body: row.get("body"),
        img_urls: serde_json::from_str(&img_urls).unwrap_or_default(),
        is_deleted: row.get::<i64, _>("is_deleted") != 0,
        created_at: row.get("created_at"),
    }
}

pub fn map_comment_row(row: &sqlx::sqlite::SqliteRow) -> CommentRow {
    CommentRow {
        id: row.get("id"),
        post_id: row.get("post_id"),
        user_id: row.get("user_id"),
        parent_comment_id: row.get("parent_comment_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

pub fn map_notification_row(row: &sqlx::sqlite::SqliteRow) -> NotificationRow {
    NotificationRow {
        id: row.get("id"),
        kind: row.get("kind"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        status: row.get("status"),
        post_id: row.get("post_id"),
        comment_id: row.get("comment_id"),
        community_id: row.get("community_id"),
        created_at: row.get("created_at"),
    }
}
