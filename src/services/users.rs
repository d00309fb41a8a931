// Accounts and the social graph edges around them: registration with OTP
// verification, credential checks, the follow/join state machines, request
// accept/reject, search, and the profile view.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::Rng;
use serde::Serialize;
use sqlx::Row;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::{map_user_row, Database};
use crate::error::{AppError, AppResult};
use crate::graphql::types::{id_of, FollowEntry, Profile, SearchHit};
use crate::id_gen::IdGenerator;
use crate::integrations::mailer::{MailPurpose, Mailer};
use crate::models::{
    now_millis, FollowStatus, MembershipStatus, NewNotification, NotificationKind, UserRow,
    Visibility,
};
use crate::services::notifications::Notifier;

const OTP_TTL_MILLIS: i64 = 15 * 60 * 1000;

/// Fields a user may change about themselves.
#[derive(Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
    pub img_url: Option<String>,
    pub designation: Option<String>,
    pub account_type: Option<Visibility>,
}

/// Outcome of a follow/unfollow or join/leave toggle: the label the client
/// button flips to.
#[derive(Debug, Clone)]
pub struct EdgeToggleOutcome {
    pub message: String,
    pub status: String,
    pub community_name: Option<String>,
}

/// Payload for `GET /api/auth/me`.
#[derive(Debug, Serialize)]
pub struct UserOverview {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "imgUrl")]
    pub img_url: Option<String>,
    #[serde(rename = "followersCount")]
    pub followers_count: i64,
    #[serde(rename = "followingCount")]
    pub following_count: i64,
    pub communities: Vec<MembershipOverview>,
}

#[derive(Debug, Serialize)]
pub struct MembershipOverview {
    pub id: String,
    pub name: String,
    #[serde(rename = "ownerId")]
    pub owner_id: String,
}

pub struct UserService {
    db: Arc<Database>,
    ids: Arc<IdGenerator>,
    notifier: Arc<Notifier>,
    mailer: Arc<dyn Mailer>,
}

impl UserService {
    pub fn new(
        db: Arc<Database>,
        ids: Arc<IdGenerator>,
        notifier: Arc<Notifier>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            ids,
            notifier,
            mailer,
        }
    }

    fn otp() -> String {
        rand::rng().random_range(100_000..1_000_000).to_string()
    }

    fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("failed to hash password: {}", e)))
    }

    fn verify_password(password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    // ---- registration & credentials ------------------------------------

    /// Create (or refresh) an unverified account and mail the OTP.
    pub async fn create(&self, email: &str, name: &str) -> AppResult<UserRow> {
        if name.trim().is_empty() || email.trim().is_empty() {
            return Err(AppError::Validation("User data is missing.".to_string()));
        }

        let existing = self.db.get_user_by_email(email).await?;
        if let Some(user) = &existing {
            if user.is_verified {
                return Err(AppError::Validation(
                    "Email exists. Proceed to login.".to_string(),
                ));
            }
        }

        let code = Self::otp();
        let expires_at = now_millis() + OTP_TTL_MILLIS;

        let user_id = match existing {
            Some(user) => {
                sqlx::query(
                    "UPDATE users SET name = ?, verification_code = ?, verification_expires_at = ?
                     WHERE id = ?",
                )
                .bind(name)
                .bind(&code)
                .bind(expires_at)
                .bind(user.id)
                .execute(self.db.pool())
                .await?;
                self.db.invalidate_user(user.id).await;
                user.id
            }
            None => {
                let id = self.ids.next_id();
                sqlx::query(
                    "INSERT INTO users
                       (id, name, email, account_type, is_verified,
                        verification_code, verification_expires_at, created_at)
                     VALUES (?, ?, ?, 'PUBLIC', 0, ?, ?, ?)",
                )
                .bind(id)
                .bind(name)
                .bind(email.to_lowercase())
                .bind(&code)
                .bind(expires_at)
                .bind(now_millis())
                .execute(self.db.pool())
                .await?;
                id
            }
        };

        if let Err(err) = self
            .mailer
            .send_verification(email, name, &code, MailPurpose::Signup)
            .await
        {
            tracing::error!("failed to send verification mail: {}", err);
        }

        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Internal("user vanished after upsert".to_string()))
    }

    /// Consume a signup OTP and mark the account verified.
    pub async fn verify(&self, token: &str) -> AppResult<UserRow> {
        if token.trim().is_empty() {
            return Err(AppError::Validation("Token missing.".to_string()));
        }

        let row = sqlx::query("SELECT * FROM users WHERE verification_code = ?")
            .bind(token)
            .fetch_optional(self.db.pool())
            .await?;
        let user = match row {
            Some(row) => map_user_row(&row)?,
            None => {
                return Err(AppError::Validation(
                    "Invalid verification token.".to_string(),
                ))
            }
        };

        if user
            .verification_expires_at
            .map(|t| t < now_millis())
            .unwrap_or(false)
        {
            return Err(AppError::Validation(
                "Verification token expired.".to_string(),
            ));
        }

        sqlx::query(
            "UPDATE users SET is_verified = 1, verification_code = NULL,
                              verification_expires_at = NULL
             WHERE id = ?",
        )
        .bind(user.id)
        .execute(self.db.pool())
        .await?;
        self.db.invalidate_user(user.id).await;

        self.db
            .get_user(user.id)
            .await?
            .ok_or_else(|| AppError::Internal("user vanished after verify".to_string()))
    }

    /// Email + password check for login.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<UserRow> {
        let user = self
            .db
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Validation("User not found".to_string()))?;

        if !user.is_verified {
            return Err(AppError::Validation("User not Verified".to_string()));
        }
        let hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::Validation("Password is wrong".to_string()))?;
        if !Self::verify_password(password, hash) {
            return Err(AppError::Validation("Password is wrong".to_string()));
        }
        Ok(user)
    }

    pub async fn update(&self, id: i64, update: UserUpdate) -> AppResult<UserRow> {
        let user = self
            .db
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let password_hash = match update.password {
            Some(password) => Some(Self::hash_password(&password)?),
            None => user.password_hash,
        };
        let account_type = update.account_type.unwrap_or(user.account_type);

        sqlx::query(
            "UPDATE users SET name = ?, password_hash = ?, img_url = ?, designation = ?,
                              account_type = ?
             WHERE id = ?",
        )
        .bind(update.name.unwrap_or(user.name))
        .bind(password_hash)
        .bind(update.img_url.or(user.img_url))
        .bind(update.designation.or(user.designation))
        .bind(account_type.as_str())
        .bind(id)
        .execute(self.db.pool())
        .await?;
        self.db.invalidate_user(id).await;

        // Going public moots any pending follow requests.
        if account_type == Visibility::Public && user.account_type == Visibility::Private {
            self.notifier.purge_follow_requests(id).await?;
        }

        self.db
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::Internal("user vanished after update".to_string()))
    }

    pub async fn list_by_email(&self, email: &str) -> AppResult<Vec<UserRow>> {
        if email.trim().is_empty() {
            return Err(AppError::Validation("Email missing.".to_string()));
        }
        Ok(self.db.get_user_by_email(email).await?.into_iter().collect())
    }

    // ---- password reset -------------------------------------------------

    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        if email.trim().is_empty() {
            return Err(AppError::Validation(
                "Email required to verify forgot password".to_string(),
            ));
        }
        let user = self
            .db
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Validation("User not exist with this email.".to_string()))?;

        let code = Self::otp();
        sqlx::query("UPDATE users SET reset_code = ?, reset_expires_at = ? WHERE id = ?")
            .bind(&code)
            .bind(now_millis() + OTP_TTL_MILLIS)
            .bind(user.id)
            .execute(self.db.pool())
            .await?;

        if let Err(err) = self
            .mailer
            .send_verification(email, &user.name, &code, MailPurpose::PasswordReset)
            .await
        {
            tracing::error!("failed to send reset mail: {}", err);
        }
        Ok(())
    }

    pub async fn reset_password(&self, email: &str, otp: &str, password: &str) -> AppResult<()> {
        if email.trim().is_empty() || password.trim().is_empty() || otp.trim().is_empty() {
            return Err(AppError::Validation(
                "Required fields are missing".to_string(),
            ));
        }
        let user = self
            .db
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::Validation("User not exist with this email".to_string()))?;

        let valid = user.reset_code.as_deref() == Some(otp)
            && user.reset_expires_at.map(|t| t > now_millis()).unwrap_or(false);
        if !valid {
            return Err(AppError::Validation(
                "Token is invalid or expired".to_string(),
            ));
        }

        sqlx::query(
            "UPDATE users SET password_hash = ?, reset_code = NULL, reset_expires_at = NULL
             WHERE id = ?",
        )
        .bind(Self::hash_password(password)?)
        .bind(user.id)
        .execute(self.db.pool())
        .await?;
        self.db.invalidate_user(user.id).await;
        Ok(())
    }

    // ---- follow state machine (spec: None -> Requested -> Accepted) -----

    pub async fn follow_unfollow(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> AppResult<EdgeToggleOutcome> {
        if self.db.follow_exists(follower_id, following_id).await? {
            // Unfollow: drop the edge outright; the button falls back to
            // "Follow Back" if the reverse edge survives.
            let reverse = self.db.follow_exists(following_id, follower_id).await?;
            sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
                .bind(follower_id)
                .bind(following_id)
                .execute(self.db.pool())
                .await?;
            return Ok(EdgeToggleOutcome {
                message: "User unfollowed successfully".to_string(),
                status: if reverse {
                    FollowStatus::FollowBack.as_str().to_string()
                } else {
                    FollowStatus::Follow.as_str().to_string()
                },
                community_name: None,
            });
        }

        let target = self
            .db
            .get_user(following_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if target.account_type == Visibility::Public {
            sqlx::query(
                "INSERT OR IGNORE INTO follows (id, follower_id, following_id, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(self.ids.next_id())
            .bind(follower_id)
            .bind(following_id)
            .bind(now_millis())
            .execute(self.db.pool())
            .await?;

            self.notifier
                .emit(NewNotification::new(
                    NotificationKind::Followed,
                    follower_id,
                    following_id,
                ))
                .await?;

            return Ok(EdgeToggleOutcome {
                message: "User followed successfully".to_string(),
                status: FollowStatus::Following.as_str().to_string(),
                community_name: None,
            });
        }

        // Private target: no edge until the request is accepted.
        let already_pending = self
            .db
            .pending_request_exists(
                follower_id,
                following_id,
                NotificationKind::FollowRequest,
                None,
            )
            .await?;
        if !already_pending {
            self.notifier
                .emit(NewNotification::new(
                    NotificationKind::FollowRequest,
                    follower_id,
                    following_id,
                ))
                .await?;
        }

        Ok(EdgeToggleOutcome {
            message: "Follow request sent (private account)".to_string(),
            status: FollowStatus::Requested.as_str().to_string(),
            community_name: None,
        })
    }

    // ---- join state machine ---------------------------------------------

    pub async fn join_leave_community(
        &self,
        user_id: i64,
        community_id: i64,
    ) -> AppResult<EdgeToggleOutcome> {
        if self.db.membership_exists(user_id, community_id).await? {
            sqlx::query("DELETE FROM community_members WHERE user_id = ? AND community_id = ?")
                .bind(user_id)
                .bind(community_id)
                .execute(self.db.pool())
                .await?;
            return Ok(EdgeToggleOutcome {
                message: "User left community successfully".to_string(),
                status: MembershipStatus::Join.as_str().to_string(),
                community_name: None,
            });
        }

        let community = self
            .db
            .get_community(community_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;

        if community.community_type == Visibility::Public {
            sqlx::query(
                "INSERT OR IGNORE INTO community_members
                   (id, community_id, user_id, last_active_at, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(self.ids.next_id())
            .bind(community_id)
            .bind(user_id)
            .bind(now_millis())
            .bind(now_millis())
            .execute(self.db.pool())
            .await?;

            self.notifier
                .emit(
                    NewNotification::new(
                        NotificationKind::JoinedCommunity,
                        user_id,
                        community.owner_id,
                    )
                    .with_community(Some(community_id)),
                )
                .await?;

            return Ok(EdgeToggleOutcome {
                message: "Community joined successfully".to_string(),
                status: MembershipStatus::Joined.as_str().to_string(),
                community_name: Some(community.name),
            });
        }

        let already_pending = self
            .db
            .pending_join_request_exists(user_id, community_id)
            .await?;
        if !already_pending {
            self.notifier
                .emit(
                    NewNotification::new(
                        NotificationKind::JoinRequestCommunity,
                        user_id,
                        community.owner_id,
                    )
                    .with_community(Some(community_id)),
                )
                .await?;
        }

        Ok(EdgeToggleOutcome {
            message: "Join request sent (private community)".to_string(),
            status: MembershipStatus::Requested.as_str().to_string(),
            community_name: None,
        })
    }

    /// Accept or reject a pending request. Accept creates the edge, reject
    /// does not; the notification row is consumed either way.
    pub async fn accept_request(
        &self,
        notification_id: i64,
        requester_id: i64,
        following_id: Option<i64>,
        community_id: Option<i64>,
        accept: bool,
    ) -> AppResult<()> {
        if accept {
            if let Some(community_id) = community_id {
                sqlx::query(
                    "INSERT OR IGNORE INTO community_members
                       (id, community_id, user_id, last_active_at, created_at)
                     VALUES (?, ?, ?, NULL, ?)",
                )
                .bind(self.ids.next_id())
                .bind(community_id)
                .bind(requester_id)
                .bind(now_millis())
                .execute(self.db.pool())
                .await?;
            }

            if let Some(following_id) = following_id {
                sqlx::query(
                    "INSERT OR IGNORE INTO follows (id, follower_id, following_id, created_at)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(self.ids.next_id())
                .bind(requester_id)
                .bind(following_id)
                .bind(now_millis())
                .execute(self.db.pool())
                .await?;
            }
        }

        self.notifier.delete(notification_id).await
    }

    // ---- listings & profile ---------------------------------------------

    pub async fn get_followers(&self, user_id: i64) -> AppResult<Vec<FollowEntry>> {
        let rows = sqlx::query(
            "SELECT u.id, u.name, u.img_url FROM follows f
             JOIN users u ON u.id = f.follower_id
             WHERE f.following_id = ?
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let following: HashSet<i64> =
            sqlx::query("SELECT following_id FROM follows WHERE follower_id = ?")
                .bind(user_id)
                .fetch_all(self.db.pool())
                .await?
                .into_iter()
                .map(|row| row.get::<i64, _>("following_id"))
                .collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let id: i64 = row.get("id");
                FollowEntry {
                    id: id_of(id),
                    name: row.get("name"),
                    img_url: row.get("img_url"),
                    is_follow_back: following.contains(&id),
                }
            })
            .collect())
    }

    pub async fn get_followings(&self, user_id: i64) -> AppResult<Vec<FollowEntry>> {
        let rows = sqlx::query(
            "SELECT u.id, u.name, u.img_url FROM follows f
             JOIN users u ON u.id = f.following_id
             WHERE f.follower_id = ?
             ORDER BY f.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let followers: HashSet<i64> =
            sqlx::query("SELECT follower_id FROM follows WHERE following_id = ?")
                .bind(user_id)
                .fetch_all(self.db.pool())
                .await?
                .into_iter()
                .map(|row| row.get::<i64, _>("follower_id"))
                .collect();

        Ok(rows
            .into_iter()
            .map(|row| {
                let id: i64 = row.get("id");
                FollowEntry {
                    id: id_of(id),
                    name: row.get("name"),
                    img_url: row.get("img_url"),
                    is_follow_back: followers.contains(&id),
                }
            })
            .collect())
    }

    /// Profile header for a user page. Viewing someone else's profile emits
    /// a PROFILE_VIEW notification to the viewed user.
    pub async fn get_profile(&self, user_id: i64, viewer_id: i64) -> AppResult<Profile> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        let followers_count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM follows WHERE following_id = ?")
                .bind(user_id)
                .fetch_one(self.db.pool())
                .await?
                .get("n");
        let following_count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM follows WHERE follower_id = ?")
                .bind(user_id)
                .fetch_one(self.db.pool())
                .await?
                .get("n");
        let posts_count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM posts WHERE user_id = ? AND is_deleted = 0")
                .bind(user_id)
                .fetch_one(self.db.pool())
                .await?
                .get("n");

        let viewer_follows = self.db.follow_exists(viewer_id, user_id).await?;
        let follows_viewer = self.db.follow_exists(user_id, viewer_id).await?;
        let requested = self
            .db
            .pending_request_exists(viewer_id, user_id, NotificationKind::FollowRequest, None)
            .await?;

        if user_id != viewer_id {
            self.notifier
                .emit(NewNotification::new(
                    NotificationKind::ProfileView,
                    viewer_id,
                    user_id,
                ))
                .await?;
        }

        let follow_status = if follows_viewer && !viewer_follows {
            FollowStatus::FollowBack
        } else if requested {
            FollowStatus::Requested
        } else if viewer_follows {
            FollowStatus::Following
        } else {
            FollowStatus::Follow
        };

        Ok(Profile {
            id: id_of(user.id),
            name: user.name,
            designation: user.designation,
            img_url: user.img_url,
            account_type: user.account_type.as_str().to_string(),
            followers_count,
            following_count,
            posts_count,
            follow_status: follow_status.as_str().to_string(),
        })
    }

    // ---- search ----------------------------------------------------------

    /// Substring search over people or communities, ascending-id cursor,
    /// page size 20.
    pub async fn search(
        &self,
        query: &str,
        search_type: &str,
        cursor: Option<i64>,
    ) -> AppResult<(Vec<SearchHit>, Option<String>)> {
        if query.trim().is_empty() {
            return Err(AppError::Validation(
                "Required fields are missing".to_string(),
            ));
        }
        let pattern = format!("%{}%", query.trim());
        let after = cursor.unwrap_or(i64::MIN);
        const PAGE: i64 = 20;

        let hits: Vec<SearchHit> = match search_type {
            "people" => sqlx::query(
                "SELECT id, name, img_url, designation FROM users
                 WHERE (name LIKE ? OR designation LIKE ?) AND id > ?
                 ORDER BY id ASC LIMIT ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(after)
            .bind(PAGE)
            .fetch_all(self.db.pool())
            .await?
            .into_iter()
            .map(|row| SearchHit {
                id: id_of(row.get("id")),
                name: row.get("name"),
                img_url: row.get("img_url"),
                designation: row.get("designation"),
                members_count: None,
            })
            .collect(),
            "community" => sqlx::query(
                "SELECT c.id, c.name, c.img_url,
                        (SELECT COUNT(*) FROM community_members m
                          WHERE m.community_id = c.id) AS members_count
                 FROM communities c
                 WHERE c.name LIKE ? AND c.id > ?
                 ORDER BY c.id ASC LIMIT ?",
            )
            .bind(&pattern)
            .bind(after)
            .bind(PAGE)
            .fetch_all(self.db.pool())
            .await?
            .into_iter()
            .map(|row| SearchHit {
                id: id_of(row.get("id")),
                name: row.get("name"),
                img_url: row.get("img_url"),
                designation: None,
                members_count: Some(row.get("members_count")),
            })
            .collect(),
            _ => return Err(AppError::Validation("Invalid search type".to_string())),
        };

        let next_cursor = if hits.len() as i64 == PAGE {
            hits.last().map(|hit| hit.id.0.clone())
        } else {
            None
        };
        Ok((hits, next_cursor))
    }

    // ---- /api/auth/me ----------------------------------------------------

    pub async fn overview(&self, user_id: i64) -> AppResult<Option<UserOverview>> {
        let user = match self.db.get_user(user_id).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let followers_count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM follows WHERE following_id = ?")
                .bind(user_id)
                .fetch_one(self.db.pool())
                .await?
                .get("n");
        let following_count: i64 =
            sqlx::query("SELECT COUNT(*) AS n FROM follows WHERE follower_id = ?")
                .bind(user_id)
                .fetch_one(self.db.pool())
                .await?
                .get("n");

        let communities = sqlx::query(
            "SELECT c.id, c.name, c.owner_id FROM community_members m
             JOIN communities c ON c.id = m.community_id
             WHERE m.user_id = ?
             ORDER BY c.name ASC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?
        .into_iter()
        .map(|row| MembershipOverview {
            id: row.get::<i64, _>("id").to_string(),
            name: row.get("name"),
            owner_id: row.get::<i64, _>("owner_id").to_string(),
        })
        .collect();

        Ok(Some(UserOverview {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
            img_url: user.img_url,
            followers_count,
            following_count,
            communities,
        }))
    }

    /// Verified upsert for the OAuth callback: GitHub identities arrive
    /// pre-verified.
    pub async fn upsert_oauth_user(
        &self,
        email: &str,
        name: &str,
        avatar_url: Option<&str>,
    ) -> AppResult<UserRow> {
        match self.db.get_user_by_email(email).await? {
            Some(user) => {
                sqlx::query(
                    "UPDATE users SET name = ?, img_url = COALESCE(?, img_url), is_verified = 1
                     WHERE id = ?",
                )
                .bind(name)
                .bind(avatar_url)
                .bind(user.id)
                .execute(self.db.pool())
                .await?;
                self.db.invalidate_user(user.id).await;
                self.db
                    .get_user(user.id)
                    .await?
                    .ok_or_else(|| AppError::Internal("user vanished after upsert".to_string()))
            }
            None => {
                let id = self.ids.next_id();
                sqlx::query(
                    "INSERT INTO users (id, name, email, img_url, account_type, is_verified, created_at)
                     VALUES (?, ?, ?, ?, 'PUBLIC', 1, ?)",
                )
                .bind(id)
                .bind(name)
                .bind(email.to_lowercase())
                .bind(avatar_url)
                .bind(now_millis())
                .execute(self.db.pool())
                .await?;
                self.db
                    .get_user(id)
                    .await?
                    .ok_or_else(|| AppError::Internal("user vanished after insert".to_string()))
            }
        }
    }
}
