// Communities: CRUD, membership administration and the activity-ranked
// "top communities" rail.

use sqlx::Row;
use std::sync::Arc;

use crate::db::{map_community_row, Database};
use crate::error::{AppError, AppResult};
use crate::graphql::types::{id_of, CommunityCard, CommunityDetail, MemberView};
use crate::id_gen::IdGenerator;
use crate::models::{
    format_count, now_millis, CommunityRow, FollowStatus, MembershipStatus, NotificationKind,
    Visibility,
};
use crate::services::notifications::Notifier;

/// How many candidates are scored for the top-communities rail.
const TOP_CANDIDATES: i64 = 25;
const TOP_RESULTS: usize = 5;

#[derive(Debug, Default)]
pub struct CommunityUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub img_url: Option<String>,
    pub banner_url: Option<String>,
    pub community_type: Option<Visibility>,
}

pub struct CommunityService {
    db: Arc<Database>,
    ids: Arc<IdGenerator>,
    notifier: Arc<Notifier>,
}

impl CommunityService {
    pub fn new(db: Arc<Database>, ids: Arc<IdGenerator>, notifier: Arc<Notifier>) -> Self {
        Self { db, ids, notifier }
    }

    /// Create the community and its owner membership atomically.
    pub async fn create(
        &self,
        owner_id: i64,
        name: &str,
        description: &str,
        img_url: &str,
    ) -> AppResult<CommunityRow> {
        if name.trim().is_empty() || description.trim().is_empty() || img_url.trim().is_empty() {
            return Err(AppError::Validation(
                "Requirements missing to create community".to_string(),
            ));
        }

        let community_id = self.ids.next_id();
        let now = now_millis();

        let mut tx = self.db.begin_transaction().await?;
        sqlx::query(
            "INSERT INTO communities
               (id, owner_id, name, description, img_url, community_type, created_at)
             VALUES (?, ?, ?, ?, ?, 'PUBLIC', ?)",
        )
        .bind(community_id)
        .bind(owner_id)
        .bind(name.trim())
        .bind(description.trim())
        .bind(img_url.trim())
        .bind(now)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO community_members (id, community_id, user_id, last_active_at, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(self.ids.next_id())
        .bind(community_id)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("failed to commit community creation: {}", e))
        })?;

        self.db
            .get_community(community_id)
            .await?
            .ok_or_else(|| AppError::Internal("community vanished after insert".to_string()))
    }

    pub async fn get_detail(
        &self,
        community_id: i64,
        viewer_id: i64,
    ) -> AppResult<CommunityDetail> {
        let community = self
            .db
            .get_community(community_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found.".to_string()))?;

        let members_count: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM community_members WHERE community_id = ?",
        )
        .bind(community_id)
        .fetch_one(self.db.pool())
        .await?
        .get("n");
        let posts_count: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM posts WHERE community_id = ? AND is_deleted = 0",
        )
        .bind(community_id)
        .fetch_one(self.db.pool())
        .await?
        .get("n");

        let is_member = if self.db.membership_exists(viewer_id, community_id).await? {
            MembershipStatus::Joined
        } else if self
            .db
            .pending_join_request_exists(viewer_id, community_id)
            .await?
        {
            MembershipStatus::Requested
        } else {
            MembershipStatus::Join
        };

        Ok(CommunityDetail {
            id: id_of(community.id),
            name: community.name,
            description: community.description,
            banner_url: community.banner_url,
            img_url: community.img_url,
            community_type: community.community_type.as_str().to_string(),
            owner_id: community.owner_id.to_string(),
            members_count,
            posts_count,
            is_member: is_member.as_str().to_string(),
        })
    }

    /// Members in name order with the viewer's own row surfaced first, each
    /// carrying the viewer-relative follow button label.
    pub async fn get_members(
        &self,
        community_id: i64,
        viewer_id: i64,
    ) -> AppResult<Vec<MemberView>> {
        let rows = sqlx::query(
            "SELECT u.id, u.name, u.img_url FROM community_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.community_id = ?
             ORDER BY u.name ASC
             LIMIT 1000",
        )
        .bind(community_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut members = Vec::with_capacity(rows.len());
        for row in rows {
            let member_id: i64 = row.get("id");
            let status = if self.db.follow_exists(viewer_id, member_id).await? {
                FollowStatus::Following
            } else if self
                .db
                .pending_request_exists(
                    viewer_id,
                    member_id,
                    NotificationKind::FollowRequest,
                    None,
                )
                .await?
            {
                FollowStatus::Requested
            } else if self.db.follow_exists(member_id, viewer_id).await? {
                FollowStatus::FollowBack
            } else {
                FollowStatus::Follow
            };

            members.push(MemberView {
                id: id_of(member_id),
                name: row.get("name"),
                img_url: row.get("img_url"),
                follow_status: status.as_str().to_string(),
            });
        }

        members.sort_by_key(|m| m.id.0 != viewer_id.to_string());
        Ok(members)
    }

    pub async fn update(&self, community_id: i64, update: CommunityUpdate) -> AppResult<()> {
        let community = self
            .db
            .get_community(community_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;

        let community_type = update.community_type.unwrap_or(community.community_type);

        sqlx::query(
            "UPDATE communities SET name = ?, description = ?, img_url = ?, banner_url = ?,
                                    community_type = ?
             WHERE id = ?",
        )
        .bind(update.name.unwrap_or(community.name))
        .bind(update.description.unwrap_or(community.description))
        .bind(update.img_url.or(community.img_url))
        .bind(update.banner_url.or(community.banner_url))
        .bind(community_type.as_str())
        .bind(community_id)
        .execute(self.db.pool())
        .await?;

        // Going public moots any pending join requests.
        if community_type == Visibility::Public
            && community.community_type == Visibility::Private
        {
            self.notifier
                .purge_join_requests(community_id, community.owner_id)
                .await?;
        }
        Ok(())
    }

    /// Owner-only removal of a member.
    pub async fn remove_member(
        &self,
        owner_id: i64,
        user_id: i64,
        community_id: i64,
    ) -> AppResult<()> {
        let community = self
            .db
            .get_community(community_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;
        if community.owner_id != owner_id {
            return Err(AppError::Forbidden(
                "Unauthorized or community not found".to_string(),
            ));
        }

        sqlx::query("DELETE FROM community_members WHERE community_id = ? AND user_id = ?")
            .bind(community_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn leave(&self, community_id: i64, user_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM community_members WHERE community_id = ? AND user_id = ?")
            .bind(community_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Recommended communities the viewer has not joined, ranked by a
    /// weighted activity score: members * 0.5 + posts * 2 + comments * 1.5
    /// plus a recency boost from the ten most recently active members.
    pub async fn top_communities(&self, viewer_id: i64) -> AppResult<Vec<CommunityCard>> {
        let rows = sqlx::query(
            "SELECT c.*,
                    (SELECT COUNT(*) FROM community_members m
                      WHERE m.community_id = c.id) AS members_count,
                    (SELECT COUNT(*) FROM posts p
                      WHERE p.community_id = c.id) AS posts_count,
                    (SELECT COUNT(*) FROM comments cm
                      JOIN posts p ON p.id = cm.post_id
                      WHERE p.community_id = c.id) AS comments_count
             FROM communities c
             WHERE NOT EXISTS (SELECT 1 FROM community_members m
                                WHERE m.community_id = c.id AND m.user_id = ?)
             ORDER BY posts_count DESC, members_count DESC
             LIMIT ?",
        )
        .bind(viewer_id)
        .bind(TOP_CANDIDATES)
        .fetch_all(self.db.pool())
        .await?;

        let now = now_millis();
        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let community = map_community_row(&row)?;
            let members_count: i64 = row.get("members_count");
            let posts_count: i64 = row.get("posts_count");
            let comments_count: i64 = row.get("comments_count");

            let recent: Vec<i64> = sqlx::query(
                "SELECT last_active_at FROM community_members
                 WHERE community_id = ? AND last_active_at IS NOT NULL
                 ORDER BY last_active_at DESC
                 LIMIT 10",
            )
            .bind(community.id)
            .fetch_all(self.db.pool())
            .await?
            .into_iter()
            .map(|r| r.get::<i64, _>("last_active_at"))
            .collect();

            let boost = if recent.is_empty() {
                0.0
            } else {
                let total: f64 = recent
                    .iter()
                    .map(|&last_active| {
                        let hours_ago = (now - last_active) as f64 / 3_600_000.0;
                        (48.0 - hours_ago).max(0.0)
                    })
                    .sum();
                total / recent.len() as f64
            };

            let score = members_count as f64 * 0.5
                + posts_count as f64 * 2.0
                + comments_count as f64 * 1.5
                + boost;
            scored.push((score, community, members_count));
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(TOP_RESULTS);

        Ok(scored
            .into_iter()
            .map(|(_, community, members_count)| CommunityCard {
                id: id_of(community.id),
                name: community.name,
                members_count: format_count(members_count),
                img_url: community.img_url,
            })
            .collect())
    }
}
