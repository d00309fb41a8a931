// Posts, comments, engagement toggling and the trending feed.
//
// Feed pagination is keyset-based: the client hands back the last post id it
// saw, the server recomputes that post's rank tuple and continues strictly
// after it in the same ordering. Every ordering ends with `id DESC`, so a
// page boundary can never repeat or skip a row.

use sqlx::Row;
use std::sync::Arc;

use crate::db::{map_post_row, Database};
use crate::error::{AppError, AppResult};
use crate::graphql::types::{
    id_of, iso_timestamp, AuthorView, CommentView, CommunityRefView, PostView, UserSummaryView,
};
use crate::id_gen::IdGenerator;
use crate::integrations::moderation::ContentFilter;
use crate::models::{
    now_millis, EngagementKind, NewNotification, NotificationKind, PostRow,
};
use crate::services::notifications::Notifier;

pub const FEED_PAGE_SIZE: i64 = 5;
const TRENDING_WINDOW_MILLIS: i64 = 14 * 24 * 60 * 60 * 1000;

const POST_FLAGGED_WARNING: &str =
    "AI detected your post content seems intense. Let's keep the conversation respectful.";
const COMMENT_FLAGGED_WARNING: &str =
    "AI detected your comment seems intense. Let's keep the conversation respectful.";

/// Trending feed modes: "top" ranks by engagement inside a 14-day window,
/// "new" ranks by recency with engagement as tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    Top,
    New,
}

impl FeedMode {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("new") => FeedMode::New,
            _ => FeedMode::Top,
        }
    }
}

/// Outcome of a moderated write: either persisted, or bounced with an
/// advisory for the author.
#[derive(Debug, Clone)]
pub enum ModeratedWrite<T> {
    Created(T),
    Flagged(String),
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub community_id: Option<i64>,
    pub user_id: i64,
    pub img_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TrendingPage {
    pub posts: Vec<PostView>,
    pub has_next_page: bool,
    pub next_cursor: Option<String>,
}

struct RankedPost {
    row: PostRow,
    like_count: i64,
    comment_count: i64,
}

pub struct PostService {
    db: Arc<Database>,
    ids: Arc<IdGenerator>,
    notifier: Arc<Notifier>,
    filter: Arc<dyn ContentFilter>,
}

impl PostService {
    pub fn new(
        db: Arc<Database>,
        ids: Arc<IdGenerator>,
        notifier: Arc<Notifier>,
        filter: Arc<dyn ContentFilter>,
    ) -> Self {
        Self {
            db,
            ids,
            notifier,
            filter,
        }
    }

    /// Moderation is advisory: a definite "unsafe" verdict bounces the
    /// write, a failed check never blocks it.
    async fn content_allowed(&self, text: &str) -> bool {
        match self.filter.is_safe(text).await {
            Ok(safe) => safe,
            Err(err) => {
                tracing::warn!("content filter unavailable, allowing write: {}", err);
                true
            }
        }
    }

    // ---- post creation & deletion ---------------------------------------

    /// Returns the new post id, or the moderation advisory if the content
    /// was flagged.
    pub async fn create_post(&self, input: NewPost) -> AppResult<ModeratedWrite<i64>> {
        if input.title.trim().is_empty() || input.body.trim().is_empty() {
            return Err(AppError::Validation(
                "Required fields are missing".to_string(),
            ));
        }

        if !self
            .content_allowed(&format!("{} {}", input.title, input.body))
            .await
        {
            return Ok(ModeratedWrite::Flagged(POST_FLAGGED_WARNING.to_string()));
        }

        if let Some(community_id) = input.community_id {
            if !self
                .db
                .membership_exists(input.user_id, community_id)
                .await?
            {
                return Err(AppError::Forbidden(
                    "User is not a member of this community".to_string(),
                ));
            }
            // Posting counts as community activity.
            sqlx::query(
                "UPDATE community_members SET last_active_at = ?
                 WHERE user_id = ? AND community_id = ?",
            )
            .bind(now_millis())
            .bind(input.user_id)
            .bind(community_id)
            .execute(self.db.pool())
            .await?;
        }

        let post_id = self.ids.next_id();
        sqlx::query(
            "INSERT INTO posts (id, user_id, community_id, title, body, img_urls, is_deleted, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(post_id)
        .bind(input.user_id)
        .bind(input.community_id)
        .bind(input.title.trim())
        .bind(input.body.trim())
        .bind(serde_json::to_string(&input.img_urls).unwrap_or_else(|_| "[]".to_string()))
        .bind(now_millis())
        .execute(self.db.pool())
        .await?;

        Ok(ModeratedWrite::Created(post_id))
    }

    /// Soft delete: flag the row and record the companion deletions entry.
    pub async fn delete_post(&self, post_id: i64, user_id: i64) -> AppResult<()> {
        let result = sqlx::query("UPDATE posts SET is_deleted = 1 WHERE id = ? AND user_id = ?")
            .bind(post_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        sqlx::query(
            "INSERT INTO deletions (id, user_id, post_id, comment_id, created_at)
             VALUES (?, ?, ?, NULL, ?)",
        )
        .bind(self.ids.next_id())
        .bind(user_id)
        .bind(post_id)
        .bind(now_millis())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    // ---- engagement toggle ----------------------------------------------

    /// Like/dislike state machine: absent -> insert, same kind -> remove,
    /// other kind -> switch. The read and the write share a transaction and
    /// partial unique indexes back the whole thing up, so concurrent
    /// double-clicks cannot produce two rows.
    pub async fn like_dislike(
        &self,
        post_id: i64,
        user_id: i64,
        comment_id: Option<i64>,
        kind: EngagementKind,
    ) -> AppResult<String> {
        let mut tx = self.db.begin_transaction().await?;

        let existing = match comment_id {
            Some(cid) => {
                sqlx::query(
                    "SELECT id, kind FROM engagements
                     WHERE user_id = ? AND post_id = ? AND comment_id = ?",
                )
                .bind(user_id)
                .bind(post_id)
                .bind(cid)
                .fetch_optional(&mut *tx)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, kind FROM engagements
                     WHERE user_id = ? AND post_id = ? AND comment_id IS NULL",
                )
                .bind(user_id)
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?
            }
        };

        let message;
        let mut notify = false;
        match existing {
            None => {
                let inserted = sqlx::query(
                    "INSERT OR IGNORE INTO engagements (id, user_id, post_id, comment_id, kind, created_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(self.ids.next_id())
                .bind(user_id)
                .bind(post_id)
                .bind(comment_id)
                .bind(kind.as_str())
                .bind(now_millis())
                .execute(&mut *tx)
                .await?;
                notify = inserted.rows_affected() > 0;
                message = format!("{} added", kind.as_str());
            }
            Some(row) => {
                let existing_id: i64 = row.get("id");
                let existing_kind: String = row.get("kind");
                if existing_kind == kind.as_str() {
                    sqlx::query("DELETE FROM engagements WHERE id = ?")
                        .bind(existing_id)
                        .execute(&mut *tx)
                        .await?;
                    message = "Action removed".to_string();
                } else {
                    sqlx::query("UPDATE engagements SET kind = ? WHERE id = ?")
                        .bind(kind.as_str())
                        .bind(existing_id)
                        .execute(&mut *tx)
                        .await?;
                    message = format!("Changed to {}", kind.as_str());
                }
            }
        }
        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(format!("failed to commit engagement toggle: {}", e))
        })?;

        // Fan-out happens outside the transaction; the notification channel
        // is best-effort by design.
        if notify {
            let owner_id = match comment_id {
                Some(cid) => self.db.get_comment(cid).await?.map(|c| c.user_id),
                None => self.db.get_post(post_id).await?.map(|p| p.user_id),
            };
            if let Some(owner_id) = owner_id {
                if owner_id != user_id {
                    self.notifier
                        .emit(
                            NewNotification::new(NotificationKind::LikePost, user_id, owner_id)
                                .with_post(Some(post_id))
                                .with_comment(comment_id),
                        )
                        .await?;
                }
            }
        }

        Ok(message)
    }

    // ---- comments --------------------------------------------------------

    pub async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        parent_comment_id: Option<i64>,
        content: &str,
    ) -> AppResult<ModeratedWrite<CommentView>> {
        if content.trim().is_empty() {
            return Err(AppError::Validation(
                "Required fields are missing to add comments".to_string(),
            ));
        }

        if !self.content_allowed(content).await {
            return Ok(ModeratedWrite::Flagged(COMMENT_FLAGGED_WARNING.to_string()));
        }

        let post = self
            .db
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let comment_id = self.ids.next_id();
        let now = now_millis();
        sqlx::query(
            "INSERT INTO comments (id, post_id, user_id, parent_comment_id, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(comment_id)
        .bind(post_id)
        .bind(user_id)
        .bind(parent_comment_id)
        .bind(content.trim())
        .bind(now)
        .execute(self.db.pool())
        .await?;

        if post.user_id != user_id {
            self.notifier
                .emit(
                    NewNotification::new(NotificationKind::CommentPost, user_id, post.user_id)
                        .with_post(Some(post_id))
                        .with_comment(Some(comment_id)),
                )
                .await?;
        }

        let user = self
            .db
            .user_summary(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(ModeratedWrite::Created(CommentView {
            id: id_of(comment_id),
            content: content.trim().to_string(),
            user: UserSummaryView::from(user),
            parent_comment_id: parent_comment_id.map(|id| id.to_string()),
            like_count: 0,
            is_liked: false,
            created_at: iso_timestamp(now),
        }))
    }

    /// One level of comments, newest first. A comment is hidden as soon as a
    /// deletions marker exists for it; comments carry no deleted flag of
    /// their own.
    pub async fn get_comments(
        &self,
        post_id: i64,
        viewer_id: Option<i64>,
        parent_comment_id: Option<i64>,
    ) -> AppResult<Vec<CommentView>> {
        let viewer = viewer_id.unwrap_or(0);
        let rows = match parent_comment_id {
            Some(parent) => {
                sqlx::query(
                    "SELECT c.id, c.content, c.parent_comment_id, c.created_at, c.user_id,
                            (SELECT COUNT(*) FROM engagements e
                              WHERE e.comment_id = c.id AND e.kind = 'LIKE') AS like_count,
                            EXISTS(SELECT 1 FROM engagements e
                              WHERE e.comment_id = c.id AND e.user_id = ? AND e.kind = 'LIKE') AS is_liked
                     FROM comments c
                     WHERE c.post_id = ? AND c.parent_comment_id = ?
                       AND NOT EXISTS (SELECT 1 FROM deletions d WHERE d.comment_id = c.id)
                     ORDER BY c.created_at DESC, c.id DESC",
                )
                .bind(viewer)
                .bind(post_id)
                .bind(parent)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT c.id, c.content, c.parent_comment_id, c.created_at, c.user_id,
                            (SELECT COUNT(*) FROM engagements e
                              WHERE e.comment_id = c.id AND e.kind = 'LIKE') AS like_count,
                            EXISTS(SELECT 1 FROM engagements e
                              WHERE e.comment_id = c.id AND e.user_id = ? AND e.kind = 'LIKE') AS is_liked
                     FROM comments c
                     WHERE c.post_id = ? AND c.parent_comment_id IS NULL
                       AND NOT EXISTS (SELECT 1 FROM deletions d WHERE d.comment_id = c.id)
                     ORDER BY c.created_at DESC, c.id DESC",
                )
                .bind(viewer)
                .bind(post_id)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut comments = Vec::with_capacity(rows.len());
        for row in rows {
            let author_id: i64 = row.get("user_id");
            let user = self
                .db
                .user_summary(author_id)
                .await?
                .ok_or_else(|| AppError::Internal("comment author missing".to_string()))?;
            comments.push(CommentView {
                id: id_of(row.get("id")),
                content: row.get("content"),
                user: UserSummaryView::from(user),
                parent_comment_id: row
                    .get::<Option<i64>, _>("parent_comment_id")
                    .map(|id| id.to_string()),
                like_count: row.get("like_count"),
                is_liked: viewer_id.is_some() && row.get::<i64, _>("is_liked") != 0,
                created_at: iso_timestamp(row.get("created_at")),
            });
        }
        Ok(comments)
    }

    pub async fn delete_comment(&self, comment_id: i64, user_id: i64) -> AppResult<()> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        if comment.user_id != user_id {
            return Err(AppError::Forbidden(
                "Only the author can delete a comment".to_string(),
            ));
        }

        let already = sqlx::query("SELECT 1 FROM deletions WHERE comment_id = ? LIMIT 1")
            .bind(comment_id)
            .fetch_optional(self.db.pool())
            .await?;
        if already.is_some() {
            return Err(AppError::Validation("Comment already deleted".to_string()));
        }

        sqlx::query(
            "INSERT INTO deletions (id, user_id, post_id, comment_id, created_at)
             VALUES (?, ?, NULL, ?, ?)",
        )
        .bind(self.ids.next_id())
        .bind(user_id)
        .bind(comment_id)
        .bind(now_millis())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    pub async fn edit_comment(
        &self,
        comment_id: i64,
        user_id: i64,
        content: &str,
    ) -> AppResult<()> {
        if content.trim().is_empty() {
            return Err(AppError::Validation(
                "Required fields are missing".to_string(),
            ));
        }
        let result = sqlx::query("UPDATE comments SET content = ? WHERE id = ? AND user_id = ?")
            .bind(content.trim())
            .bind(comment_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }
        Ok(())
    }

    // ---- reports ---------------------------------------------------------

    pub async fn report(
        &self,
        post_id: Option<i64>,
        comment_id: Option<i64>,
        reported_user_id: i64,
        reason: &str,
    ) -> AppResult<()> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation(
                "Required fields are missing".to_string(),
            ));
        }

        sqlx::query(
            "INSERT INTO reports (id, reason, reported_user_id, post_id, comment_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(self.ids.next_id())
        .bind(reason.trim())
        .bind(reported_user_id)
        .bind(post_id)
        .bind(comment_id)
        .bind(now_millis())
        .execute(self.db.pool())
        .await?;

        self.notifier
            .emit(
                NewNotification::system(NotificationKind::Report, reported_user_id)
                    .with_post(post_id)
                    .with_comment(comment_id),
            )
            .await?;
        Ok(())
    }

    // ---- feeds -----------------------------------------------------------

    /// A user's own posts, newest first.
    pub async fn get_user_posts(&self, user_id: i64) -> AppResult<Vec<PostView>> {
        let rows = sqlx::query(
            "SELECT p.*,
                    (SELECT COUNT(*) FROM engagements e
                      WHERE e.post_id = p.id AND e.comment_id IS NULL AND e.kind = 'LIKE') AS like_count,
                    (SELECT COUNT(*) FROM comments c
                      WHERE c.post_id = p.id AND c.parent_comment_id IS NULL) AS comment_count
             FROM posts p
             WHERE p.user_id = ? AND p.is_deleted = 0
             ORDER BY p.created_at DESC, p.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in rows {
            let ranked = RankedPost {
                row: map_post_row(&row),
                like_count: row.get("like_count"),
                comment_count: row.get("comment_count"),
            };
            posts.push(self.build_view(ranked, Some(user_id), true).await?);
        }
        Ok(posts)
    }

    /// Trending feed with a page size of 5; one extra row detects whether a
    /// next page exists; the returned cursor is the id of the last post.
    pub async fn get_trending(
        &self,
        last_post_id: Option<i64>,
        viewer_id: Option<i64>,
        mode: FeedMode,
    ) -> AppResult<TrendingPage> {
        let mut ranked = self
            .fetch_ranked(mode, last_post_id, FEED_PAGE_SIZE + 1)
            .await?;

        let has_next_page = ranked.len() as i64 > FEED_PAGE_SIZE;
        if has_next_page {
            ranked.truncate(FEED_PAGE_SIZE as usize);
        }

        let next_cursor = if has_next_page {
            ranked.last().map(|p| p.row.id.to_string())
        } else {
            None
        };

        let mut posts = Vec::with_capacity(ranked.len());
        for post in ranked {
            posts.push(self.build_view(post, viewer_id, false).await?);
        }

        Ok(TrendingPage {
            posts,
            has_next_page,
            next_cursor,
        })
    }

    async fn fetch_ranked(
        &self,
        mode: FeedMode,
        cursor: Option<i64>,
        limit: i64,
    ) -> AppResult<Vec<RankedPost>> {
        // Resolve the cursor post to its rank tuple; a stale cursor (post
        // since hard-deleted) restarts from the top of the feed.
        let anchor = match cursor {
            Some(id) => match self.db.get_post(id).await? {
                Some(post) => Some(RankedPost {
                    like_count: self.db.post_like_count(post.id).await?,
                    comment_count: self.db.post_comment_count(post.id).await?,
                    row: post,
                }),
                None => None,
            },
            None => None,
        };

        let window_start = now_millis() - TRENDING_WINDOW_MILLIS;

        let rows = match (mode, &anchor) {
            (FeedMode::Top, None) => {
                sqlx::query(
                    "SELECT * FROM (
                        SELECT p.*,
                               (SELECT COUNT(*) FROM engagements e
                                 WHERE e.post_id = p.id AND e.comment_id IS NULL AND e.kind = 'LIKE') AS like_count,
                               (SELECT COUNT(*) FROM comments c
                                 WHERE c.post_id = p.id AND c.parent_comment_id IS NULL) AS comment_count
                        FROM posts p
                        WHERE p.is_deleted = 0 AND p.created_at >= ?
                     ) ranked
                     ORDER BY like_count DESC, comment_count DESC, id DESC
                     LIMIT ?",
                )
                .bind(window_start)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            (FeedMode::Top, Some(anchor)) => {
                sqlx::query(
                    "SELECT * FROM (
                        SELECT p.*,
                               (SELECT COUNT(*) FROM engagements e
                                 WHERE e.post_id = p.id AND e.comment_id IS NULL AND e.kind = 'LIKE') AS like_count,
                               (SELECT COUNT(*) FROM comments c
                                 WHERE c.post_id = p.id AND c.parent_comment_id IS NULL) AS comment_count
                        FROM posts p
                        WHERE p.is_deleted = 0 AND p.created_at >= ?
                     ) ranked
                     WHERE (like_count, comment_count, id) < (?, ?, ?)
                     ORDER BY like_count DESC, comment_count DESC, id DESC
                     LIMIT ?",
                )
                .bind(window_start)
                .bind(anchor.like_count)
                .bind(anchor.comment_count)
                .bind(anchor.row.id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            (FeedMode::New, None) => {
                sqlx::query(
                    "SELECT * FROM (
                        SELECT p.*,
                               (SELECT COUNT(*) FROM engagements e
                                 WHERE e.post_id = p.id AND e.comment_id IS NULL AND e.kind = 'LIKE') AS like_count,
                               (SELECT COUNT(*) FROM comments c
                                 WHERE c.post_id = p.id AND c.parent_comment_id IS NULL) AS comment_count
                        FROM posts p
                        WHERE p.is_deleted = 0
                     ) ranked
                     ORDER BY created_at DESC, like_count DESC, comment_count DESC, id DESC
                     LIMIT ?",
                )
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            (FeedMode::New, Some(anchor)) => {
                sqlx::query(
                    "SELECT * FROM (
                        SELECT p.*,
                               (SELECT COUNT(*) FROM engagements e
                                 WHERE e.post_id = p.id AND e.comment_id IS NULL AND e.kind = 'LIKE') AS like_count,
                               (SELECT COUNT(*) FROM comments c
                                 WHERE c.post_id = p.id AND c.parent_comment_id IS NULL) AS comment_count
                        FROM posts p
                        WHERE p.is_deleted = 0
                     ) ranked
                     WHERE (created_at, like_count, comment_count, id) < (?, ?, ?, ?)
                     ORDER BY created_at DESC, like_count DESC, comment_count DESC, id DESC
                     LIMIT ?",
                )
                .bind(anchor.row.created_at)
                .bind(anchor.like_count)
                .bind(anchor.comment_count)
                .bind(anchor.row.id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        Ok(rows
            .into_iter()
            .map(|row| RankedPost {
                like_count: row.get("like_count"),
                comment_count: row.get("comment_count"),
                row: map_post_row(&row),
            })
            .collect())
    }

    // ---- view assembly ---------------------------------------------------

    pub(crate) async fn author_view(
        &self,
        author_id: i64,
        viewer_id: Option<i64>,
        include_email: bool,
    ) -> AppResult<AuthorView> {
        let author = self
            .db
            .get_user(author_id)
            .await?
            .ok_or_else(|| AppError::Internal("post author missing".to_string()))?;

        let (is_followed, is_requested, follows_viewer) = match viewer_id {
            Some(viewer) => (
                self.db.follow_exists(viewer, author_id).await?,
                self.db
                    .pending_request_exists(
                        viewer,
                        author_id,
                        NotificationKind::FollowRequest,
                        None,
                    )
                    .await?,
                self.db.follow_exists(author_id, viewer).await?,
            ),
            None => (false, false, false),
        };

        Ok(AuthorView {
            id: id_of(author.id),
            name: author.name,
            img_url: author.img_url,
            email: if include_email {
                Some(author.email)
            } else {
                None
            },
            is_requested,
            is_followed_by_current_user: is_followed,
            follows_current_user: follows_viewer,
        })
    }

    async fn community_ref(
        &self,
        community_id: Option<i64>,
        viewer_id: Option<i64>,
    ) -> AppResult<Option<CommunityRefView>> {
        let community_id = match community_id {
            Some(id) => id,
            None => return Ok(None),
        };
        let community = match self.db.get_community(community_id).await? {
            Some(community) => community,
            None => return Ok(None),
        };

        let members_count: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM community_members WHERE community_id = ?",
        )
        .bind(community_id)
        .fetch_one(self.db.pool())
        .await?
        .get("n");

        let (is_member, is_requested) = match viewer_id {
            Some(viewer) => (
                self.db.membership_exists(viewer, community_id).await?,
                self.db
                    .pending_join_request_exists(viewer, community_id)
                    .await?,
            ),
            None => (false, false),
        };

        Ok(Some(CommunityRefView {
            id: id_of(community.id),
            name: community.name,
            description: community.description,
            img_url: community.img_url,
            members_count,
            is_community_member: is_member,
            is_requested,
        }))
    }

    async fn build_view(
        &self,
        ranked: RankedPost,
        viewer_id: Option<i64>,
        include_email: bool,
    ) -> AppResult<PostView> {
        let engagement = match viewer_id {
            Some(viewer) => self.db.viewer_engagement(ranked.row.id, viewer).await?,
            None => None,
        };

        Ok(PostView {
            id: id_of(ranked.row.id),
            title: ranked.row.title.clone(),
            body: ranked.row.body.clone(),
            img_urls: ranked.row.img_urls.clone(),
            created_at: iso_timestamp(ranked.row.created_at),
            community: self
                .community_ref(ranked.row.community_id, viewer_id)
                .await?,
            user: self
                .author_view(ranked.row.user_id, viewer_id, include_email)
                .await?,
            comments_count: ranked.comment_count,
            likes_count: ranked.like_count,
            is_liked: engagement == Some(EngagementKind::Like),
            is_disliked: engagement == Some(EngagementKind::Dislike),
        })
    }

    /// Shared by the community feed: page of a community's posts, newest
    /// first, keyset cursor on (created_at, id).
    pub async fn get_community_posts(
        &self,
        community_id: i64,
        viewer_id: i64,
        cursor: Option<i64>,
        limit: i64,
    ) -> AppResult<(Vec<PostView>, bool, Option<String>)> {
        let anchor = match cursor {
            Some(id) => self.db.get_post(id).await?,
            None => None,
        };

        let rows = match &anchor {
            Some(anchor) => {
                sqlx::query(
                    "SELECT p.*,
                            (SELECT COUNT(*) FROM engagements e
                              WHERE e.post_id = p.id AND e.comment_id IS NULL AND e.kind = 'LIKE') AS like_count,
                            (SELECT COUNT(*) FROM comments c
                              WHERE c.post_id = p.id AND c.parent_comment_id IS NULL) AS comment_count
                     FROM posts p
                     WHERE p.community_id = ? AND p.is_deleted = 0
                       AND (p.created_at, p.id) < (?, ?)
                     ORDER BY p.created_at DESC, p.id DESC
                     LIMIT ?",
                )
                .bind(community_id)
                .bind(anchor.created_at)
                .bind(anchor.id)
                .bind(limit + 1)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT p.*,
                            (SELECT COUNT(*) FROM engagements e
                              WHERE e.post_id = p.id AND e.comment_id IS NULL AND e.kind = 'LIKE') AS like_count,
                            (SELECT COUNT(*) FROM comments c
                              WHERE c.post_id = p.id AND c.parent_comment_id IS NULL) AS comment_count
                     FROM posts p
                     WHERE p.community_id = ? AND p.is_deleted = 0
                     ORDER BY p.created_at DESC, p.id DESC
                     LIMIT ?",
                )
                .bind(community_id)
                .bind(limit + 1)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let mut ranked: Vec<RankedPost> = rows
            .into_iter()
            .map(|row| RankedPost {
                like_count: row.get("like_count"),
                comment_count: row.get("comment_count"),
                row: map_post_row(&row),
            })
            .collect();

        let has_more = ranked.len() as i64 > limit;
        if has_more {
            ranked.truncate(limit as usize);
        }
        let next_cursor = if has_more {
            ranked.last().map(|p| p.row.id.to_string())
        } else {
            None
        };

        let mut posts = Vec::with_capacity(ranked.len());
        for post in ranked {
            posts.push(self.build_view(post, Some(viewer_id), false).await?);
        }
        Ok((posts, has_more, next_cursor))
    }
}
