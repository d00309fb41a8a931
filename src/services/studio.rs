// Studio: the owner-facing content-management view over posts, comments,
// communities and engagements, including report counts and deletion state.

use sqlx::Row;
use std::sync::Arc;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::graphql::types::{
    id_of, iso_timestamp, CollectionDocument, StudioDocument, UserSummaryView,
};
use crate::id_gen::IdGenerator;
use crate::models::now_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Post,
    Comment,
    Community,
    Engage,
}

impl Collection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post" => Some(Collection::Post),
            "comment" => Some(Collection::Comment),
            "community" => Some(Collection::Community),
            "engage" => Some(Collection::Engage),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct StudioUpdate {
    pub id: i64,
    pub title: Option<String>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub img_urls: Option<Vec<String>>,
    pub is_deleted: bool,
}

pub struct StudioService {
    db: Arc<Database>,
    ids: Arc<IdGenerator>,
}

impl StudioService {
    pub fn new(db: Arc<Database>, ids: Arc<IdGenerator>) -> Self {
        Self { db, ids }
    }

    pub async fn get_documents(
        &self,
        collection: Collection,
        user_id: i64,
    ) -> AppResult<Vec<CollectionDocument>> {
        match collection {
            Collection::Post => {
                // The studio lists posts without a deletions marker; the
                // post's own is_deleted flag is deliberately not consulted.
                let rows = sqlx::query(
                    "SELECT id, title, body, img_urls, created_at FROM posts p
                     WHERE p.user_id = ?
                       AND NOT EXISTS (SELECT 1 FROM deletions d WHERE d.post_id = p.id)
                     ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(self.db.pool())
                .await?;

                Ok(rows
                    .into_iter()
                    .map(|row| {
                        let img_urls: Vec<String> =
                            serde_json::from_str(row.get::<String, _>("img_urls").as_str())
                                .unwrap_or_default();
                        CollectionDocument {
                            id: id_of(row.get("id")),
                            name: None,
                            title: Some(row.get("title")),
                            content: Some(row.get("body")),
                            description: None,
                            img_url: img_urls.into_iter().next(),
                            doc_type: Some("post".to_string()),
                            created_at: Some(iso_timestamp(row.get("created_at"))),
                        }
                    })
                    .collect())
            }
            Collection::Comment => {
                let rows = sqlx::query(
                    "SELECT id, content, created_at FROM comments c
                     WHERE c.user_id = ?
                       AND NOT EXISTS (SELECT 1 FROM deletions d WHERE d.comment_id = c.id)
                     ORDER BY created_at DESC",
                )
                .bind(user_id)
                .fetch_all(self.db.pool())
                .await?;

                Ok(rows
                    .into_iter()
                    .map(|row| CollectionDocument {
                        id: id_of(row.get("id")),
                        name: None,
                        title: None,
                        content: Some(row.get("content")),
                        description: None,
                        img_url: None,
                        doc_type: Some("comment".to_string()),
                        created_at: Some(iso_timestamp(row.get("created_at"))),
                    })
                    .collect())
            }
            Collection::Community => {
                let rows = sqlx::query(
                    "SELECT c.id, c.name, c.description, c.img_url, c.created_at
                     FROM communities c
                     JOIN community_members m ON m.community_id = c.id
                     WHERE m.user_id = ?
                     ORDER BY c.created_at DESC",
                )
                .bind(user_id)
                .fetch_all(self.db.pool())
                .await?;

                Ok(rows
                    .into_iter()
                    .map(|row| CollectionDocument {
                        id: id_of(row.get("id")),
                        name: Some(row.get("name")),
                        title: None,
                        content: None,
                        description: Some(row.get("description")),
                        img_url: row.get("img_url"),
                        doc_type: Some("community".to_string()),
                        created_at: Some(iso_timestamp(row.get("created_at"))),
                    })
                    .collect())
            }
            Collection::Engage => {
                let rows = sqlx::query(
                    "SELECT e.comment_id, e.post_id,
                            p.title AS post_title, p.body AS post_body,
                            p.img_urls AS post_img_urls, p.created_at AS post_created_at,
                            c.content AS comment_content, c.created_at AS comment_created_at
                     FROM engagements e
                     LEFT JOIN posts p ON p.id = e.post_id
                     LEFT JOIN comments c ON c.id = e.comment_id
                     WHERE e.user_id = ?
                     ORDER BY e.created_at DESC",
                )
                .bind(user_id)
                .fetch_all(self.db.pool())
                .await?;

                Ok(rows
                    .into_iter()
                    .map(|row| {
                        let comment_id: Option<i64> = row.get("comment_id");
                        match comment_id {
                            Some(id) => CollectionDocument {
                                id: id_of(id),
                                name: None,
                                title: None,
                                content: row.get("comment_content"),
                                description: None,
                                img_url: None,
                                doc_type: Some("comment".to_string()),
                                created_at: row
                                    .get::<Option<i64>, _>("comment_created_at")
                                    .map(iso_timestamp),
                            },
                            None => {
                                let img_urls: Vec<String> = row
                                    .get::<Option<String>, _>("post_img_urls")
                                    .and_then(|s| serde_json::from_str(&s).ok())
                                    .unwrap_or_default();
                                CollectionDocument {
                                    id: id_of(row.get("post_id")),
                                    name: None,
                                    title: row.get("post_title"),
                                    content: row.get("post_body"),
                                    description: None,
                                    img_url: img_urls.into_iter().next(),
                                    doc_type: Some("post".to_string()),
                                    created_at: row
                                        .get::<Option<i64>, _>("post_created_at")
                                        .map(iso_timestamp),
                                }
                            }
                        }
                    })
                    .collect())
            }
        }
    }

    pub async fn get_document_by_id(
        &self,
        collection: Collection,
        user_id: i64,
        document_id: i64,
    ) -> AppResult<Option<StudioDocument>> {
        match collection {
            Collection::Post => {
                let row = sqlx::query(
                    "SELECT p.*,
                            (SELECT COUNT(*) FROM reports r WHERE r.post_id = p.id) AS report_count,
                            EXISTS(SELECT 1 FROM deletions d WHERE d.post_id = p.id) AS has_deletion
                     FROM posts p
                     WHERE p.id = ? AND p.user_id = ?",
                )
                .bind(document_id)
                .bind(user_id)
                .fetch_optional(self.db.pool())
                .await?;

                Ok(row.map(|row| {
                    let img_urls: Vec<String> =
                        serde_json::from_str(row.get::<String, _>("img_urls").as_str())
                            .unwrap_or_default();
                    let report_count: i64 = row.get("report_count");
                    StudioDocument {
                        id: id_of(row.get("id")),
                        name: None,
                        title: Some(row.get("title")),
                        content: Some(row.get("body")),
                        img_url: None,
                        img_urls: Some(img_urls),
                        owner: None,
                        doc_type: "post".to_string(),
                        is_reported: Some(report_count > 0),
                        is_deleted: Some(row.get::<i64, _>("has_deletion") != 0),
                        report_count: Some(report_count),
                        created_at: Some(iso_timestamp(row.get("created_at"))),
                    }
                }))
            }
            Collection::Comment => {
                let row = sqlx::query(
                    "SELECT c.*, u.id AS owner_id, u.name AS owner_name, u.img_url AS owner_img,
                            (SELECT COUNT(*) FROM reports r WHERE r.comment_id = c.id) AS report_count,
                            EXISTS(SELECT 1 FROM deletions d WHERE d.comment_id = c.id) AS has_deletion
                     FROM comments c
                     JOIN users u ON u.id = c.user_id
                     WHERE c.id = ?",
                )
                .bind(document_id)
                .fetch_optional(self.db.pool())
                .await?;

                Ok(row.map(|row| {
                    let report_count: i64 = row.get("report_count");
                    StudioDocument {
                        id: id_of(row.get("id")),
                        name: None,
                        title: None,
                        content: Some(row.get("content")),
                        img_url: None,
                        img_urls: None,
                        owner: Some(UserSummaryView {
                            id: id_of(row.get("owner_id")),
                            name: row.get("owner_name"),
                            img_url: row.get("owner_img"),
                        }),
                        doc_type: "comment".to_string(),
                        is_reported: Some(report_count > 0),
                        is_deleted: Some(row.get::<i64, _>("has_deletion") != 0),
                        report_count: Some(report_count),
                        created_at: Some(iso_timestamp(row.get("created_at"))),
                    }
                }))
            }
            Collection::Community => {
                let row = sqlx::query(
                    "SELECT c.*, u.id AS owner_id, u.name AS owner_name, u.img_url AS owner_img
                     FROM communities c
                     JOIN users u ON u.id = c.owner_id
                     WHERE c.id = ?",
                )
                .bind(document_id)
                .fetch_optional(self.db.pool())
                .await?;

                Ok(row.map(|row| StudioDocument {
                    id: id_of(row.get("id")),
                    name: Some(row.get("name")),
                    title: None,
                    content: Some(row.get("description")),
                    img_url: row.get("img_url"),
                    img_urls: None,
                    owner: Some(UserSummaryView {
                        id: id_of(row.get("owner_id")),
                        name: row.get("owner_name"),
                        img_url: row.get("owner_img"),
                    }),
                    doc_type: "community".to_string(),
                    is_reported: None,
                    is_deleted: None,
                    report_count: None,
                    created_at: Some(iso_timestamp(row.get("created_at"))),
                }))
            }
            Collection::Engage => Err(AppError::Validation(
                "No collection exists".to_string(),
            )),
        }
    }

    /// Edit or soft-delete a document from the studio. Soft deletion writes
    /// the deletions marker; restoring clears the entity flag but never
    /// removes an existing marker.
    pub async fn update_document(
        &self,
        collection: Collection,
        user_id: i64,
        update: StudioUpdate,
    ) -> AppResult<()> {
        match collection {
            Collection::Post => {
                let post = self
                    .db
                    .get_post(update.id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

                let img_urls = update.img_urls.unwrap_or(post.img_urls);
                sqlx::query(
                    "UPDATE posts SET title = ?, body = ?, img_urls = ?, is_deleted = ?
                     WHERE id = ?",
                )
                .bind(update.title.unwrap_or(post.title))
                .bind(update.content.unwrap_or(post.body))
                .bind(serde_json::to_string(&img_urls).unwrap_or_else(|_| "[]".to_string()))
                .bind(update.is_deleted as i64)
                .bind(update.id)
                .execute(self.db.pool())
                .await?;

                if update.is_deleted {
                    sqlx::query(
                        "INSERT INTO deletions (id, user_id, post_id, comment_id, created_at)
                         VALUES (?, ?, ?, NULL, ?)",
                    )
                    .bind(self.ids.next_id())
                    .bind(user_id)
                    .bind(update.id)
                    .bind(now_millis())
                    .execute(self.db.pool())
                    .await?;
                }
                Ok(())
            }
            Collection::Comment => {
                let comment = self
                    .db
                    .get_comment(update.id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

                sqlx::query("UPDATE comments SET content = ? WHERE id = ?")
                    .bind(update.content.unwrap_or(comment.content))
                    .bind(update.id)
                    .execute(self.db.pool())
                    .await?;

                if update.is_deleted {
                    sqlx::query(
                        "INSERT INTO deletions (id, user_id, post_id, comment_id, created_at)
                         VALUES (?, ?, NULL, ?, ?)",
                    )
                    .bind(self.ids.next_id())
                    .bind(user_id)
                    .bind(update.id)
                    .bind(now_millis())
                    .execute(self.db.pool())
                    .await?;
                }
                Ok(())
            }
            Collection::Community => {
                let community = self
                    .db
                    .get_community(update.id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Community not found".to_string()))?;

                sqlx::query("UPDATE communities SET name = ?, description = ? WHERE id = ?")
                    .bind(update.name.unwrap_or(community.name))
                    .bind(update.content.unwrap_or(community.description))
                    .bind(update.id)
                    .execute(self.db.pool())
                    .await?;
                Ok(())
            }
            Collection::Engage => Err(AppError::Validation(
                "No collection exists".to_string(),
            )),
        }
    }
}
