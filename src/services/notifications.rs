// Notification fan-out: the relational row is the authoritative write, the
// realtime push is a best-effort denormalized copy. The two writes are
// deliberately not transactional.

use std::sync::Arc;

use crate::db::{map_notification_row, Database};
use crate::error::{AppError, AppResult};
use crate::id_gen::IdGenerator;
use crate::integrations::realtime::{RealtimeNotification, RealtimePublisher};
use crate::models::{now_millis, NewNotification, NotificationRow, NotificationStatus, UserSummary};

/// A notification row joined with its sender/receiver summaries, ready for
/// the inbox or the realtime channel.
#[derive(Debug, Clone)]
pub struct InboxEntry {
    pub row: NotificationRow,
    pub sender: Option<UserSummary>,
    pub receiver: Option<UserSummary>,
}

pub struct Notifier {
    db: Arc<Database>,
    ids: Arc<IdGenerator>,
    realtime: Arc<dyn RealtimePublisher>,
}

impl Notifier {
    pub fn new(
        db: Arc<Database>,
        ids: Arc<IdGenerator>,
        realtime: Arc<dyn RealtimePublisher>,
    ) -> Self {
        Self { db, ids, realtime }
    }

    /// Write the authoritative row, then push the denormalized copy to the
    /// realtime channel. Push failures are logged and never fail the caller.
    pub async fn emit(&self, input: NewNotification) -> AppResult<NotificationRow> {
        let id = self.ids.next_id();
        let now = now_millis();

        sqlx::query(
            "INSERT INTO notifications
               (id, kind, sender_id, receiver_id, status, post_id, comment_id, community_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(input.kind.as_str())
        .bind(input.sender_id)
        .bind(input.receiver_id)
        .bind(NotificationStatus::Unread.as_str())
        .bind(input.post_id)
        .bind(input.comment_id)
        .bind(input.community_id)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        let row = NotificationRow {
            id,
            kind: input.kind.as_str().to_string(),
            sender_id: input.sender_id,
            receiver_id: input.receiver_id,
            status: NotificationStatus::Unread.as_str().to_string(),
            post_id: input.post_id,
            comment_id: input.comment_id,
            community_id: input.community_id,
            created_at: now,
        };

        self.push_realtime(&row).await;
        Ok(row)
    }

    async fn push_realtime(&self, row: &NotificationRow) {
        let sender = match row.sender_id {
            Some(id) => self.db.user_summary(id).await.ok().flatten(),
            None => None,
        };
        let receiver = match self.db.user_summary(row.receiver_id).await {
            Ok(Some(summary)) => summary,
            _ => return,
        };

        let payload = RealtimeNotification {
            id: row.id.to_string(),
            kind: row.kind.clone(),
            status: row.status.clone(),
            sender,
            receiver,
            post_id: row.post_id.map(|id| id.to_string()),
            comment_id: row.comment_id.map(|id| id.to_string()),
            community_id: row.community_id.map(|id| id.to_string()),
            created_at: row.created_at,
        };

        if let Err(err) = self.realtime.push(row.receiver_id, &payload).await {
            tracing::warn!("realtime notification push failed: {}", err);
        }
    }

    pub async fn get(&self, id: i64) -> AppResult<Option<NotificationRow>> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|r| map_notification_row(&r)))
    }

    /// Inbox listing: newest first, self-sent rows excluded.
    pub async fn list_for(&self, user_id: i64) -> AppResult<Vec<InboxEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM notifications
             WHERE receiver_id = ? AND (sender_id IS NULL OR sender_id != ?)
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let row = map_notification_row(&row);
            let sender = match row.sender_id {
                Some(id) => self.db.user_summary(id).await?,
                None => None,
            };
            let receiver = self.db.user_summary(row.receiver_id).await?;
            entries.push(InboxEntry {
                row,
                sender,
                receiver,
            });
        }
        Ok(entries)
    }

    /// Notifications are deleted outright once acted upon.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Notification {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Drop every pending follow request addressed to a user (account made
    /// public).
    pub async fn purge_follow_requests(&self, receiver_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE receiver_id = ? AND kind = 'FOLLOW_REQUEST'",
        )
        .bind(receiver_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected())
    }

    /// Drop every pending join request for a community (community made
    /// public).
    pub async fn purge_join_requests(&self, community_id: i64, receiver_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications
             WHERE community_id = ? AND receiver_id = ? AND kind = 'JOIN_REQUEST_COMMUNITY'",
        )
        .bind(community_id)
        .bind(receiver_id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected())
    }
}
