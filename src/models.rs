// Domain rows and enums shared across services. Enum values are stored as
// their wire strings in TEXT columns.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in milliseconds. All persisted timestamps use this.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// PUBLIC/PRIVATE gating shared by user accounts and communities. Private
/// targets turn follow/join into a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PUBLIC" => Some(Visibility::Public),
            "PRIVATE" => Some(Visibility::Private),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngagementKind {
    Like,
    Dislike,
}

impl EngagementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementKind::Like => "LIKE",
            EngagementKind::Dislike => "DISLIKE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LIKE" => Some(EngagementKind::Like),
            "DISLIKE" => Some(EngagementKind::Dislike),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    FollowRequest,
    Followed,
    JoinRequestCommunity,
    JoinedCommunity,
    LikePost,
    CommentPost,
    ProfileView,
    Report,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::FollowRequest => "FOLLOW_REQUEST",
            NotificationKind::Followed => "FOLLOWED",
            NotificationKind::JoinRequestCommunity => "JOIN_REQUEST_COMMUNITY",
            NotificationKind::JoinedCommunity => "JOINED_COMMUNITY",
            NotificationKind::LikePost => "LIKE_POST",
            NotificationKind::CommentPost => "COMMENT_POST",
            NotificationKind::ProfileView => "PROFILE_VIEW",
            NotificationKind::Report => "REPORT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    Unread,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unread => "UNREAD",
            NotificationStatus::Read => "READ",
        }
    }
}

/// What the viewer's follow button should show for a given user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowStatus {
    Follow,
    FollowBack,
    Requested,
    Following,
}

impl FollowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowStatus::Follow => "Follow",
            FollowStatus::FollowBack => "Follow Back",
            FollowStatus::Requested => "Requested",
            FollowStatus::Following => "Following",
        }
    }
}

/// What the viewer's join button should show for a given community.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Join,
    Requested,
    Joined,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Join => "Join",
            MembershipStatus::Requested => "Requested",
            MembershipStatus::Joined => "Joined",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub img_url: Option<String>,
    pub designation: Option<String>,
    pub account_type: Visibility,
    pub is_verified: bool,
    pub verification_code: Option<String>,
    pub verification_expires_at: Option<i64>,
    pub reset_code: Option<String>,
    pub reset_expires_at: Option<i64>,
    pub created_at: i64,
}

/// The id/name/avatar triple embedded in views and notification payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub img_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionRow {
    pub id: i64,
    pub user_id: i64,
    pub jti: String,
    pub token: String,
    pub device_id: String,
    pub user_agent: String,
    pub ip_address: String,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct CommunityRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: String,
    pub img_url: Option<String>,
    pub banner_url: Option<String>,
    pub community_type: Visibility,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: i64,
    pub user_id: i64,
    pub community_id: Option<i64>,
    pub title: String,
    pub body: String,
    pub img_urls: Vec<String>,
    pub is_deleted: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_comment_id: Option<i64>,
    pub content: String,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NotificationRow {
    pub id: i64,
    pub kind: String,
    pub sender_id: Option<i64>,
    pub receiver_id: i64,
    pub status: String,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub community_id: Option<i64>,
    pub created_at: i64,
}

/// Input for a notification write; the fan-out service fills in id, status
/// and timestamps.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub sender_id: Option<i64>,
    pub receiver_id: i64,
    pub post_id: Option<i64>,
    pub comment_id: Option<i64>,
    pub community_id: Option<i64>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, sender_id: i64, receiver_id: i64) -> Self {
        Self {
            kind,
            sender_id: Some(sender_id),
            receiver_id,
            post_id: None,
            comment_id: None,
            community_id: None,
        }
    }

    /// System-originated notification with no sender (reports).
    pub fn system(kind: NotificationKind, receiver_id: i64) -> Self {
        Self {
            kind,
            sender_id: None,
            receiver_id,
            post_id: None,
            comment_id: None,
            community_id: None,
        }
    }

    pub fn with_post(mut self, post_id: Option<i64>) -> Self {
        self.post_id = post_id;
        self
    }

    pub fn with_comment(mut self, comment_id: Option<i64>) -> Self {
        self.comment_id = comment_id;
        self
    }

    pub fn with_community(mut self, community_id: Option<i64>) -> Self {
        self.community_id = community_id;
        self
    }
}

/// Compact display form for large counts: 950 -> "950", 1200 -> "1.2k",
/// 3_400_000 -> "3.4m".
pub fn format_count(value: i64) -> String {
    if value < 1_000 {
        value.to_string()
    } else if value < 1_000_000 {
        format!("{:.1}k", value as f64 / 1_000.0)
    } else {
        format!("{:.1}m", value as f64 / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_200), "1.2k");
        assert_eq!(format_count(999_999), "1000.0k");
        assert_eq!(format_count(3_400_000), "3.4m");
    }

    #[test]
    fn test_visibility_round_trip() {
        assert_eq!(Visibility::parse("PUBLIC"), Some(Visibility::Public));
        assert_eq!(Visibility::parse("PRIVATE"), Some(Visibility::Private));
        assert_eq!(Visibility::parse("banana"), None);
        assert_eq!(Visibility::Private.as_str(), "PRIVATE");
    }

    #[test]
    fn test_follow_status_labels() {
        assert_eq!(FollowStatus::FollowBack.as_str(), "Follow Back");
        assert_eq!(MembershipStatus::Joined.as_str(), "Joined");
    }
}
