// Response and input shapes for the GraphQL API. Mutations and queries fold
// service failures into `{success, message}` payloads instead of GraphQL
// errors, so every response carries those two fields.

use async_graphql::{InputObject, SimpleObject, ID};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::UserSummary;

/// Render a unix-millis timestamp as an ISO-8601 string for the API.
pub fn iso_timestamp(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

pub fn id_of(id: i64) -> ID {
    ID(id.to_string())
}

// ---- shared -------------------------------------------------------------

#[derive(SimpleObject, Clone, Debug)]
pub struct UserSummaryView {
    pub id: ID,
    pub name: String,
    pub img_url: Option<String>,
}

impl From<UserSummary> for UserSummaryView {
    fn from(summary: UserSummary) -> Self {
        Self {
            id: id_of(summary.id),
            name: summary.name,
            img_url: summary.img_url,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

// ---- user domain --------------------------------------------------------

/// Public slice of a user record (account lookups by email).
#[derive(SimpleObject, Clone, Debug)]
pub struct UserRecord {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub img_url: Option<String>,
    pub is_verified: bool,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct VerifiedState {
    pub id: ID,
    pub is_verified: bool,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub user: Option<VerifiedState>,
}

impl UserResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            user: None,
        }
    }
}

/// Profile header data: counts plus what the viewer's follow button shows.
#[derive(SimpleObject, Clone, Debug)]
pub struct Profile {
    pub id: ID,
    pub name: String,
    pub designation: Option<String>,
    pub img_url: Option<String>,
    pub account_type: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub posts_count: i64,
    pub follow_status: String,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct ProfileResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Vec<UserRecord>>,
    pub user: Option<Profile>,
}

impl ProfileResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            user: None,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct FollowEntry {
    pub id: ID,
    pub name: String,
    pub img_url: Option<String>,
    pub is_follow_back: bool,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct FollowListResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Vec<FollowEntry>>,
}

impl FollowListResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Result of a follow/unfollow or join/leave action: the label the button
/// should switch to.
#[derive(SimpleObject, Clone, Debug)]
pub struct FollowActionResponse {
    pub success: bool,
    pub message: String,
    pub status: Option<String>,
    pub community_name: Option<String>,
}

impl FollowActionResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            status: None,
            community_name: None,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct NotificationView {
    pub id: ID,
    #[graphql(name = "type")]
    pub kind: String,
    pub sender: Option<UserSummaryView>,
    pub receiver: Option<UserSummaryView>,
    pub status: String,
    pub created_at: String,
    pub post_id: Option<String>,
    pub community_id: Option<String>,
    pub comment_id: Option<String>,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct NotificationListResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Vec<NotificationView>>,
}

impl NotificationListResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct SearchHit {
    pub id: ID,
    pub name: String,
    pub img_url: Option<String>,
    pub designation: Option<String>,
    pub members_count: Option<i64>,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct SearchResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Vec<SearchHit>>,
    pub next_cursor: Option<String>,
}

impl SearchResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            next_cursor: None,
        }
    }
}

#[derive(InputObject, Debug)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub password: Option<String>,
    pub img_url: Option<String>,
    pub designation: Option<String>,
    pub account_type: Option<String>,
}

// ---- post domain --------------------------------------------------------

/// Post author plus the viewer-relative relationship flags the feed buttons
/// need.
#[derive(SimpleObject, Clone, Debug)]
pub struct AuthorView {
    pub id: ID,
    pub name: String,
    pub img_url: Option<String>,
    pub email: Option<String>,
    pub is_requested: bool,
    pub is_followed_by_current_user: bool,
    pub follows_current_user: bool,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CommunityRefView {
    pub id: ID,
    pub name: String,
    pub description: String,
    pub img_url: Option<String>,
    pub members_count: i64,
    pub is_community_member: bool,
    pub is_requested: bool,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct PostView {
    pub id: ID,
    pub title: String,
    pub body: String,
    pub img_urls: Vec<String>,
    pub created_at: String,
    pub community: Option<CommunityRefView>,
    pub user: AuthorView,
    pub comments_count: i64,
    pub likes_count: i64,
    pub is_liked: bool,
    pub is_disliked: bool,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct PostsResponse {
    pub success: bool,
    pub message: String,
    pub warn_ai: Option<String>,
    pub posts: Option<Vec<PostView>>,
    pub has_next_page: Option<bool>,
    pub next_cursor: Option<String>,
}

impl PostsResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            warn_ai: None,
            posts: None,
            has_next_page: None,
            next_cursor: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            warn_ai: None,
            posts: None,
            has_next_page: None,
            next_cursor: None,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CommentView {
    pub id: ID,
    pub content: String,
    pub user: UserSummaryView,
    pub parent_comment_id: Option<String>,
    pub like_count: i64,
    pub is_liked: bool,
    pub created_at: String,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CommentsResponse {
    pub success: bool,
    pub message: String,
    pub warn_ai: Option<String>,
    pub comments: Option<Vec<CommentView>>,
}

impl CommentsResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            warn_ai: None,
            comments: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            warn_ai: None,
            comments: None,
        }
    }
}

#[derive(InputObject, Debug)]
pub struct PostInput {
    pub title: String,
    pub body: String,
    pub community_id: Option<String>,
    pub user_id: String,
    pub img_urls: Option<Vec<String>>,
}

// ---- community domain ---------------------------------------------------

#[derive(SimpleObject, Clone, Debug)]
pub struct CommunityCreated {
    pub id: ID,
    pub owner_id: String,
    pub name: String,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CommunityDetail {
    pub id: ID,
    pub name: String,
    pub description: String,
    pub banner_url: Option<String>,
    pub img_url: Option<String>,
    pub community_type: String,
    pub owner_id: String,
    pub members_count: i64,
    pub posts_count: i64,
    /// Join | Requested | Joined, relative to the viewer.
    pub is_member: String,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CommunityDataResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<CommunityCreated>,
    pub community: Option<CommunityDetail>,
}

impl CommunityDataResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            community: None,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct MemberView {
    pub id: ID,
    pub name: String,
    pub img_url: Option<String>,
    pub follow_status: String,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CommunityFeedResponse {
    pub success: bool,
    pub message: String,
    pub posts: Option<Vec<PostView>>,
    pub members: Option<Vec<MemberView>>,
    pub next_cursor: Option<String>,
    pub has_more: Option<bool>,
}

impl CommunityFeedResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            posts: None,
            members: None,
            next_cursor: None,
            has_more: None,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CommunityCard {
    pub id: ID,
    pub name: String,
    /// Compact display form: "950", "1.2k", "3.4m".
    pub members_count: String,
    pub img_url: Option<String>,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CommunityListResponse {
    pub success: bool,
    pub message: String,
    pub communities: Option<Vec<CommunityCard>>,
}

impl CommunityListResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            communities: None,
        }
    }
}

#[derive(InputObject, Debug)]
pub struct CreateCommunityInput {
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub img_url: String,
}

#[derive(InputObject, Debug)]
pub struct UpdateCommunityInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub img_url: Option<String>,
    pub banner_url: Option<String>,
    pub community_type: Option<String>,
}

// ---- studio domain ------------------------------------------------------

#[derive(SimpleObject, Clone, Debug)]
pub struct CollectionDocument {
    pub id: ID,
    pub name: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub description: Option<String>,
    pub img_url: Option<String>,
    #[graphql(name = "type")]
    pub doc_type: Option<String>,
    pub created_at: Option<String>,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct StudioDocumentsResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Vec<CollectionDocument>>,
}

impl StudioDocumentsResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct StudioDocument {
    pub id: ID,
    pub name: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub img_url: Option<String>,
    pub img_urls: Option<Vec<String>>,
    pub owner: Option<UserSummaryView>,
    #[graphql(name = "type")]
    pub doc_type: String,
    pub is_reported: Option<bool>,
    pub is_deleted: Option<bool>,
    pub report_count: Option<i64>,
    pub created_at: Option<String>,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct StudioDocumentResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<StudioDocument>,
}

impl StudioDocumentResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(InputObject, Debug)]
pub struct StudioUpdateInput {
    pub id: ID,
    pub title: Option<String>,
    pub name: Option<String>,
    pub content: Option<String>,
    pub img_urls: Option<Vec<String>>,
    #[graphql(default)]
    pub is_deleted: bool,
}
