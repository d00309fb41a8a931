use async_graphql::{Context, Object, Result as GqlResult, ID};
use std::sync::Arc;

use crate::app_state::Services;
use crate::error::{AppError, AppResult};
use crate::graphql::types::*;
use crate::services::posts::FeedMode;
use crate::services::studio::Collection;

pub fn parse_id(value: &str) -> AppResult<i64> {
    value
        .parse()
        .map_err(|_| AppError::BadRequest(format!("malformed id: {}", value)))
}

fn parse_opt_id(value: &Option<String>) -> AppResult<Option<i64>> {
    value.as_deref().map(parse_id).transpose()
}

/// Root query object. Every resolver delegates to a service and folds
/// failures into a `{success:false, message}` payload.
pub struct Query;

#[Object]
impl Query {
    async fn list_user_by_email(
        &self,
        ctx: &Context<'_>,
        email: String,
    ) -> GqlResult<ProfileResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        Ok(match services.users.list_by_email(&email).await {
            Ok(users) => ProfileResponse {
                success: true,
                message: "Users fetched.".to_string(),
                data: Some(
                    users
                        .into_iter()
                        .map(|user| UserRecord {
                            id: id_of(user.id),
                            name: user.name,
                            email: user.email,
                            img_url: user.img_url,
                            is_verified: user.is_verified,
                        })
                        .collect(),
                ),
                user: None,
            },
            Err(err) => ProfileResponse::failure(err.client_message()),
        })
    }

    async fn get_user(
        &self,
        ctx: &Context<'_>,
        user_id: String,
        logged_in_user_id: String,
    ) -> GqlResult<ProfileResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&user_id)?;
            let viewer_id = parse_id(&logged_in_user_id)?;
            services.users.get_profile(user_id, viewer_id).await
        }
        .await;

        Ok(match result {
            Ok(profile) => ProfileResponse {
                success: true,
                message: "User fetched successfully.".to_string(),
                data: None,
                user: Some(profile),
            },
            Err(err) => ProfileResponse::failure(err.client_message()),
        })
    }

    async fn get_followers(
        &self,
        ctx: &Context<'_>,
        user_id: String,
    ) -> GqlResult<FollowListResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&user_id)?;
            services.users.get_followers(user_id).await
        }
        .await;

        Ok(match result {
            Ok(data) => FollowListResponse {
                success: true,
                message: "Followers fetched successfully.".to_string(),
                data: Some(data),
            },
            Err(err) => FollowListResponse::failure(err.client_message()),
        })
    }

    async fn get_followings(
        &self,
        ctx: &Context<'_>,
        user_id: String,
    ) -> GqlResult<FollowListResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&user_id)?;
            services.users.get_followings(user_id).await
        }
        .await;

        Ok(match result {
            Ok(data) => FollowListResponse {
                success: true,
                message: "Followings fetched successfully.".to_string(),
                data: Some(data),
            },
            Err(err) => FollowListResponse::failure(err.client_message()),
        })
    }

    async fn get_notifications(
        &self,
        ctx: &Context<'_>,
        logged_in_user_id: ID,
    ) -> GqlResult<NotificationListResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&logged_in_user_id)?;
            services.notifier.list_for(user_id).await
        }
        .await;

        Ok(match result {
            Ok(entries) => NotificationListResponse {
                success: true,
                message: "Fetched notifications".to_string(),
                data: Some(
                    entries
                        .into_iter()
                        .map(|entry| NotificationView {
                            id: id_of(entry.row.id),
                            kind: entry.row.kind,
                            sender: entry.sender.map(UserSummaryView::from),
                            receiver: entry.receiver.map(UserSummaryView::from),
                            status: entry.row.status,
                            created_at: iso_timestamp(entry.row.created_at),
                            post_id: entry.row.post_id.map(|id| id.to_string()),
                            community_id: entry.row.community_id.map(|id| id.to_string()),
                            comment_id: entry.row.comment_id.map(|id| id.to_string()),
                        })
                        .collect(),
                ),
            },
            Err(err) => NotificationListResponse::failure(err.client_message()),
        })
    }

    async fn handle_search(
        &self,
        ctx: &Context<'_>,
        query: String,
        search_type: String,
        cursor: Option<String>,
    ) -> GqlResult<SearchResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let cursor = parse_opt_id(&cursor)?;
            services.users.search(&query, &search_type, cursor).await
        }
        .await;

        Ok(match result {
            Ok((data, next_cursor)) => SearchResponse {
                success: true,
                message: "Fetched query result".to_string(),
                data: Some(data),
                next_cursor,
            },
            Err(err) => SearchResponse::failure(err.client_message()),
        })
    }

    // ---- community domain -----------------------------------------------

    async fn get_community_data(
        &self,
        ctx: &Context<'_>,
        community_id: String,
        logged_in_user_id: String,
    ) -> GqlResult<CommunityDataResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let community_id = parse_id(&community_id)?;
            let viewer_id = parse_id(&logged_in_user_id)?;
            services.communities.get_detail(community_id, viewer_id).await
        }
        .await;

        Ok(match result {
            Ok(detail) => CommunityDataResponse {
                success: true,
                message: "Community fetched successfully".to_string(),
                data: None,
                community: Some(detail),
            },
            Err(err) => CommunityDataResponse::failure(err.client_message()),
        })
    }

    async fn get_community_posts(
        &self,
        ctx: &Context<'_>,
        community_id: String,
        logged_in_user_id: String,
        cursor: Option<String>,
        limit: Option<i32>,
    ) -> GqlResult<CommunityFeedResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let community_id = parse_id(&community_id)?;
            let viewer_id = parse_id(&logged_in_user_id)?;
            let cursor = parse_opt_id(&cursor)?;
            let limit = i64::from(limit.unwrap_or(10)).clamp(1, 50);
            services
                .posts
                .get_community_posts(community_id, viewer_id, cursor, limit)
                .await
        }
        .await;

        Ok(match result {
            Ok((posts, has_more, next_cursor)) => CommunityFeedResponse {
                success: true,
                message: "Posts fetched successfully".to_string(),
                posts: Some(posts),
                members: None,
                next_cursor,
                has_more: Some(has_more),
            },
            Err(err) => CommunityFeedResponse::failure(err.client_message()),
        })
    }

    async fn get_community_members(
        &self,
        ctx: &Context<'_>,
        community_id: String,
        logged_in_user_id: String,
    ) -> GqlResult<CommunityFeedResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let community_id = parse_id(&community_id)?;
            let viewer_id = parse_id(&logged_in_user_id)?;
            services.communities.get_members(community_id, viewer_id).await
        }
        .await;

        Ok(match result {
            Ok(members) => CommunityFeedResponse {
                success: true,
                message: "Community members fetched successfully".to_string(),
                posts: None,
                members: Some(members),
                next_cursor: None,
                has_more: None,
            },
            Err(err) => CommunityFeedResponse::failure(err.client_message()),
        })
    }

    async fn get_top_communities(
        &self,
        ctx: &Context<'_>,
        logged_in_user_id: String,
    ) -> GqlResult<CommunityListResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let viewer_id = parse_id(&logged_in_user_id)?;
            services.communities.top_communities(viewer_id).await
        }
        .await;

        Ok(match result {
            Ok(communities) => CommunityListResponse {
                success: true,
                message: "Most active communities fetched successfully".to_string(),
                communities: Some(communities),
            },
            Err(err) => CommunityListResponse::failure(err.client_message()),
        })
    }

    // ---- post domain ------------------------------------------------------

    async fn get_user_posts(
        &self,
        ctx: &Context<'_>,
        user_id: String,
    ) -> GqlResult<PostsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&user_id)?;
            services.posts.get_user_posts(user_id).await
        }
        .await;

        Ok(match result {
            Ok(posts) => PostsResponse {
                posts: Some(posts),
                ..PostsResponse::ok("Posts fetched successfully")
            },
            Err(err) => PostsResponse::failure(err.client_message()),
        })
    }

    async fn get_comments(
        &self,
        ctx: &Context<'_>,
        post_id: String,
        user_id: Option<String>,
        parent_comment_id: Option<String>,
    ) -> GqlResult<CommentsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let post_id = parse_id(&post_id)?;
            let viewer_id = parse_opt_id(&user_id)?;
            let parent_id = parse_opt_id(&parent_comment_id)?;
            services.posts.get_comments(post_id, viewer_id, parent_id).await
        }
        .await;

        Ok(match result {
            Ok(comments) => CommentsResponse {
                comments: Some(comments),
                ..CommentsResponse::ok("Comments fetched successfully")
            },
            Err(err) => CommentsResponse::failure(err.client_message()),
        })
    }

    async fn get_trending_posts(
        &self,
        ctx: &Context<'_>,
        last_post_id: Option<String>,
        user_id: Option<String>,
        #[graphql(name = "type")] feed_type: Option<String>,
    ) -> GqlResult<PostsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let cursor = parse_opt_id(&last_post_id)?;
            let viewer_id = parse_opt_id(&user_id)?;
            let mode = FeedMode::parse(feed_type.as_deref());
            services.posts.get_trending(cursor, viewer_id, mode).await
        }
        .await;

        Ok(match result {
            Ok(page) => PostsResponse {
                posts: Some(page.posts),
                has_next_page: Some(page.has_next_page),
                next_cursor: page.next_cursor,
                ..PostsResponse::ok("Posts fetched successfully")
            },
            Err(err) => PostsResponse::failure(err.client_message()),
        })
    }

    // ---- studio domain ----------------------------------------------------

    async fn get_documents(
        &self,
        ctx: &Context<'_>,
        collection: String,
        logged_in_user_id: ID,
    ) -> GqlResult<StudioDocumentsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&logged_in_user_id)?;
            let collection = Collection::parse(&collection)
                .ok_or_else(|| AppError::Validation("No collection exists".to_string()))?;
            services.studio.get_documents(collection, user_id).await
        }
        .await;

        Ok(match result {
            Ok(data) => StudioDocumentsResponse {
                success: true,
                message: "Documents fetched".to_string(),
                data: Some(data),
            },
            Err(err) => StudioDocumentsResponse::failure(err.client_message()),
        })
    }

    async fn get_document_by_id(
        &self,
        ctx: &Context<'_>,
        collection: String,
        logged_in_user_id: ID,
        document_id: ID,
    ) -> GqlResult<StudioDocumentResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&logged_in_user_id)?;
            let document_id = parse_id(&document_id)?;
            let collection = Collection::parse(&collection)
                .ok_or_else(|| AppError::Validation("No collection exists".to_string()))?;
            services
                .studio
                .get_document_by_id(collection, user_id, document_id)
                .await
        }
        .await;

        Ok(match result {
            Ok(data) => StudioDocumentResponse {
                success: true,
                message: "Document fetched".to_string(),
                data,
            },
            Err(err) => StudioDocumentResponse::failure(err.client_message()),
        })
    }
}
