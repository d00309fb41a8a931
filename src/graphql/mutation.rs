use async_graphql::{Context, Object, Result as GqlResult, ID};
use std::sync::Arc;
use tower_cookies::Cookies;

use crate::app_state::Services;
use crate::error::{AppError, AppResult};
use crate::graphql::query::parse_id;
use crate::graphql::schema::ClientMeta;
use crate::graphql::types::*;
use crate::http::auth::{clear_session_cookie, session_cookie};
use crate::models::{EngagementKind, Visibility};
use crate::services::communities::CommunityUpdate;
use crate::services::posts::{ModeratedWrite, NewPost};
use crate::services::studio::{Collection, StudioUpdate};
use crate::services::users::UserUpdate;

fn parse_opt_id(value: &Option<String>) -> AppResult<Option<i64>> {
    value
        .as_deref()
        .map(parse_id)
        .transpose()
}

/// Root mutation object.
pub struct Mutation;

#[Object]
impl Mutation {
    // ---- accounts ---------------------------------------------------------

    async fn create_user(
        &self,
        ctx: &Context<'_>,
        email: String,
        name: String,
    ) -> GqlResult<UserResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        Ok(match services.users.create(&email, &name).await {
            Ok(user) => UserResponse {
                success: true,
                message: "OTP Sent to mail for verification".to_string(),
                user: Some(VerifiedState {
                    id: id_of(user.id),
                    is_verified: user.is_verified,
                }),
            },
            Err(err) => UserResponse::failure(err.client_message()),
        })
    }

    async fn verify_user(&self, ctx: &Context<'_>, token: String) -> GqlResult<UserResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        Ok(match services.users.verify(&token).await {
            Ok(user) => UserResponse {
                success: true,
                message: "User verified successfully".to_string(),
                user: Some(VerifiedState {
                    id: id_of(user.id),
                    is_verified: user.is_verified,
                }),
            },
            Err(err) => UserResponse::failure(err.client_message()),
        })
    }

    async fn update_user(
        &self,
        ctx: &Context<'_>,
        id: String,
        data: UpdateUserInput,
    ) -> GqlResult<UserResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&id)?;
            let account_type = match data.account_type.as_deref() {
                Some(value) => Some(Visibility::parse(value).ok_or_else(|| {
                    AppError::Validation(format!("unknown account type: {}", value))
                })?),
                None => None,
            };
            services
                .users
                .update(
                    user_id,
                    UserUpdate {
                        name: data.name,
                        password: data.password,
                        img_url: data.img_url,
                        designation: data.designation,
                        account_type,
                    },
                )
                .await
        }
        .await;

        Ok(match result {
            Ok(user) => UserResponse {
                success: true,
                message: "User updated successfully".to_string(),
                user: Some(VerifiedState {
                    id: id_of(user.id),
                    is_verified: user.is_verified,
                }),
            },
            Err(err) => UserResponse::failure(err.client_message()),
        })
    }

    async fn login_user(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> GqlResult<UserResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let meta = ctx.data::<ClientMeta>()?;
        let cookies = ctx.data::<Cookies>()?;

        let result = async {
            let user = services.users.authenticate(&email, &password).await?;
            let (_, token) = services
                .sessions
                .create_session(user.id, &meta.ip, &meta.user_agent)
                .await?;
            Ok::<_, AppError>(token)
        }
        .await;

        Ok(match result {
            Ok(token) => {
                cookies.add(session_cookie(token, services.sessions.ttl_seconds()));
                UserResponse {
                    success: true,
                    message: "Logged In Successfully".to_string(),
                    user: None,
                }
            }
            Err(err) => UserResponse::failure(err.client_message()),
        })
    }

    async fn signout(
        &self,
        ctx: &Context<'_>,
        logged_in_user_id: ID,
    ) -> GqlResult<StatusResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let cookies = ctx.data::<Cookies>()?;
        let result = async {
            let user_id = parse_id(&logged_in_user_id)?;
            services.sessions.destroy_for_user(user_id).await
        }
        .await;

        Ok(match result {
            Ok(()) => {
                cookies.add(clear_session_cookie());
                StatusResponse::ok("User signed out successfully")
            }
            Err(err) => StatusResponse::failure(err.client_message()),
        })
    }

    async fn verify_reset_password(
        &self,
        ctx: &Context<'_>,
        email: String,
    ) -> GqlResult<StatusResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        Ok(match services.users.request_password_reset(&email).await {
            Ok(()) => StatusResponse::ok("OTP Sent to mail for password verification"),
            Err(err) => StatusResponse::failure(err.client_message()),
        })
    }

    async fn reset_password(
        &self,
        ctx: &Context<'_>,
        email: String,
        otp: String,
        password: String,
    ) -> GqlResult<StatusResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        Ok(
            match services.users.reset_password(&email, &otp, &password).await {
                Ok(()) => StatusResponse::ok("Password updated successfully"),
                Err(err) => StatusResponse::failure(err.client_message()),
            },
        )
    }

    // ---- social graph -----------------------------------------------------

    async fn follow_unfollow_action(
        &self,
        ctx: &Context<'_>,
        follower_id: String,
        following_id: String,
    ) -> GqlResult<FollowActionResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let follower_id = parse_id(&follower_id)?;
            let following_id = parse_id(&following_id)?;
            services.users.follow_unfollow(follower_id, following_id).await
        }
        .await;

        Ok(match result {
            Ok(outcome) => FollowActionResponse {
                success: true,
                message: outcome.message,
                status: Some(outcome.status),
                community_name: None,
            },
            Err(err) => FollowActionResponse::failure(err.client_message()),
        })
    }

    async fn join_leave_community(
        &self,
        ctx: &Context<'_>,
        user_id: String,
        community_id: String,
    ) -> GqlResult<FollowActionResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&user_id)?;
            let community_id = parse_id(&community_id)?;
            services.users.join_leave_community(user_id, community_id).await
        }
        .await;

        Ok(match result {
            Ok(outcome) => FollowActionResponse {
                success: true,
                message: outcome.message,
                status: Some(outcome.status),
                community_name: outcome.community_name,
            },
            Err(err) => FollowActionResponse::failure(err.client_message()),
        })
    }

    async fn accept_request(
        &self,
        ctx: &Context<'_>,
        community_id: Option<ID>,
        following_id: Option<ID>,
        user_id: ID,
        id: ID,
        action: String,
    ) -> GqlResult<StatusResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let notification_id = parse_id(&id)?;
            let requester_id = parse_id(&user_id)?;
            let community_id = community_id.as_deref().map(|id| parse_id(id)).transpose()?;
            let following_id = following_id.as_deref().map(|id| parse_id(id)).transpose()?;
            let accept = match action.as_str() {
                "accept" => true,
                "reject" => false,
                other => {
                    return Err(AppError::Validation(format!("unknown action: {}", other)))
                }
            };
            services
                .users
                .accept_request(notification_id, requester_id, following_id, community_id, accept)
                .await?;
            Ok::<_, AppError>(accept)
        }
        .await;

        Ok(match result {
            Ok(true) => StatusResponse::ok("Request accepted"),
            Ok(false) => StatusResponse::ok("Request rejected"),
            Err(err) => StatusResponse::failure(err.client_message()),
        })
    }

    // ---- communities ------------------------------------------------------

    async fn create_community(
        &self,
        ctx: &Context<'_>,
        data: CreateCommunityInput,
    ) -> GqlResult<CommunityDataResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let owner_id = parse_id(&data.owner_id)?;
            services
                .communities
                .create(owner_id, &data.name, &data.description, &data.img_url)
                .await
        }
        .await;

        Ok(match result {
            Ok(community) => CommunityDataResponse {
                success: true,
                message: "Community created successfully.".to_string(),
                data: Some(CommunityCreated {
                    id: id_of(community.id),
                    owner_id: community.owner_id.to_string(),
                    name: community.name,
                }),
                community: None,
            },
            Err(err) => CommunityDataResponse::failure(err.client_message()),
        })
    }

    async fn update_community(
        &self,
        ctx: &Context<'_>,
        community_id: String,
        data: UpdateCommunityInput,
    ) -> GqlResult<CommunityListResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let community_id = parse_id(&community_id)?;
            let community_type = match data.community_type.as_deref() {
                Some(value) => Some(Visibility::parse(value).ok_or_else(|| {
                    AppError::Validation(format!("unknown community type: {}", value))
                })?),
                None => None,
            };
            services
                .communities
                .update(
                    community_id,
                    CommunityUpdate {
                        name: data.name,
                        description: data.description,
                        img_url: data.img_url,
                        banner_url: data.banner_url,
                        community_type,
                    },
                )
                .await
        }
        .await;

        Ok(match result {
            Ok(()) => CommunityListResponse {
                success: true,
                message: "Community data updated successfully".to_string(),
                communities: None,
            },
            Err(err) => CommunityListResponse::failure(err.client_message()),
        })
    }

    async fn remove_member(
        &self,
        ctx: &Context<'_>,
        owner_id: String,
        user_id: String,
        community_id: String,
    ) -> GqlResult<CommunityListResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let owner_id = parse_id(&owner_id)?;
            let user_id = parse_id(&user_id)?;
            let community_id = parse_id(&community_id)?;
            services
                .communities
                .remove_member(owner_id, user_id, community_id)
                .await
        }
        .await;

        Ok(match result {
            Ok(()) => CommunityListResponse {
                success: true,
                message: "Member removed from community".to_string(),
                communities: None,
            },
            Err(err) => CommunityListResponse::failure(err.client_message()),
        })
    }

    async fn leave_community(
        &self,
        ctx: &Context<'_>,
        community_id: String,
        user_id: String,
    ) -> GqlResult<CommunityListResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let community_id = parse_id(&community_id)?;
            let user_id = parse_id(&user_id)?;
            services.communities.leave(community_id, user_id).await
        }
        .await;

        Ok(match result {
            Ok(()) => CommunityListResponse {
                success: true,
                message: "Member left community".to_string(),
                communities: None,
            },
            Err(err) => CommunityListResponse::failure(err.client_message()),
        })
    }

    // ---- posts & comments -------------------------------------------------

    async fn create_post(
        &self,
        ctx: &Context<'_>,
        data: PostInput,
    ) -> GqlResult<PostsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&data.user_id)?;
            let community_id = parse_opt_id(&data.community_id)?;
            services
                .posts
                .create_post(NewPost {
                    title: data.title,
                    body: data.body,
                    community_id,
                    user_id,
                    img_urls: data.img_urls.unwrap_or_default(),
                })
                .await
        }
        .await;

        Ok(match result {
            Ok(ModeratedWrite::Created(_)) => PostsResponse::ok("Post created successfully"),
            Ok(ModeratedWrite::Flagged(warning)) => PostsResponse {
                warn_ai: Some(warning),
                ..PostsResponse::ok("Content is intense")
            },
            Err(err) => PostsResponse::failure(err.client_message()),
        })
    }

    async fn delete_post(
        &self,
        ctx: &Context<'_>,
        post_id: String,
        user_id: String,
    ) -> GqlResult<PostsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let post_id = parse_id(&post_id)?;
            let user_id = parse_id(&user_id)?;
            services.posts.delete_post(post_id, user_id).await
        }
        .await;

        Ok(match result {
            Ok(()) => PostsResponse::ok("Post deleted"),
            Err(err) => PostsResponse::failure(err.client_message()),
        })
    }

    async fn like_dislike_actions(
        &self,
        ctx: &Context<'_>,
        post_id: String,
        user_id: String,
        comment_id: Option<String>,
        #[graphql(name = "type")] kind: String,
    ) -> GqlResult<CommentsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let post_id = parse_id(&post_id)?;
            let user_id = parse_id(&user_id)?;
            let comment_id = parse_opt_id(&comment_id)?;
            let kind = EngagementKind::parse(&kind)
                .ok_or_else(|| AppError::Validation(format!("unknown engagement: {}", kind)))?;
            services
                .posts
                .like_dislike(post_id, user_id, comment_id, kind)
                .await
        }
        .await;

        Ok(match result {
            Ok(message) => CommentsResponse::ok(message),
            Err(err) => CommentsResponse::failure(err.client_message()),
        })
    }

    async fn add_comment(
        &self,
        ctx: &Context<'_>,
        post_id: String,
        user_id: String,
        parent_comment_id: Option<String>,
        content: String,
    ) -> GqlResult<CommentsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let post_id = parse_id(&post_id)?;
            let user_id = parse_id(&user_id)?;
            let parent_id = parse_opt_id(&parent_comment_id)?;
            services
                .posts
                .add_comment(post_id, user_id, parent_id, &content)
                .await
        }
        .await;

        Ok(match result {
            Ok(ModeratedWrite::Created(comment)) => CommentsResponse {
                comments: Some(vec![comment]),
                ..CommentsResponse::ok("Comment created successfully")
            },
            Ok(ModeratedWrite::Flagged(warning)) => CommentsResponse {
                warn_ai: Some(warning),
                ..CommentsResponse::ok("Content is intense")
            },
            Err(err) => CommentsResponse::failure(err.client_message()),
        })
    }

    async fn delete_comment(
        &self,
        ctx: &Context<'_>,
        comment_id: String,
        user_id: String,
    ) -> GqlResult<CommentsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let comment_id = parse_id(&comment_id)?;
            let user_id = parse_id(&user_id)?;
            services.posts.delete_comment(comment_id, user_id).await
        }
        .await;

        Ok(match result {
            Ok(()) => CommentsResponse::ok("Comment deleted successfully"),
            Err(err) => CommentsResponse::failure(err.client_message()),
        })
    }

    async fn edit_comment(
        &self,
        ctx: &Context<'_>,
        comment_id: String,
        user_id: String,
        content: String,
    ) -> GqlResult<CommentsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let comment_id = parse_id(&comment_id)?;
            let user_id = parse_id(&user_id)?;
            services.posts.edit_comment(comment_id, user_id, &content).await
        }
        .await;

        Ok(match result {
            Ok(()) => CommentsResponse::ok("Comment edited successfully"),
            Err(err) => CommentsResponse::failure(err.client_message()),
        })
    }

    async fn report(
        &self,
        ctx: &Context<'_>,
        comment_id: Option<String>,
        post_id: Option<String>,
        reported_user_id: String,
        reason: String,
    ) -> GqlResult<CommentsResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let comment_id = parse_opt_id(&comment_id)?;
            let post_id = parse_opt_id(&post_id)?;
            let reported_user_id = parse_id(&reported_user_id)?;
            services
                .posts
                .report(post_id, comment_id, reported_user_id, &reason)
                .await
        }
        .await;

        Ok(match result {
            Ok(()) => CommentsResponse::ok("User reported"),
            Err(err) => CommentsResponse::failure(err.client_message()),
        })
    }

    // ---- studio -----------------------------------------------------------

    async fn update_document(
        &self,
        ctx: &Context<'_>,
        content_type: String,
        logged_in_user_id: ID,
        data: StudioUpdateInput,
    ) -> GqlResult<StatusResponse> {
        let services = ctx.data::<Arc<Services>>()?;
        let result = async {
            let user_id = parse_id(&logged_in_user_id)?;
            let collection = Collection::parse(&content_type)
                .ok_or_else(|| AppError::Validation("No collection exists".to_string()))?;
            let document_id = parse_id(&data.id)?;
            services
                .studio
                .update_document(
                    collection,
                    user_id,
                    StudioUpdate {
                        id: document_id,
                        title: data.title,
                        name: data.name,
                        content: data.content,
                        img_urls: data.img_urls,
                        is_deleted: data.is_deleted,
                    },
                )
                .await
        }
        .await;

        Ok(match result {
            Ok(()) => StatusResponse::ok("Updated successfully"),
            Err(err) => StatusResponse::failure(err.client_message()),
        })
    }
}
