// End-to-end service tests over an in-memory SQLite database with no-op
// external collaborators.

use sqlx::Row;
use std::collections::HashSet;
use std::sync::Arc;

use drifnet::app_state::Services;
use drifnet::config::{
    AuthConfig, CacheConfig, Config, DatabaseConfig, GithubConfig, MailConfig, MediaConfig,
    ModerationConfig, RealtimeConfig, ServerConfig,
};
use drifnet::integrations::mailer::LogMailer;
use drifnet::integrations::moderation::DisabledFilter;
use drifnet::integrations::realtime::NoopPublisher;
use drifnet::integrations::storage::FsObjectStorage;
use drifnet::models::{EngagementKind, Visibility};
use drifnet::services::posts::{FeedMode, ModeratedWrite, NewPost, FEED_PAGE_SIZE};
use drifnet::services::studio::Collection;
use drifnet::services::users::UserUpdate;

fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            app_url: "http://localhost:3000".to_string(),
        },
        auth: AuthConfig {
            jwt_secret: "test-secret".to_string(),
            session_ttl_days: 7,
        },
        cache: CacheConfig { capacity: 64 },
        moderation: ModerationConfig {
            url: "http://localhost/unused".to_string(),
            api_key: None,
        },
        realtime: RealtimeConfig {
            url: None,
            auth_token: None,
        },
        mail: MailConfig {
            smtp_url: None,
            from: "DrifNet <no-reply@drifnet.test>".to_string(),
        },
        media: MediaConfig {
            dir: std::env::temp_dir()
                .join("drifnet-test-media")
                .to_string_lossy()
                .into_owned(),
            public_base_url: "/media".to_string(),
        },
        github: GithubConfig {
            client_id: None,
            client_secret: None,
        },
    }
}

async fn setup() -> Arc<Services> {
    let config = test_config();
    Services::build(
        &config,
        Arc::new(DisabledFilter),
        Arc::new(NoopPublisher),
        Arc::new(LogMailer),
        Arc::new(FsObjectStorage::new(
            config.media.dir.clone(),
            config.media.public_base_url.clone(),
        )),
        None,
    )
    .await
    .expect("failed to build test services")
}

/// Register a user and mark it verified so social actions are available.
async fn register(services: &Services, email: &str, name: &str) -> i64 {
    let user = services.users.create(email, name).await.unwrap();
    sqlx::query("UPDATE users SET is_verified = 1 WHERE id = ?")
        .bind(user.id)
        .execute(services.db.pool())
        .await
        .unwrap();
    user.id
}

async fn make_private(services: &Services, user_id: i64) {
    services
        .users
        .update(
            user_id,
            UserUpdate {
                account_type: Some(Visibility::Private),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

async fn create_post(services: &Services, user_id: i64, title: &str) -> i64 {
    match services
        .posts
        .create_post(NewPost {
            title: title.to_string(),
            body: format!("{} body", title),
            community_id: None,
            user_id,
            img_urls: vec![],
        })
        .await
        .unwrap()
    {
        ModeratedWrite::Created(id) => id,
        ModeratedWrite::Flagged(warning) => panic!("unexpected moderation flag: {}", warning),
    }
}

async fn follow_edge_exists(services: &Services, follower: i64, following: i64) -> bool {
    services.db.follow_exists(follower, following).await.unwrap()
}

// ---- follow / join state machines ---------------------------------------

#[tokio::test]
async fn follow_public_account_creates_edge_immediately() {
    let services = setup().await;
    let alice = register(&services, "alice@test.io", "Alice").await;
    let bob = register(&services, "bob@test.io", "Bob").await;

    let outcome = services.users.follow_unfollow(alice, bob).await.unwrap();
    assert_eq!(outcome.status, "Following");
    assert!(follow_edge_exists(&services, alice, bob).await);

    // The target got a FOLLOWED notification.
    let inbox = services.notifier.list_for(bob).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].row.kind, "FOLLOWED");
}

#[tokio::test]
async fn follow_private_account_never_creates_edge_before_acceptance() {
    let services = setup().await;
    let alice = register(&services, "alice@test.io", "Alice").await;
    let bob = register(&services, "bob@test.io", "Bob").await;
    make_private(&services, bob).await;

    let outcome = services.users.follow_unfollow(alice, bob).await.unwrap();
    assert_eq!(outcome.status, "Requested");
    assert!(!follow_edge_exists(&services, alice, bob).await);

    let inbox = services.notifier.list_for(bob).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].row.kind, "FOLLOW_REQUEST");

    // Repeating the request does not stack another notification.
    services.users.follow_unfollow(alice, bob).await.unwrap();
    assert_eq!(services.notifier.list_for(bob).await.unwrap().len(), 1);

    // Accept: the edge appears and the notification is consumed.
    let request_id = inbox[0].row.id;
    services
        .users
        .accept_request(request_id, alice, Some(bob), None, true)
        .await
        .unwrap();
    assert!(follow_edge_exists(&services, alice, bob).await);
    assert!(services.notifier.list_for(bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn reject_discards_request_without_creating_edge() {
    let services = setup().await;
    let alice = register(&services, "alice@test.io", "Alice").await;
    let bob = register(&services, "bob@test.io", "Bob").await;
    make_private(&services, bob).await;

    services.users.follow_unfollow(alice, bob).await.unwrap();
    let request_id = services.notifier.list_for(bob).await.unwrap()[0].row.id;

    services
        .users
        .accept_request(request_id, alice, Some(bob), None, false)
        .await
        .unwrap();
    assert!(!follow_edge_exists(&services, alice, bob).await);
    assert!(services.notifier.list_for(bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn unfollow_reports_follow_back_when_reverse_edge_exists() {
    let services = setup().await;
    let alice = register(&services, "alice@test.io", "Alice").await;
    let bob = register(&services, "bob@test.io", "Bob").await;

    services.users.follow_unfollow(alice, bob).await.unwrap();
    services.users.follow_unfollow(bob, alice).await.unwrap();

    // Alice unfollows; Bob still follows her, so the button shows
    // "Follow Back".
    let outcome = services.users.follow_unfollow(alice, bob).await.unwrap();
    assert_eq!(outcome.status, "Follow Back");
    assert!(!follow_edge_exists(&services, alice, bob).await);
    assert!(follow_edge_exists(&services, bob, alice).await);

    // Bob unfollows too; no edges remain, plain "Follow".
    let outcome = services.users.follow_unfollow(bob, alice).await.unwrap();
    assert_eq!(outcome.status, "Follow");
}

#[tokio::test]
async fn switching_account_public_purges_pending_requests() {
    let services = setup().await;
    let alice = register(&services, "alice@test.io", "Alice").await;
    let carol = register(&services, "carol@test.io", "Carol").await;
    let bob = register(&services, "bob@test.io", "Bob").await;
    make_private(&services, bob).await;

    services.users.follow_unfollow(alice, bob).await.unwrap();
    services.users.follow_unfollow(carol, bob).await.unwrap();
    assert_eq!(services.notifier.list_for(bob).await.unwrap().len(), 2);

    services
        .users
        .update(
            bob,
            UserUpdate {
                account_type: Some(Visibility::Public),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(services.notifier.list_for(bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn community_join_flow_honors_visibility_gating() {
    let services = setup().await;
    let owner = register(&services, "owner@test.io", "Owner").await;
    let member = register(&services, "member@test.io", "Member").await;

    let community = services
        .communities
        .create(owner, "rustaceans", "all things rust", "/media/c.png")
        .await
        .unwrap();

    // Owner membership was created atomically with the community.
    assert!(services.db.membership_exists(owner, community.id).await.unwrap());

    // Public community: join is immediate and notifies the owner.
    let outcome = services
        .users
        .join_leave_community(member, community.id)
        .await
        .unwrap();
    assert_eq!(outcome.status, "Joined");
    assert_eq!(outcome.community_name.as_deref(), Some("rustaceans"));
    assert!(services.db.membership_exists(member, community.id).await.unwrap());
    let inbox = services.notifier.list_for(owner).await.unwrap();
    assert_eq!(inbox[0].row.kind, "JOINED_COMMUNITY");

    // Toggle again: leave.
    let outcome = services
        .users
        .join_leave_community(member, community.id)
        .await
        .unwrap();
    assert_eq!(outcome.status, "Join");
    assert!(!services.db.membership_exists(member, community.id).await.unwrap());

    // Flip private: joining now only produces a pending request.
    services
        .communities
        .update(
            community.id,
            drifnet::services::communities::CommunityUpdate {
                community_type: Some(Visibility::Private),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let outcome = services
        .users
        .join_leave_community(member, community.id)
        .await
        .unwrap();
    assert_eq!(outcome.status, "Requested");
    assert!(!services.db.membership_exists(member, community.id).await.unwrap());

    // Flipping back to public purges the pending join request.
    services
        .communities
        .update(
            community.id,
            drifnet::services::communities::CommunityUpdate {
                community_type: Some(Visibility::Public),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let pending: Vec<_> = services
        .notifier
        .list_for(owner)
        .await
        .unwrap()
        .into_iter()
        .filter(|entry| entry.row.kind == "JOIN_REQUEST_COMMUNITY")
        .collect();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn remove_member_is_owner_only() {
    let services = setup().await;
    let owner = register(&services, "owner@test.io", "Owner").await;
    let member = register(&services, "member@test.io", "Member").await;
    let stranger = register(&services, "x@test.io", "X").await;

    let community = services
        .communities
        .create(owner, "club", "desc", "/media/c.png")
        .await
        .unwrap();
    services
        .users
        .join_leave_community(member, community.id)
        .await
        .unwrap();

    assert!(services
        .communities
        .remove_member(stranger, member, community.id)
        .await
        .is_err());
    assert!(services.db.membership_exists(member, community.id).await.unwrap());

    services
        .communities
        .remove_member(owner, member, community.id)
        .await
        .unwrap();
    assert!(!services.db.membership_exists(member, community.id).await.unwrap());
}

// ---- engagement toggle ----------------------------------------------------

#[tokio::test]
async fn liking_twice_removes_the_like() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let fan = register(&services, "fan@test.io", "Fan").await;
    let post = create_post(&services, author, "hello").await;

    services
        .posts
        .like_dislike(post, fan, None, EngagementKind::Like)
        .await
        .unwrap();
    assert_eq!(services.db.post_like_count(post).await.unwrap(), 1);

    services
        .posts
        .like_dislike(post, fan, None, EngagementKind::Like)
        .await
        .unwrap();
    assert_eq!(services.db.post_like_count(post).await.unwrap(), 0);
}

#[tokio::test]
async fn dislike_after_like_switches_instead_of_stacking() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let fan = register(&services, "fan@test.io", "Fan").await;
    let post = create_post(&services, author, "hello").await;

    services
        .posts
        .like_dislike(post, fan, None, EngagementKind::Like)
        .await
        .unwrap();
    services
        .posts
        .like_dislike(post, fan, None, EngagementKind::Dislike)
        .await
        .unwrap();

    assert_eq!(services.db.post_like_count(post).await.unwrap(), 0);
    let engagement = services.db.viewer_engagement(post, fan).await.unwrap();
    assert_eq!(engagement, Some(EngagementKind::Dislike));

    // Exactly one engagement row exists for (fan, post).
    let count: i64 = sqlx::query(
        "SELECT COUNT(*) AS n FROM engagements WHERE user_id = ? AND post_id = ?",
    )
    .bind(fan)
    .bind(post)
    .fetch_one(services.db.pool())
    .await
    .unwrap()
    .get("n");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn like_notifies_author_but_never_self() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let fan = register(&services, "fan@test.io", "Fan").await;
    let post = create_post(&services, author, "hello").await;

    services
        .posts
        .like_dislike(post, author, None, EngagementKind::Like)
        .await
        .unwrap();
    assert!(services.notifier.list_for(author).await.unwrap().is_empty());

    services
        .posts
        .like_dislike(post, fan, None, EngagementKind::Like)
        .await
        .unwrap();
    let inbox = services.notifier.list_for(author).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].row.kind, "LIKE_POST");
}

// ---- comments -------------------------------------------------------------

#[tokio::test]
async fn comment_notifies_post_author_once_and_not_for_self_comments() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let reader = register(&services, "reader@test.io", "Reader").await;
    let post = create_post(&services, author, "hello").await;

    services
        .posts
        .add_comment(post, author, None, "my own thread")
        .await
        .unwrap();
    assert!(services.notifier.list_for(author).await.unwrap().is_empty());

    services
        .posts
        .add_comment(post, reader, None, "nice post")
        .await
        .unwrap();
    let inbox = services.notifier.list_for(author).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].row.kind, "COMMENT_POST");
}

#[tokio::test]
async fn deleted_comments_disappear_from_listings() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let post = create_post(&services, author, "hello").await;

    let comment = match services
        .posts
        .add_comment(post, author, None, "first")
        .await
        .unwrap()
    {
        ModeratedWrite::Created(comment) => comment,
        ModeratedWrite::Flagged(_) => unreachable!(),
    };
    services
        .posts
        .add_comment(post, author, None, "second")
        .await
        .unwrap();
    assert_eq!(
        services.posts.get_comments(post, None, None).await.unwrap().len(),
        2
    );

    let comment_id: i64 = comment.id.0.parse().unwrap();
    services.posts.delete_comment(comment_id, author).await.unwrap();
    let remaining = services.posts.get_comments(post, None, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].content, "second");

    // Deleting again reports the already-deleted state.
    assert!(services.posts.delete_comment(comment_id, author).await.is_err());
}

#[tokio::test]
async fn replies_are_scoped_to_their_parent() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let post = create_post(&services, author, "hello").await;

    let parent = match services
        .posts
        .add_comment(post, author, None, "parent")
        .await
        .unwrap()
    {
        ModeratedWrite::Created(comment) => comment.id.0.parse::<i64>().unwrap(),
        ModeratedWrite::Flagged(_) => unreachable!(),
    };
    services
        .posts
        .add_comment(post, author, Some(parent), "reply")
        .await
        .unwrap();

    let top_level = services.posts.get_comments(post, None, None).await.unwrap();
    assert_eq!(top_level.len(), 1);
    assert_eq!(top_level[0].content, "parent");

    let replies = services
        .posts
        .get_comments(post, None, Some(parent))
        .await
        .unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].content, "reply");
}

// ---- trending feed --------------------------------------------------------

#[tokio::test]
async fn trending_top_never_returns_posts_older_than_14_days() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let fresh = create_post(&services, author, "fresh").await;
    let stale = create_post(&services, author, "stale").await;

    // Age the second post past the window.
    let fifteen_days_ago = drifnet::models::now_millis() - 15 * 24 * 60 * 60 * 1000;
    sqlx::query("UPDATE posts SET created_at = ? WHERE id = ?")
        .bind(fifteen_days_ago)
        .bind(stale)
        .execute(services.db.pool())
        .await
        .unwrap();

    let top = services
        .posts
        .get_trending(None, None, FeedMode::Top)
        .await
        .unwrap();
    let top_ids: Vec<String> = top.posts.iter().map(|p| p.id.0.clone()).collect();
    assert!(top_ids.contains(&fresh.to_string()));
    assert!(!top_ids.contains(&stale.to_string()));

    // "new" has no window; the stale post is still reachable there.
    let new = services
        .posts
        .get_trending(None, None, FeedMode::New)
        .await
        .unwrap();
    let new_ids: Vec<String> = new.posts.iter().map(|p| p.id.0.clone()).collect();
    assert!(new_ids.contains(&stale.to_string()));
}

#[tokio::test]
async fn trending_top_orders_by_like_count() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let quiet = create_post(&services, author, "quiet").await;
    let popular = create_post(&services, author, "popular").await;

    for i in 0..3 {
        let fan = register(&services, &format!("fan{}@test.io", i), "Fan").await;
        services
            .posts
            .like_dislike(popular, fan, None, EngagementKind::Like)
            .await
            .unwrap();
    }

    let page = services
        .posts
        .get_trending(None, None, FeedMode::Top)
        .await
        .unwrap();
    assert_eq!(page.posts[0].id.0, popular.to_string());
    assert_eq!(page.posts[0].likes_count, 3);
    assert_eq!(page.posts[1].id.0, quiet.to_string());
}

#[tokio::test]
async fn trending_cursors_never_repeat_or_skip_a_row() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;

    // 8 posts, all with zero engagement: ordering falls back to id, which
    // exercises the tie-break path of the cursor.
    let mut expected = HashSet::new();
    for i in 0..8 {
        expected.insert(create_post(&services, author, &format!("post {}", i)).await);
    }

    let mut seen: Vec<i64> = Vec::new();
    let mut cursor: Option<i64> = None;
    loop {
        let page = services
            .posts
            .get_trending(cursor, None, FeedMode::Top)
            .await
            .unwrap();
        assert!(page.posts.len() as i64 <= FEED_PAGE_SIZE);
        for post in &page.posts {
            seen.push(post.id.0.parse().unwrap());
        }
        if !page.has_next_page {
            break;
        }
        cursor = page.next_cursor.as_deref().map(|c| c.parse().unwrap());
    }

    let unique: HashSet<i64> = seen.iter().copied().collect();
    assert_eq!(unique.len(), seen.len(), "a cursor page repeated a row");
    assert_eq!(unique, expected, "a cursor page skipped a row");
}

#[tokio::test]
async fn soft_deleted_posts_vanish_from_feeds() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let post = create_post(&services, author, "doomed").await;

    services.posts.delete_post(post, author).await.unwrap();

    assert!(services.posts.get_user_posts(author).await.unwrap().is_empty());
    let page = services
        .posts
        .get_trending(None, None, FeedMode::New)
        .await
        .unwrap();
    assert!(page.posts.is_empty());

    // The studio listing hides it too (deletions marker), but the direct
    // document fetch still reports the deletion state.
    let documents = services
        .studio
        .get_documents(Collection::Post, author)
        .await
        .unwrap();
    assert!(documents.is_empty());
    let doc = services
        .studio
        .get_document_by_id(Collection::Post, author, post)
        .await
        .unwrap()
        .expect("document should still resolve by id");
    assert_eq!(doc.is_deleted, Some(true));
}

// ---- community feed -------------------------------------------------------

#[tokio::test]
async fn community_posts_paginate_without_overlap() {
    let services = setup().await;
    let owner = register(&services, "owner@test.io", "Owner").await;
    let community = services
        .communities
        .create(owner, "feed", "desc", "/media/c.png")
        .await
        .unwrap();

    let mut expected = HashSet::new();
    for i in 0..7 {
        match services
            .posts
            .create_post(NewPost {
                title: format!("post {}", i),
                body: "body".to_string(),
                community_id: Some(community.id),
                user_id: owner,
                img_urls: vec![],
            })
            .await
            .unwrap()
        {
            ModeratedWrite::Created(id) => expected.insert(id),
            ModeratedWrite::Flagged(_) => unreachable!(),
        };
    }

    let (page1, has_more, cursor) = services
        .posts
        .get_community_posts(community.id, owner, None, 3)
        .await
        .unwrap();
    assert_eq!(page1.len(), 3);
    assert!(has_more);
    let cursor = cursor.unwrap().parse::<i64>().unwrap();

    let (page2, _, cursor2) = services
        .posts
        .get_community_posts(community.id, owner, Some(cursor), 3)
        .await
        .unwrap();
    let (page3, has_more3, _) = services
        .posts
        .get_community_posts(
            community.id,
            owner,
            Some(cursor2.unwrap().parse().unwrap()),
            3,
        )
        .await
        .unwrap();
    assert!(!has_more3);

    let mut seen = HashSet::new();
    for post in page1.iter().chain(page2.iter()).chain(page3.iter()) {
        assert!(seen.insert(post.id.0.parse::<i64>().unwrap()));
    }
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn posting_into_a_community_requires_membership() {
    let services = setup().await;
    let owner = register(&services, "owner@test.io", "Owner").await;
    let outsider = register(&services, "out@test.io", "Out").await;
    let community = services
        .communities
        .create(owner, "closed", "desc", "/media/c.png")
        .await
        .unwrap();

    let result = services
        .posts
        .create_post(NewPost {
            title: "intruding".to_string(),
            body: "body".to_string(),
            community_id: Some(community.id),
            user_id: outsider,
            img_urls: vec![],
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn top_communities_exclude_already_joined_ones() {
    let services = setup().await;
    let owner = register(&services, "owner@test.io", "Owner").await;
    let viewer = register(&services, "viewer@test.io", "Viewer").await;

    let joined = services
        .communities
        .create(owner, "joined", "desc", "/media/a.png")
        .await
        .unwrap();
    let other = services
        .communities
        .create(owner, "other", "desc", "/media/b.png")
        .await
        .unwrap();
    services
        .users
        .join_leave_community(viewer, joined.id)
        .await
        .unwrap();

    let cards = services.communities.top_communities(viewer).await.unwrap();
    let names: Vec<&str> = cards.iter().map(|c| c.name.as_str()).collect();
    assert!(!names.contains(&"joined"));
    assert!(names.contains(&"other"));
    let other_card = cards.iter().find(|c| c.name == "other").unwrap();
    assert_eq!(other_card.id.0, other.id.to_string());
}

// ---- sessions -------------------------------------------------------------

#[tokio::test]
async fn login_keeps_exactly_one_session_per_user() {
    let services = setup().await;
    let user = register(&services, "alice@test.io", "Alice").await;

    let (_, first_token) = services
        .sessions
        .create_session(user, "10.0.0.1", "firefox")
        .await
        .unwrap();
    let (_, second_token) = services
        .sessions
        .create_session(user, "10.0.0.2", "chrome")
        .await
        .unwrap();

    assert_eq!(services.sessions.active_session_count(user).await.unwrap(), 1);

    // The evicted token no longer validates; the fresh one does.
    assert_eq!(
        services.sessions.validate_token(&first_token).await.unwrap(),
        None
    );
    assert_eq!(
        services.sessions.validate_token(&second_token).await.unwrap(),
        Some(user)
    );
}

#[tokio::test]
async fn garbage_tokens_are_rejected_without_error() {
    let services = setup().await;
    assert_eq!(
        services.sessions.validate_token("not-a-jwt").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn signout_invalidates_the_session() {
    let services = setup().await;
    let user = register(&services, "alice@test.io", "Alice").await;
    let (_, token) = services
        .sessions
        .create_session(user, "10.0.0.1", "firefox")
        .await
        .unwrap();

    services.sessions.destroy_for_user(user).await.unwrap();
    assert_eq!(services.sessions.validate_token(&token).await.unwrap(), None);
    assert_eq!(services.sessions.active_session_count(user).await.unwrap(), 0);
}

// ---- accounts -------------------------------------------------------------

#[tokio::test]
async fn registration_verification_and_login_round_trip() {
    let services = setup().await;
    let user = services
        .users
        .create("new@test.io", "Newcomer")
        .await
        .unwrap();
    assert!(!user.is_verified);

    // Login is refused before verification.
    services
        .users
        .update(
            user.id,
            UserUpdate {
                password: Some("hunter2!".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(services
        .users
        .authenticate("new@test.io", "hunter2!")
        .await
        .is_err());

    // Consume the emailed OTP.
    let code: String = sqlx::query("SELECT verification_code FROM users WHERE id = ?")
        .bind(user.id)
        .fetch_one(services.db.pool())
        .await
        .unwrap()
        .get("verification_code");
    let verified = services.users.verify(&code).await.unwrap();
    assert!(verified.is_verified);

    let authed = services
        .users
        .authenticate("new@test.io", "hunter2!")
        .await
        .unwrap();
    assert_eq!(authed.id, user.id);
    assert!(services
        .users
        .authenticate("new@test.io", "wrong")
        .await
        .is_err());
}

#[tokio::test]
async fn password_reset_requires_a_live_otp() {
    let services = setup().await;
    let user_id = register(&services, "alice@test.io", "Alice").await;

    services
        .users
        .request_password_reset("alice@test.io")
        .await
        .unwrap();
    let code: String = sqlx::query("SELECT reset_code FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(services.db.pool())
        .await
        .unwrap()
        .get("reset_code");

    assert!(services
        .users
        .reset_password("alice@test.io", "000000", "newpass!")
        .await
        .is_err());
    services
        .users
        .reset_password("alice@test.io", &code, "newpass!")
        .await
        .unwrap();
    assert!(services
        .users
        .authenticate("alice@test.io", "newpass!")
        .await
        .is_ok());
}

#[tokio::test]
async fn search_pages_through_people_with_a_stable_cursor() {
    let services = setup().await;
    for i in 0..25 {
        register(
            &services,
            &format!("dev{}@test.io", i),
            &format!("Developer {:02}", i),
        )
        .await;
    }

    let (page1, cursor) = services.users.search("Developer", "people", None).await.unwrap();
    assert_eq!(page1.len(), 20);
    let cursor = cursor.expect("a full page should produce a cursor");

    let (page2, cursor2) = services
        .users
        .search("Developer", "people", Some(cursor.parse().unwrap()))
        .await
        .unwrap();
    assert_eq!(page2.len(), 5);
    assert!(cursor2.is_none());

    let mut seen = HashSet::new();
    for hit in page1.iter().chain(page2.iter()) {
        assert!(seen.insert(hit.id.0.clone()), "search pages overlapped");
    }
    assert_eq!(seen.len(), 25);
}

#[tokio::test]
async fn profile_view_emits_notification_for_other_viewers_only() {
    let services = setup().await;
    let alice = register(&services, "alice@test.io", "Alice").await;
    let bob = register(&services, "bob@test.io", "Bob").await;

    // Own profile: no notification.
    services.users.get_profile(alice, alice).await.unwrap();
    assert!(services.notifier.list_for(alice).await.unwrap().is_empty());

    // Bob views Alice: she is notified.
    let profile = services.users.get_profile(alice, bob).await.unwrap();
    assert_eq!(profile.follow_status, "Follow");
    let inbox = services.notifier.list_for(alice).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].row.kind, "PROFILE_VIEW");
    assert_eq!(
        inbox[0].sender.as_ref().map(|s| s.id),
        Some(bob)
    );
}

#[tokio::test]
async fn report_creates_row_and_system_notification() {
    let services = setup().await;
    let author = register(&services, "author@test.io", "Author").await;
    let post = create_post(&services, author, "edgy").await;

    services
        .posts
        .report(Some(post), None, author, "inappropriate")
        .await
        .unwrap();

    let inbox = services.notifier.list_for(author).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].row.kind, "REPORT");
    assert!(inbox[0].sender.is_none());

    let report_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM reports WHERE post_id = ?")
        .bind(post)
        .fetch_one(services.db.pool())
        .await
        .unwrap()
        .get("n");
    assert_eq!(report_count, 1);
}
