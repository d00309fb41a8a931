use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    graphql::{build_schema, AppSchema},
    id_gen::IdGenerator,
    integrations::{
        github::GithubOAuth, mailer, mailer::Mailer, moderation, moderation::ContentFilter,
        realtime, realtime::RealtimePublisher, storage, storage::ObjectStorage,
    },
    services::{
        communities::CommunityService, notifications::Notifier, posts::PostService,
        sessions::SessionService, studio::StudioService, users::UserService,
    },
};

/// Shared service container handed to GraphQL resolvers and REST handlers.
pub struct Services {
    pub db: Arc<Database>,
    pub ids: Arc<IdGenerator>,
    pub notifier: Arc<Notifier>,
    pub sessions: SessionService,
    pub users: UserService,
    pub posts: PostService,
    pub communities: CommunityService,
    pub studio: StudioService,
    pub storage: Arc<dyn ObjectStorage>,
    pub github: Option<GithubOAuth>,
}

impl Services {
    /// Wire every service against real integrations from config.
    pub async fn from_config(config: &Config) -> anyhow::Result<Arc<Self>> {
        Self::build(
            config,
            moderation::from_config(&config.moderation),
            realtime::from_config(&config.realtime),
            mailer::from_config(&config.mail).map_err(|e| anyhow::anyhow!(e.to_string()))?,
            storage::from_config(&config.media),
            GithubOAuth::from_config(&config.github),
        )
        .await
    }

    /// Wire services with caller-supplied integrations (tests swap in no-op
    /// implementations here).
    pub async fn build(
        config: &Config,
        filter: Arc<dyn ContentFilter>,
        realtime: Arc<dyn RealtimePublisher>,
        mail: Arc<dyn Mailer>,
        storage: Arc<dyn ObjectStorage>,
        github: Option<GithubOAuth>,
    ) -> anyhow::Result<Arc<Self>> {
        let db = Database::new(&config.database.url, config.cache.capacity).await?;
        db.init().await?;
        let db = Arc::new(db);

        // Single-node deployment: node 0. Multi-node would read this from
        // the environment.
        let ids = Arc::new(IdGenerator::new(0));

        let notifier = Arc::new(Notifier::new(db.clone(), ids.clone(), realtime));

        Ok(Arc::new(Self {
            sessions: SessionService::new(
                db.clone(),
                ids.clone(),
                config.auth.jwt_secret.clone(),
                config.auth.session_ttl_days,
            ),
            users: UserService::new(db.clone(), ids.clone(), notifier.clone(), mail),
            posts: PostService::new(db.clone(), ids.clone(), notifier.clone(), filter),
            communities: CommunityService::new(db.clone(), ids.clone(), notifier.clone()),
            studio: StudioService::new(db.clone(), ids.clone()),
            storage,
            github,
            notifier,
            ids,
            db,
        }))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub services: Arc<Services>,
    pub schema: AppSchema,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let services = Services::from_config(&config).await?;
        let schema = build_schema(services.clone());

        Ok(Self {
            config,
            services,
            schema,
        })
    }
}
