// HTTP surface: the GraphQL endpoint, the small REST auth/upload API and
// static service of stored media.

pub mod auth;
pub mod upload;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::HeaderMap,
    response::{Html, IntoResponse},
    routing::{get, post},
    Router,
};
use tower_cookies::{CookieManagerLayer, Cookies};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::app_state::AppState;
use crate::graphql::ClientMeta;

pub fn build_router(state: AppState) -> Router {
    let media_dir = state.config.media.dir.clone();

    Router::new()
        .route("/api/graphql", get(graphiql).post(graphql_handler))
        .route("/api/auth/validate", post(auth::validate_token))
        .route("/api/auth/me", get(auth::current_user))
        .route("/api/auth/github/callback", get(auth::github_callback))
        .route("/api/upload", post(upload::upload))
        .route("/api/health", get(health))
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<&'static str, crate::error::AppError> {
    state.services.db.health_check().await?;
    Ok("ok")
}

/// Client metadata recorded on sessions at login.
pub fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("remote-addr"))
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let user_agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    ClientMeta { ip, user_agent }
}

async fn graphql_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let meta = client_meta(&headers);
    state
        .schema
        .execute(req.into_inner().data(cookies).data(meta))
        .await
        .into()
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/api/graphql").finish())
}
