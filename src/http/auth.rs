// REST auth endpoints: token validation, the current-user lookup behind the
// session cookie, and the GitHub OAuth callback.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_cookies::{
    cookie::{time::Duration, SameSite},
    Cookie, Cookies,
};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::services::sessions::SESSION_COOKIE;

pub fn session_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(Duration::seconds(max_age_secs));
    cookie
}

pub fn clear_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(Duration::seconds(0));
    cookie
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    token: Option<String>,
}

/// POST /api/auth/validate - verify a raw session token.
pub async fn validate_token(
    State(state): State<AppState>,
    Json(body): Json<ValidateRequest>,
) -> Json<Value> {
    let token = match body.token {
        Some(token) => token,
        None => return Json(json!({ "valid": false })),
    };

    match state.services.sessions.validate_token(&token).await {
        Ok(Some(user_id)) => Json(json!({ "valid": true, "userId": user_id.to_string() })),
        Ok(None) => Json(json!({ "valid": false })),
        Err(err) => {
            tracing::error!("token validation failed: {}", err);
            Json(json!({ "valid": false }))
        }
    }
}

/// GET /api/auth/me - resolve the session cookie to the logged-in user's
/// summary, counts and community memberships.
pub async fn current_user(State(state): State<AppState>, cookies: Cookies) -> Json<Value> {
    let token = match cookies.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_string(),
        None => return Json(json!({ "valid": false })),
    };

    let user_id = match state.services.sessions.validate_token(&token).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return Json(json!({ "valid": false })),
        Err(err) => {
            tracing::error!("session validation failed: {}", err);
            return Json(json!({ "valid": false }));
        }
    };

    match state.services.users.overview(user_id).await {
        Ok(Some(user)) => Json(json!({ "valid": true, "user": user })),
        Ok(None) => Json(json!({ "valid": false })),
        Err(err) => {
            tracing::error!("failed to load current user: {}", err);
            Json(json!({ "valid": false }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
}

/// GET /api/auth/github/callback - OAuth code exchange, verified user
/// upsert, session + cookie, then redirect back into the app.
pub async fn github_callback(
    State(state): State<AppState>,
    Query(params): Query<OAuthCallback>,
    headers: HeaderMap,
    cookies: Cookies,
) -> AppResult<Response> {
    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("No code provided".to_string()))?;

    let github = state.services.github.as_ref().ok_or_else(|| {
        AppError::ConfigurationError("GitHub OAuth is not configured".to_string())
    })?;

    let access_token = github.exchange_code(&code).await?;
    let profile = github.fetch_profile(&access_token).await?;

    let user = state
        .services
        .users
        .upsert_oauth_user(&profile.email, &profile.name, profile.avatar_url.as_deref())
        .await?;

    let meta = crate::http::client_meta(&headers);
    let (_, token) = state
        .services
        .sessions
        .create_session(user.id, &meta.ip, &meta.user_agent)
        .await?;
    cookies.add(session_cookie(token, state.services.sessions.ttl_seconds()));

    Ok(Redirect::to(&state.config.server.app_url).into_response())
}
