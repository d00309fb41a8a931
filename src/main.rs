// DrifNet API Server

use std::net::SocketAddr;
use tokio::net::TcpListener;

use drifnet::{app_state::AppState, config::Config, http::build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize application state
    let app_state = AppState::new(config.clone()).await?;

    // Build main application router
    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = config
        .server_address()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server address: {}", e))?;
    println!("🚀 DrifNet server starting on http://{}", addr);
    println!("📋 API surface:");
    println!("  POST /api/graphql                 - GraphQL queries and mutations");
    println!("  GET  /api/graphql                 - GraphiQL");
    println!("  POST /api/auth/validate           - Session token validation");
    println!("  GET  /api/auth/me                 - Current user (session cookie)");
    println!("  GET  /api/auth/github/callback    - OAuth callback");
    println!("  POST /api/upload                  - Media upload");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
