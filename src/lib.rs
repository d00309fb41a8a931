// DrifNet - social networking API server

// Application wiring
pub mod app_state;
pub mod config;

// Persistence
pub mod cache;
pub mod db;
pub mod id_gen;
pub mod models;

// Domain services
pub mod services;

// External collaborators (mail, moderation, realtime, storage, OAuth)
pub mod integrations;

// API surface
pub mod graphql;
pub mod http;

// Common utilities
pub mod error;

// Re-exports for convenience
pub use error::{AppError, AppResult};
