//! Request-authentication gate for axum services.
//!
//! - `middleware::auth::access`: `Authorization: OAuth <token>` → validated principal in request extensions, or 401
//! - `middleware::scoped`: run a request transform only for allow-listed endpoint groups
//! - `api::v1::extractors::current_user`: read the principal back in handlers
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
