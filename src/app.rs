/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (scoped filter / 認証ゲート / HTTP 共通)
 * - axum::serve() で起動
 */
use std::{panic, process};

use anyhow::Result;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::middleware::{
    self,
    scoped::{
        InsertExtension, PathSegmentResolver, ScopedFilter, ScopedFilterApplied,
        ScopedFilterLayer,
    },
};
use crate::services::auth::build_gateway;
use crate::{api, state::AppState};

pub const API_PREFIX: &str = "/api/v1";

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,oauth_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: fail fast. Production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        env = ?config.app_env,
        addr = %config.addr,
        filtered_controllers = ?config.filtered_controllers,
        "starting oauth gate"
    );

    let state = AppState::new(build_gateway(&config));
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let filter = ScopedFilter::new(
        config.filtered_controllers.clone(),
        PathSegmentResolver::new(API_PREFIX),
        InsertExtension(ScopedFilterApplied),
    );

    let router = Router::new()
        .nest(API_PREFIX, api::v1::routes(state.clone()))
        .with_state(state)
        .layer(ScopedFilterLayer::new(filter));

    middleware::http::apply(router, &config.http)
}
