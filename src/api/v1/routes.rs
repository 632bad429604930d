/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は公開、それ以外 (/me, /orders, /customers) は認証ゲートの内側
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{
    groups::{customers, orders},
    health::health,
    me::me,
};
use crate::middleware::auth::access;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route("/orders", get(orders))
        .route("/customers", get(customers));

    let protected = access::apply(protected, state);

    Router::new().route("/health", get(health)).merge(protected)
}
