/*
 * Responsibility
 * - GET /health (疎通用, 認証ゲートの外)
 * - validation authority が初期化済みかどうかも返す (初期化自体はトリガしない)
 */
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let authority = if state.gateway.authority().is_initialized() {
        "ready"
    } else {
        "pending"
    };

    (
        StatusCode::OK,
        Json(json!({"status": "ok", "authority": authority})),
    )
}
