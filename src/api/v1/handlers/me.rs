/*
 * Responsibility
 * - GET /me: 認証ゲートが付けた Principal をそのまま返す
 */
use axum::Json;
use serde::Serialize;

use crate::api::v1::extractors::CurrentUser;
use crate::services::auth::Claim;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub name: Option<String>,
    pub claims: Vec<Claim>,
}

pub async fn me(CurrentUser(principal): CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        authenticated: principal.is_authenticated(),
        name: principal.name().map(str::to_owned),
        claims: principal.claims().to_vec(),
    })
}
