/*
 * Responsibility
 * - /orders, /customers: endpoint group ごとの疎通用 handler
 * - scoped filter がこのリクエストに適用されたか (ScopedFilterApplied の有無) を返す
 */
use axum::{Json, http::Extensions};
use serde::Serialize;

use crate::api::v1::extractors::CurrentUser;
use crate::middleware::scoped::ScopedFilterApplied;

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub group: &'static str,
    pub filtered: bool,
    pub user: Option<String>,
}

fn respond(group: &'static str, extensions: &Extensions, user: &CurrentUser) -> Json<GroupResponse> {
    Json(GroupResponse {
        group,
        filtered: extensions.get::<ScopedFilterApplied>().is_some(),
        user: user.0.name().map(str::to_owned),
    })
}

pub async fn orders(user: CurrentUser, extensions: Extensions) -> Json<GroupResponse> {
    respond("orders", &extensions, &user)
}

pub async fn customers(user: CurrentUser, extensions: Extensions) -> Json<GroupResponse> {
    respond("customers", &extensions, &user)
}
