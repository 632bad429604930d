//! `Authorization: OAuth <token>` 検証 → Principal を extensions に入れる
//!
//! - ヘッダ抽出 → ValidationGateway → 成功なら CurrentPrincipal を insert して次へ
//! - 失敗なら 401 + `X-Suppress-Forms-Redirect: true` を返し、downstream は呼ばない
//! - 「ヘッダ無し」と「検証失敗」はクライアントからは区別できない（ログにだけ理由を残す）
//!
//! 検証が終わるまで next は呼ばない。クライアント切断などで future が drop された場合、
//! extensions への書き込みは起きない。

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::{CredentialOutcome, CurrentPrincipal, GatewayError};
use crate::services::auth::principal::PRINCIPAL_KEY;
use crate::state::AppState;

/// 認証を掛けたい Router に middleware を適用する。
///
/// 例：
/// ```ignore
/// let protected = Router::new().route("/me", get(me));
/// let protected = middleware::auth::access::apply(protected, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let outcome = CredentialOutcome::from_headers(req.headers());

    // credential 無しでも gateway に渡す（拒否経路を 1 本にする）
    let principal = match state.gateway.authenticate(outcome.credential()).await {
        Ok(principal) => principal,
        Err(GatewayError::Rejected(reason)) => {
            tracing::warn!(
                credential = outcome.kind(),
                reason = %reason,
                path = %req.uri().path(),
                "authentication rejected"
            );
            return Err(AppError::Unauthorized);
        }
        Err(GatewayError::Unavailable(err)) => {
            tracing::error!(error = %err, "validation authority unavailable");
            return Err(AppError::Internal);
        }
    };

    tracing::debug!(
        key = PRINCIPAL_KEY,
        name = principal.name().unwrap_or("-"),
        "request authenticated"
    );

    // middleware → extractor への受け渡し
    req.extensions_mut()
        .insert(CurrentPrincipal(Arc::new(principal)));

    Ok(next.run(req).await)
}
