use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{Extensions, Request, request::Parts};

use crate::error::AppError;
use crate::services::auth::{CurrentPrincipal, Principal};

/// Principal the authentication gate attached, if any.
///
/// Never fails: a request that skipped the gate (or was rejected by it) yields `None`.
pub fn current_user(extensions: &Extensions) -> Option<Arc<Principal>> {
    extensions
        .get::<CurrentPrincipal>()
        .map(|current| Arc::clone(&current.0))
}

/// `req.user()` for anything carrying request extensions.
pub trait RequestPrincipalExt {
    fn user(&self) -> Option<Arc<Principal>>;
}

impl<B> RequestPrincipalExt for Request<B> {
    fn user(&self) -> Option<Arc<Principal>> {
        current_user(self.extensions())
    }
}

impl RequestPrincipalExt for Parts {
    fn user(&self) -> Option<Arc<Principal>> {
        current_user(&self.extensions)
    }
}

/// Handler で Principal を受け取るための extractor
/// middleware が CurrentPrincipal を request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（ゲートが掛かっていないルート）
pub struct CurrentUser(pub Arc<Principal>);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.user().map(CurrentUser).ok_or(AppError::Unauthorized)
    }
}
