/*
 * Responsibility
 * - credential を validation authority に渡し、claims → Principal に変換する
 * - authority の失敗理由は Rejected に畳み込む（呼び出し側には accept/reject だけ見える）
 * - authority の初期化失敗は Rejected とは別扱い（そのリクエストだけ失敗させる）
 */
use thiserror::Error;

use crate::services::auth::authority::{AuthorityInitError, LazyAuthority, RejectReason};
use crate::services::auth::credential::Credential;
use crate::services::auth::principal::Principal;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("credential rejected: {0}")]
    Rejected(RejectReason),
    #[error(transparent)]
    Unavailable(#[from] AuthorityInitError),
}

#[derive(Debug)]
pub struct ValidationGateway {
    authority: LazyAuthority,
}

impl ValidationGateway {
    pub fn new(authority: LazyAuthority) -> Self {
        Self { authority }
    }

    pub fn authority(&self) -> &LazyAuthority {
        &self.authority
    }

    /// Validate `credential` and build an authenticated principal.
    ///
    /// An absent credential still goes to the authority so every rejection takes
    /// the same path.
    pub async fn authenticate(
        &self,
        credential: Option<&Credential>,
    ) -> Result<Principal, GatewayError> {
        let authority = self.authority.get().await?;

        let claims = authority
            .validate(credential)
            .await
            .map_err(GatewayError::Rejected)?;

        Ok(Principal::authenticated(claims))
    }
}
