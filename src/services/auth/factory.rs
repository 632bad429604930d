/// Factory: build `ValidationGateway` from application `Config`.
///
/// Nothing is validated here; key material is decoded the first time a request
/// needs the authority.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::access_jwt::JwtAuthorityLoader;
use crate::services::auth::{LazyAuthority, ValidationGateway};

pub fn build_gateway(config: &Config) -> Arc<ValidationGateway> {
    let loader = JwtAuthorityLoader::new(config.auth.clone());
    let authority = LazyAuthority::new(loader);

    Arc::new(ValidationGateway::new(authority))
}
