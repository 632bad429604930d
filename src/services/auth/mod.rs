pub mod access_jwt;
pub mod authority;
pub mod credential;
pub mod factory;
pub mod gateway;
pub mod principal;

pub use authority::{AuthorityLoader, LazyAuthority, RejectReason, ValidationAuthority};
pub use credential::{Credential, CredentialOutcome, extract_credential};
pub use factory::build_gateway;
pub use gateway::{GatewayError, ValidationGateway};
pub use principal::{Claim, CurrentPrincipal, Principal};
