pub mod current_user;

pub use current_user::{CurrentUser, RequestPrincipalExt, current_user};
