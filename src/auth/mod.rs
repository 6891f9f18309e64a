//! Bearer-token authentication for HTTP routes.
//!
//! Every request passes through [`require_auth`]. Routes listed as exempt
//! (`"METHOD /path"`) are let through even without a valid token; all others
//! need a valid access token in `Authorization: Bearer <token>`.

mod authenticator;
mod bearer;
mod errors;
mod extractors;
mod middleware;

pub use authenticator::Authenticator;
pub use bearer::{BEARER_PREFIX, get_bearer_token};
pub use errors::AuthError;
pub use extractors::Identity;
pub use middleware::require_auth;
