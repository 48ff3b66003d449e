//! API middleware.

mod auth;
mod error_detail;
mod rate_limit;

pub use auth::{admin_middleware, auth_middleware, MSG_TOKEN_MISSING};
pub use error_detail::error_detail_middleware;
pub use rate_limit::{client_identifier, rate_limit_auth_middleware, rate_limit_middleware};
