mod auth;
mod error_handler;

pub use auth::{
    CurrentUser, RequestIdentity, SESSION_COOKIE, auth_middleware, identify,
    require_authenticated, session_token,
};
pub use error_handler::log_errors;
