mod handler;
mod model;

pub use handler::{google_callback, login, logout, me, register};
pub use model::{AuthResponse, expired_session_cookie, session_cookie};
