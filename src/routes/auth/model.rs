use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};

use crate::middleware::SESSION_COOKIE;
use crate::session::SESSION_TTL_DAYS;
use crate::user::AuthUser;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: AuthUser,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCallbackRequest {
    #[serde(default)]
    pub id_token: String,
}

/// 会话 cookie，有效期与会话一致
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// 用于清除会话 cookie，路径需与设置时一致
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
