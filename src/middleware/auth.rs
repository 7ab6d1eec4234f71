use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{AppState, error::AppError, session::SessionStore, user::AuthUser};

/// 会话令牌所在的 cookie 名
pub const SESSION_COOKIE: &str = "sessionToken";

/// 请求的认证状态，由 `auth_middleware` 写入请求扩展
#[derive(Debug, Clone, Default)]
pub enum RequestIdentity {
    #[default]
    Unauthenticated,
    Authenticated { user: AuthUser, token: String },
}

impl RequestIdentity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, RequestIdentity::Authenticated { .. })
    }
}

/// 从 cookie 头中取出会话令牌，缺失或格式错误都视为没有令牌
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// 将令牌解析为认证状态；无效或过期的令牌与未登录无法区分
pub async fn identify(
    sessions: &SessionStore,
    token: Option<String>,
) -> Result<RequestIdentity, AppError> {
    let Some(token) = token else {
        return Ok(RequestIdentity::Unauthenticated);
    };

    Ok(match sessions.resolve(&token).await? {
        Some(user) => RequestIdentity::Authenticated { user, token },
        None => RequestIdentity::Unauthenticated,
    })
}

/// 认证中间件，只标注请求，不拒绝请求
///
/// 会话存储本身出错（数据库不可用）时返回 500。
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = session_token(request.headers());
    let identity = identify(&state.sessions, token).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// 要求已认证，否则返回 401
pub fn require_authenticated(identity: &RequestIdentity) -> Result<(&AuthUser, &str), AppError> {
    match identity {
        RequestIdentity::Authenticated { user, token } => Ok((user, token)),
        RequestIdentity::Unauthenticated => Err(AppError::Unauthorized),
    }
}

impl<S> FromRequestParts<S> for RequestIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestIdentity>()
            .cloned()
            .unwrap_or_default())
    }
}

/// 已认证用户提取器，未认证时以 401 拒绝
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthUser,
    pub token: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = RequestIdentity::from_request_parts(parts, state)
            .await
            .unwrap_or_default();
        let (user, token) = require_authenticated(&identity)?;
        Ok(CurrentUser {
            user: user.clone(),
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::{HeaderValue, header::COOKIE};

    use super::*;
    use crate::cache::CacheStore;
    use crate::database::memory::{MemorySessionRepository, MemoryUserRepository};
    use crate::database::models::NewUser;
    use crate::database::repositories::UserRepository;
    use crate::user::UserService;

    fn headers(cookie: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            headers.insert(COOKIE, HeaderValue::from_static(cookie));
        }
        headers
    }

    async fn sessions_with_user() -> (SessionStore, String) {
        let users = Arc::new(MemoryUserRepository::new());
        let user = users
            .insert(NewUser {
                name: "Ada".into(),
                email: "ada@x.io".into(),
                handle: "ada".into(),
                password_hash: None,
                google_id: None,
                avatar: None,
            })
            .await
            .unwrap();
        let cache = Arc::new(CacheStore::in_memory(Duration::from_millis(100)));
        let store = SessionStore::new(
            Arc::new(MemorySessionRepository::new()),
            UserService::new(users, cache, 60),
        );
        let token = store.create(&user.id, None).await.unwrap();
        (store, token)
    }

    #[test]
    fn token_is_read_from_cookie_header() {
        let headers = headers(Some("theme=dark; sessionToken=abc123; lang=en"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_or_unrelated_cookies_yield_no_token() {
        assert_eq!(session_token(&headers(None)), None);
        assert_eq!(session_token(&headers(Some(""))), None);
        assert_eq!(session_token(&headers(Some("theme=dark"))), None);
        assert_eq!(session_token(&headers(Some("sessionToken="))), None);
        assert_eq!(session_token(&headers(Some(";;==;garbage"))), None);
    }

    #[tokio::test]
    async fn non_matching_requests_stay_unauthenticated() {
        let (store, _) = sessions_with_user().await;
        for cookie in [None, Some(""), Some("theme=dark"), Some("sessionToken=bogus")] {
            let identity = identify(&store, session_token(&headers(cookie))).await.unwrap();
            assert!(!identity.is_authenticated());
            assert!(require_authenticated(&identity).is_err());
        }
    }

    #[tokio::test]
    async fn valid_cookie_authenticates() {
        let (store, token) = sessions_with_user().await;
        let identity = identify(&store, Some(token.clone())).await.unwrap();

        let (user, resolved_token) = require_authenticated(&identity).unwrap();
        assert_eq!(user.email, "ada@x.io");
        assert_eq!(resolved_token, token);
    }
}
