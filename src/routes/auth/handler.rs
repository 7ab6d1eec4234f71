use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    AppState,
    error::AppError,
    middleware::{CurrentUser, SESSION_COOKIE},
    result::ApiResponse,
    user::{AuthUser, LoginRequest, RegisterRequest},
    utils::success_to_api_response,
};

use super::model::{
    AuthResponse, GoogleCallbackRequest, LogoutResponse, expired_session_cookie, session_cookie,
};

type AuthReply = (StatusCode, CookieJar, Json<ApiResponse<AuthResponse>>);

/// 创建会话并把令牌写入 cookie
async fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: AuthUser,
    status: StatusCode,
) -> Result<AuthReply, AppError> {
    let token = state.sessions.create(&user.id, None).await?;
    let jar = jar.add(session_cookie(token, state.config.secure_cookies));
    Ok((status, jar, success_to_api_response(AuthResponse { user })))
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<AuthReply, AppError> {
    let user = state.users.register(req).await?;
    start_session(&state, jar, user, StatusCode::CREATED).await
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<AuthReply, AppError> {
    let user = state.users.authenticate(req).await?;
    tracing::info!("User {} logged in", user.id);
    start_session(&state, jar, user, StatusCode::OK).await
}

/// Google 登录回调：校验 ID 令牌，按邮箱关联或创建用户，然后建立会话
#[axum::debug_handler]
pub async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<GoogleCallbackRequest>,
) -> Result<AuthReply, AppError> {
    if req.id_token.is_empty() {
        return Err(AppError::Validation("ID token is required".into()));
    }
    let Some(verifier) = state.identity_verifier.clone() else {
        return Err(AppError::Internal("Google OAuth not configured".into()));
    };

    let identity = verifier
        .verify(&req.id_token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or(AppError::InvalidToken)?;
    let user = state.users.find_or_create_oauth(identity).await?;
    tracing::info!("User {} signed in with Google", user.id);
    start_session(&state, jar, user, StatusCode::OK).await
}

/// 注销总是成功；cookie 中的令牌不论是否有效都会被删除
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ApiResponse<LogoutResponse>>), AppError> {
    if let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        state.sessions.revoke(&token).await?;
    }

    let jar = jar.remove(expired_session_cookie());
    Ok((jar, success_to_api_response(LogoutResponse {})))
}

#[axum::debug_handler]
pub async fn me(CurrentUser { user, .. }: CurrentUser) -> Json<ApiResponse<AuthResponse>> {
    success_to_api_response(AuthResponse { user })
}
