use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::{
    AppState,
    middleware::{auth_middleware, log_errors},
    routes,
};

// 认证相关的路由
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/google/callback", post(routes::auth::google_callback))
}

// 用户相关的路由
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", patch(routes::user::update_me))
        .route("/users/{id}", get(routes::user::get_user))
}

/// 创建应用路由，所有请求都先经过认证中间件
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/ping", get(routes::ping))
        .merge(auth_routes())
        .merge(user_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // axum 不允许在根路径上 nest
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };

    router
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
