use std::sync::Arc;

use cache::CacheStore;
use config::Config;
use database::{SessionRepository, UserRepository};
use oauth::IdentityVerifier;
use session::SessionStore;
use user::UserService;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod oauth;
pub mod result;
pub mod router;
pub mod routes;
pub mod session;
pub mod user;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<CacheStore>,
    pub users: UserService,
    pub sessions: SessionStore,
    /// 未配置第三方登录时为 `None`
    pub identity_verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    /// 组装应用状态，缓存由调用方创建后注入
    pub fn new(
        config: Config,
        cache: Arc<CacheStore>,
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        let users = UserService::new(user_repo, cache.clone(), config.user_cache_ttl_secs);
        let sessions = SessionStore::new(session_repo, users.clone());
        Self {
            config: Arc::new(config),
            cache,
            users,
            sessions,
            identity_verifier: None,
        }
    }

    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.identity_verifier = Some(verifier);
        self
    }
}
