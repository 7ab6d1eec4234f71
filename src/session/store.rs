use std::sync::Arc;

use chrono::Utc;

use crate::database::models::SessionEntity;
use crate::database::repositories::SessionRepository;
use crate::error::StoreError;
use crate::user::{AuthUser, UserService};
use crate::utils::generate_session_token;

/// 会话存储
///
/// 过期会话在被访问时删除；后台清理（`purge_expired`）只用于回收存储空间，
/// 不影响对外行为。
#[derive(Clone)]
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
    users: UserService,
}

impl SessionStore {
    pub fn new(repo: Arc<dyn SessionRepository>, users: UserService) -> Self {
        Self { repo, users }
    }

    /// 创建会话，未提供令牌时生成一个，返回令牌
    pub async fn create(&self, user_id: &str, token: Option<String>) -> Result<String, StoreError> {
        let token = token.unwrap_or_else(generate_session_token);
        let session = SessionEntity::new(token, user_id.to_string(), Utc::now());
        self.repo.insert(&session).await?;

        tracing::debug!("Created session for user {}, expires at {}", user_id, session.expires_at);
        Ok(session.token)
    }

    /// 解析令牌对应的用户
    ///
    /// 会话不存在、已过期或用户已被删除时返回 `None`；过期和孤立的会话会被顺带删除。
    pub async fn resolve(&self, token: &str) -> Result<Option<AuthUser>, StoreError> {
        let Some(session) = self.repo.find(token).await? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            tracing::debug!("Session for user {} expired, removing", session.user_id);
            self.repo.delete(token).await?;
            return Ok(None);
        }

        match self.users.find_by_id(&session.user_id).await? {
            Some(user) => Ok(Some(user)),
            None => {
                tracing::warn!("Session references missing user {}, removing", session.user_id);
                self.repo.delete(token).await?;
                Ok(None)
            }
        }
    }

    /// 删除会话，可重复调用
    pub async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        self.repo.delete(token).await
    }

    /// 删除所有过期会话，返回删除数量
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let removed = self.repo.delete_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::info!("Purged {} expired sessions", removed);
        }
        Ok(removed)
    }
}
