//! 进程内存储实现，约束与 Postgres 表一致（邮箱、handle、Google ID、令牌唯一）。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::database::models::{NewUser, ProfileUpdate, SessionEntity, UserEntity};
use crate::database::repositories::{SessionRepository, UserRepository};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<String, UserEntity>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserEntity>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn handle_exists(&self, handle: &str) -> Result<bool, StoreError> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| u.handle == handle))
    }

    async fn insert(&self, user: NewUser) -> Result<UserEntity, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| {
            u.email == user.email
                || u.handle == user.handle
                || (user.google_id.is_some() && u.google_id == user.google_id)
        }) {
            return Err(StoreError::Conflict("user"));
        }

        let now = Utc::now();
        let entity = UserEntity {
            id: uuid::Uuid::new_v4().to_string(),
            name: user.name,
            email: user.email,
            handle: user.handle,
            password_hash: user.password_hash,
            google_id: user.google_id,
            avatar: user.avatar,
            bio: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(entity.id.clone(), entity.clone());
        Ok(entity)
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserEntity>, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(bio) = &update.bio {
            user.bio = Some(bio.clone());
        }
        if let Some(avatar) = &update.avatar {
            user.avatar = Some(avatar.clone());
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    sessions: RwLock<HashMap<String, SessionEntity>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接改写会话的过期时间，返回会话是否存在
    pub async fn set_expires_at(&self, token: &str, expires_at: DateTime<Utc>) -> bool {
        match self.sessions.write().await.get_mut(token) {
            Some(session) => {
                session.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    /// 存储中的会话数（包含已过期但尚未清理的）
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn insert(&self, session: &SessionEntity) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.token) {
            return Err(StoreError::Conflict("session"));
        }
        sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<SessionEntity>, StoreError> {
        Ok(self.sessions.read().await.get(token).cloned())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        self.sessions.write().await.remove(token);
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at >= now);
        Ok((before - sessions.len()) as u64)
    }
}
