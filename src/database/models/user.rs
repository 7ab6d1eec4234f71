use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;

/// 用户数据库实体
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub handle: String,
    /// OAuth 用户没有密码
    pub password_hash: Option<String>,
    /// Google 账号的 `sub`
    pub google_id: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建用户参数，密码已经过哈希
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub handle: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub avatar: Option<String>,
}

/// 资料更新，`None` 字段保持不变
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.bio.is_none() && self.avatar.is_none()
    }
}
