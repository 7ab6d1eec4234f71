use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 会话有效期固定为 7 天
pub const SESSION_TTL_DAYS: i64 = 7;

/// 用户会话数据库实体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SessionEntity {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionEntity {
    pub fn new(token: String, user_id: String, now: DateTime<Utc>) -> Self {
        Self {
            token,
            user_id,
            created_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        }
    }

    /// 恰好到达 `expires_at` 时仍然有效
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
