use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::models::SessionEntity;
use crate::error::StoreError;

/// 会话存储，会话必须落在数据库中，不能放进缓存
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// 令牌重复时返回 `StoreError::Conflict`
    async fn insert(&self, session: &SessionEntity) -> Result<(), StoreError>;

    async fn find(&self, token: &str) -> Result<Option<SessionEntity>, StoreError>;

    /// 删除不存在的会话不是错误
    async fn delete(&self, token: &str) -> Result<(), StoreError>;

    /// 删除所有 `expires_at < now` 的会话，返回删除数量
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// 会话存储的 Postgres 实现
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn insert(&self, session: &SessionEntity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, "session"))?;

        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<SessionEntity>, StoreError> {
        let session = sqlx::query_as::<_, SessionEntity>(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
