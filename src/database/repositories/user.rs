use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::database::models::{NewUser, ProfileUpdate, UserEntity};
use crate::error::StoreError;

const USER_COLUMNS: &str =
    "id, name, email, handle, password_hash, google_id, avatar, bio, created_at, updated_at";

/// 用户存储
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserEntity>, StoreError>;

    /// `email` 需已转为小写
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, StoreError>;

    async fn handle_exists(&self, handle: &str) -> Result<bool, StoreError>;

    /// 邮箱、handle 或 Google ID 冲突时返回 `StoreError::Conflict`
    async fn insert(&self, user: NewUser) -> Result<UserEntity, StoreError>;

    /// 用户不存在时返回 `None`
    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserEntity>, StoreError>;
}

/// 用户存储的 Postgres 实现
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<UserEntity>, StoreError> {
        let user = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, StoreError> {
        let user = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn handle_exists(&self, handle: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE handle = $1)")
                .bind(handle)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> Result<UserEntity, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        tracing::debug!("Creating user: {}", id);

        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (id, name, email, handle, password_hash, google_id, avatar)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.handle)
        .bind(&user.password_hash)
        .bind(&user.google_id)
        .bind(&user.avatar)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => {
                tracing::info!("Created user: {}", user.id);
                Ok(user)
            }
            Err(e) => {
                tracing::error!("Failed to create user: {:?}", e);
                Err(StoreError::from_insert(e, "user"))
            }
        }
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<UserEntity>, StoreError> {
        let user = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                bio = COALESCE($3, bio),
                avatar = COALESCE($4, avatar),
                updated_at = $5
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.bio)
        .bind(&update.avatar)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
