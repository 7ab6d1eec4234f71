use std::sync::Arc;

use crate::cache::{CacheStore, keys};
use crate::database::models::{NewUser, ProfileUpdate};
use crate::database::repositories::UserRepository;
use crate::error::{AppError, StoreError};
use crate::oauth::VerifiedIdentity;
use crate::user::types::{AuthUser, LoginRequest, PublicProfile, RegisterRequest};
use crate::user::validation::{handle_base, validate_registration};
use crate::utils::{hash_password, verify_password};

/// 用户操作，读取路径经过缓存加速
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    cache: Arc<CacheStore>,
    cache_ttl_secs: u64,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, cache: Arc<CacheStore>, cache_ttl_secs: u64) -> Self {
        Self {
            repo,
            cache,
            cache_ttl_secs,
        }
    }

    /// 根据ID查找用户，缓存未命中时回源数据库并写回
    pub async fn find_by_id(&self, id: &str) -> Result<Option<AuthUser>, StoreError> {
        let key = keys::user_key(id);
        if let Some(user) = self.cache.get::<AuthUser>(&key).await {
            return Ok(Some(user));
        }

        let Some(entity) = self.repo.find_by_id(id).await? else {
            return Ok(None);
        };
        let user = AuthUser::from(entity);
        self.cache.set(&key, &user, self.cache_ttl_secs).await;
        Ok(Some(user))
    }

    /// 公开资料，单独缓存
    pub async fn public_profile(&self, id: &str) -> Result<Option<PublicProfile>, StoreError> {
        let key = keys::user_profile_key(id);
        if let Some(profile) = self.cache.get::<PublicProfile>(&key).await {
            return Ok(Some(profile));
        }

        let Some(user) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let profile = PublicProfile::from(&user);
        self.cache.set(&key, &profile, self.cache_ttl_secs).await;
        Ok(Some(profile))
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<AuthUser, AppError> {
        validate_registration(&req)?;

        let email = req.email.trim().to_lowercase();
        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".into()));
        }

        let handle = self.unique_handle(handle_base(&req.name)).await?;
        let password = req.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        let entity = self
            .repo
            .insert(NewUser {
                name: req.name.trim().to_string(),
                email,
                handle,
                password_hash: Some(password_hash),
                google_id: None,
                avatar: None,
            })
            .await?;

        // 清除可能残留的旧缓存
        self.cache.delete(&keys::user_key(&entity.id)).await;
        tracing::info!("Registered user: {}", entity.id);
        Ok(AuthUser::from(entity))
    }

    /// 校验邮箱和密码，所有失败都返回同一个错误
    pub async fn authenticate(&self, req: LoginRequest) -> Result<AuthUser, AppError> {
        if req.email.is_empty() || req.password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".into(),
            ));
        }

        let email = req.email.trim().to_lowercase();
        let Some(entity) = self.repo.find_by_email(&email).await? else {
            return Err(AppError::InvalidCredentials);
        };
        let Some(hash) = entity.password_hash.clone() else {
            return Err(AppError::InvalidCredentials);
        };

        let password = req.password;
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .unwrap_or_else(|e| {
                tracing::warn!("Stored password hash for {} is invalid: {}", entity.id, e);
                false
            });

        if !matches {
            return Err(AppError::InvalidCredentials);
        }
        Ok(AuthUser::from(entity))
    }

    pub async fn update_profile(
        &self,
        id: &str,
        update: ProfileUpdate,
    ) -> Result<AuthUser, AppError> {
        if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AppError::Validation("Name cannot be empty".into()));
        }

        let entity = self
            .repo
            .update_profile(id, &update)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        self.cache.clear(Some(&keys::user_pattern(id))).await;
        Ok(AuthUser::from(entity))
    }

    /// 第三方登录：按邮箱找到已有用户，没有则创建一个无密码用户
    ///
    /// 新用户的 handle 取邮箱 @ 前的部分。
    pub async fn find_or_create_oauth(&self, identity: VerifiedIdentity) -> Result<AuthUser, AppError> {
        let email = identity.email.trim().to_lowercase();
        if let Some(entity) = self.repo.find_by_email(&email).await? {
            return Ok(AuthUser::from(entity));
        }

        let local_part = email.split('@').next().unwrap_or_default().to_string();
        let handle = self.unique_handle(local_part).await?;
        let entity = self
            .repo
            .insert(NewUser {
                name: identity.name,
                email,
                handle,
                password_hash: None,
                google_id: Some(identity.subject),
                avatar: identity.picture,
            })
            .await?;

        tracing::info!("Created user {} from Google sign-in", entity.id);
        Ok(AuthUser::from(entity))
    }

    async fn unique_handle(&self, base: String) -> Result<String, StoreError> {
        let mut handle = base.clone();
        let mut counter = 1;
        while self.repo.handle_exists(&handle).await? {
            handle = format!("{}_{}", base, counter);
            counter += 1;
        }
        Ok(handle)
    }
}
