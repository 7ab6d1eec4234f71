// 第三方登录
// 令牌校验交给身份提供方，这里只关心校验后的身份

mod google;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub use google::GoogleTokenVerifier;

/// 身份提供方确认过的用户身份
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedIdentity {
    /// 提供方的用户 ID（Google 的 `sub`）
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity provider returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// ID 令牌校验
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// 令牌无效时返回 `Ok(None)`；提供方不可用时返回错误
    async fn verify(&self, id_token: &str) -> Result<Option<VerifiedIdentity>, OAuthError>;
}

/// 固定令牌表，用于测试和本地开发
#[derive(Debug, Default)]
pub struct StaticIdentityVerifier {
    identities: HashMap<String, VerifiedIdentity>,
}

impl StaticIdentityVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, id_token: impl Into<String>, identity: VerifiedIdentity) -> Self {
        self.identities.insert(id_token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, id_token: &str) -> Result<Option<VerifiedIdentity>, OAuthError> {
        Ok(self.identities.get(id_token).cloned())
    }
}
