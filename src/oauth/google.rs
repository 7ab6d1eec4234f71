use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{IdentityVerifier, OAuthError, VerifiedIdentity};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// tokeninfo 接口返回的声明，字段都是字符串
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    iss: String,
    sub: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// 通过 Google tokeninfo 接口校验 ID 令牌
#[derive(Clone)]
pub struct GoogleTokenVerifier {
    client: reqwest::Client,
    client_id: String,
    endpoint: String,
}

impl GoogleTokenVerifier {
    pub fn new(client_id: impl Into<String>, timeout: Duration) -> Result<Self, OAuthError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            client_id: client_id.into(),
            endpoint: TOKENINFO_URL.to_string(),
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<Option<VerifiedIdentity>, OAuthError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        // 签名无效或已过期的令牌返回 400
        match response.status() {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST => return Ok(None),
            status => return Err(OAuthError::Status(status)),
        }

        let info: TokenInfo = response.json().await?;
        Ok(identity_from(info, &self.client_id))
    }
}

/// 检查受众、签发方和邮箱验证状态
fn identity_from(info: TokenInfo, client_id: &str) -> Option<VerifiedIdentity> {
    if info.aud != client_id {
        tracing::warn!("Google token issued for another client: {}", info.aud);
        return None;
    }
    if !ISSUERS.contains(&info.iss.as_str()) {
        tracing::warn!("Google token has unexpected issuer: {}", info.iss);
        return None;
    }
    if info.email_verified.as_deref() != Some("true") {
        return None;
    }

    let email = info.email?;
    let name = info
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
    Some(VerifiedIdentity {
        subject: info.sub,
        email,
        name,
        picture: info.picture,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_info() -> TokenInfo {
        TokenInfo {
            aud: "client-1".into(),
            iss: "https://accounts.google.com".into(),
            sub: "1087".into(),
            email: Some("ada@example.com".into()),
            email_verified: Some("true".into()),
            name: Some("Ada Lovelace".into()),
            picture: Some("https://lh3.example/ada.png".into()),
        }
    }

    #[test]
    fn accepted_token_maps_claims() {
        let identity = identity_from(token_info(), "client-1").unwrap();
        assert_eq!(identity.subject, "1087");
        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.name, "Ada Lovelace");
        assert_eq!(identity.picture.as_deref(), Some("https://lh3.example/ada.png"));
    }

    #[test]
    fn foreign_or_unverified_tokens_are_rejected() {
        assert!(identity_from(token_info(), "client-2").is_none());

        let mut info = token_info();
        info.iss = "https://evil.example".into();
        assert!(identity_from(info, "client-1").is_none());

        let mut info = token_info();
        info.email_verified = Some("false".into());
        assert!(identity_from(info, "client-1").is_none());

        let mut info = token_info();
        info.email = None;
        assert!(identity_from(info, "client-1").is_none());
    }

    #[test]
    fn missing_name_falls_back_to_email_local_part() {
        let mut info = token_info();
        info.name = None;
        assert_eq!(identity_from(info, "client-1").unwrap().name, "ada");
    }
}
