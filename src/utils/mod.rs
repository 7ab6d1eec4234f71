use axum::Json;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use bcrypt::{DEFAULT_COST, hash, verify};
use rand::RngCore;
use serde::Serialize;

use crate::result::ApiResponse;

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 生成会话令牌
///
/// 32 字节来自操作系统安全随机源的数据，base64url 编码（43 个字符）。
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const USER_EXISTS: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const UNAUTHORIZED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn session_tokens_are_unique_and_url_safe() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_session_token()).collect();
        assert_eq!(tokens.len(), 256);
        for token in &tokens {
            assert_eq!(token.len(), 43);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn password_hash_is_salted_and_verifiable() {
        let first = hash_password("TestPassword123").unwrap();
        let second = hash_password("TestPassword123").unwrap();
        assert_ne!(first, second);
        assert_ne!(first, "TestPassword123");
        assert!(verify_password("TestPassword123", &first).unwrap());
        assert!(!verify_password("WrongPassword123", &first).unwrap());
    }
}
