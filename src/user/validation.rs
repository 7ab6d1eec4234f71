use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;
use crate::user::types::RegisterRequest;

pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// 注册参数校验
pub fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    if req.name.trim().is_empty()
        || req.email.is_empty()
        || req.password.is_empty()
        || req.confirm_password.is_empty()
    {
        return Err(AppError::Validation("All fields are required".into()));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("Invalid email format".into()));
    }
    if !is_valid_password(&req.password) {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if req.password != req.confirm_password {
        return Err(AppError::Validation("Passwords do not match".into()));
    }
    Ok(())
}

/// 由昵称生成 handle 的基础部分：小写，空白替换为下划线
pub fn handle_base(name: &str) -> String {
    WHITESPACE_RE
        .replace_all(name.trim(), "_")
        .to_lowercase()
}
