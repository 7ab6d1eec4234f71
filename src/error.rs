use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::result::ApiResponse;
use crate::utils::error_codes;

/// 持久层错误，会话存储没有降级路径，直接向上传播
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} already exists")]
    Conflict(&'static str),
}

impl StoreError {
    /// 将唯一约束冲突映射为 `Conflict`
    pub fn from_insert(err: sqlx::Error, what: &'static str) -> Self {
        let unique = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            StoreError::Conflict(what)
        } else {
            StoreError::Database(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: Please log in")]
    Unauthorized,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, error_codes::UNAUTHORIZED),
            AppError::InvalidCredentials | AppError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED)
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::Conflict(_) | AppError::Store(StoreError::Conflict(_)) => {
                (StatusCode::CONFLICT, error_codes::USER_EXISTS)
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::Store(StoreError::Database(_)) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
            }
        };

        let body: Json<ApiResponse<()>> = Json(ApiResponse::error(code, self.to_string()));
        (status, body).into_response()
    }
}
