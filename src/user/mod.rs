// 用户模块

pub mod service;
pub mod types;
pub mod validation;

pub use service::UserService;
pub use types::{AuthUser, LoginRequest, PublicProfile, RegisterRequest};
