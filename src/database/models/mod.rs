/// 数据库实体定义
pub mod session;
pub mod user;

pub use session::SessionEntity;
pub use user::{NewUser, ProfileUpdate, UserEntity};
