// 会话模块
// 令牌到用户的权威映射，持久化在数据库中

pub mod store;

pub use crate::database::models::session::{SESSION_TTL_DAYS, SessionEntity};
pub use store::SessionStore;
