/// 存储库接口与 Postgres 实现
pub mod session;
pub mod user;

pub use session::{PgSessionRepository, SessionRepository};
pub use user::{PgUserRepository, UserRepository};
