// 数据库模块
// 包含数据库实体定义和存储库操作

pub mod memory; // 进程内实现
pub mod models; // 数据库实体定义
pub mod repositories; // 存储库接口与 Postgres 实现

// 重新导出常用类型，方便其他模块使用
pub use memory::{MemorySessionRepository, MemoryUserRepository};
pub use models::{NewUser, ProfileUpdate, SessionEntity, UserEntity};
pub use repositories::{PgSessionRepository, PgUserRepository, SessionRepository, UserRepository};
