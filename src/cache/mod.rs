// 缓存模块
// Redis 优先，不可用时退化为进程内缓存

pub mod keys;
pub mod memory;
pub mod remote;
pub mod store;

/// 缓存过期时间上限（秒），更大的值按此截断
pub const MAX_TTL_SECS: u64 = 30 * 365 * 24 * 3600;

pub use memory::MemoryCache;
pub use remote::{CacheError, RedisCache, RemoteCache};
pub use store::{CacheBackend, CacheStore};
