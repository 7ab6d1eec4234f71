use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client as RedisClient, RedisResult, aio::MultiplexedConnection};
use thiserror::Error;

const SCAN_BATCH: usize = 200;

/// 远程缓存调用失败的原因，只在 `CacheStore` 内部使用
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("remote cache call timed out after {0:?}")]
    Timeout(Duration),
}

/// 远程缓存后端
#[async_trait]
pub trait RemoteCache: Send + Sync {
    async fn get(&self, key: &str) -> RedisResult<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> RedisResult<()>;

    async fn del(&self, key: &str) -> RedisResult<()>;

    /// 按模式删除键；`None` 清空整个数据库。返回删除数量（清空时为 0）
    async fn clear(&self, pattern: Option<&str>) -> RedisResult<usize>;
}

/// 基于 Redis 多路复用连接的远程缓存
#[derive(Clone)]
pub struct RedisCache {
    conn: MultiplexedConnection,
}

impl RedisCache {
    /// 建立连接，超时视为失败
    pub async fn connect(redis_url: &str, timeout: Duration) -> Result<Self, CacheError> {
        let client = RedisClient::open(redis_url)?;
        let conn = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout(timeout))??;
        Ok(Self { conn })
    }
}

#[async_trait]
impl RemoteCache for RedisCache {
    async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs).await
    }

    async fn del(&self, key: &str) -> RedisResult<()> {
        let mut conn = self.conn.clone();
        conn.del(key).await
    }

    async fn clear(&self, pattern: Option<&str>) -> RedisResult<usize> {
        let mut conn = self.conn.clone();
        let Some(pattern) = pattern else {
            redis::cmd("FLUSHDB").query_async::<()>(&mut conn).await?;
            return Ok(0);
        };

        // 用 SCAN 分批遍历，避免 KEYS 阻塞 Redis
        let mut cursor: u64 = 0;
        let mut removed = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            if !keys.is_empty() {
                let deleted: usize = conn.del(&keys).await?;
                removed += deleted;
            }
            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }
}
