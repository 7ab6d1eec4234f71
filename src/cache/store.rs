use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::MAX_TTL_SECS;
use crate::cache::memory::MemoryCache;
use crate::cache::remote::{CacheError, RedisCache, RemoteCache};
use crate::config::Config;

/// 缓存后端状态
///
/// 一旦进入 `Fallback` 就不会再回到 `Connected`。
#[derive(Clone)]
pub enum CacheBackend {
    Connected(Arc<dyn RemoteCache>),
    Fallback,
}

/// 缓存存储
///
/// 只是数据库前的加速层，所有操作都是 fail-open：远程缓存出错、超时时记录日志，
/// 读取返回未命中、写入直接丢弃，并永久切换到进程内缓存。
pub struct CacheStore {
    backend: RwLock<CacheBackend>,
    memory: MemoryCache,
    timeout: Duration,
}

impl CacheStore {
    /// 按配置连接远程缓存，未配置或连接失败时使用进程内缓存
    pub async fn initialize(config: &Config) -> Self {
        let timeout = config.cache_timeout();
        let Some(redis_url) = config.redis_url.as_deref() else {
            info!("REDIS_URL not configured, using memory cache");
            return Self::in_memory(timeout);
        };

        match RedisCache::connect(redis_url, timeout).await {
            Ok(redis) => {
                info!("Redis connected successfully");
                Self::with_remote(Arc::new(redis), timeout)
            }
            Err(e) => {
                warn!("Redis connection failed, using memory cache: {}", e);
                Self::in_memory(timeout)
            }
        }
    }

    pub fn in_memory(timeout: Duration) -> Self {
        Self {
            backend: RwLock::new(CacheBackend::Fallback),
            memory: MemoryCache::new(),
            timeout,
        }
    }

    pub fn with_remote(remote: Arc<dyn RemoteCache>, timeout: Duration) -> Self {
        Self {
            backend: RwLock::new(CacheBackend::Connected(remote)),
            memory: MemoryCache::new(),
            timeout,
        }
    }

    pub async fn is_connected(&self) -> bool {
        matches!(*self.backend.read().await, CacheBackend::Connected(_))
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.remote().await {
            Some(remote) => match self.call(remote.get(key)).await {
                Ok(Some(raw)) => Some(raw),
                Ok(None) => None,
                Err(e) => {
                    self.degrade("get", key, &e).await;
                    None
                }
            },
            None => self.memory.get(key).await,
        };

        let Some(raw) = raw else {
            debug!("Cache MISS: {}", key);
            return None;
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache HIT: {}", key);
                Some(value)
            }
            Err(e) => {
                error!("Cache entry {} could not be decoded: {}", key, e);
                None
            }
        }
    }

    /// 写入缓存，`ttl_secs` 为 0 时等同于删除，超过 `MAX_TTL_SECS` 时截断
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        if ttl_secs == 0 {
            self.delete(key).await;
            return;
        }
        // Redis 拒绝超出范围的过期时间，不能让配置错误触发降级
        let ttl_secs = ttl_secs.min(MAX_TTL_SECS);

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Cache set {} failed to serialize value: {}", key, e);
                return;
            }
        };

        match self.remote().await {
            Some(remote) => {
                if let Err(e) = self.call(remote.set_ex(key, raw, ttl_secs)).await {
                    self.degrade("set", key, &e).await;
                    return;
                }
            }
            None => {
                self.memory
                    .set(key, raw, Duration::from_secs(ttl_secs))
                    .await
            }
        }
        debug!("Cache SET: {} (expires in {}s)", key, ttl_secs);
    }

    pub async fn delete(&self, key: &str) {
        match self.remote().await {
            Some(remote) => {
                if let Err(e) = self.call(remote.del(key)).await {
                    self.degrade("delete", key, &e).await;
                }
            }
            None => self.memory.delete(key).await,
        }
    }

    /// 按 glob 模式失效缓存，无模式时清空全部
    pub async fn clear(&self, pattern: Option<&str>) {
        let label = pattern.unwrap_or("*");
        match self.remote().await {
            Some(remote) => match self.call(remote.clear(pattern)).await {
                Ok(removed) => debug!("Cache CLEAR: {} removed {} entries", label, removed),
                Err(e) => self.degrade("clear", label, &e).await,
            },
            None => {
                let compiled = match pattern.map(glob::Pattern::new).transpose() {
                    Ok(compiled) => compiled,
                    Err(e) => {
                        error!("Cache clear ignored invalid pattern {}: {}", label, e);
                        return;
                    }
                };
                let removed = self.memory.clear(compiled.as_ref()).await;
                debug!("Cache CLEAR: {} removed {} entries", label, removed);
            }
        }
    }

    /// 清理进程内缓存中的过期条目
    pub async fn purge_expired(&self) -> usize {
        self.memory.purge_expired().await
    }

    async fn remote(&self) -> Option<Arc<dyn RemoteCache>> {
        match &*self.backend.read().await {
            CacheBackend::Connected(remote) => Some(Arc::clone(remote)),
            CacheBackend::Fallback => None,
        }
    }

    async fn call<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }

    async fn degrade(&self, op: &str, key: &str, err: &CacheError) {
        error!("Cache {} error for {}: {}", op, key, err);
        let mut backend = self.backend.write().await;
        if matches!(*backend, CacheBackend::Connected(_)) {
            warn!("Falling back to memory cache");
            *backend = CacheBackend::Fallback;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use redis::{ErrorKind, RedisError, RedisResult};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        id: String,
        name: String,
    }

    fn profile() -> Profile {
        Profile {
            id: "u1".into(),
            name: "Ada".into(),
        }
    }

    /// 每次调用都失败的远程缓存
    #[derive(Default)]
    struct BrokenRemote {
        calls: AtomicUsize,
    }

    impl BrokenRemote {
        fn fail<T>(&self) -> RedisResult<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RedisError::from((ErrorKind::IoError, "connection refused")))
        }
    }

    #[async_trait]
    impl RemoteCache for BrokenRemote {
        async fn get(&self, _key: &str) -> RedisResult<Option<String>> {
            self.fail()
        }
        async fn set_ex(&self, _key: &str, _value: String, _ttl: u64) -> RedisResult<()> {
            self.fail()
        }
        async fn del(&self, _key: &str) -> RedisResult<()> {
            self.fail()
        }
        async fn clear(&self, _pattern: Option<&str>) -> RedisResult<usize> {
            self.fail()
        }
    }

    /// 永远不返回的远程缓存
    struct HangingRemote;

    #[async_trait]
    impl RemoteCache for HangingRemote {
        async fn get(&self, _key: &str) -> RedisResult<Option<String>> {
            std::future::pending().await
        }
        async fn set_ex(&self, _key: &str, _value: String, _ttl: u64) -> RedisResult<()> {
            std::future::pending().await
        }
        async fn del(&self, _key: &str) -> RedisResult<()> {
            std::future::pending().await
        }
        async fn clear(&self, _pattern: Option<&str>) -> RedisResult<usize> {
            std::future::pending().await
        }
    }

    /// 正常工作的远程缓存
    #[derive(Default)]
    struct MapRemote {
        entries: Mutex<HashMap<String, String>>,
        ttls: Mutex<HashMap<String, u64>>,
    }

    #[async_trait]
    impl RemoteCache for MapRemote {
        async fn get(&self, key: &str) -> RedisResult<Option<String>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }
        async fn set_ex(&self, key: &str, value: String, ttl: u64) -> RedisResult<()> {
            if ttl > i64::MAX as u64 / 1000 {
                return Err(RedisError::from((ErrorKind::ResponseError, "invalid expire time")));
            }
            self.entries.lock().unwrap().insert(key.into(), value);
            self.ttls.lock().unwrap().insert(key.into(), ttl);
            Ok(())
        }
        async fn del(&self, key: &str) -> RedisResult<()> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }
        async fn clear(&self, pattern: Option<&str>) -> RedisResult<usize> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            match pattern.map(|p| glob::Pattern::new(p).unwrap()) {
                Some(p) => entries.retain(|k, _| !p.matches(k)),
                None => entries.clear(),
            }
            Ok(before - entries.len())
        }
    }

    fn memory_store() -> CacheStore {
        CacheStore::in_memory(Duration::from_millis(100))
    }

    async fn assert_round_trip<T>(store: &CacheStore, key: &str, value: T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        store.set(key, &value, 60).await;
        assert_eq!(store.get::<T>(key).await, Some(value), "key {:?}", key);
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Page {
        owner: Profile,
        tags: Vec<String>,
        cursor: Option<u64>,
    }

    #[tokio::test]
    async fn set_then_get_returns_value() {
        for store in [
            memory_store(),
            CacheStore::with_remote(Arc::new(MapRemote::default()), Duration::from_millis(100)),
        ] {
            assert_round_trip(&store, "user:u1", profile()).await;
            assert_round_trip(&store, "", 0u32).await;
            assert_round_trip(&store, "count", -42i64).await;
            assert_round_trip(&store, "float", 2.5f64).await;
            assert_round_trip(&store, "flag", true).await;
            assert_round_trip(&store, "text", String::from("héllo \"quoted\"")).await;
            assert_round_trip(&store, "empty text", String::new()).await;
            assert_round_trip(&store, "list", vec![1u8, 2, 3]).await;
            assert_round_trip(&store, "empty list", Vec::<String>::new()).await;
            assert_round_trip(
                &store,
                "feed:page:1",
                Page {
                    owner: profile(),
                    tags: vec!["rust".into(), "axum".into()],
                    cursor: Some(7),
                },
            )
            .await;

            // 最后一次写入生效
            assert_round_trip(&store, "user:u1", Profile { id: "u1".into(), name: "Grace".into() }).await;
        }
    }

    #[tokio::test]
    async fn null_value_reads_as_missing() {
        let store = memory_store();
        store.set("maybe", &None::<u32>, 60).await;
        assert_eq!(store.get::<Option<u32>>("maybe").await, Some(None));
        assert_eq!(store.get::<u32>("maybe").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_reads_as_missing_and_is_removed() {
        let store = memory_store();
        store.set("user:u1", &profile(), 1).await;

        tokio::time::advance(Duration::from_millis(1100)).await;
        assert_eq!(store.get::<Profile>("user:u1").await, None);
        assert!(store.memory.is_empty().await);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = memory_store();
        store.delete("missing").await;
        assert!(store.memory.is_empty().await);

        store.set("k", &1u32, 60).await;
        store.delete("k").await;
        store.delete("k").await;
        assert_eq!(store.get::<u32>("k").await, None);
    }

    #[tokio::test]
    async fn zero_ttl_does_not_store() {
        let store = memory_store();
        store.set("k", &1u32, 60).await;
        store.set("k", &2u32, 0).await;
        assert_eq!(store.get::<u32>("k").await, None);
    }

    #[tokio::test]
    async fn clear_by_pattern_and_everything() {
        let store = memory_store();
        store.set("posts:page:1", &1u32, 60).await;
        store.set("posts:page:2", &2u32, 60).await;
        store.set("user:u1", &profile(), 60).await;

        store.clear(Some("posts:*")).await;
        assert_eq!(store.get::<u32>("posts:page:1").await, None);
        assert_eq!(store.get::<u32>("posts:page:2").await, None);
        assert_eq!(store.get::<Profile>("user:u1").await, Some(profile()));

        store.clear(None).await;
        assert!(store.memory.is_empty().await);
    }

    #[tokio::test]
    async fn undecodable_entry_reads_as_missing() {
        let store = memory_store();
        store.set("k", &"text", 60).await;
        assert_eq!(store.get::<Profile>("k").await, None);
    }

    #[tokio::test]
    async fn broken_remote_fails_open_and_falls_back_once() {
        let remote = Arc::new(BrokenRemote::default());
        let store = CacheStore::with_remote(remote.clone(), Duration::from_millis(100));
        assert!(store.is_connected().await);

        store.set("k", &profile(), 60).await;
        assert!(!store.is_connected().await);
        assert_eq!(store.get::<Profile>("k").await, None);
        store.delete("k").await;
        store.clear(Some("k*")).await;
        store.clear(None).await;
        assert_eq!(store.get::<Profile>("k").await, None);

        // 降级后不再访问远程缓存
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn every_operation_fails_open_on_broken_remote() {
        for op in 0..4 {
            let store = CacheStore::with_remote(
                Arc::new(BrokenRemote::default()),
                Duration::from_millis(100),
            );
            match op {
                0 => assert_eq!(store.get::<u32>("k").await, None),
                1 => store.set("k", &1u32, 60).await,
                2 => store.delete("k").await,
                _ => store.clear(Some("k*")).await,
            }
            assert!(!store.is_connected().await);
            assert_eq!(store.get::<u32>("k").await, None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_remote_times_out_into_fallback() {
        let store = CacheStore::with_remote(Arc::new(HangingRemote), Duration::from_millis(50));
        assert_eq!(store.get::<u32>("k").await, None);
        assert!(!store.is_connected().await);

        // 降级后写入进入进程内缓存
        store.set("k", &7u32, 60).await;
        assert_eq!(store.get::<u32>("k").await, Some(7));
    }

    #[tokio::test]
    async fn connected_store_uses_remote() {
        let remote = Arc::new(MapRemote::default());
        let store = CacheStore::with_remote(remote.clone(), Duration::from_millis(100));

        store.set("user:u1", &profile(), 60).await;
        assert!(remote.entries.lock().unwrap().contains_key("user:u1"));
        assert!(store.memory.is_empty().await);
        assert_eq!(store.get::<Profile>("user:u1").await, Some(profile()));

        store.clear(Some("user:*")).await;
        assert_eq!(store.get::<Profile>("user:u1").await, None);
        assert!(store.is_connected().await);
    }

    #[tokio::test]
    async fn oversized_ttl_is_clamped_instead_of_degrading() {
        let remote = Arc::new(MapRemote::default());
        let store = CacheStore::with_remote(remote.clone(), Duration::from_millis(100));

        store.set("k", &1u32, u64::MAX).await;
        assert!(store.is_connected().await);
        assert_eq!(remote.ttls.lock().unwrap().get("k"), Some(&MAX_TTL_SECS));
        assert_eq!(store.get::<u32>("k").await, Some(1));

        let memory = memory_store();
        memory.set("k", &1u32, u64::MAX).await;
        assert_eq!(memory.get::<u32>("k").await, Some(1));
    }

    #[tokio::test]
    async fn initialize_without_redis_url_uses_memory() {
        let config = Config::default();
        let store = CacheStore::initialize(&config).await;
        assert!(!store.is_connected().await);
    }

    #[tokio::test]
    async fn initialize_with_unreachable_redis_falls_back() {
        let config = Config {
            redis_url: Some("redis://127.0.0.1:1/".into()),
            cache_timeout_ms: 200,
            ..Config::default()
        };
        let store = CacheStore::initialize(&config).await;
        assert!(!store.is_connected().await);

        store.set("k", &1u32, 60).await;
        assert_eq!(store.get::<u32>("k").await, Some(1));
    }
}
