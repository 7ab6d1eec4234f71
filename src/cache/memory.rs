use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

// TTL 溢出时的上限
const FAR_FUTURE: Duration = Duration::from_secs(super::MAX_TTL_SECS);

/// 进程内缓存条目，值为序列化后的 JSON
#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// 远程缓存不可用时使用的进程内缓存
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取条目，过期条目在此处被删除
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn set(&self, key: &str, value: String, ttl: Duration) {
        let now = Instant::now();
        let entry = MemoryEntry {
            value,
            expires_at: now.checked_add(ttl).unwrap_or(now + FAR_FUTURE),
        };
        self.entries.lock().await.insert(key.to_string(), entry);
    }

    pub async fn delete(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// 按 glob 模式删除；无模式时清空全部。返回删除数量
    pub async fn clear(&self, pattern: Option<&glob::Pattern>) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        match pattern {
            Some(pattern) => entries.retain(|key, _| !pattern.matches(key)),
            None => entries.clear(),
        }
        before - entries.len()
    }

    /// 清理所有已过期条目
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// 当前存储的条目数（包含尚未被访问清理的过期条目）
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
