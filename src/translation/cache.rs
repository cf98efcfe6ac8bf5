//! 翻译结果缓存
//!
//! 有界LRU + TTL双重淘汰的线程安全缓存。所有操作通过`&self`进行，
//! 可以在tokio工作线程之间直接共享。
//!
//! 过期检查是惰性的：条目在被`get`命中时才检查TTL，过期条目当场移除，
//! 同时计入一次过期和一次未命中。

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::config::CacheSettings;
use super::engine::TranslationOutcome;

/// 缓存统计信息
///
/// 计数器单调递增，只有`clear`或显式`reset`才会归零。
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// 命中次数
    pub hits: u64,
    /// 未命中次数
    pub misses: u64,
    /// 因容量淘汰的条目数
    pub evictions: u64,
    /// 因TTL过期移除的条目数
    pub expirations: u64,
    /// 插入次数
    pub insertions: u64,
}

impl CacheStats {
    /// 命中率（无访问时为0.0）
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// 重置所有计数器
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 单条缓存条目
#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: TranslationOutcome,
    created_at: Instant,
    access_count: u64,
}

struct CacheInner {
    store: LruCache<String, CacheEntry>,
    stats: CacheStats,
}

/// 翻译缓存
///
/// 键由 `blake3(文本|源语言|目标语言)` 生成，同一文本在不同语言对
/// 下互不干扰。
pub struct TranslationCache {
    inner: RwLock<CacheInner>,
    ttl: Duration,
    enabled: bool,
}

impl TranslationCache {
    /// 创建缓存，容量至少为1
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: RwLock::new(CacheInner {
                store: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
            ttl,
            enabled: true,
        }
    }

    /// 根据配置创建缓存
    pub fn from_settings(settings: &CacheSettings) -> Self {
        let mut cache = Self::new(settings.capacity, settings.ttl());
        cache.enabled = settings.enabled;
        cache
    }

    /// 生成缓存键
    pub fn cache_key(text: &str, source_lang: &str, target_lang: &str) -> String {
        let hash = blake3::hash(format!("{}|{}|{}", text, source_lang, target_lang).as_bytes());
        format!("trans:{}", hash.to_hex())
    }

    /// 查询缓存
    ///
    /// 命中时刷新LRU顺序并累加条目访问计数；过期条目被移除并
    /// 同时计为一次过期和一次未命中。
    pub fn get(&self, text: &str, source_lang: &str, target_lang: &str) -> Option<TranslationOutcome> {
        if !self.enabled {
            return None;
        }
        let key = Self::cache_key(text, source_lang, target_lang);
        let mut inner = self.inner.write().ok()?;

        let expired = inner
            .store
            .get(&key)
            .map(|entry| entry.created_at.elapsed() > self.ttl);

        match expired {
            None => {
                inner.stats.misses += 1;
                None
            }
            Some(true) => {
                inner.store.pop(&key);
                inner.stats.expirations += 1;
                inner.stats.misses += 1;
                None
            }
            Some(false) => {
                inner.stats.hits += 1;
                let entry = inner.store.get_mut(&key)?;
                entry.access_count += 1;
                Some(entry.outcome.clone())
            }
        }
    }

    /// 写入缓存
    ///
    /// 缓存已满且键不存在时，最久未使用的条目被淘汰并计数。
    pub fn insert(&self, outcome: TranslationOutcome) {
        if !self.enabled {
            return;
        }
        let key = Self::cache_key(
            &outcome.original,
            &outcome.source_language,
            &outcome.target_language,
        );
        let Ok(mut inner) = self.inner.write() else {
            tracing::warn!("缓存锁中毒，跳过写入");
            return;
        };

        if inner.store.len() == inner.store.cap().get() && !inner.store.contains(&key) {
            inner.stats.evictions += 1;
        }
        inner.store.put(
            key,
            CacheEntry {
                outcome,
                created_at: Instant::now(),
                access_count: 0,
            },
        );
        inner.stats.insertions += 1;
    }

    /// 移除指定条目，返回是否存在
    pub fn remove(&self, text: &str, source_lang: &str, target_lang: &str) -> bool {
        let key = Self::cache_key(text, source_lang, target_lang);
        match self.inner.write() {
            Ok(mut inner) => inner.store.pop(&key).is_some(),
            Err(_) => false,
        }
    }

    /// 主动清理所有过期条目，返回移除数量
    pub fn cleanup_expired(&self) -> usize {
        let Ok(mut inner) = self.inner.write() else {
            return 0;
        };
        let expired_keys: Vec<String> = inner
            .store
            .iter()
            .filter(|(_, entry)| entry.created_at.elapsed() > self.ttl)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            inner.store.pop(key);
        }
        inner.stats.expirations += expired_keys.len() as u64;

        if !expired_keys.is_empty() {
            tracing::debug!("清理了 {} 条过期缓存", expired_keys.len());
        }
        expired_keys.len()
    }

    /// 调整缓存容量
    ///
    /// 缩容立即按LRU顺序淘汰多出的条目并计数。
    pub fn resize(&self, new_capacity: usize) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        let new_capacity = NonZeroUsize::new(new_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        let overflow = inner.store.len().saturating_sub(new_capacity.get());
        inner.stats.evictions += overflow as u64;
        inner.store.resize(new_capacity);
        tracing::debug!("缓存容量调整为 {}", new_capacity);
    }

    /// 清空缓存并重置统计
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.store.clear();
            inner.stats.reset();
        }
    }

    /// 当前条目数
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.store.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 当前统计快照
    pub fn stats(&self) -> CacheStats {
        self.inner
            .read()
            .map(|inner| inner.stats.clone())
            .unwrap_or_default()
    }

    /// 重置统计计数器（不清空条目）
    pub fn reset_stats(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.stats.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(text: &str) -> TranslationOutcome {
        TranslationOutcome::translated(
            text.to_string(),
            format!("{}-en", text),
            "de",
            "en",
            0.9,
            "local",
            Duration::from_millis(1),
        )
    }

    #[test]
    fn test_basic_get_insert() {
        let cache = TranslationCache::new(10, Duration::from_secs(60));
        assert!(cache.get("Motor", "de", "en").is_none());
        cache.insert(outcome("Motor"));
        let hit = cache.get("Motor", "de", "en").unwrap();
        assert_eq!(hit.translated, "Motor-en");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.insertions, 1);
    }

    #[test]
    fn test_language_pair_isolation() {
        let cache = TranslationCache::new(10, Duration::from_secs(60));
        cache.insert(outcome("Druck"));
        assert!(cache.get("Druck", "de", "en").is_some());
        assert!(cache.get("Druck", "fr", "en").is_none());
    }

    #[test]
    fn test_lru_eviction_order() {
        let cache = TranslationCache::new(2, Duration::from_secs(60));
        cache.insert(outcome("A"));
        cache.insert(outcome("B"));
        // 访问A使其成为最近使用
        assert!(cache.get("A", "de", "en").is_some());
        cache.insert(outcome("C"));

        assert!(cache.get("A", "de", "en").is_some());
        assert!(cache.get("B", "de", "en").is_none());
        assert!(cache.get("C", "de", "en").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_ttl_lazy_expiration() {
        let cache = TranslationCache::new(10, Duration::from_millis(10));
        cache.insert(outcome("Temp"));
        std::thread::sleep(Duration::from_millis(30));

        assert!(cache.get("Temp", "de", "en").is_none());
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cleanup_expired() {
        let cache = TranslationCache::new(10, Duration::from_millis(10));
        cache.insert(outcome("X"));
        cache.insert(outcome("Y"));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(cache.cleanup_expired(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().expirations, 2);
    }

    #[test]
    fn test_resize_evicts_lru_first() {
        let cache = TranslationCache::new(3, Duration::from_secs(60));
        cache.insert(outcome("A"));
        cache.insert(outcome("B"));
        cache.insert(outcome("C"));
        cache.get("A", "de", "en");

        cache.resize(1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("A", "de", "en").is_some());
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_clear_resets_stats() {
        let cache = TranslationCache::new(10, Duration::from_secs(60));
        cache.insert(outcome("A"));
        cache.get("A", "de", "en");
        cache.clear();
        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.insertions, 0);
    }

    #[test]
    fn test_disabled_cache_is_inert() {
        let settings = CacheSettings {
            enabled: false,
            ..Default::default()
        };
        let cache = TranslationCache::from_settings(&settings);
        cache.insert(outcome("A"));
        assert!(cache.get("A", "de", "en").is_none());
        assert!(cache.is_empty());
    }
}
