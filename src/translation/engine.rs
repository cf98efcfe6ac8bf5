//! 翻译调度器
//!
//! 整个翻译子系统的协调核心：语言解析 → 缓存查询 → 按序尝试后端 →
//! 置信度门控 → 结果缓存。批量翻译通过信号量限制并发，
//! 单条失败不影响其余条目，输出顺序与输入一致。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::Semaphore;

use super::backends::{build_backends, TranslationBackend};
use super::cache::{CacheStats, TranslationCache};
use super::config::TranslationConfig;
use super::detector::LanguageDetector;
use super::error::TranslationResult;
use super::glossary::Glossary;

/// 所有后端都失败或无需翻译时的占位后端名
pub const BACKEND_NONE: &str = "none";

/// 单条文本的翻译结果
///
/// 构建后不可变；失败时`translated`等于`original`、置信度为0、
/// 后端名为`"none"`，调用方据此决定是否替换。
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub original: String,
    pub translated: String,
    pub source_language: String,
    pub target_language: String,
    /// 置信度，[0,1]区间
    pub confidence: f32,
    /// 产生译文的后端名，失败时为"none"
    pub backend_used: String,
    pub word_count: usize,
    pub translated_word_count: usize,
    pub processing_time: Duration,
}

impl TranslationOutcome {
    /// 成功翻译的结果
    pub fn translated(
        original: String,
        translated: String,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        confidence: f32,
        backend_used: impl Into<String>,
        processing_time: Duration,
    ) -> Self {
        let word_count = original.split_whitespace().count();
        let translated_word_count = translated.split_whitespace().count();
        Self {
            original,
            translated,
            source_language: source_language.into(),
            target_language: target_language.into(),
            confidence,
            backend_used: backend_used.into(),
            word_count,
            translated_word_count,
            processing_time,
        }
    }

    /// 保持原文不变的结果（翻译失败或无需翻译）
    pub fn unchanged(
        original: String,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        processing_time: Duration,
    ) -> Self {
        let word_count = original.split_whitespace().count();
        Self {
            translated: original.clone(),
            original,
            source_language: source_language.into(),
            target_language: target_language.into(),
            confidence: 0.0,
            backend_used: BACKEND_NONE.to_string(),
            word_count,
            translated_word_count: word_count,
            processing_time,
        }
    }

    /// 是否产生了实际译文
    pub fn is_translated(&self) -> bool {
        self.backend_used != BACKEND_NONE && self.translated != self.original
    }
}

/// 调度器运行统计
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// 总请求数
    pub total_requests: u64,
    /// 成功翻译数
    pub successful: u64,
    /// 所有后端都失败的条目数
    pub failed_translations: u64,
    /// 空文本跳过数
    pub skipped_empty: u64,
    /// 源语言为英语或未知而直接放行的条目数
    pub no_translation_needed: u64,
    /// 各后端的采用次数
    pub backend_usage: HashMap<String, u64>,
}

impl EngineStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 翻译调度器
pub struct TranslationEngine {
    config: TranslationConfig,
    backends: Vec<Arc<dyn TranslationBackend>>,
    cache: TranslationCache,
    detector: LanguageDetector,
    semaphore: Arc<Semaphore>,
    cancelled: AtomicBool,
    stats: RwLock<EngineStats>,
}

impl TranslationEngine {
    /// 按配置构建调度器（后端链、缓存、检测器）
    pub fn new(config: TranslationConfig) -> TranslationResult<Self> {
        config.validate()?;
        let glossary = Glossary::automotive();
        let backends = build_backends(&config, glossary)?;
        Ok(Self::with_backends(config, backends))
    }

    /// 用显式的后端列表构建调度器
    ///
    /// 后端按列表顺序尝试；测试中可以注入桩后端。
    pub fn with_backends(
        config: TranslationConfig,
        backends: Vec<Arc<dyn TranslationBackend>>,
    ) -> Self {
        let cache = TranslationCache::from_settings(&config.cache);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config,
            backends,
            cache,
            detector: LanguageDetector::new(),
            semaphore,
            cancelled: AtomicBool::new(false),
            stats: RwLock::new(EngineStats::default()),
        }
    }

    /// 翻译单条文本
    ///
    /// 源语言未指定时对该条文本单独做语言检测。
    pub async fn translate_text(&self, text: &str) -> TranslationOutcome {
        let source = self.resolve_source_language(|| self.detector.detect(text).0);
        self.translate_with_source(text, &source).await
    }

    /// 批量翻译，输出顺序与输入一致
    ///
    /// 源语言未指定时对整批做一次联合检测，所有条目共用检测结果。
    /// 条目按`batch_size`分批提交，批内由信号量限制并发；
    /// 取消标志生效后剩余条目以原文返回。
    pub async fn translate_batch(&self, texts: &[String]) -> Vec<TranslationOutcome> {
        if texts.is_empty() {
            return Vec::new();
        }

        let source = self.resolve_source_language(|| {
            let non_empty: Vec<&str> = texts
                .iter()
                .map(|t| t.as_str())
                .filter(|t| !t.trim().is_empty())
                .collect();
            let (lang, confidence) = self.detector.detect_batch(&non_empty);
            tracing::info!("批量语言检测: {} (置信度 {:.2})", lang, confidence);
            lang
        });

        let batch_size = self.config.batch_size.max(1);
        let mut outcomes = Vec::with_capacity(texts.len());
        for (batch_index, chunk) in texts.chunks(batch_size).enumerate() {
            tracing::debug!("提交第 {} 批: {} 条", batch_index + 1, chunk.len());
            let tasks = chunk.iter().map(|text| {
                let source = source.clone();
                async move {
                    if self.cancelled.load(Ordering::Relaxed) {
                        return TranslationOutcome::unchanged(
                            text.clone(),
                            source.clone(),
                            self.config.target_lang.clone(),
                            Duration::ZERO,
                        );
                    }
                    // 信号量关闭只在引擎销毁时发生，这里按取消处理
                    match self.semaphore.acquire().await {
                        Ok(_permit) => self.translate_with_source(text, &source).await,
                        Err(_) => TranslationOutcome::unchanged(
                            text.clone(),
                            source.clone(),
                            self.config.target_lang.clone(),
                            Duration::ZERO,
                        ),
                    }
                }
            });

            // join_all保持批内顺序，批次按序拼接
            outcomes.extend(join_all(tasks).await);
        }
        outcomes
    }

    /// 单条文本的完整调度流程
    async fn translate_with_source(&self, text: &str, source: &str) -> TranslationOutcome {
        let started = Instant::now();
        let target = self.config.target_lang.clone();

        if let Ok(mut stats) = self.stats.write() {
            stats.total_requests += 1;
        }

        if text.trim().is_empty() {
            if let Ok(mut stats) = self.stats.write() {
                stats.skipped_empty += 1;
            }
            return TranslationOutcome::unchanged(
                text.to_string(),
                source.to_string(),
                target,
                started.elapsed(),
            );
        }

        // 英语源或语言不明时不调用后端
        if source == target || source == "unknown" {
            if let Ok(mut stats) = self.stats.write() {
                stats.no_translation_needed += 1;
            }
            return TranslationOutcome::unchanged(
                text.to_string(),
                source.to_string(),
                target,
                started.elapsed(),
            );
        }

        if let Some(hit) = self.cache.get(text, source, &target) {
            tracing::trace!("缓存命中: {}", text);
            if let Ok(mut stats) = self.stats.write() {
                stats.successful += 1;
                *stats.backend_usage.entry(hit.backend_used.clone()).or_insert(0) += 1;
            }
            return hit;
        }

        let threshold = self.config.confidence_threshold;
        for backend in &self.backends {
            if !backend.is_available() {
                tracing::debug!("后端 {} 不可用，跳过", backend.name());
                continue;
            }

            let attempt = tokio::time::timeout(
                self.config.request_timeout(),
                backend.translate(text, source, &target),
            )
            .await;

            match attempt {
                Ok(Ok((translated, confidence))) if confidence >= threshold => {
                    let outcome = TranslationOutcome::translated(
                        text.to_string(),
                        translated,
                        source.to_string(),
                        target.clone(),
                        confidence,
                        backend.name(),
                        started.elapsed(),
                    );
                    self.cache.insert(outcome.clone());
                    if let Ok(mut stats) = self.stats.write() {
                        stats.successful += 1;
                        *stats
                            .backend_usage
                            .entry(backend.name().to_string())
                            .or_insert(0) += 1;
                    }
                    return outcome;
                }
                Ok(Ok((_, confidence))) => {
                    tracing::debug!(
                        "后端 {} 置信度 {:.2} 低于阈值 {:.2}，尝试下一个",
                        backend.name(),
                        confidence,
                        threshold
                    );
                }
                Ok(Err(err)) => {
                    tracing::warn!("后端 {} 翻译失败: {}", backend.name(), err);
                }
                Err(_) => {
                    tracing::warn!(
                        "后端 {} 超时 ({}s)",
                        backend.name(),
                        self.config.request_timeout_secs
                    );
                }
            }
        }

        tracing::warn!("所有后端均未给出合格译文: {}", text);
        if let Ok(mut stats) = self.stats.write() {
            stats.failed_translations += 1;
        }
        TranslationOutcome::unchanged(
            text.to_string(),
            source.to_string(),
            target,
            started.elapsed(),
        )
    }

    /// 配置了明确源语言时直接使用，否则调用检测回调
    fn resolve_source_language(&self, detect: impl FnOnce() -> String) -> String {
        if self.config.source_lang != "auto" {
            self.config.source_lang.clone()
        } else {
            detect()
        }
    }

    /// 请求取消：批量翻译不再提交新条目
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        tracing::info!("翻译已请求取消");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// 各后端的健康状态
    pub async fn health_check(&self) -> HashMap<String, bool> {
        let mut statuses = HashMap::new();
        for backend in &self.backends {
            statuses.insert(backend.name().to_string(), backend.health_check().await);
        }
        statuses
    }

    /// 运行统计快照
    pub fn stats(&self) -> EngineStats {
        self.stats
            .read()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }

    pub fn reset_stats(&self) {
        if let Ok(mut stats) = self.stats.write() {
            stats.reset();
        }
    }

    /// 缓存统计快照
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// 清理过期缓存条目，返回移除数量
    pub fn cleanup_cache(&self) -> usize {
        self.cache.cleanup_expired()
    }

    /// 调整缓存容量
    pub fn resize_cache(&self, capacity: usize) {
        self.cache.resize(capacity);
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }
}
