//! 翻译后端
//!
//! 定义后端能力接口并提供三个实现：DeepL（神经机器翻译API）、
//! LibreTranslate（开源自托管API）和本地离线规则翻译。
//! 调度器只依赖 [`TranslationBackend`] trait，后端之间可以自由组合。

mod deepl;
mod libre;
mod local;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::config::{BackendKind, TranslationConfig};
use super::error::TranslationResult;
use super::glossary::Glossary;

pub use deepl::DeeplBackend;
pub use libre::LibreBackend;
pub use local::LocalBackend;

/// 翻译后端能力接口
///
/// 实现必须满足`Send + Sync`，以便在批量翻译的并发任务间共享。
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// 后端标识名（出现在错误、统计和报告中）
    fn name(&self) -> &'static str;

    /// 翻译单条文本，返回 `(译文, 置信度)`
    ///
    /// 置信度在[0,1]区间，由各后端的启发式算法给出。
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<(String, f32)>;

    /// 后端当前是否可用（凭据已配置等），不做网络探测
    fn is_available(&self) -> bool;

    /// 主动健康检查，可能发起网络请求
    async fn health_check(&self) -> bool;

    /// 支持的源语言代码
    fn supported_languages(&self) -> Vec<&'static str>;
}

/// 请求间隔限制器
///
/// 通过互斥锁串行化同一后端的请求节奏：持锁期间完成等待和时间戳更新，
/// 并发调用会自然排队。
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// 按每分钟请求数创建限制器，0表示不限制
    pub fn per_minute(requests_per_minute: u32) -> Self {
        let min_interval = if requests_per_minute > 0 {
            Duration::from_secs_f64(60.0 / requests_per_minute as f64)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// 等待到允许发起下一次请求
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// 根据配置的尝试顺序构建后端实例列表
pub fn build_backends(
    config: &TranslationConfig,
    glossary: Arc<Glossary>,
) -> TranslationResult<Vec<Arc<dyn TranslationBackend>>> {
    let mut backends: Vec<Arc<dyn TranslationBackend>> = Vec::new();
    for kind in config.backend_order() {
        let backend: Arc<dyn TranslationBackend> = match kind {
            BackendKind::Deepl => Arc::new(DeeplBackend::new(config)?),
            BackendKind::Libre => Arc::new(LibreBackend::new(config)?),
            BackendKind::Local => Arc::new(LocalBackend::new(Arc::clone(&glossary))),
        };
        tracing::debug!("注册翻译后端: {}", backend.name());
        backends.push(backend);
    }
    Ok(backends)
}
