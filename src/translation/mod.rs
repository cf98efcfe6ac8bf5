//! 翻译子系统
//!
//! 多后端、带缓存和置信度门控的文本翻译调度，
//! 为DAMOS描述文本提供德语到英语（及其他语言对）的翻译能力。
//!
//! ## 架构
//!
//! ```text
//! TranslationEngine (调度)
//!   ├── LanguageDetector (源语言检测)
//!   ├── TranslationCache (LRU + TTL)
//!   └── backends (按序尝试)
//!        ├── DeeplBackend  (神经MT API)
//!        ├── LibreBackend  (开源API)
//!        └── LocalBackend  (离线词汇表，保底)
//! ```

pub mod backends;
pub mod cache;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod glossary;

pub use backends::{DeeplBackend, LibreBackend, LocalBackend, RateLimiter, TranslationBackend};
pub use cache::{CacheStats, TranslationCache};
pub use config::{BackendKind, CacheSettings, TranslationConfig};
pub use detector::LanguageDetector;
pub use engine::{EngineStats, TranslationEngine, TranslationOutcome, BACKEND_NONE};
pub use error::{TranslationError, TranslationResult};
pub use glossary::Glossary;

/// 用默认配置翻译单条文本的便捷入口
pub async fn translate_text(text: &str) -> TranslationResult<TranslationOutcome> {
    let engine = TranslationEngine::new(TranslationConfig::default())?;
    Ok(engine.translate_text(text).await)
}
