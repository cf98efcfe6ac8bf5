//! 翻译配置管理
//!
//! 集中管理翻译流程的所有可调参数：后端选择、置信度阈值、
//! 缓存容量与TTL、并发与速率限制。支持TOML文件和环境变量两种来源。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{TranslationError, TranslationResult};

// ============================================================================
// 常量定义
// ============================================================================

/// 默认配置常量
pub mod constants {
    use std::time::Duration;

    /// 默认源语言（auto表示自动检测）
    pub const DEFAULT_SOURCE_LANG: &str = "auto";
    /// 默认目标语言
    pub const DEFAULT_TARGET_LANG: &str = "en";
    /// 默认置信度阈值
    pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
    /// 默认缓存容量（条目数）
    pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
    /// 默认缓存TTL（小时）
    pub const DEFAULT_CACHE_TTL_HOURS: f64 = 24.0;
    /// 默认最大并发翻译数
    pub const DEFAULT_MAX_CONCURRENT: usize = 5;
    /// 默认批次大小（每批提交的条目数）
    pub const DEFAULT_BATCH_SIZE: usize = 100;
    /// 默认每分钟请求上限
    pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 100;
    /// 单次后端调用超时
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    /// DeepL付费版API端点
    pub const DEEPL_PRO_API_URL: &str = "https://api.deepl.com/v2/translate";
    /// DeepL免费版API端点（:fx后缀密钥）
    pub const DEEPL_FREE_API_URL: &str = "https://api-free.deepl.com/v2/translate";
    /// LibreTranslate默认实例
    pub const LIBRE_DEFAULT_API_URL: &str = "https://libretranslate.de";
}

/// 可用的翻译后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Deepl,
    Libre,
    Local,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deepl => "deepl",
            Self::Libre => "libre",
            Self::Local => "local",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deepl" => Ok(Self::Deepl),
            "libre" | "libretranslate" => Ok(Self::Libre),
            "local" | "offline" => Ok(Self::Local),
            other => Err(TranslationError::Config(format!(
                "未知的翻译后端: {}",
                other
            ))),
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// 是否启用缓存
    pub enabled: bool,
    /// 最大条目数
    pub capacity: usize,
    /// 条目存活时间（小时，支持小数）
    pub ttl_hours: f64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: constants::DEFAULT_CACHE_CAPACITY,
            ttl_hours: constants::DEFAULT_CACHE_TTL_HOURS,
        }
    }
}

impl CacheSettings {
    /// TTL换算为Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs_f64(self.ttl_hours * 3600.0)
    }
}

/// 翻译流程总配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// 源语言代码，"auto"表示自动检测
    pub source_lang: String,
    /// 目标语言代码
    pub target_lang: String,
    /// 接受翻译结果的最低置信度
    pub confidence_threshold: f32,
    /// 首选后端
    pub primary_backend: BackendKind,
    /// 备选后端，按尝试顺序排列
    pub fallback_backends: Vec<BackendKind>,
    /// 最大并发翻译数
    pub max_concurrent: usize,
    /// 批次大小：批量翻译按此数量分批提交
    pub batch_size: usize,
    /// 每分钟请求上限（远程后端）
    pub requests_per_minute: u32,
    /// 单次后端调用超时（秒）
    pub request_timeout_secs: u64,
    /// DeepL API密钥（也可用环境变量DEEPL_API_KEY）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deepl_api_key: Option<String>,
    /// LibreTranslate端点（也可用环境变量LIBRE_API_URL）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libre_api_url: Option<String>,
    /// LibreTranslate API密钥（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libre_api_key: Option<String>,
    /// 缓存配置
    pub cache: CacheSettings,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            source_lang: constants::DEFAULT_SOURCE_LANG.to_string(),
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            confidence_threshold: constants::DEFAULT_CONFIDENCE_THRESHOLD,
            primary_backend: BackendKind::Deepl,
            fallback_backends: vec![BackendKind::Libre, BackendKind::Local],
            max_concurrent: constants::DEFAULT_MAX_CONCURRENT,
            batch_size: constants::DEFAULT_BATCH_SIZE,
            requests_per_minute: constants::DEFAULT_REQUESTS_PER_MINUTE,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            deepl_api_key: None,
            libre_api_url: None,
            libre_api_key: None,
            cache: CacheSettings::default(),
        }
    }
}

impl TranslationConfig {
    /// 从TOML文件加载配置
    pub fn from_file(path: &Path) -> TranslationResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::Config(format!("读取配置文件失败: {}", e)))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| TranslationError::Config(format!("解析配置文件失败: {}", e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 纯默认值 + 环境变量覆盖
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// 环境变量覆盖凭据类字段
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("DEEPL_API_KEY") {
            if !key.is_empty() {
                self.deepl_api_key = Some(key);
            }
        }
        if let Ok(url) = std::env::var("LIBRE_API_URL") {
            if !url.is_empty() {
                self.libre_api_url = Some(url);
            }
        }
        if let Ok(key) = std::env::var("LIBRE_API_KEY") {
            if !key.is_empty() {
                self.libre_api_key = Some(key);
            }
        }
    }

    /// 校验配置合法性
    pub fn validate(&self) -> TranslationResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(TranslationError::Config(format!(
                "置信度阈值必须在0.0-1.0之间: {}",
                self.confidence_threshold
            )));
        }
        if self.max_concurrent == 0 {
            return Err(TranslationError::Config(
                "最大并发数必须大于0".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TranslationError::Config("批次大小必须大于0".to_string()));
        }
        if self.cache.capacity == 0 && self.cache.enabled {
            return Err(TranslationError::Config(
                "缓存容量必须大于0".to_string(),
            ));
        }
        if self.target_lang.trim().is_empty() {
            return Err(TranslationError::Config("目标语言不能为空".to_string()));
        }
        Ok(())
    }

    /// 完整的后端尝试顺序（首选 + 备选，去重）
    pub fn backend_order(&self) -> Vec<BackendKind> {
        let mut order = vec![self.primary_backend];
        for &kind in &self.fallback_backends {
            if !order.contains(&kind) {
                order.push(kind);
            }
        }
        order
    }

    /// 单次后端调用超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 生成带注释的示例配置文件内容
    pub fn example_toml() -> String {
        let mut out = String::new();
        out.push_str("# DAMOS翻译器配置文件\n");
        out.push_str("# 凭据也可以通过环境变量提供: DEEPL_API_KEY, LIBRE_API_URL\n\n");
        match toml::to_string_pretty(&Self::default()) {
            Ok(body) => out.push_str(&body),
            Err(e) => tracing::warn!("序列化示例配置失败: {}", e),
        }
        out
    }
}
