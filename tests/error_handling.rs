//! 错误路径集成测试
//!
//! 验证后端全部失败、超时和不可用后端被跳过时流水线仍然跑完，
//! 文件原样写出且报告如实统计。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use damos_translator::core::{translate_damos_data_with_engine, DamosOptions};
use damos_translator::translation::{
    BackendKind, TranslationBackend, TranslationConfig, TranslationEngine, TranslationError,
    TranslationResult, BACKEND_NONE,
};

const SAMPLE: &str = "\
/EPR, 4711\n\
1, /SPZ, ABGTEMP, {Abgastemperaturschwelle}, 2, $100, $200\n\
2, /SPZ, DRUCK, {Druckwert}, 2, $104, $208\n";

struct FailingBackend;

#[async_trait]
impl TranslationBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn translate(
        &self,
        _text: &str,
        _source: &str,
        _target: &str,
    ) -> TranslationResult<(String, f32)> {
        Err(TranslationError::backend("failing", "service down"))
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn supported_languages(&self) -> Vec<&'static str> {
        vec![]
    }
}

struct UnavailableBackend;

#[async_trait]
impl TranslationBackend for UnavailableBackend {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn translate(
        &self,
        _text: &str,
        _source: &str,
        _target: &str,
    ) -> TranslationResult<(String, f32)> {
        panic!("不可用的后端不应被调用");
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn supported_languages(&self) -> Vec<&'static str> {
        vec![]
    }
}

/// 睡过超时时限的后端
struct HangingBackend;

#[async_trait]
impl TranslationBackend for HangingBackend {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn translate(
        &self,
        _text: &str,
        _source: &str,
        _target: &str,
    ) -> TranslationResult<(String, f32)> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!()
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn health_check(&self) -> bool {
        false
    }

    fn supported_languages(&self) -> Vec<&'static str> {
        vec![]
    }
}

fn german_config() -> TranslationConfig {
    TranslationConfig {
        source_lang: "de".to_string(),
        primary_backend: BackendKind::Local,
        fallback_backends: vec![],
        ..Default::default()
    }
}

fn options() -> DamosOptions {
    DamosOptions {
        translation: german_config(),
        skip_validation: false,
    }
}

#[tokio::test]
async fn test_all_backends_fail_run_completes() {
    let engine = TranslationEngine::with_backends(german_config(), vec![Arc::new(FailingBackend)]);
    let run = translate_damos_data_with_engine(SAMPLE.as_bytes(), &engine, &options())
        .await
        .unwrap();

    // 输出逐字节等于输入
    assert_eq!(run.output, SAMPLE.as_bytes());
    assert_eq!(run.report.substituted, 0);
    assert_eq!(run.report.failed_translations, 2);
    assert!(run.engine_stats.failed_translations > 0);
    assert!(run.report.validation.passed());
    println!("✅ 后端全部失败时文件原样写出");
}

#[tokio::test]
async fn test_failed_outcome_uses_none_sentinel() {
    let engine = TranslationEngine::with_backends(german_config(), vec![Arc::new(FailingBackend)]);
    let outcome = engine.translate_text("Druckwert").await;

    assert_eq!(outcome.translated, "Druckwert");
    assert_eq!(outcome.confidence, 0.0);
    assert_eq!(outcome.backend_used, BACKEND_NONE);
    println!("✅ 失败结果带none哨兵值");
}

#[tokio::test]
async fn test_unavailable_backend_skipped() {
    // 不可用的后端被跳过而不是panic，后续后端接手
    struct GoodBackend;

    #[async_trait]
    impl TranslationBackend for GoodBackend {
        fn name(&self) -> &'static str {
            "good"
        }

        async fn translate(
            &self,
            _text: &str,
            _source: &str,
            _target: &str,
        ) -> TranslationResult<(String, f32)> {
            Ok(("pressure value".to_string(), 0.9))
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn supported_languages(&self) -> Vec<&'static str> {
            vec!["de"]
        }
    }

    let engine = TranslationEngine::with_backends(
        german_config(),
        vec![Arc::new(UnavailableBackend), Arc::new(GoodBackend)],
    );
    let outcome = engine.translate_text("Druckwert").await;
    assert_eq!(outcome.backend_used, "good");
    assert_eq!(outcome.translated, "pressure value");
    println!("✅ 不可用后端被跳过");
}

#[tokio::test]
async fn test_backend_timeout_falls_through() {
    let config = TranslationConfig {
        request_timeout_secs: 1,
        ..german_config()
    };
    let engine = TranslationEngine::with_backends(config, vec![Arc::new(HangingBackend)]);
    let outcome = engine.translate_text("Druckwert").await;

    assert_eq!(outcome.translated, "Druckwert");
    assert_eq!(outcome.backend_used, BACKEND_NONE);
    println!("✅ 后端超时按失败处理");
}

#[tokio::test]
async fn test_error_retryability_surface() {
    let retryable = TranslationError::Timeout("30s".to_string());
    assert!(retryable.is_retryable());

    let permanent = TranslationError::Config("bad threshold".to_string());
    assert!(!permanent.is_retryable());

    let tagged = TranslationError::backend("deepl", "HTTP 500");
    assert_eq!(tagged.service(), Some("deepl"));
    println!("✅ 错误分类符合预期");
}
