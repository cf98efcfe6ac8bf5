//! LibreTranslate后端
//!
//! 调用LibreTranslate开源翻译API，可指向公共实例或自托管实例。
//! 作为商业服务不可用时的网络备选，置信度评分偏保守。

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::super::config::{constants, TranslationConfig};
use super::super::error::{TranslationError, TranslationResult};
use super::{RateLimiter, TranslationBackend};

const SERVICE: &str = "libre";

/// 保守的基础置信度
const BASE_CONFIDENCE: f32 = 0.6;
/// 常见语言对冠词加成
const ARTICLE_BOOST: f32 = 0.1;
/// 长文本上下文加成
const CONTEXT_BOOST: f32 = 0.05;
/// 译文过短惩罚
const SHORT_PENALTY: f32 = 0.1;
/// 置信度上限
const MAX_CONFIDENCE: f32 = 0.8;
/// 置信度下限
const MIN_CONFIDENCE: f32 = 0.1;

const ARTICLE_HINTS: &[&str] = &["der", "die", "das", "le", "la", "el"];

#[derive(Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// LibreTranslate后端
pub struct LibreBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    limiter: RateLimiter,
}

impl LibreBackend {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        let base_url = config
            .libre_api_url
            .clone()
            .unwrap_or_else(|| constants::LIBRE_DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TranslationError::Config(format!("构建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.libre_api_key.clone(),
            limiter: RateLimiter::per_minute(config.requests_per_minute),
        })
    }

    /// 保守置信度：基础分 + 冠词/上下文加成 - 短译文惩罚，限制在[0.1, 0.8]
    fn confidence(original: &str, translated: &str) -> f32 {
        if translated.is_empty() || translated == original {
            return 0.0;
        }
        let lower = original.to_lowercase();
        let mut confidence = BASE_CONFIDENCE;
        if ARTICLE_HINTS
            .iter()
            .any(|word| lower.split_whitespace().any(|w| w == *word))
        {
            confidence += ARTICLE_BOOST;
        }
        let original_words = original.split_whitespace().count();
        if original_words > 2 {
            confidence += CONTEXT_BOOST;
        }
        if translated.split_whitespace().count() * 2 < original_words {
            confidence -= SHORT_PENALTY;
        }
        confidence.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}

#[async_trait::async_trait]
impl TranslationBackend for LibreBackend {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<(String, f32)> {
        self.limiter.acquire().await;

        let mut form: Vec<(&str, String)> = vec![
            ("q", text.to_string()),
            ("source", source_lang.to_string()),
            ("target", target_lang.to_string()),
            ("format", "text".to_string()),
        ];
        if let Some(key) = &self.api_key {
            form.push(("api_key", key.clone()));
        }

        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(TranslationError::RateLimited(format!(
                "LibreTranslate返回 {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(TranslationError::backend(
                SERVICE,
                format!("HTTP {}", status),
            ));
        }

        let body: LibreResponse = response.json().await?;
        let confidence = Self::confidence(text, &body.translated_text);
        tracing::debug!("LibreTranslate翻译完成, 置信度 {:.2}", confidence);
        Ok((body.translated_text, confidence))
    }

    fn is_available(&self) -> bool {
        // 端点总是有默认值，可用性由实际请求决定
        true
    }

    async fn health_check(&self) -> bool {
        self.limiter.acquire().await;
        let result = self
            .client
            .get(format!("{}/languages", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                match response.json::<serde_json::Value>().await {
                    Ok(body) => body.as_array().map(|list| !list.is_empty()).unwrap_or(false),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }

    fn supported_languages(&self) -> Vec<&'static str> {
        vec![
            "ar", "az", "ca", "cs", "da", "de", "el", "en", "eo", "es", "fa", "fi", "fr", "ga",
            "he", "hi", "hu", "id", "it", "ja", "ko", "nl", "pl", "pt", "ru", "sk", "sv", "tr",
            "uk", "zh",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_url_trailing_slash_stripped() {
        let config = TranslationConfig {
            libre_api_url: Some("http://localhost:5000/".to_string()),
            ..Default::default()
        };
        let backend = LibreBackend::new(&config).unwrap();
        assert_eq!(backend.base_url, "http://localhost:5000");
    }

    #[test]
    fn test_confidence_clamping() {
        // 冠词 + 长文本加成
        let conf = LibreBackend::confidence("der Wert für die Messung", "the value for the measurement");
        assert!((conf - 0.75).abs() < 1e-6);

        // 上限0.8以内
        assert!(LibreBackend::confidence("a b c d", "x y z w") <= 0.8);
        assert_eq!(LibreBackend::confidence("gleich", "gleich"), 0.0);
    }

    #[test]
    fn test_short_translation_penalty() {
        let conf = LibreBackend::confidence("eins zwei drei vier fünf sechs", "one");
        assert!((conf - 0.55).abs() < 1e-6);
    }
}
