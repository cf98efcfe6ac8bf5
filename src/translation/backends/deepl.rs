//! DeepL后端
//!
//! 调用DeepL v2 API做神经机器翻译。密钥以`:fx`结尾时使用免费版端点。
//! DeepL不返回置信度，这里按其欧洲语言的已知质量给出启发式评分。

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::super::config::{constants, TranslationConfig};
use super::super::error::{TranslationError, TranslationResult};
use super::{RateLimiter, TranslationBackend};

const SERVICE: &str = "deepl";

/// 基础置信度（DeepL欧洲语言对的经验值）
const BASE_CONFIDENCE: f32 = 0.85;
/// 技术词汇加成
const TECHNICAL_BOOST: f32 = 0.05;
/// 德语功能词加成（DeepL的强项语言对）
const GERMAN_BOOST: f32 = 0.05;

const TECHNICAL_HINTS: &[&str] = &["temperatur", "druck", "motor", "sensor"];
const GERMAN_HINTS: &[&str] = &["der", "die", "das", "und", "für"];

#[derive(Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Deserialize)]
struct DeeplTranslation {
    text: String,
}

/// DeepL API后端
pub struct DeeplBackend {
    client: Client,
    api_key: Option<String>,
    translate_url: &'static str,
    usage_url: String,
    limiter: RateLimiter,
}

impl DeeplBackend {
    pub fn new(config: &TranslationConfig) -> TranslationResult<Self> {
        let api_key = config.deepl_api_key.clone();
        // 免费版密钥带:fx后缀，走独立端点
        let translate_url = match &api_key {
            Some(key) if key.ends_with(":fx") => constants::DEEPL_FREE_API_URL,
            _ => constants::DEEPL_PRO_API_URL,
        };
        let usage_url = translate_url.replace("/translate", "/usage");

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TranslationError::Config(format!("构建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            translate_url,
            usage_url,
            limiter: RateLimiter::per_minute(config.requests_per_minute),
        })
    }

    /// DeepL语言代码为大写形式
    fn map_language_code(lang: &str) -> Option<String> {
        if lang.is_empty() || lang == "auto" {
            None
        } else {
            Some(lang.to_ascii_uppercase())
        }
    }

    /// 启发式置信度：基础分 + 技术词汇加成 + 德语源加成
    fn confidence(original: &str, translated: &str) -> f32 {
        if translated.is_empty() || translated == original {
            return 0.0;
        }
        let lower = original.to_lowercase();
        let mut confidence = BASE_CONFIDENCE;
        if TECHNICAL_HINTS.iter().any(|term| lower.contains(term)) {
            confidence += TECHNICAL_BOOST;
        }
        if GERMAN_HINTS
            .iter()
            .any(|word| lower.split_whitespace().any(|w| w == *word))
        {
            confidence += GERMAN_BOOST;
        }
        confidence.min(1.0)
    }
}

#[async_trait::async_trait]
impl TranslationBackend for DeeplBackend {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<(String, f32)> {
        let Some(api_key) = &self.api_key else {
            return Err(TranslationError::Unavailable {
                service: SERVICE.to_string(),
            });
        };

        self.limiter.acquire().await;

        let target = Self::map_language_code(target_lang).ok_or_else(|| {
            TranslationError::Config(format!("DeepL不支持的目标语言: {}", target_lang))
        })?;

        let mut form: Vec<(&str, String)> = vec![
            ("auth_key", api_key.clone()),
            ("text", text.to_string()),
            ("target_lang", target),
            ("preserve_formatting", "1".to_string()),
            ("formality", "default".to_string()),
        ];
        if let Some(source) = Self::map_language_code(source_lang) {
            form.push(("source_lang", source));
        }

        let response = self
            .client
            .post(self.translate_url)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(TranslationError::RateLimited(format!(
                "DeepL返回 {}",
                status
            )));
        }
        if !status.is_success() {
            return Err(TranslationError::backend(
                SERVICE,
                format!("HTTP {}", status),
            ));
        }

        let body: DeeplResponse = response.json().await?;
        let translation = body.translations.into_iter().next().ok_or_else(|| {
            TranslationError::backend(SERVICE, "响应中没有翻译结果")
        })?;

        let confidence = Self::confidence(text, &translation.text);
        tracing::debug!("DeepL翻译完成, 置信度 {:.2}", confidence);
        Ok((translation.text, confidence))
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn health_check(&self) -> bool {
        let Some(api_key) = &self.api_key else {
            return false;
        };
        self.limiter.acquire().await;

        let result = self
            .client
            .get(&self.usage_url)
            .query(&[("auth_key", api_key.as_str())])
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                match response.json::<serde_json::Value>().await {
                    Ok(body) => body.get("character_count").is_some(),
                    Err(_) => false,
                }
            }
            _ => false,
        }
    }

    fn supported_languages(&self) -> Vec<&'static str> {
        vec![
            "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "hu", "id", "it", "ja",
            "ko", "lt", "lv", "nb", "nl", "pl", "pt", "ro", "ru", "sk", "sl", "sv", "tr", "uk",
            "zh",
        ]
    }
}
