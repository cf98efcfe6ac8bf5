//! 本地离线后端
//!
//! 基于词汇表和构词规则的离线德英翻译，不依赖任何网络服务，
//! 是后端链条的保底选项。对汽车标定描述这类术语密集的短文本效果最好。
//!
//! 单词处理顺序：词汇表直查 → 复合词分解 → 词尾变换 → 保留原词。
//! 首字母大小写跟随原词。

use std::sync::Arc;

use super::super::error::{TranslationError, TranslationResult};
use super::super::glossary::Glossary;
use super::TranslationBackend;

const SERVICE: &str = "local";

/// 覆盖率对置信度的最大贡献
const COVERAGE_WEIGHT: f32 = 0.7;
/// 每个技术术语的加成
const TECHNICAL_BOOST: f32 = 0.05;
/// 覆盖率低于此值时打五折
const LOW_COVERAGE_RATIO: f32 = 0.3;
/// 本地翻译的置信度上限
const MAX_CONFIDENCE: f32 = 0.9;
/// 置信度下限
const MIN_CONFIDENCE: f32 = 0.1;

/// 离线规则翻译后端
pub struct LocalBackend {
    glossary: Arc<Glossary>,
}

impl LocalBackend {
    pub fn new(glossary: Arc<Glossary>) -> Self {
        Self { glossary }
    }

    /// 翻译单个单词，返回 `(译文, 是否命中)`
    fn translate_word(&self, word: &str) -> (String, bool) {
        // 去掉尾部标点做查询，翻译后再拼回去
        let trimmed_len = word
            .char_indices()
            .rev()
            .take_while(|(_, c)| !c.is_alphanumeric())
            .count();
        let split_at = word
            .char_indices()
            .nth(word.chars().count() - trimmed_len)
            .map(|(i, _)| i)
            .unwrap_or(word.len());
        let (clean, punctuation) = word.split_at(split_at);
        let lower = clean.to_lowercase();

        if lower.is_empty() {
            return (word.to_string(), false);
        }

        let translated = if let Some(hit) = self.glossary.lookup(&lower) {
            Some(hit.to_string())
        } else if let Some(parts) = self.glossary.split_compound(&lower) {
            Some(parts.join(" "))
        } else {
            self.glossary.apply_ending_rules(&lower)
        };

        match translated {
            Some(text) => {
                let adjusted = preserve_capitalization(clean, &text);
                (format!("{}{}", adjusted, punctuation), true)
            }
            None => (word.to_string(), false),
        }
    }

    /// 覆盖率置信度：命中比例 × 0.7 + 技术术语加成，限制在[0.1, 0.9]
    fn confidence(&self, original: &str, translated: &str, hits: usize, total: usize) -> f32 {
        if total == 0 {
            return 0.0;
        }
        let coverage = hits as f32 / total as f32;
        let mut base = coverage * COVERAGE_WEIGHT;
        if translated == original {
            base = MIN_CONFIDENCE;
        }
        if coverage < LOW_COVERAGE_RATIO {
            base *= 0.5;
        }
        let boost = self.glossary.count_technical_terms(original) as f32 * TECHNICAL_BOOST;
        (base + boost).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }
}

/// 原词首字母大写时，译文首字母也大写
fn preserve_capitalization(original: &str, translated: &str) -> String {
    let starts_upper = original.chars().next().map(|c| c.is_uppercase());
    match (starts_upper, translated.chars().next()) {
        (Some(true), Some(first)) => {
            let mut out = String::with_capacity(translated.len());
            out.extend(first.to_uppercase());
            out.push_str(&translated[first.len_utf8()..]);
            out
        }
        _ => translated.to_string(),
    }
}

#[async_trait::async_trait]
impl TranslationBackend for LocalBackend {
    fn name(&self) -> &'static str {
        SERVICE
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<(String, f32)> {
        if target_lang != "en" {
            return Err(TranslationError::backend(
                SERVICE,
                format!("本地后端只支持翻译到英语, 不支持 {}", target_lang),
            ));
        }
        // 非德语源直接返回原文，置信度压到下限
        if source_lang != "de" && source_lang != "auto" {
            return Ok((text.to_string(), MIN_CONFIDENCE));
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let total = words.len();
        let mut hits = 0usize;
        let mut output = Vec::with_capacity(total);

        for word in &words {
            let (translated, hit) = self.translate_word(word);
            if hit {
                hits += 1;
            }
            output.push(translated);
        }

        let translated_text = output.join(" ");
        let confidence = self.confidence(text, &translated_text, hits, total);
        tracing::trace!(
            "本地翻译: {}/{} 个词命中, 置信度 {:.2}",
            hits,
            total,
            confidence
        );
        Ok((translated_text, confidence))
    }

    fn is_available(&self) -> bool {
        // 离线后端永远可用
        true
    }

    async fn health_check(&self) -> bool {
        match self.translate("motor temperatur", "de", "en").await {
            Ok((text, _)) => {
                let lower = text.to_lowercase();
                lower.contains("engine") && lower.contains("temperature")
            }
            Err(_) => false,
        }
    }

    fn supported_languages(&self) -> Vec<&'static str> {
        vec!["de"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> LocalBackend {
        LocalBackend::new(Glossary::automotive())
    }

    #[tokio::test]
    async fn test_compound_description() {
        let (text, confidence) = backend()
            .translate("Abgastemperaturschwelle", "de", "en")
            .await
            .unwrap();
        assert_eq!(text, "Exhaust gas temperature threshold");
        assert!(confidence >= 0.7);
    }

    #[tokio::test]
    async fn test_phrase_with_function_words() {
        let (text, _) = backend()
            .translate("Motordrehzahl im Leerlauf", "de", "en")
            .await
            .unwrap();
        assert_eq!(text, "Engine rotational speed in the Idle");
    }

    #[tokio::test]
    async fn test_unknown_words_kept() {
        let (text, confidence) = backend()
            .translate("Qwertz blorp", "de", "en")
            .await
            .unwrap();
        assert_eq!(text, "Qwertz blorp");
        assert!((confidence - MIN_CONFIDENCE).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_punctuation_preserved() {
        let (text, _) = backend().translate("Druck, Wert.", "de", "en").await.unwrap();
        assert_eq!(text, "Pressure, Value.");
    }

    #[tokio::test]
    async fn test_non_german_source_passthrough() {
        let (text, confidence) = backend().translate("bonjour", "fr", "en").await.unwrap();
        assert_eq!(text, "bonjour");
        assert_eq!(confidence, MIN_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_unsupported_target_rejected() {
        let err = backend().translate("Wert", "de", "ja").await.unwrap_err();
        assert_eq!(err.service(), Some("local"));
    }

    #[tokio::test]
    async fn test_health_check() {
        assert!(backend().health_check().await);
    }

    #[test]
    fn test_capitalization_preserved() {
        assert_eq!(preserve_capitalization("Druck", "pressure"), "Pressure");
        assert_eq!(preserve_capitalization("druck", "pressure"), "pressure");
    }
}
