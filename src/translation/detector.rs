//! 源语言检测
//!
//! 基于特征词表的加权打分检测器，面向汽车标定文本优化。
//! 支持德语、法语、意大利语、西班牙语；得分过低时返回"unknown"。

// ============================================================================
// 打分权重
// ============================================================================

/// 常用功能词权重
const WEIGHT_COMMON_WORD: f32 = 2.0;
/// 汽车领域指示词权重
const WEIGHT_AUTOMOTIVE: f32 = 3.0;
/// 特征字符（变音符号等）权重
const WEIGHT_DIACRITIC: f32 = 1.5;
/// 构词词尾权重
const WEIGHT_ENDING: f32 = 1.0;
/// 复合词指示词权重
const WEIGHT_COMPOUND: f32 = 2.5;
/// 低于此置信度时判定为unknown
const MIN_CONFIDENCE: f32 = 0.1;

/// 单个语言的特征描述
struct LanguageProfile {
    code: &'static str,
    common_words: &'static [&'static str],
    automotive_indicators: &'static [&'static str],
    diacritics: &'static [char],
    word_endings: &'static [&'static str],
    compound_indicators: &'static [&'static str],
}

static PROFILES: &[LanguageProfile] = &[
    LanguageProfile {
        code: "de",
        common_words: &[
            "der", "die", "das", "und", "oder", "mit", "für", "bei", "von", "zu", "im", "am",
            "ist", "sind", "wird", "werden", "hat", "haben", "kann", "soll", "muss", "nach",
            "vor", "über", "unter", "zwischen", "während", "ohne", "gegen",
        ],
        automotive_indicators: &[
            "motor", "temperatur", "druck", "sensor", "ventil", "steuerung", "regelung",
            "katalysator", "lambdasonde", "drosselklappe", "einspritzung", "zündung", "abgas",
            "kraftstoff", "leerlauf", "drehzahl", "zylinder", "kolben",
        ],
        diacritics: &['ä', 'ö', 'ü', 'ß'],
        word_endings: &["ung", "tion", "heit", "keit", "schaft", "tum"],
        compound_indicators: &["temperatur", "druck", "sensor", "ventil", "steuerung"],
    },
    LanguageProfile {
        code: "fr",
        common_words: &[
            "le", "la", "les", "de", "du", "des", "et", "ou", "avec", "pour", "par", "dans",
            "est", "sont", "sera", "seront", "ont", "peut", "doit", "va", "après", "avant",
            "sur", "sous", "entre", "pendant", "sans", "contre",
        ],
        automotive_indicators: &[
            "moteur", "température", "pression", "capteur", "valve", "contrôle", "régulation",
            "catalyseur", "sonde", "papillon", "injection", "allumage", "échappement",
            "carburant", "ralenti", "régime", "cylindre", "piston",
        ],
        diacritics: &[
            'é', 'è', 'ê', 'ë', 'à', 'â', 'ç', 'î', 'ï', 'ô', 'ù', 'û', 'ÿ',
        ],
        word_endings: &["tion", "sion", "ment", "ance", "ence", "eur", "euse"],
        compound_indicators: &["température", "pression", "capteur", "valve", "contrôle"],
    },
    LanguageProfile {
        code: "it",
        common_words: &[
            "il", "la", "lo", "gli", "le", "di", "del", "della", "con", "per", "da", "in",
            "è", "sono", "sarà", "saranno", "ha", "hanno", "può", "deve", "va", "dopo",
            "prima", "sopra", "sotto", "tra", "durante", "senza", "contro",
        ],
        automotive_indicators: &[
            "motore", "temperatura", "pressione", "sensore", "valvola", "controllo",
            "regolazione", "catalizzatore", "sonda", "farfalla", "iniezione", "accensione",
            "scarico", "carburante", "minimo", "regime", "cilindro", "pistone",
        ],
        diacritics: &['à', 'è', 'é', 'ì', 'í', 'î', 'ò', 'ó', 'ù', 'ú'],
        word_endings: &["zione", "sione", "mento", "anza", "enza", "ore", "tore"],
        compound_indicators: &["temperatura", "pressione", "sensore", "valvola", "controllo"],
    },
    LanguageProfile {
        code: "es",
        common_words: &[
            "el", "la", "los", "las", "de", "del", "y", "o", "con", "para", "por", "en",
            "es", "son", "será", "serán", "ha", "han", "puede", "debe", "va", "después",
            "antes", "sobre", "bajo", "entre", "durante", "sin", "contra",
        ],
        automotive_indicators: &[
            "motor", "temperatura", "presión", "sensor", "válvula", "control", "regulación",
            "catalizador", "sonda", "mariposa", "inyección", "encendido", "escape",
            "combustible", "ralentí", "régimen", "cilindro", "pistón",
        ],
        diacritics: &['á', 'é', 'í', 'ó', 'ú', 'ñ'],
        word_endings: &["ción", "sión", "miento", "anza", "encia", "dor", "dora"],
        compound_indicators: &["temperatura", "presión", "sensor", "válvula", "control"],
    },
];

/// 语言检测器
#[derive(Debug, Default)]
pub struct LanguageDetector;

impl LanguageDetector {
    pub fn new() -> Self {
        Self
    }

    /// 检测单条文本的语言
    ///
    /// 返回 `(语言代码, 置信度)`；空文本或得分低于阈值时返回
    /// `("unknown", 置信度)`。
    pub fn detect(&self, text: &str) -> (String, f32) {
        if text.trim().is_empty() {
            return ("unknown".to_string(), 0.0);
        }

        let text_lower = text.to_lowercase();
        let word_count = text_lower.split_whitespace().count();
        if word_count == 0 {
            return ("unknown".to_string(), 0.0);
        }

        let mut best: (&str, f32) = ("unknown", 0.0);
        for profile in PROFILES {
            let score = Self::score_profile(profile, text, &text_lower) / word_count as f32;
            if score > best.1 {
                best = (profile.code, score);
            }
        }

        let confidence = best.1.min(1.0);
        if confidence < MIN_CONFIDENCE {
            ("unknown".to_string(), confidence)
        } else {
            (best.0.to_string(), confidence)
        }
    }

    /// 对一批描述做联合语言检测
    ///
    /// 合并文本的整体检测与逐条检测的多数投票相互印证：
    /// 两者一致时置信度提升20%（封顶1.0），不一致时取置信度更高的一方。
    pub fn detect_batch(&self, texts: &[&str]) -> (String, f32) {
        if texts.is_empty() {
            return ("unknown".to_string(), 0.0);
        }

        let combined = texts.join(" ");
        let (combined_lang, combined_conf) = self.detect(&combined);

        let individual: Vec<(String, f32)> = texts
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| self.detect(t))
            .filter(|(lang, _)| lang != "unknown")
            .collect();

        if individual.is_empty() {
            return (combined_lang, combined_conf);
        }

        // 多数投票
        let mut votes: Vec<(&str, usize)> = Vec::new();
        for (lang, _) in &individual {
            match votes.iter_mut().find(|(l, _)| l == lang) {
                Some((_, count)) => *count += 1,
                None => votes.push((lang, 1)),
            }
        }
        let (majority_lang, _) = votes
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|&(lang, count)| (lang.to_string(), count))
            .unwrap_or(("unknown".to_string(), 0));

        let matching: Vec<f32> = individual
            .iter()
            .filter(|(lang, _)| *lang == majority_lang)
            .map(|(_, conf)| *conf)
            .collect();
        let avg_confidence = matching.iter().sum::<f32>() / matching.len() as f32;

        if majority_lang == combined_lang {
            let boosted = ((avg_confidence + combined_conf) / 2.0 * 1.2).min(1.0);
            (majority_lang, boosted)
        } else if avg_confidence > combined_conf {
            (majority_lang, avg_confidence)
        } else {
            (combined_lang, combined_conf)
        }
    }

    fn score_profile(profile: &LanguageProfile, original: &str, lower: &str) -> f32 {
        let common = count_substring_total(lower, profile.common_words);
        let automotive = count_substring_total(lower, profile.automotive_indicators);
        let diacritics: usize = original
            .chars()
            .filter(|c| profile.diacritics.contains(c))
            .count();
        let endings: usize = lower
            .split_whitespace()
            .map(|word| {
                profile
                    .word_endings
                    .iter()
                    .filter(|ending| word.ends_with(*ending))
                    .count()
            })
            .sum();
        let compounds = count_substring_total(lower, profile.compound_indicators);

        common as f32 * WEIGHT_COMMON_WORD
            + automotive as f32 * WEIGHT_AUTOMOTIVE
            + diacritics as f32 * WEIGHT_DIACRITIC
            + endings as f32 * WEIGHT_ENDING
            + compounds as f32 * WEIGHT_COMPOUND
    }
}

/// 统计所有关键词在文本中的出现总次数（子串匹配）
fn count_substring_total(text: &str, keywords: &[&str]) -> usize {
    keywords
        .iter()
        .map(|keyword| text.matches(keyword).count())
        .sum()
}
