//! 德英汽车术语词汇表
//!
//! 不可变的查询服务：基础词汇、复合词组件、词尾变换规则和技术术语表。
//! 构建后不再修改，通过`Arc`在各组件间共享；运行时追加术语通过
//! [`Glossary::with_custom_terms`] 重建一份新表来实现。

use std::collections::HashMap;
use std::sync::Arc;

/// 基础词汇映射（德语小写 → 英语）
const VOCABULARY: &[(&str, &str)] = &[
    // 冠词与连词
    ("der", "the"),
    ("die", "the"),
    ("das", "the"),
    ("den", "the"),
    ("dem", "the"),
    ("des", "of the"),
    ("ein", "a"),
    ("eine", "a"),
    ("einen", "a"),
    ("einem", "a"),
    ("einer", "a"),
    ("und", "and"),
    ("oder", "or"),
    ("aber", "but"),
    ("wenn", "if"),
    ("dann", "then"),
    // 介词
    ("für", "for"),
    ("fuer", "for"),
    ("mit", "with"),
    ("bei", "at"),
    ("von", "from"),
    ("zu", "to"),
    ("nach", "after"),
    ("vor", "before"),
    ("über", "above"),
    ("unter", "under"),
    ("zwischen", "between"),
    ("während", "during"),
    ("ohne", "without"),
    ("gegen", "against"),
    ("durch", "through"),
    ("um", "around"),
    ("an", "at"),
    ("auf", "on"),
    ("in", "in"),
    ("aus", "from"),
    ("bis", "until"),
    ("seit", "since"),
    ("im", "in the"),
    ("am", "at the"),
    ("zum", "to the"),
    ("zur", "to the"),
    ("beim", "at the"),
    ("vom", "from the"),
    // 常用动词
    ("ist", "is"),
    ("sind", "are"),
    ("war", "was"),
    ("wird", "will be"),
    ("werden", "become"),
    ("haben", "have"),
    ("hat", "has"),
    ("sein", "be"),
    ("kann", "can"),
    ("soll", "should"),
    ("muss", "must"),
    // 技术名词
    ("wert", "value"),
    ("zeit", "time"),
    ("temperatur", "temperature"),
    ("druck", "pressure"),
    ("geschwindigkeit", "speed"),
    ("drehzahl", "rotational speed"),
    ("faktor", "factor"),
    ("schwelle", "threshold"),
    ("grenze", "limit"),
    ("bereich", "range"),
    ("anzahl", "number"),
    ("menge", "amount"),
    ("zähler", "counter"),
    ("zhler", "counter"),
    ("messung", "measurement"),
    ("sensor", "sensor"),
    ("signal", "signal"),
    ("spannung", "voltage"),
    ("strom", "current"),
    ("leistung", "power"),
    ("kennfeld", "characteristic map"),
    ("kennlinie", "characteristic curve"),
    ("leerlauf", "idle"),
    // 汽车术语
    ("motor", "engine"),
    ("abgas", "exhaust gas"),
    ("katalysator", "catalytic converter"),
    ("benzin", "gasoline"),
    ("diesel", "diesel"),
    ("öl", "oil"),
    ("kraftstoff", "fuel"),
    ("zündung", "ignition"),
    ("einspritzung", "injection"),
    ("einspritz", "injection"),
    ("ventil", "valve"),
    ("kolben", "piston"),
    ("zylinder", "cylinder"),
    ("getriebe", "transmission"),
    ("bremse", "brake"),
    ("brems", "brake"),
    ("lenkung", "steering"),
    ("rad", "wheel"),
    ("reifen", "tire"),
    ("lambda", "lambda"),
    ("nockenwelle", "camshaft"),
    ("kurbelwelle", "crankshaft"),
    // 形容词
    ("groß", "large"),
    ("klein", "small"),
    ("hoch", "high"),
    ("niedrig", "low"),
    ("lang", "long"),
    ("kurz", "short"),
    ("neu", "new"),
    ("alt", "old"),
    ("schnell", "fast"),
    ("langsam", "slow"),
    ("stark", "strong"),
    ("schwach", "weak"),
    ("warm", "warm"),
    ("kalt", "cold"),
    ("oberer", "upper"),
    ("unterer", "lower"),
    ("obere", "upper"),
    ("untere", "lower"),
    ("maximal", "maximum"),
    ("minimal", "minimum"),
    ("maximale", "maximum"),
    ("minimale", "minimum"),
    ("optimal", "optimal"),
    ("normal", "normal"),
    ("aktiv", "active"),
    ("passiv", "passive"),
    ("max", "maximum"),
    ("min", "minimum"),
    ("alle", "all"),
    ("jede", "each"),
    ("mehr", "more"),
    ("weniger", "less"),
    // 动作与状态
    ("starten", "start"),
    ("start", "start"),
    ("stoppen", "stop"),
    ("stopp", "stop"),
    ("messen", "measure"),
    ("prüfen", "check"),
    ("prüf", "check"),
    ("regeln", "regulate"),
    ("überwachen", "monitor"),
    ("erkennen", "recognize"),
    ("erkennung", "recognition"),
    ("diagnose", "diagnosis"),
    ("fehler", "error"),
    ("störung", "fault"),
    ("warnung", "warning"),
    ("alarm", "alarm"),
    ("offen", "open"),
    ("geschlossen", "closed"),
    ("inaktiv", "inactive"),
    ("bereit", "ready"),
    ("verfügbar", "available"),
    ("gesperrt", "locked"),
    // 复合词组件
    ("steuerung", "control"),
    ("regelung", "regulation"),
    ("überwachung", "monitoring"),
    ("einstellung", "setting"),
    ("anpassung", "adaptation"),
    ("korrektur", "correction"),
    ("verstärkung", "amplification"),
    ("dämpfung", "damping"),
    ("filter", "filter"),
    ("regler", "controller"),
    ("wandler", "converter"),
    ("verstärker", "amplifier"),
    ("begrenzer", "limiter"),
    ("schalter", "switch"),
    ("kontrolle", "control"),
    ("prüfung", "test"),
];

/// 词尾变换规则（后缀 → 英语后缀）
const ENDING_RULES: &[(&str, &str)] = &[
    ("ung", "tion"),
    ("keit", "ity"),
    ("heit", "ness"),
    ("schaft", "ship"),
    ("ismus", "ism"),
    ("ität", "ity"),
    ("ieren", "ate"),
    ("lich", "ly"),
    ("bar", "able"),
];

/// 汽车领域技术术语（用于置信度加成）
const TECHNICAL_TERMS: &[&str] = &[
    "temperatur",
    "druck",
    "motor",
    "sensor",
    "signal",
    "wert",
];

/// 复合词拆分时组件的最短长度
const MIN_COMPONENT_LEN: usize = 3;

/// 不可变德英词汇表
#[derive(Debug)]
pub struct Glossary {
    vocabulary: HashMap<String, String>,
}

impl Glossary {
    /// 构建内置汽车术语表
    pub fn automotive() -> Arc<Self> {
        let vocabulary = VOCABULARY
            .iter()
            .map(|&(de, en)| (de.to_string(), en.to_string()))
            .collect();
        Arc::new(Self { vocabulary })
    }

    /// 在内置词汇表基础上追加自定义术语，返回一份新表
    ///
    /// 自定义术语覆盖同名内置条目；原有的`Arc<Glossary>`不受影响。
    pub fn with_custom_terms(&self, terms: &[(String, String)]) -> Arc<Self> {
        let mut vocabulary = self.vocabulary.clone();
        for (de, en) in terms {
            vocabulary.insert(de.to_lowercase(), en.clone());
        }
        Arc::new(Self { vocabulary })
    }

    /// 直接词汇查询（输入应为小写）
    pub fn lookup(&self, word: &str) -> Option<&str> {
        self.vocabulary.get(word).map(|s| s.as_str())
    }

    /// 递归拆分德语复合词
    ///
    /// 贪心取最长的已知前缀，剩余部分递归处理；只有整个单词都能
    /// 分解为已知组件时才返回结果。`Abgastemperaturschwelle` →
    /// `["exhaust gas", "temperature", "threshold"]`。
    pub fn split_compound(&self, word: &str) -> Option<Vec<&str>> {
        if word.len() < MIN_COMPONENT_LEN {
            return None;
        }
        // 整词命中优先
        if let Some(translation) = self.lookup(word) {
            return Some(vec![translation]);
        }

        let prefix_lengths: Vec<usize> = word
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .filter(|&len| len >= MIN_COMPONENT_LEN && len < word.len())
            .collect();

        // 从最长前缀开始尝试
        for &len in prefix_lengths.iter().rev() {
            let (prefix, rest) = word.split_at(len);
            let Some(head) = self.lookup(prefix) else {
                continue;
            };
            // 德语复合词常用连接音s，允许跳过
            let rest_trimmed = rest.strip_prefix('s').filter(|r| r.len() >= MIN_COMPONENT_LEN);
            for candidate in [Some(rest), rest_trimmed].into_iter().flatten() {
                if let Some(mut tail) = self.split_compound(candidate) {
                    let mut parts = vec![head];
                    parts.append(&mut tail);
                    return Some(parts);
                }
            }
        }
        None
    }

    /// 应用词尾变换规则
    ///
    /// 词根在词汇表中时用`词根翻译 + 英语后缀`，否则只替换后缀。
    pub fn apply_ending_rules(&self, word: &str) -> Option<String> {
        for &(suffix, replacement) in ENDING_RULES {
            if let Some(root) = word.strip_suffix(suffix) {
                if root.is_empty() {
                    continue;
                }
                return Some(match self.lookup(root) {
                    Some(translation) => format!("{}{}", translation, replacement),
                    None => format!("{}{}", root, replacement),
                });
            }
        }
        None
    }

    /// 统计文本中出现的技术术语数（用于置信度加成）
    pub fn count_technical_terms(&self, text: &str) -> usize {
        let lower = text.to_lowercase();
        TECHNICAL_TERMS
            .iter()
            .filter(|term| lower.contains(*term))
            .count()
    }

    /// 词汇表条目数
    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_lookup() {
        let glossary = Glossary::automotive();
        assert_eq!(glossary.lookup("motor"), Some("engine"));
        assert_eq!(glossary.lookup("schwelle"), Some("threshold"));
        assert_eq!(glossary.lookup("xyz"), None);
    }

    #[test]
    fn test_compound_splitting() {
        let glossary = Glossary::automotive();
        assert_eq!(
            glossary.split_compound("abgastemperaturschwelle"),
            Some(vec!["exhaust gas", "temperature", "threshold"])
        );
        assert_eq!(
            glossary.split_compound("motordrehzahl"),
            Some(vec!["engine", "rotational speed"])
        );
        // 无法完整分解时不返回部分结果
        assert_eq!(glossary.split_compound("motorxyz"), None);
    }

    #[test]
    fn test_compound_linking_s() {
        let glossary = Glossary::automotive();
        // Zündungswinkel之类带连接音s的构词
        assert_eq!(
            glossary.split_compound("leistungsgrenze"),
            Some(vec!["power", "limit"])
        );
    }

    #[test]
    fn test_ending_rules() {
        let glossary = Glossary::automotive();
        // 词根不在词汇表：仅替换后缀
        assert_eq!(
            glossary.apply_ending_rules("sicherheit"),
            Some("sicherness".to_string())
        );
        assert_eq!(glossary.apply_ending_rules("wert"), None);
    }

    #[test]
    fn test_custom_terms_override() {
        let base = Glossary::automotive();
        let custom = base.with_custom_terms(&[
            ("motor".to_string(), "motor".to_string()),
            ("sonde".to_string(), "probe".to_string()),
        ]);
        assert_eq!(custom.lookup("motor"), Some("motor"));
        assert_eq!(custom.lookup("sonde"), Some("probe"));
        // 原表保持不变
        assert_eq!(base.lookup("motor"), Some("engine"));
        assert_eq!(base.lookup("sonde"), None);
    }

    #[test]
    fn test_technical_term_counting() {
        let glossary = Glossary::automotive();
        assert_eq!(
            glossary.count_technical_terms("Abgastemperatur am Motor"),
            2
        );
        assert_eq!(glossary.count_technical_terms("hello world"), 0);
    }
}
