//! DAMOS记录解析器
//!
//! 从原始文件字节中提取可翻译的描述字段，其余内容一律视为不透明字节。
//! 解析器从不合并或拆分行，输入输出行号保持一一对应。

use std::sync::LazyLock;

use encoding_rs::{Encoding, ISO_8859_15, UTF_8, WINDOWS_1252};
use regex::Regex;
use thiserror::Error;

/// 编码检测候选列表，按优先级排列
///
/// UTF-8优先，随后是欧洲汽车行业工具常见的Latin系编码
const ENCODING_CANDIDATES: &[&Encoding] = &[UTF_8, WINDOWS_1252, ISO_8859_15];

/// 记录行的主语法
///
/// `<序号>, /<指令>, <大写标识符>, {<自由文本>}` 之后是不透明的尾部字段
static RECORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*,\s*/([A-Z][A-Z0-9]*)\s*,\s*([A-Za-z0-9_.\-]+)\s*,\s*\{([^}]*)\}(.*)$")
        .expect("record pattern is valid")
});

/// 严格尾部：`, <数字类型码>, $<十六进制地址>[, $<十六进制地址>]`，尾部字段按指令可选
static STRICT_TAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:,\s*\d+\s*(?:,\s*\$[0-9A-Fa-f]+\s*){0,2})?\r?$")
        .expect("tail pattern is valid")
});

/// 头部指令行：`/<指令>,`
static DIRECTIVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*/([A-Z]+),").expect("directive pattern is valid"));

/// 解析错误类型
#[derive(Error, Debug)]
pub enum ParserError {
    /// 所有候选编码都无法解码文件
    #[error("无法用任何受支持的编码解码文件")]
    Decode,

    /// 文件完全不像DAMOS格式（仅作诊断，不阻断处理）
    #[error("文件结构不符合DAMOS格式: {0}")]
    Structure(String),
}

/// 描述文本在解码后文件文本中的精确字节范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// 一条可翻译的DAMOS参数记录
///
/// 解析后不再修改；翻译结果记录在独立的结构中，不回写到记录上。
#[derive(Debug, Clone)]
pub struct Record {
    /// 源文件中的序号，原样保留
    pub sequence_id: String,
    /// 指令名（如SPZ）
    pub directive: String,
    /// 大写参数标识符，原样保留
    pub field_name: String,
    /// 可翻译的描述文本，可能为空
    pub description: String,
    /// 花括号之后的尾部字段，作为不透明字符串逐字节保留
    pub auxiliary: String,
    /// 所在行号（从0计）
    pub line_index: usize,
    /// 描述文本的精确span，只覆盖本记录的这一处出现
    pub span: Span,
    /// 空描述不参与翻译
    pub translatable: bool,
}

/// 记录指纹：用于重建后的结构比对
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFingerprint {
    pub field_name: String,
    pub auxiliary: String,
}

/// 文件结构快照
///
/// 解析器和重建器共同使用，确认重建后的文件与原文件结构同构。
#[derive(Debug, Clone)]
pub struct FileStructureSnapshot {
    pub line_count: usize,
    pub record_count: usize,
    pub fingerprints: Vec<RecordFingerprint>,
}

/// 解析模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// 所有记录都带严格尾部（类型码 + 地址）
    Standard,
    /// 没有任何记录匹配严格尾部，退化解析，需在报告中标注
    Degraded,
}

/// 解析结果
#[derive(Debug, Clone)]
pub struct ParsedDamos {
    /// 解码后的完整文件文本
    pub text: String,
    /// 检测到的源文件编码
    pub encoding: &'static Encoding,
    /// 按文档顺序排列的记录（span严格递增）
    pub records: Vec<Record>,
    /// 结构快照
    pub snapshot: FileStructureSnapshot,
    /// 解析模式
    pub mode: ParseMode,
}

impl ParsedDamos {
    /// 返回所有非空描述及其记录下标
    pub fn translatable_descriptions(&self) -> Vec<(usize, &str)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.translatable)
            .map(|(i, r)| (i, r.description.as_str()))
            .collect()
    }
}

/// 解析DAMOS文件字节
///
/// 依次尝试候选编码，第一个能无损解码整个文件的编码胜出；
/// 全部失败时返回 [`ParserError::Decode`]。
pub fn parse(bytes: &[u8]) -> Result<ParsedDamos, ParserError> {
    let (encoding, text) = detect_encoding(bytes)?;
    tracing::debug!("检测到文件编码: {}", encoding.name());

    let (records, snapshot, mode) = parse_text(&text);
    tracing::info!(
        "解析完成: {} 行, {} 条记录, 模式 {:?}",
        snapshot.line_count,
        snapshot.record_count,
        mode
    );

    Ok(ParsedDamos {
        text,
        encoding,
        records,
        snapshot,
        mode,
    })
}

/// 解析已解码的文件文本（重建器复用此入口做输出校验）
pub fn parse_text(text: &str) -> (Vec<Record>, FileStructureSnapshot, ParseMode) {
    let mut records = Vec::new();
    let mut strict_count = 0usize;
    let mut line_count = 0usize;
    let mut offset = 0usize;

    for (line_index, line) in text.split_inclusive('\n').enumerate() {
        line_count += 1;
        let body_len = line.len() - trailing_terminator_len(line);
        let body = &line[..body_len];

        if let Some(caps) = RECORD_PATTERN.captures(body) {
            let desc = caps.get(4).expect("group 4 always present");
            let tail = caps.get(5).expect("group 5 always present");
            if STRICT_TAIL_PATTERN.is_match(tail.as_str()) {
                strict_count += 1;
            }

            let description = desc.as_str().to_string();
            records.push(Record {
                sequence_id: caps[1].to_string(),
                directive: caps[2].to_string(),
                field_name: caps[3].to_string(),
                translatable: !description.trim().is_empty(),
                description,
                auxiliary: tail.as_str().to_string(),
                line_index,
                span: Span {
                    start: offset + desc.start(),
                    end: offset + desc.end(),
                },
            });
        }

        offset += line.len();
    }

    let mode = if records.is_empty() || strict_count > 0 {
        ParseMode::Standard
    } else {
        ParseMode::Degraded
    };

    let snapshot = FileStructureSnapshot {
        line_count,
        record_count: records.len(),
        fingerprints: records
            .iter()
            .map(|r| RecordFingerprint {
                field_name: r.field_name.clone(),
                auxiliary: r.auxiliary.clone(),
            })
            .collect(),
    };

    (records, snapshot, mode)
}

/// 启发式地判断文件是否像DAMOS格式
///
/// 满足以下任一条件即为真：识别出创建工具横幅、顶层/EPR指令，
/// 或前100行内出现记录行。仅作建议，不作为解析的硬性门槛。
pub fn validate(bytes: &[u8]) -> bool {
    let (text, _, _) = UTF_8.decode(bytes);

    let mut has_banner = false;
    let mut has_epr = false;
    let mut has_record = false;

    for (i, line) in text.lines().enumerate() {
        if i < 10 {
            if line.contains("Created by") || line.contains("ASAP2DAM") {
                has_banner = true;
            }
            if line.trim_start().starts_with("/EPR,") {
                has_epr = true;
            }
        }
        if i >= 100 {
            break;
        }
        if RECORD_PATTERN.is_match(line) {
            has_record = true;
            break;
        }
    }

    has_banner || has_epr || has_record
}

/// 结构启发式检查的诊断版本
///
/// [`validate`]失败时给出具体的 [`ParserError::Structure`] 诊断，
/// 调用方只应记录告警，不应据此中断处理。
pub fn check_structure(bytes: &[u8]) -> Result<(), ParserError> {
    if validate(bytes) {
        Ok(())
    } else {
        Err(ParserError::Structure(
            "前100行内没有记录行，也没有创建工具横幅或/EPR指令".to_string(),
        ))
    }
}

/// 判断一行是否为头部/注释/指令行
pub fn is_header_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("***") || trimmed.starts_with(';') || DIRECTIVE_PATTERN.is_match(line)
}

/// 编码检测：按候选顺序做严格解码
pub fn detect_encoding(bytes: &[u8]) -> Result<(&'static Encoding, String), ParserError> {
    for &encoding in ENCODING_CANDIDATES {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return Ok((encoding, text.into_owned()));
        }
        tracing::debug!("编码 {} 解码失败，尝试下一个候选", encoding.name());
    }
    Err(ParserError::Decode)
}

fn trailing_terminator_len(line: &str) -> usize {
    if line.ends_with("\r\n") {
        2
    } else if line.ends_with('\n') {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
*** Created by ASAP2DAM converter ***\n\
/EPR, 4711\n\
; comment line\n\
1, /SPZ, ABGTEMP, {Abgastemperaturschwelle}, 2, $100, $200\n\
2, /SPZ, MOTDREH, {Motordrehzahl im Leerlauf}, 2, $104, $208\n\
3, /SPZ, LEER, {}, 2, $108, $210\n";

    #[test]
    fn test_parse_records_and_spans() {
        let parsed = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.snapshot.line_count, 6);
        assert_eq!(parsed.mode, ParseMode::Standard);

        let first = &parsed.records[0];
        assert_eq!(first.sequence_id, "1");
        assert_eq!(first.directive, "SPZ");
        assert_eq!(first.field_name, "ABGTEMP");
        assert_eq!(first.description, "Abgastemperaturschwelle");
        assert!(first.translatable);
        assert_eq!(
            &parsed.text[first.span.start..first.span.end],
            "Abgastemperaturschwelle"
        );
    }

    #[test]
    fn test_empty_description_not_translatable() {
        let parsed = parse(SAMPLE.as_bytes()).unwrap();
        let empty = &parsed.records[2];
        assert_eq!(empty.description, "");
        assert!(!empty.translatable);
        assert_eq!(parsed.translatable_descriptions().len(), 2);
    }

    #[test]
    fn test_header_lines_are_not_records() {
        let parsed = parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(parsed.snapshot.record_count, 3);
        assert!(is_header_line("*** Created by tool ***"));
        assert!(is_header_line("/EPR, 4711"));
        assert!(is_header_line("; comment"));
        assert!(!is_header_line("1, /SPZ, X, {y}, 2, $1, $2"));
    }

    #[test]
    fn test_malformed_address_still_parses() {
        let input = "7, /SPZ, ODD, {Druckwert}, 2, $GGG, $1Z\n";
        let (records, _, mode) = parse_text(input);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].auxiliary, ", 2, $GGG, $1Z");
        // 尾部不是严格格式，但文件里没有任何严格记录，进入退化模式
        assert_eq!(mode, ParseMode::Degraded);
    }

    #[test]
    fn test_degraded_mode_not_triggered_when_strict_exists() {
        let input = "1, /SPZ, A, {x}, 2, $100, $200\n7, /SPZ, ODD, {y}, 2, $GGG\n";
        let (_, _, mode) = parse_text(input);
        assert_eq!(mode, ParseMode::Standard);
    }

    #[test]
    fn test_latin1_fallback_decoding() {
        // 0xFC 是latin系编码的 'ü'，不是合法UTF-8
        let mut bytes = b"1, /SPZ, TST, {Pr\xFCfwert}, 2, $100, $200\n".to_vec();
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.encoding, WINDOWS_1252);
        assert_eq!(parsed.records[0].description, "Prüfwert");

        bytes.clear();
        bytes.extend_from_slice("1, /SPZ, TST, {Prüfwert}, 2, $100, $200\n".as_bytes());
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.encoding, UTF_8);
    }

    #[test]
    fn test_validate_heuristics() {
        assert!(validate(SAMPLE.as_bytes()));
        assert!(validate(b"1, /SPZ, A, {x}, 2, $1, $2\n"));
        assert!(!validate(b"just some random\ntext file\n"));
    }

    #[test]
    fn test_check_structure_diagnostic() {
        assert!(check_structure(SAMPLE.as_bytes()).is_ok());
        let err = check_structure(b"just some random\ntext file\n").unwrap_err();
        assert!(matches!(err, ParserError::Structure(_)));
        assert!(err.to_string().contains("不符合DAMOS格式"));
    }

    #[test]
    fn test_crlf_line_endings_preserved_in_spans() {
        let input = "1, /SPZ, A, {Wert}, 2, $1, $2\r\n2, /SPZ, B, {Zeit}, 2, $3, $4\r\n";
        let (records, snapshot, _) = parse_text(input);
        assert_eq!(snapshot.line_count, 2);
        assert_eq!(&input[records[1].span.start..records[1].span.end], "Zeit");
    }
}
