//! 文件重建器
//!
//! 把合格的译文按字节span精确写回原文件文本：span之外的每个字节
//! 原样保留，非记录行完全不经手。重建后重新解析输出做结构比对，
//! 比对结果只进报告，不阻止写出。

use std::collections::HashMap;

use encoding_rs::UTF_8;

use crate::parser::{parse_text, ParseMode, ParsedDamos};
use crate::translation::TranslationOutcome;

/// 单条被替换记录的明细
#[derive(Debug, Clone)]
pub struct ChangeDetail {
    pub line_index: usize,
    pub field_name: String,
    pub original: String,
    pub translated: String,
    pub confidence: f32,
    pub backend: String,
    /// 该条翻译的耗时
    pub processing_time: std::time::Duration,
}

/// 输出结构校验结果
///
/// 任何一项不一致都说明译文破坏了记录语法，仅作警示。
#[derive(Debug, Clone)]
pub struct ValidationSummary {
    pub line_count_match: bool,
    pub record_count_match: bool,
    pub fingerprints_match: bool,
}

impl ValidationSummary {
    pub fn passed(&self) -> bool {
        self.line_count_match && self.record_count_match && self.fingerprints_match
    }
}

/// 重建统计报告
#[derive(Debug, Clone)]
pub struct ReconstructionReport {
    /// 文件中的记录总数
    pub total_records: usize,
    /// 描述非空的记录数
    pub translatable_records: usize,
    /// 实际替换的记录数
    pub substituted: usize,
    /// 译文置信度低于阈值而保留原文的记录数
    pub below_threshold: usize,
    /// 所有后端都失败的记录数
    pub failed_translations: usize,
    /// 空描述跳过数
    pub skipped_empty: usize,
    /// 译文含有破坏记录语法的字符而被放弃的记录数
    pub structural_skips: usize,
    /// 使用的置信度阈值
    pub threshold: f32,
    /// 输出是否退回UTF-8编码
    pub encoding_fallback: bool,
    /// 输出实际使用的编码名
    pub output_encoding: &'static str,
    /// 解析是否处于退化模式
    pub degraded_parse: bool,
    /// 结构校验结果
    pub validation: ValidationSummary,
    /// 各后端的采用次数
    pub backend_usage: HashMap<String, usize>,
    /// 源语言分布
    pub language_usage: HashMap<String, usize>,
    /// 每条被替换记录的明细
    pub changes: Vec<ChangeDetail>,
}

impl ReconstructionReport {
    /// 翻译率：替换数 / 可翻译记录数
    pub fn translation_rate(&self) -> f64 {
        if self.translatable_records == 0 {
            0.0
        } else {
            self.substituted as f64 / self.translatable_records as f64
        }
    }
}

/// 按span重建文件
///
/// `outcomes`是`(记录下标, 翻译结果)`对，下标须指向`parsed.records`
/// 且互不重复；记录本身已按span升序排列。返回输出字节和报告。
pub fn reconstruct(
    parsed: &ParsedDamos,
    outcomes: &[(usize, TranslationOutcome)],
    threshold: f32,
) -> (Vec<u8>, ReconstructionReport) {
    let mut by_record: Vec<Option<&TranslationOutcome>> = vec![None; parsed.records.len()];
    for (index, outcome) in outcomes {
        if let Some(slot) = by_record.get_mut(*index) {
            *slot = Some(outcome);
        }
    }

    let mut output = String::with_capacity(parsed.text.len());
    let mut last_end = 0usize;

    let mut substituted = 0usize;
    let mut below_threshold = 0usize;
    let mut failed_translations = 0usize;
    let mut structural_skips = 0usize;
    let mut backend_usage: HashMap<String, usize> = HashMap::new();
    let mut language_usage: HashMap<String, usize> = HashMap::new();
    let mut changes = Vec::new();

    for (record, outcome) in parsed.records.iter().zip(by_record.iter()) {
        let Some(outcome) = outcome else {
            continue;
        };
        *language_usage
            .entry(outcome.source_language.clone())
            .or_insert(0) += 1;

        if !outcome.is_translated() {
            failed_translations += 1;
            continue;
        }
        if outcome.confidence < threshold {
            below_threshold += 1;
            continue;
        }
        if breaks_record_syntax(&outcome.translated) {
            tracing::warn!(
                "第 {} 行译文含有结构字符，保留原文: {}",
                record.line_index + 1,
                outcome.translated
            );
            structural_skips += 1;
            continue;
        }

        output.push_str(&parsed.text[last_end..record.span.start]);
        output.push_str(&outcome.translated);
        last_end = record.span.end;

        substituted += 1;
        *backend_usage.entry(outcome.backend_used.clone()).or_insert(0) += 1;
        changes.push(ChangeDetail {
            line_index: record.line_index,
            field_name: record.field_name.clone(),
            original: outcome.original.clone(),
            translated: outcome.translated.clone(),
            confidence: outcome.confidence,
            backend: outcome.backend_used.clone(),
            processing_time: outcome.processing_time,
        });
    }
    output.push_str(&parsed.text[last_end..]);

    // 输出结构校验
    let (_, new_snapshot, _) = parse_text(&output);
    let fingerprints_match = new_snapshot.fingerprints == parsed.snapshot.fingerprints;
    let validation = ValidationSummary {
        line_count_match: new_snapshot.line_count == parsed.snapshot.line_count,
        record_count_match: new_snapshot.record_count == parsed.snapshot.record_count,
        fingerprints_match,
    };
    if !validation.passed() {
        tracing::warn!(
            "输出结构校验未通过: 行数 {} -> {}, 记录数 {} -> {}",
            parsed.snapshot.line_count,
            new_snapshot.line_count,
            parsed.snapshot.record_count,
            new_snapshot.record_count
        );
    }

    // 按源编码写出，有无法映射的字符时退回UTF-8
    let (bytes, encoding_fallback) = encode_output(&output, parsed);
    let output_encoding = if encoding_fallback {
        UTF_8.name()
    } else {
        parsed.encoding.name()
    };

    let skipped_empty = parsed
        .records
        .iter()
        .filter(|record| !record.translatable)
        .count();

    let report = ReconstructionReport {
        total_records: parsed.records.len(),
        translatable_records: parsed.records.len() - skipped_empty,
        substituted,
        below_threshold,
        failed_translations,
        skipped_empty,
        structural_skips,
        threshold,
        encoding_fallback,
        output_encoding,
        degraded_parse: parsed.mode == ParseMode::Degraded,
        validation,
        backend_usage,
        language_usage,
        changes,
    };

    tracing::info!(
        "重建完成: {}/{} 条记录已替换 (翻译率 {:.1}%)",
        report.substituted,
        report.translatable_records,
        report.translation_rate() * 100.0
    );

    (bytes, report)
}

/// 译文中不允许出现的结构字符
fn breaks_record_syntax(text: &str) -> bool {
    text.contains('{') || text.contains('}') || text.contains('\n') || text.contains('\r')
}

fn encode_output(text: &str, parsed: &ParsedDamos) -> (Vec<u8>, bool) {
    let (bytes, _, had_unmappable) = parsed.encoding.encode(text);
    if had_unmappable {
        tracing::warn!(
            "输出含有 {} 无法表示的字符，退回UTF-8编码",
            parsed.encoding.name()
        );
        (text.as_bytes().to_vec(), true)
    } else {
        (bytes.into_owned(), false)
    }
}
