//! 翻译报告生成
//!
//! 把重建报告渲染为人类可读的纯文本，随输出文件一起保存。

use chrono::Local;

use crate::reconstructor::ReconstructionReport;

/// 置信度直方图的分桶边界
const HISTOGRAM_BUCKETS: &[(f32, f32, &str)] = &[
    (0.0, 0.5, "0.0 - 0.5"),
    (0.5, 0.7, "0.5 - 0.7"),
    (0.7, 0.8, "0.7 - 0.8"),
    (0.8, 0.9, "0.8 - 0.9"),
    (0.9, 1.01, "0.9 - 1.0"),
];

/// 渲染完整的翻译报告
pub fn render_report(report: &ReconstructionReport, input_name: &str, output_name: &str) -> String {
    let mut out = String::new();
    let divider = "=".repeat(50);

    out.push_str("DAMOS Translation Report\n");
    out.push_str(&divider);
    out.push('\n');
    out.push_str(&format!(
        "Generated: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("Input:  {}\n", input_name));
    out.push_str(&format!("Output: {}\n\n", output_name));

    // 汇总统计
    out.push_str(&format!("Total records: {}\n", report.total_records));
    out.push_str(&format!(
        "Translatable records: {}\n",
        report.translatable_records
    ));
    out.push_str(&format!("Translated records: {}\n", report.substituted));
    out.push_str(&format!(
        "Translation rate: {:.1}%\n",
        report.translation_rate() * 100.0
    ));
    out.push_str(&format!(
        "Confidence threshold: {:.2}\n",
        report.threshold
    ));
    out.push_str(&format!(
        "Below threshold (kept original): {}\n",
        report.below_threshold
    ));
    out.push_str(&format!(
        "Failed translations: {}\n",
        report.failed_translations
    ));
    out.push_str(&format!("Empty descriptions skipped: {}\n", report.skipped_empty));
    if report.structural_skips > 0 {
        out.push_str(&format!(
            "Rejected (unsafe characters): {}\n",
            report.structural_skips
        ));
    }
    out.push_str(&format!("Output encoding: {}\n", report.output_encoding));
    if report.encoding_fallback {
        out.push_str("NOTE: output fell back to UTF-8 encoding\n");
    }
    if report.degraded_parse {
        out.push_str("NOTE: file parsed in degraded mode (no strict record tails)\n");
    }
    out.push('\n');

    // 结构校验
    out.push_str("Structure validation:\n");
    out.push_str(&format!(
        "  Line count preserved:   {}\n",
        yes_no(report.validation.line_count_match)
    ));
    out.push_str(&format!(
        "  Record count preserved: {}\n",
        yes_no(report.validation.record_count_match)
    ));
    out.push_str(&format!(
        "  Record fields intact:   {}\n\n",
        yes_no(report.validation.fingerprints_match)
    ));

    // 语言分布
    if !report.language_usage.is_empty() {
        out.push_str("Detected languages:\n");
        let mut languages: Vec<_> = report.language_usage.iter().collect();
        languages.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (lang, count) in languages {
            out.push_str(&format!("  {}: {} records\n", lang, count));
        }
        out.push('\n');
    }

    // 后端分布
    if !report.backend_usage.is_empty() {
        out.push_str("Translation backends:\n");
        let mut backends: Vec<_> = report.backend_usage.iter().collect();
        backends.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (backend, count) in backends {
            out.push_str(&format!("  {}: {} records\n", backend, count));
        }
        out.push('\n');
    }

    // 置信度直方图
    if !report.changes.is_empty() {
        out.push_str("Confidence distribution:\n");
        for &(low, high, label) in HISTOGRAM_BUCKETS {
            let count = report
                .changes
                .iter()
                .filter(|c| c.confidence >= low && c.confidence < high)
                .count();
            if count > 0 {
                out.push_str(&format!("  {}: {}\n", label, count));
            }
        }
        out.push('\n');
    }

    // 逐条明细
    if !report.changes.is_empty() {
        out.push_str("Detailed translations:\n");
        out.push_str(&"-".repeat(30));
        out.push_str("\n\n");
        for change in &report.changes {
            out.push_str(&format!(
                "Line {}: {}\n",
                change.line_index + 1,
                change.field_name
            ));
            out.push_str(&format!("  Original:   {}\n", change.original));
            out.push_str(&format!("  Translated: {}\n", change.translated));
            out.push_str(&format!(
                "  Backend: {}  Confidence: {:.2}  Time: {}ms\n\n",
                change.backend,
                change.confidence,
                change.processing_time.as_millis()
            ));
        }
    }

    out
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "NO"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::reconstructor::reconstruct;
    use crate::translation::TranslationOutcome;
    use std::time::Duration;

    #[test]
    fn test_report_rendering() {
        let input = "1, /SPZ, ABGTEMP, {Abgastemperaturschwelle}, 2, $100, $200\n";
        let parsed = parse(input.as_bytes()).unwrap();
        let outcome = TranslationOutcome::translated(
            "Abgastemperaturschwelle".to_string(),
            "exhaust gas temperature threshold".to_string(),
            "de",
            "en",
            0.8,
            "local",
            Duration::from_millis(2),
        );
        let (_, report) = reconstruct(&parsed, &[(0, outcome)], 0.7);
        let rendered = render_report(&report, "in.dam", "out.dam");

        assert!(rendered.contains("Total records: 1"));
        assert!(rendered.contains("Translation rate: 100.0%"));
        assert!(rendered.contains("local: 1 records"));
        assert!(rendered.contains("de: 1 records"));
        assert!(rendered.contains("Line 1: ABGTEMP"));
        assert!(rendered.contains("exhaust gas temperature threshold"));
        assert!(rendered.contains("Time: 2ms"));
        assert!(rendered.contains("0.7 - 0.8: 1"));
    }

    #[test]
    fn test_empty_report_has_no_detail_section() {
        let input = "1, /SPZ, LEER, {}, 2, $100, $200\n";
        let parsed = parse(input.as_bytes()).unwrap();
        let (_, report) = reconstruct(&parsed, &[], 0.7);
        let rendered = render_report(&report, "in.dam", "out.dam");
        assert!(!rendered.contains("Detailed translations"));
        assert!(rendered.contains("Empty descriptions skipped: 1"));
    }
}
