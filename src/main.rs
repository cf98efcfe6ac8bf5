//! DAMOS翻译器命令行入口
//!
//! 读取DAMOS标定文件，翻译记录描述后按原结构写出。
//! 只有文件I/O和编码失败会以非零码退出，翻译失败只体现在报告里。

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use damos_translator::core::{translate_damos_data, DamosError, DamosOptions};
use damos_translator::report::render_report;
use damos_translator::translation::{BackendKind, TranslationConfig};

#[derive(Parser, Debug)]
#[command(
    name = "damos-translator",
    version,
    about = "Translate DAMOS calibration file descriptions while preserving file structure"
)]
struct Cli {
    /// 输入的DAMOS文件
    input: PathBuf,

    /// 输出文件路径（默认在输入文件名后加 _translated）
    output: Option<PathBuf>,

    /// 目标语言代码
    #[arg(long, default_value = "en")]
    target_lang: String,

    /// 源语言代码，auto表示自动检测
    #[arg(long, default_value = "auto")]
    source_lang: String,

    /// 接受翻译结果的最低置信度 (0.0 - 1.0)
    #[arg(long)]
    threshold: Option<f32>,

    /// 只使用指定后端 (deepl / libre / local)
    #[arg(long)]
    backend: Option<BackendKind>,

    /// 同时生成翻译报告
    #[arg(long)]
    report: bool,

    /// TOML配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    /// 输出详细日志（可叠加）
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli).await {
        eprintln!("错误: {}", err);
        process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), DamosError> {
    let translation = build_config(cli)?;
    let options = DamosOptions {
        translation,
        skip_validation: false,
    };

    let bytes = std::fs::read(&cli.input)
        .map_err(|e| DamosError::new(&format!("读取 {} 失败: {}", cli.input.display(), e)))?;

    let run = translate_damos_data(&bytes, &options).await?;

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.input));
    std::fs::write(&output_path, &run.output)
        .map_err(|e| DamosError::new(&format!("写入 {} 失败: {}", output_path.display(), e)))?;

    println!(
        "已翻译 {}/{} 条记录 -> {}",
        run.report.substituted,
        run.report.translatable_records,
        output_path.display()
    );
    if !run.report.validation.passed() {
        println!("警告: 输出结构校验未通过，请人工核对");
    }

    if cli.report {
        let report_path = report_path_for(&output_path);
        let rendered = render_report(
            &run.report,
            &cli.input.display().to_string(),
            &output_path.display().to_string(),
        );
        std::fs::write(&report_path, rendered)
            .map_err(|e| DamosError::new(&format!("写入报告失败: {}", e)))?;
        println!("报告已保存: {}", report_path.display());
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<TranslationConfig, DamosError> {
    let mut config = match &cli.config {
        Some(path) => TranslationConfig::from_file(path)?,
        None => TranslationConfig::from_env(),
    };

    config.source_lang = cli.source_lang.clone();
    config.target_lang = cli.target_lang.clone();
    if let Some(threshold) = cli.threshold {
        config.confidence_threshold = threshold;
    }
    // 指定单一后端时不再使用备选链
    if let Some(backend) = cli.backend {
        config.primary_backend = backend;
        config.fallback_backends.clear();
    }
    config.validate()?;
    Ok(config)
}

/// foo.dam -> foo_translated.dam
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{}_translated.{}", stem, ext.to_string_lossy()),
        None => format!("{}_translated", stem),
    };
    input.with_file_name(name)
}

/// foo_translated.dam -> foo_translated_report.txt
fn report_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}_report.txt", stem))
}

fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "damos_translator=warn",
        1 => "damos_translator=info",
        2 => "damos_translator=debug",
        _ => "trace",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
