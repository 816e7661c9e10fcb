/// 日志工具模块
///
/// 提供日志初始化、运行日志文件和统一格式的横幅输出
use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；未设置时使用 `essay_pipeline=info`，
/// `verbose` 为 true 时提升到 debug
pub fn init(verbose: bool) {
    let default_directive = if verbose {
        "essay_pipeline=debug"
    } else {
        "essay_pipeline=info"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    // 测试中可能被多次调用，忽略重复初始化
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化运行日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
/// - `stage`: 本次运行的阶段名称
pub fn init_log_file(log_file_path: &str, stage: &str) -> Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let log_header = format!(
        "{}\n作文流水线运行日志 [{}] - {}\n{}\n\n",
        "=".repeat(60),
        stage,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 输出阶段开始横幅
pub fn log_stage_start(stage: &str, description: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 {} - {}", stage, description);
    info!("{}", "=".repeat(60));
}

/// 输出阶段完成横幅
///
/// # 参数
/// - `stage`: 阶段名称
/// - `output`: 输出文件路径
/// - `rows`: 写入行数
pub fn log_stage_complete(stage: &str, output: &str, rows: usize) {
    info!("\n{}", "─".repeat(60));
    info!("✓ {} 完成: 写入 {} 行", stage, rows);
    info!("📄 输出文件: {}", output);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_chars`: 最大字符数（按 Unicode 字符计）
///
/// # 返回
/// 返回前 `max_chars` 个字符
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
