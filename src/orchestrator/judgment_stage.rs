//! LLM 评分阶段 - 编排层
//!
//! - `template`: 从测试集生成评分模板
//! - `judge`: 调用 LLM 自动填写模板中的三次评分
//! - `analyze`: 读取已填写的模板，分组汇总并做 t 检验

use crate::config::Config;
use crate::error::{AnalysisError, AppResult};
use crate::models::{
    format_float, read_headers, read_table, write_table, JudgmentRow, JudgmentScores, TestSetRow,
};
use crate::services::judgment_analysis::{self, AnalysisReport, Comparison, GroupSummary};
use crate::services::llm_service::{JUDGE_PROMPT, JUDGE_SYSTEM_PROMPT};
use crate::services::LlmService;
use crate::utils::logging::{log_stage_complete, log_stage_start};
use crate::utils::truncate_chars;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info, warn};

/// 模板中每篇作文的评分次数
pub const JUDGE_RUNS: usize = 3;

/// 预览正文的字符数
const PREVIEW_CHARS: usize = 500;

/// 生成评分模板
pub async fn run_template(config: &Config) -> Result<usize> {
    log_stage_start("template", "生成 LLM 评分模板");

    let input = Path::new(&config.test_set_csv);
    let test_set: Vec<TestSetRow> = read_table(input).await?;

    let template = judgment_analysis::build_template(
        test_set,
        config.template_sample_size,
        &config.judge_model_label,
    );

    let output = Path::new(&config.judgment_csv);
    write_table(output, &JudgmentRow::COLUMNS, &template)
        .await
        .with_context(|| format!("无法写出评分模板: {}", output.display()))?;

    log_instructions(&template, config);
    log_stage_complete("template", &config.judgment_csv, template.len());

    Ok(template.len())
}

/// 调用 LLM 填写模板中尚未填写的评分
pub async fn run_judge(config: &Config) -> Result<usize> {
    log_stage_start("judge", "调用 LLM 自动评分");

    let path = Path::new(&config.judgment_csv);
    let mut rows: Vec<JudgmentRow> = read_table(path).await?;
    let service = LlmService::new(config);
    info!("🤖 评分模型: {}", service.model_name());

    let total = rows.len();
    let mut filled = 0;
    for (idx, row) in rows.iter_mut().enumerate() {
        if row.is_complete() {
            info!("[{}/{}] {} 已评分，跳过", idx + 1, total, row.filename);
            continue;
        }

        info!("[{}/{}] 🤖 正在评分: {}", idx + 1, total, row.filename);
        for run in 0..JUDGE_RUNS {
            if row.runs()[run].is_some() {
                continue;
            }
            match service.judge_essay(&row.essay_text).await {
                Ok(Some(score)) => {
                    info!("  第 {} 次: {}", run + 1, format_float(score));
                    row.set_run(run, Some(score));
                    row.model = service.model_name().to_string();
                    filled += 1;
                }
                Ok(None) => warn!("  第 {} 次: 未能解析分数，留空", run + 1),
                Err(e) => error!("  第 {} 次: LLM 调用失败: {}", run + 1, e),
            }
        }
        row.recompute_mean();
    }

    write_table(path, &JudgmentRow::COLUMNS, &rows)
        .await
        .with_context(|| format!("无法写回评分模板: {}", path.display()))?;

    log_stage_complete("judge", &config.judgment_csv, rows.len());
    info!("本次共填写 {} 个评分", filled);
    Ok(filled)
}

/// 分析已填写的模板
///
/// 任何失败都只输出诊断信息，不向上返回错误
pub async fn run_analyze(config: &Config) -> Result<()> {
    log_stage_start("analyze", "LLM 评分初步分析");

    match analyze_file(Path::new(&config.judgment_csv)).await {
        Ok(report) => log_report(&report, config.significance_level),
        Err(e) => {
            error!("❌ 无法分析: {}", e);
            info!("💡 请先在 {} 中填写评分", config.judgment_csv);
        }
    }

    Ok(())
}

/// 读取模板并分析
pub async fn analyze_file(path: &Path) -> AppResult<AnalysisReport> {
    let headers = read_headers(path).await?;
    let missing: Vec<String> = JudgmentScores::REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AnalysisError::MissingColumns {
            path: path.display().to_string(),
            columns: missing,
        }
        .into());
    }

    let rows: Vec<JudgmentScores> = read_table(path).await?;
    Ok(judgment_analysis::analyze(&rows, &path.display().to_string())?)
}

fn log_instructions(template: &[JudgmentRow], config: &Config) {
    info!("\n请将以下提示词复制到 ChatGPT / Claude:\n");
    info!("{}\n\n{}", JUDGE_SYSTEM_PROMPT, JUDGE_PROMPT);
    info!("\n{}", "=".repeat(60));
    info!("评分模板已保存: {}", config.judgment_csv);
    info!("模板包含前 {} 篇作文", template.len());
    info!("\n步骤:");
    info!("1. 把每篇作文粘贴给 LLM");
    info!("2. 每篇评分 {} 次", JUDGE_RUNS);
    info!("3. 把评分填入 score_run1..score_run{} 列", JUDGE_RUNS);
    info!("   (或运行 judge 子命令自动填写)");
    info!("{}", "=".repeat(60));

    let Some(first) = template.first() else {
        warn!("⚠️ 测试集为空，模板中没有作文");
        return;
    };
    info!("\n示例作文 1:");
    info!("Filename: {}", first.filename);
    info!("Language: {}", first.language);
    info!("Human Score: {}", format_float(first.score));
    info!("Perplexity: {:.2}", first.perplexity);
    info!("Perplexity Group: {}", first.perplexity_group);
    info!("\n正文（前 {} 个字符）:", PREVIEW_CHARS);
    info!("{}...", truncate_chars(&first.essay_text, PREVIEW_CHARS));
}

fn log_report(report: &AnalysisReport, alpha: f64) {
    info!("\n初步分析:");
    info!("{}", "=".repeat(60));

    if let Some(low) = &report.low {
        log_group_summary("Low", low);
    }
    if let Some(high) = &report.high {
        log_group_summary("High", high);
    }

    match &report.comparison {
        Comparison::Completed(result) => {
            info!("\nT 检验 (Low vs High Perplexity):");
            info!("  t-statistic: {:.3}", result.statistic);
            info!("  p-value: {:.3}", result.p_value);
            if result.is_significant(alpha) {
                info!("  *** 发现显著差异 (p < {}) ***", alpha);
            } else {
                info!("  暂无显著差异");
            }
        }
        Comparison::Failed(e) => warn!("\n⚠️ 无法进行 t 检验: {}", e),
        Comparison::Skipped => info!("\n两组都需要多于 1 篇作文才能进行 t 检验"),
    }
}

fn log_group_summary(name: &str, summary: &GroupSummary) {
    let fmt = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v));

    info!("\n{} Perplexity 组 (n={}):", name, summary.count);
    info!(
        "  Mean LLM Score: {} (SD: {})",
        fmt(summary.mean_llm),
        fmt(summary.sd_llm)
    );
    info!("  Mean Human Score: {}", fmt(summary.mean_human));
    if summary.scored < summary.count {
        warn!("  仅 {}/{} 篇已评分", summary.scored, summary.count);
    }
}
