//! 分组阶段 - 编排层
//!
//! 读取带困惑度的表 → 选出高质量子集 → 切分 low / high 两组 → 写出测试集和作文列表

use crate::config::Config;
use crate::models::{format_float, read_table, write_table, ScoredEssay, TestSetRow};
use crate::services::partitioner::{self, Partition, PartitionSettings};
use crate::services::statistics;
use crate::utils::logging::{log_stage_complete, log_stage_start};
use crate::utils::truncate_chars;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

/// 运行分组阶段
pub async fn run(config: &Config) -> Result<usize> {
    log_stage_start("partition", "按分数和困惑度切分测试集");

    let input = Path::new(&config.perplexity_csv);
    info!("📄 读取: {}", input.display());
    let essays: Vec<ScoredEssay> = read_table(input).await?;
    info!("作文总数: {}", essays.len());

    let settings = PartitionSettings {
        quality_quantile: config.quality_quantile,
        group_size: config.group_size,
    };

    let test_set = match partitioner::partition(essays, &settings) {
        Some(partition) => {
            log_partition(&partition);
            partition.test_set
        }
        None => {
            warn!("⚠️ 没有可分组的作文，写出空测试集");
            Vec::new()
        }
    };

    let output = Path::new(&config.test_set_csv);
    write_table(output, &TestSetRow::COLUMNS, &test_set)
        .await
        .with_context(|| format!("无法写出测试集: {}", output.display()))?;
    info!("\n测试集已保存: {}", output.display());

    let listing_path = Path::new(&config.scoring_listing_txt);
    if let Some(parent) = listing_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(listing_path, render_listing(&test_set, config.excerpt_chars))
        .await
        .with_context(|| format!("无法写出作文列表: {}", listing_path.display()))?;
    info!("人工评分用作文列表已保存: {}", listing_path.display());

    log_stage_complete("partition", &config.test_set_csv, test_set.len());
    Ok(test_set.len())
}

/// 生成便于人工阅读的作文列表
///
/// 每篇作文一段，横幅之间是元数据，之后是正文前 `excerpt_chars` 个字符
pub fn render_listing(rows: &[TestSetRow], excerpt_chars: usize) -> String {
    let banner = "=".repeat(60);
    let mut out = String::new();

    for row in rows {
        out.push_str(&format!("\n{}\n", banner));
        out.push_str(&format!("ESSAY ID: {}\n", row.filename));
        out.push_str(&format!("Language: {}\n", row.language));
        out.push_str(&format!("Human Score: {}\n", format_float(row.score)));
        out.push_str(&format!("Perplexity: {:.2}\n", row.perplexity));
        out.push_str(&format!("Group: {}\n", row.perplexity_group));
        out.push_str(&format!("{}\n", banner));
        out.push_str(truncate_chars(&row.essay_text, excerpt_chars));
        out.push('\n');
    }

    out
}

fn log_partition(partition: &Partition) {
    info!("高质量分数阈值: {:.1}", partition.threshold);
    info!("高质量作文 (前 25%): {}", partition.high_quality_count);
    info!("高质量子集困惑度中位数: {:.2}", partition.median_perplexity);

    log_group("Low", partition.low_rows());
    log_group("High", partition.high_rows());

    info!("\n待 LLM 评分作文总数: {}", partition.test_set.len());
}

fn log_group(name: &str, rows: &[TestSetRow]) {
    info!("\n{} perplexity 组 (n={}):", name, rows.len());

    let perplexities: Vec<f64> = rows.iter().map(|r| r.perplexity).collect();
    let scores: Vec<f64> = rows.iter().map(|r| r.score).collect();
    match (
        statistics::min_max_mean(&perplexities),
        statistics::mean(&scores),
    ) {
        (Some((min, max, _)), Some(mean_score)) => {
            info!("  困惑度范围: {:.2} - {:.2}", min, max);
            info!("  平均分: {:.1}", mean_score);
        }
        _ => info!("  (空)"),
    }
}
