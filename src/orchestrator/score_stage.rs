//! 困惑度评分阶段 - 编排层
//!
//! 读取作文表 → 逐篇评分 → 丢弃无法评分的作文 → 写出带困惑度的表

use crate::config::Config;
use crate::models::{read_table, write_table, EssayRecord, ScoredEssay};
use crate::services::{statistics, CompletionLogprobScorer, PredictabilityScorer, SkipWriter};
use crate::utils::logging::{log_stage_complete, log_stage_start};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// 每处理多少篇输出一次进度
const PROGRESS_INTERVAL: usize = 50;

/// 运行评分阶段（使用配置中的 completions 接口）
pub async fn run(config: &Config) -> Result<usize> {
    let scorer = CompletionLogprobScorer::new(config);
    info!(
        "🤖 困惑度模型: {} ({})",
        config.scorer_model_name, config.scorer_api_base_url
    );
    run_with_scorer(config, &scorer).await
}

/// 使用指定的评分器运行评分阶段
pub async fn run_with_scorer<S: PredictabilityScorer>(
    config: &Config,
    scorer: &S,
) -> Result<usize> {
    log_stage_start("score", "计算每篇作文的困惑度");

    let input = Path::new(&config.extracted_csv);
    info!("📄 读取作文表: {}", input.display());
    let essays: Vec<EssayRecord> = read_table(input).await?;

    let skip_writer = SkipWriter::with_path(&config.output_log_file);
    let scored = score_essays(scorer, essays, &skip_writer).await;
    info!("✓ 成功计算 {} 篇作文的困惑度", scored.len());

    let output = Path::new(&config.perplexity_csv);
    write_table(output, &ScoredEssay::COLUMNS, &scored)
        .await
        .with_context(|| format!("无法写出困惑度表: {}", output.display()))?;

    log_perplexity_stats(&scored);
    log_stage_complete("score", &config.perplexity_csv, scored.len());

    Ok(scored.len())
}

/// 逐篇评分，按输入顺序返回评分成功的作文
pub async fn score_essays<S: PredictabilityScorer>(
    scorer: &S,
    essays: Vec<EssayRecord>,
    skip_writer: &SkipWriter,
) -> Vec<ScoredEssay> {
    let total = essays.len();
    let mut scored = Vec::with_capacity(total);

    for (idx, essay) in essays.into_iter().enumerate() {
        if idx % PROGRESS_INTERVAL == 0 {
            info!("⏳ 正在处理第 {}/{} 篇...", idx, total);
        }

        match scorer.score(&essay.essay_text).await {
            Some(perplexity) => scored.push(ScoredEssay::from_record(essay, perplexity)),
            None => {
                if let Err(e) = skip_writer.write(&essay.filename, "无法计算困惑度") {
                    warn!("写入运行日志失败: {}", e);
                }
            }
        }
    }

    scored
}

fn log_perplexity_stats(scored: &[ScoredEssay]) {
    let mut perplexities: Vec<f64> = scored.iter().map(|e| e.perplexity).collect();
    let Some((min, max, mean)) = statistics::min_max_mean(&perplexities) else {
        warn!("⚠️ 没有任何作文得到困惑度，写出空表");
        return;
    };
    perplexities.sort_by(f64::total_cmp);

    info!("\n困惑度统计:");
    info!("  Min: {:.2}", min);
    info!("  Max: {:.2}", max);
    info!("  Mean: {:.2}", mean);
    info!("  Median: {:.2}", perplexities[perplexities.len() / 2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 按词数给分，少于 3 个词不评分
    struct WordCountScorer;

    impl PredictabilityScorer for WordCountScorer {
        async fn score(&self, text: &str) -> Option<f64> {
            let words = text.split_whitespace().count();
            (words >= 3).then(|| words as f64 * 1.5)
        }
    }

    fn record(filename: &str, text: &str) -> EssayRecord {
        EssayRecord {
            filename: filename.to_string(),
            language: "Turkish".to_string(),
            age: "Unknown".to_string(),
            score: 20.0,
            length: text.split_whitespace().count(),
            essay_text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unscored_essays_are_dropped_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let skip_writer = SkipWriter::with_path(dir.path().join("run.txt").to_str().unwrap());

        let essays = vec![
            record("a.xml", "one two three"),
            record("b.xml", "short"),
            record("c.xml", "four five six seven"),
        ];
        let scored = score_essays(&WordCountScorer, essays, &skip_writer).await;

        let names: Vec<&str> = scored.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, vec!["a.xml", "c.xml"]);
        assert_eq!(scored[0].perplexity, 4.5);
        assert_eq!(scored[1].perplexity, 6.0);

        let log = std::fs::read_to_string(dir.path().join("run.txt")).unwrap();
        assert!(log.contains("b.xml"));
    }

    #[tokio::test]
    async fn test_run_with_scorer_writes_table() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            extracted_csv: dir.path().join("extracted.csv").display().to_string(),
            perplexity_csv: dir.path().join("perplexity.csv").display().to_string(),
            output_log_file: dir.path().join("run.txt").display().to_string(),
            ..Config::default()
        };
        write_table(
            Path::new(&config.extracted_csv),
            &EssayRecord::COLUMNS,
            &[record("a.xml", "x y z"), record("b.xml", "x")],
        )
        .await
        .unwrap();

        let written = run_with_scorer(&config, &WordCountScorer).await.unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(&config.perplexity_csv).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("filename,language,age,score,length,essay_text,perplexity")
        );
        assert_eq!(lines.next(), Some("a.xml,Turkish,Unknown,20.0,3,x y z,4.5"));
        assert_eq!(lines.next(), None);
    }

    #[tokio::test]
    async fn test_missing_input_table_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            extracted_csv: dir.path().join("missing.csv").display().to_string(),
            output_log_file: dir.path().join("run.txt").display().to_string(),
            ..Config::default()
        };
        let err = run_with_scorer(&config, &WordCountScorer).await.unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
    }
}
