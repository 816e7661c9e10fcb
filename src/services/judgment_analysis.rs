//! 评分分析服务 - 业务能力层
//!
//! 生成评分模板、按困惑度分组汇总 LLM 评分并做 t 检验

use crate::error::AnalysisError;
use crate::models::{JudgmentRow, JudgmentScores, PerplexityGroup, TestSetRow};
use crate::services::statistics::{self, TTestResult};

/// 从测试集生成评分模板
///
/// # 参数
/// - `test_set`: 测试集
/// - `sample_size`: 取前多少篇
/// - `model_label`: model 列的值
pub fn build_template(
    test_set: Vec<TestSetRow>,
    sample_size: usize,
    model_label: &str,
) -> Vec<JudgmentRow> {
    test_set
        .into_iter()
        .take(sample_size)
        .map(|row| JudgmentRow::from_test_row(row, model_label))
        .collect()
}

/// 单组汇总
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    /// 组内行数
    pub count: usize,
    /// 已评分行数
    pub scored: usize,
    /// LLM 评分均值
    pub mean_llm: Option<f64>,
    /// LLM 评分标准差（n-1）
    pub sd_llm: Option<f64>,
    /// 人工评分均值
    pub mean_human: Option<f64>,
}

/// 两组比较结果
#[derive(Debug)]
pub enum Comparison {
    /// 至少一组不超过 1 行，不做检验
    Skipped,
    /// 检验完成
    Completed(TTestResult),
    /// 检验无法进行
    Failed(AnalysisError),
}

/// 分析报告
#[derive(Debug)]
pub struct AnalysisReport {
    pub low: Option<GroupSummary>,
    pub high: Option<GroupSummary>,
    pub comparison: Comparison,
}

/// 分析已填写的模板
///
/// # 参数
/// - `rows`: 模板行
/// - `path`: 模板路径（仅用于错误信息）
///
/// # 返回
/// 一行评分都没有时返回 `TemplateNotFilled`
pub fn analyze(rows: &[JudgmentScores], path: &str) -> Result<AnalysisReport, AnalysisError> {
    if rows.iter().all(|r| r.mean_score().is_none()) {
        return Err(AnalysisError::TemplateNotFilled {
            path: path.to_string(),
        });
    }

    let low: Vec<&JudgmentScores> = rows
        .iter()
        .filter(|r| r.perplexity_group == PerplexityGroup::Low.as_str())
        .collect();
    let high: Vec<&JudgmentScores> = rows
        .iter()
        .filter(|r| r.perplexity_group == PerplexityGroup::High.as_str())
        .collect();

    let comparison = if low.len() > 1 && high.len() > 1 {
        match statistics::student_t_test(&llm_means(&low), &llm_means(&high)) {
            Ok(result) => Comparison::Completed(result),
            Err(e) => Comparison::Failed(e),
        }
    } else {
        Comparison::Skipped
    };

    Ok(AnalysisReport {
        low: summarize(&low),
        high: summarize(&high),
        comparison,
    })
}

fn llm_means(rows: &[&JudgmentScores]) -> Vec<f64> {
    rows.iter().filter_map(|r| r.mean_score()).collect()
}

fn summarize(rows: &[&JudgmentScores]) -> Option<GroupSummary> {
    if rows.is_empty() {
        return None;
    }

    let means = llm_means(rows);
    let human: Vec<f64> = rows.iter().map(|r| r.score).collect();

    Some(GroupSummary {
        count: rows.len(),
        scored: means.len(),
        mean_llm: statistics::mean(&means),
        sd_llm: statistics::sample_std(&means),
        mean_human: statistics::mean(&human),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(group: &str, human: f64, runs: [Option<f64>; 3]) -> JudgmentScores {
        JudgmentScores {
            perplexity_group: group.to_string(),
            score: human,
            score_run1: runs[0],
            score_run2: runs[1],
            score_run3: runs[2],
        }
    }

    fn test_row(id: usize, group: PerplexityGroup) -> TestSetRow {
        TestSetRow {
            filename: format!("doc{}.xml", id),
            language: "Italian".to_string(),
            age: "16-20".to_string(),
            score: 35.0,
            length: 250,
            essay_text: "text".to_string(),
            perplexity: 20.0 + id as f64,
            perplexity_group: group,
        }
    }

    #[test]
    fn test_template_takes_first_rows_with_empty_runs() {
        let test_set: Vec<TestSetRow> = (0..8)
            .map(|i| test_row(i, PerplexityGroup::Low))
            .collect();

        let template = build_template(test_set, 5, "ChatGPT");
        assert_eq!(template.len(), 5);
        assert_eq!(template[0].filename, "doc0.xml");
        assert_eq!(template[4].filename, "doc4.xml");
        assert!(template.iter().all(|r| r.model == "ChatGPT"));
        assert!(template
            .iter()
            .all(|r| r.runs().iter().all(Option::is_none) && r.mean_score.is_none()));
    }

    #[test]
    fn test_template_with_short_test_set() {
        let template = build_template(vec![test_row(1, PerplexityGroup::High)], 5, "Claude");
        assert_eq!(template.len(), 1);
    }

    #[test]
    fn test_unfilled_template_is_reported() {
        let rows = vec![
            scores("low", 30.0, [None, None, None]),
            scores("high", 32.0, [None, None, None]),
        ];
        let err = analyze(&rows, "llm_scores_manual.csv").unwrap_err();
        assert!(matches!(err, AnalysisError::TemplateNotFilled { .. }));
    }

    #[test]
    fn test_group_summaries_and_t_test() {
        let rows = vec![
            scores("low", 30.0, [Some(1.0), Some(1.0), Some(1.0)]),
            scores("low", 32.0, [Some(2.0), Some(2.0), Some(2.0)]),
            scores("low", 34.0, [Some(3.0), Some(3.0), Some(3.0)]),
            scores("low", 36.0, [Some(4.0), Some(4.0), Some(4.0)]),
            scores("low", 38.0, [Some(5.0), Some(5.0), Some(5.0)]),
            scores("high", 31.0, [Some(2.0), Some(2.0), Some(2.0)]),
            scores("high", 33.0, [Some(4.0), Some(4.0), Some(4.0)]),
            scores("high", 35.0, [Some(6.0), Some(6.0), Some(6.0)]),
            scores("high", 37.0, [Some(8.0), Some(8.0), Some(8.0)]),
            scores("high", 39.0, [Some(10.0), Some(10.0), Some(10.0)]),
        ];

        let report = analyze(&rows, "t.csv").unwrap();
        let low = report.low.unwrap();
        assert_eq!(low.count, 5);
        assert_eq!(low.mean_llm, Some(3.0));
        assert_eq!(low.mean_human, Some(34.0));
        assert!((low.sd_llm.unwrap() - 2.5f64.sqrt()).abs() < 1e-9);

        let high = report.high.unwrap();
        assert_eq!(high.mean_llm, Some(6.0));
        assert_eq!(high.mean_human, Some(35.0));

        match report.comparison {
            Comparison::Completed(result) => {
                assert!((result.statistic + 1.897_366_596).abs() < 1e-6);
                assert!((result.p_value - 0.094_349_772_8).abs() < 1e-6);
            }
            other => panic!("应完成 t 检验: {:?}", other),
        }
    }

    #[test]
    fn test_t_test_skipped_for_single_row_group() {
        let rows = vec![
            scores("low", 30.0, [Some(5.0), Some(6.0), Some(7.0)]),
            scores("high", 31.0, [Some(4.0), None, None]),
            scores("high", 29.0, [Some(8.0), Some(8.0), None]),
        ];
        let report = analyze(&rows, "t.csv").unwrap();
        assert_eq!(report.low.as_ref().unwrap().count, 1);
        assert_eq!(report.low.as_ref().unwrap().sd_llm, None);
        assert_eq!(report.high.as_ref().unwrap().mean_llm, Some(6.0));
        assert!(matches!(report.comparison, Comparison::Skipped));
    }

    #[test]
    fn test_partially_scored_groups_fail_t_test() {
        let rows = vec![
            scores("low", 30.0, [Some(5.0), None, None]),
            scores("low", 30.0, [None, None, None]),
            scores("high", 31.0, [Some(4.0), None, None]),
            scores("high", 29.0, [Some(8.0), None, None]),
        ];
        let report = analyze(&rows, "t.csv").unwrap();
        assert_eq!(report.low.as_ref().unwrap().scored, 1);
        assert!(matches!(
            report.comparison,
            Comparison::Failed(AnalysisError::InsufficientSamples { low: 1, high: 2 })
        ));
    }

    #[test]
    fn test_identical_scores_within_groups() {
        let rows = vec![
            scores("low", 30.0, [Some(7.0), Some(7.0), Some(7.0)]),
            scores("low", 32.0, [Some(7.0), Some(7.0), Some(7.0)]),
            scores("high", 31.0, [Some(8.0), Some(8.0), Some(8.0)]),
            scores("high", 33.0, [Some(8.0), Some(8.0), Some(8.0)]),
        ];
        match analyze(&rows, "t.csv").unwrap().comparison {
            Comparison::Completed(result) => {
                assert_eq!(result.statistic, f64::NEG_INFINITY);
                assert_eq!(result.p_value, 0.0);
            }
            other => panic!("均值不同应完成 t 检验: {:?}", other),
        }

        let same = vec![
            scores("low", 30.0, [Some(7.0), None, None]),
            scores("low", 32.0, [Some(7.0), None, None]),
            scores("high", 31.0, [Some(7.0), None, None]),
            scores("high", 33.0, [Some(7.0), None, None]),
        ];
        assert!(matches!(
            analyze(&same, "t.csv").unwrap().comparison,
            Comparison::Failed(AnalysisError::ZeroVariance)
        ));
    }
}
