//! 分组服务 - 业务能力层
//!
//! 选出高质量子集，并按困惑度切成 low / high 两组

use crate::models::{PerplexityGroup, ScoredEssay, TestSetRow};
use crate::services::statistics;

/// 分组参数
#[derive(Debug, Clone, Copy)]
pub struct PartitionSettings {
    /// 高质量阈值的分位数
    pub quality_quantile: f64,
    /// 每组固定大小；子集少于 `2 * group_size` 行时改为对半分
    pub group_size: usize,
}

impl Default for PartitionSettings {
    fn default() -> Self {
        Self {
            quality_quantile: 0.75,
            group_size: 20,
        }
    }
}

/// 分组结果
#[derive(Debug, Clone)]
pub struct Partition {
    /// 高质量阈值（含）
    pub threshold: f64,
    /// 高质量子集大小
    pub high_quality_count: usize,
    /// 高质量子集的困惑度中位数（用于打标签）
    pub median_perplexity: f64,
    /// low 组行数
    pub low_count: usize,
    /// high 组行数
    pub high_count: usize,
    /// low 组在前、high 组在后的合并测试集
    pub test_set: Vec<TestSetRow>,
}

impl Partition {
    pub fn low_rows(&self) -> &[TestSetRow] {
        &self.test_set[..self.low_count]
    }

    pub fn high_rows(&self) -> &[TestSetRow] {
        &self.test_set[self.low_count..]
    }
}

/// 对整张表执行分组
///
/// # 参数
/// - `rows`: 带困惑度的作文表
/// - `settings`: 分组参数
///
/// # 返回
/// 输入为空时返回 None
pub fn partition(rows: Vec<ScoredEssay>, settings: &PartitionSettings) -> Option<Partition> {
    let scores: Vec<f64> = rows.iter().map(|r| r.score).collect();
    let threshold = statistics::quantile(&scores, settings.quality_quantile)?;

    let mut high_quality: Vec<ScoredEssay> =
        rows.into_iter().filter(|r| r.score >= threshold).collect();
    // 稳定排序，困惑度相同的行保持输入顺序
    high_quality.sort_by(|a, b| a.perplexity.total_cmp(&b.perplexity));

    let perplexities: Vec<f64> = high_quality.iter().map(|r| r.perplexity).collect();
    let median_perplexity = statistics::median(&perplexities)?;
    let high_quality_count = high_quality.len();

    let (low, high) = split_groups(&high_quality, settings.group_size);
    let (low_count, high_count) = (low.len(), high.len());

    let combined: Vec<ScoredEssay> = low.iter().chain(high.iter()).cloned().collect();
    let test_set = label_groups(combined, median_perplexity);

    Some(Partition {
        threshold,
        high_quality_count,
        median_perplexity,
        low_count,
        high_count,
        test_set,
    })
}

/// 按头尾取两组
///
/// 子集不少于 `2 * group_size` 行时取前后各 `group_size` 行，
/// 否则取前后各 `n / 2` 行（n 为奇数时正中间一行不进入任何一组）
pub fn split_groups<T>(sorted: &[T], group_size: usize) -> (&[T], &[T]) {
    let n = sorted.len();
    let take = if n >= 2 * group_size {
        group_size
    } else {
        n / 2
    };
    (&sorted[..take], &sorted[n - take..])
}

/// 打标签：先全部标为 low，再把困惑度不低于 `median` 的改为 high
///
/// `median` 取自整个高质量子集，而不是合并后的测试集，
/// 因此标签可能与头尾分组不一致
pub fn label_groups(rows: Vec<ScoredEssay>, median: f64) -> Vec<TestSetRow> {
    rows.into_iter()
        .map(|row| {
            let group = if row.perplexity >= median {
                PerplexityGroup::High
            } else {
                PerplexityGroup::Low
            };
            TestSetRow::from_scored(row, group)
        })
        .collect()
}
