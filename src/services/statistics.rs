//! 统计服务 - 业务能力层
//!
//! 分位数、描述统计和独立样本 t 检验

use crate::error::AnalysisError;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// 算术平均值，空输入返回 None
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// 样本方差（分母 n-1），少于 2 个值返回 None
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// 样本标准差（分母 n-1）
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// 线性插值分位数
///
/// 排序后位置 `(n - 1) * q`，在相邻两个值之间线性插值
///
/// # 参数
/// - `values`: 样本
/// - `q`: 分位点，取值 [0, 1]
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// 中位数（偶数个时取中间两个的平均）
pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// 最小值、最大值、平均值
pub fn min_max_mean(values: &[f64]) -> Option<(f64, f64, f64)> {
    let min = values.iter().copied().reduce(f64::min)?;
    let max = values.iter().copied().reduce(f64::max)?;
    Some((min, max, mean(values)?))
}

/// t 检验结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestResult {
    /// t 统计量
    pub statistic: f64,
    /// 双尾 p 值
    pub p_value: f64,
    /// 自由度
    pub degrees_of_freedom: f64,
}

impl TTestResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// 两独立样本 t 检验（Student，合并方差）
///
/// # 参数
/// - `a`, `b`: 两组样本，每组至少 2 个值
///
/// # 返回
/// t 统计量（a 减 b 方向）和双尾 p 值
pub fn student_t_test(a: &[f64], b: &[f64]) -> Result<TTestResult, AnalysisError> {
    let (n1, n2) = (a.len(), b.len());
    let (Some(var1), Some(var2)) = (sample_variance(a), sample_variance(b)) else {
        return Err(AnalysisError::InsufficientSamples { low: n1, high: n2 });
    };
    let (Some(mean1), Some(mean2)) = (mean(a), mean(b)) else {
        return Err(AnalysisError::InsufficientSamples { low: n1, high: n2 });
    };

    let df = (n1 + n2 - 2) as f64;
    let pooled = ((n1 - 1) as f64 * var1 + (n2 - 1) as f64 * var2) / df;
    let standard_error = (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
    if standard_error == 0.0 {
        // 两组内部都没有波动：均值不同时差异无穷显著，均值相同时 t 为 0/0
        if mean1 == mean2 {
            return Err(AnalysisError::ZeroVariance);
        }
        return Ok(TTestResult {
            statistic: (mean1 - mean2).signum() * f64::INFINITY,
            p_value: 0.0,
            degrees_of_freedom: df,
        });
    }

    let statistic = (mean1 - mean2) / standard_error;
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| AnalysisError::Distribution {
        reason: e.to_string(),
    })?;
    let p_value = (2.0 * dist.sf(statistic.abs())).clamp(0.0, 1.0);

    Ok(TTestResult {
        statistic,
        p_value,
        degrees_of_freedom: df,
    })
}
