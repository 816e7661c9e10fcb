//! 作文表的行类型
//!
//! 每个阶段只在上一阶段的列之后追加新列，列顺序即 CSV 表头顺序

use serde::{Deserialize, Serialize, Serializer};

/// 第一阶段：从一篇 XML 文档抽取出的作文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EssayRecord {
    /// 源文件名（跨阶段的主键）
    pub filename: String,
    /// 母语（自报）
    pub language: String,
    /// 年龄段（原样保留）
    pub age: String,
    /// 人工评分
    #[serde(serialize_with = "serialize_float")]
    pub score: f64,
    /// 词数
    pub length: usize,
    /// 去除标注后的作文正文
    pub essay_text: String,
}

impl EssayRecord {
    pub const COLUMNS: [&'static str; 6] =
        ["filename", "language", "age", "score", "length", "essay_text"];
}

/// 第二阶段：带困惑度的作文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEssay {
    pub filename: String,
    pub language: String,
    pub age: String,
    #[serde(serialize_with = "serialize_float")]
    pub score: f64,
    pub length: usize,
    pub essay_text: String,
    /// 困惑度（越低越可预测）
    #[serde(serialize_with = "serialize_float")]
    pub perplexity: f64,
}

impl ScoredEssay {
    pub const COLUMNS: [&'static str; 7] = [
        "filename",
        "language",
        "age",
        "score",
        "length",
        "essay_text",
        "perplexity",
    ];

    pub fn from_record(record: EssayRecord, perplexity: f64) -> Self {
        Self {
            filename: record.filename,
            language: record.language,
            age: record.age,
            score: record.score,
            length: record.length,
            essay_text: record.essay_text,
            perplexity,
        }
    }
}

/// 困惑度分组标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerplexityGroup {
    Low,
    High,
}

impl PerplexityGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            PerplexityGroup::Low => "low",
            PerplexityGroup::High => "high",
        }
    }
}

impl std::fmt::Display for PerplexityGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 第三阶段：测试集中的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSetRow {
    pub filename: String,
    pub language: String,
    pub age: String,
    #[serde(serialize_with = "serialize_float")]
    pub score: f64,
    pub length: usize,
    pub essay_text: String,
    #[serde(serialize_with = "serialize_float")]
    pub perplexity: f64,
    pub perplexity_group: PerplexityGroup,
}

impl TestSetRow {
    pub const COLUMNS: [&'static str; 8] = [
        "filename",
        "language",
        "age",
        "score",
        "length",
        "essay_text",
        "perplexity",
        "perplexity_group",
    ];

    pub fn from_scored(essay: ScoredEssay, group: PerplexityGroup) -> Self {
        Self {
            filename: essay.filename,
            language: essay.language,
            age: essay.age,
            score: essay.score,
            length: essay.length,
            essay_text: essay.essay_text,
            perplexity: essay.perplexity,
            perplexity_group: group,
        }
    }
}

/// 第四阶段：LLM 评分模板中的一行
///
/// 三次评分与均值在人工（或自动）填写前为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentRow {
    pub filename: String,
    pub language: String,
    pub age: String,
    #[serde(serialize_with = "serialize_float")]
    pub score: f64,
    pub length: usize,
    pub essay_text: String,
    #[serde(serialize_with = "serialize_float")]
    pub perplexity: f64,
    pub perplexity_group: PerplexityGroup,
    /// 评分所用模型
    pub model: String,
    #[serde(serialize_with = "serialize_opt_float")]
    pub score_run1: Option<f64>,
    #[serde(serialize_with = "serialize_opt_float")]
    pub score_run2: Option<f64>,
    #[serde(serialize_with = "serialize_opt_float")]
    pub score_run3: Option<f64>,
    #[serde(serialize_with = "serialize_opt_float")]
    pub mean_score: Option<f64>,
}

impl JudgmentRow {
    pub const COLUMNS: [&'static str; 13] = [
        "filename",
        "language",
        "age",
        "score",
        "length",
        "essay_text",
        "perplexity",
        "perplexity_group",
        "model",
        "score_run1",
        "score_run2",
        "score_run3",
        "mean_score",
    ];

    pub fn from_test_row(row: TestSetRow, model: impl Into<String>) -> Self {
        Self {
            filename: row.filename,
            language: row.language,
            age: row.age,
            score: row.score,
            length: row.length,
            essay_text: row.essay_text,
            perplexity: row.perplexity,
            perplexity_group: row.perplexity_group,
            model: model.into(),
            score_run1: None,
            score_run2: None,
            score_run3: None,
            mean_score: None,
        }
    }

    pub fn runs(&self) -> [Option<f64>; 3] {
        [self.score_run1, self.score_run2, self.score_run3]
    }

    pub fn set_run(&mut self, run: usize, value: Option<f64>) {
        match run {
            0 => self.score_run1 = value,
            1 => self.score_run2 = value,
            2 => self.score_run3 = value,
            _ => {}
        }
    }

    /// 所有评分都已填写
    pub fn is_complete(&self) -> bool {
        self.runs().iter().all(Option::is_some)
    }

    /// 按已填写的评分重新计算均值
    pub fn recompute_mean(&mut self) {
        self.mean_score = mean_of_runs(&self.runs());
    }
}

/// 分析阶段只需要的列
///
/// 模板被人工编辑后其他列可能变化，这里只依赖分组、人工评分和三次评分
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JudgmentScores {
    pub perplexity_group: String,
    pub score: f64,
    pub score_run1: Option<f64>,
    pub score_run2: Option<f64>,
    pub score_run3: Option<f64>,
}

impl JudgmentScores {
    pub const REQUIRED_COLUMNS: [&'static str; 5] = [
        "perplexity_group",
        "score",
        "score_run1",
        "score_run2",
        "score_run3",
    ];

    /// 已填写评分的均值，三次都为空时返回 None
    pub fn mean_score(&self) -> Option<f64> {
        mean_of_runs(&[self.score_run1, self.score_run2, self.score_run3])
    }
}

fn mean_of_runs(runs: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = runs.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// 浮点数的文本形式：整数值保留一位小数（`5.0`），其余用最短往返表示
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn serialize_float<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_float(*value))
}

fn serialize_opt_float<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&format_float(*v)),
        None => serializer.serialize_str(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(5.0), "5.0");
        assert_eq!(format_float(5.3), "5.3");
        assert_eq!(format_float(23.456789), "23.456789");
    }

    #[test]
    fn test_perplexity_group_labels() {
        assert_eq!(PerplexityGroup::Low.to_string(), "low");
        assert_eq!(PerplexityGroup::High.as_str(), "high");
    }

    #[test]
    fn test_judgment_mean_ignores_missing_runs() {
        let scores = JudgmentScores {
            perplexity_group: "low".to_string(),
            score: 30.0,
            score_run1: Some(7.0),
            score_run2: None,
            score_run3: Some(8.0),
        };
        assert_eq!(scores.mean_score(), Some(7.5));

        let empty = JudgmentScores {
            score_run1: None,
            score_run3: None,
            ..scores
        };
        assert_eq!(empty.mean_score(), None);
    }

    #[test]
    fn test_judgment_row_runs_and_mean() {
        let row = TestSetRow {
            filename: "doc1.xml".to_string(),
            language: "French".to_string(),
            age: "Unknown".to_string(),
            score: 31.0,
            length: 2,
            essay_text: "Hello world".to_string(),
            perplexity: 40.5,
            perplexity_group: PerplexityGroup::High,
        };
        let mut judgment = JudgmentRow::from_test_row(row, "ChatGPT");
        assert!(!judgment.is_complete());
        assert_eq!(judgment.mean_score, None);

        judgment.set_run(0, Some(6.0));
        judgment.set_run(1, Some(7.0));
        judgment.set_run(2, Some(8.0));
        judgment.recompute_mean();
        assert!(judgment.is_complete());
        assert_eq!(judgment.mean_score, Some(7.0));
    }
}
