use crate::error::{AppResult, ConfigError};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// 程序配置
///
/// 优先级：环境变量 > TOML 配置文件 > 默认值
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 语料根目录（XML 文档树）
    pub dataset_dir: String,
    /// 第一阶段输出：抽取后的作文表
    pub extracted_csv: String,
    /// 第二阶段输出：带困惑度的作文表
    pub perplexity_csv: String,
    /// 第三阶段输出：测试集
    pub test_set_csv: String,
    /// 第三阶段输出：便于人工阅读的作文列表
    pub scoring_listing_txt: String,
    /// 第四阶段：LLM 评分模板
    pub judgment_csv: String,
    /// 运行日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,

    // --- 分组配置 ---
    /// 高质量阈值的分位数
    pub quality_quantile: f64,
    /// 每组固定大小（子集不少于两倍时使用）
    pub group_size: usize,
    /// 作文列表中正文的最大字符数
    pub excerpt_chars: usize,

    // --- 评分模板配置 ---
    /// 模板中抽取的作文数量
    pub template_sample_size: usize,
    /// 模板 model 列的默认值
    pub judge_model_label: String,
    /// 显著性水平
    pub significance_level: f64,

    // --- 困惑度模型配置 ---
    pub scorer_api_base_url: String,
    pub scorer_api_key: String,
    pub scorer_model_name: String,
    /// 少于该 token 数的作文不评分
    pub scorer_min_tokens: usize,
    /// 参与计算的最大 token 数
    pub scorer_max_tokens: usize,

    // --- LLM 评审配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_dir: "fce-released-dataset".to_string(),
            extracted_csv: "outputs/fce_essays_extracted.csv".to_string(),
            perplexity_csv: "outputs/fce_essays_with_perplexity.csv".to_string(),
            test_set_csv: "outputs/fce_test_set.csv".to_string(),
            scoring_listing_txt: "outputs/essays_for_scoring.txt".to_string(),
            judgment_csv: "outputs/llm_scores_manual.csv".to_string(),
            output_log_file: "outputs/pipeline_log.txt".to_string(),
            verbose_logging: false,
            quality_quantile: 0.75,
            group_size: 20,
            excerpt_chars: 2000,
            template_sample_size: 5,
            judge_model_label: "ChatGPT".to_string(),
            significance_level: 0.05,
            scorer_api_base_url: "http://localhost:8000/v1".to_string(),
            scorer_api_key: String::new(),
            scorer_model_name: "gpt2".to_string(),
            scorer_min_tokens: 5,
            scorer_max_tokens: 512,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
        }
    }
}

impl Config {
    /// 只从环境变量加载（未设置的字段使用默认值）
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 加载配置
    ///
    /// # 参数
    /// - `path`: TOML 配置文件路径，文件不存在时忽略
    ///
    /// # 返回
    /// 合并了配置文件和环境变量的配置
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(p) if p.exists() => Self::from_toml_file(p)?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取配置，缺失字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            dataset_dir: env_string("DATASET_DIR", self.dataset_dir),
            extracted_csv: env_string("EXTRACTED_CSV", self.extracted_csv),
            perplexity_csv: env_string("PERPLEXITY_CSV", self.perplexity_csv),
            test_set_csv: env_string("TEST_SET_CSV", self.test_set_csv),
            scoring_listing_txt: env_string("SCORING_LISTING_TXT", self.scoring_listing_txt),
            judgment_csv: env_string("JUDGMENT_CSV", self.judgment_csv),
            output_log_file: env_string("OUTPUT_LOG_FILE", self.output_log_file),
            verbose_logging: env_parsed("VERBOSE_LOGGING", self.verbose_logging),
            quality_quantile: env_parsed("QUALITY_QUANTILE", self.quality_quantile),
            group_size: env_parsed("GROUP_SIZE", self.group_size),
            excerpt_chars: env_parsed("EXCERPT_CHARS", self.excerpt_chars),
            template_sample_size: env_parsed("TEMPLATE_SAMPLE_SIZE", self.template_sample_size),
            judge_model_label: env_string("JUDGE_MODEL_LABEL", self.judge_model_label),
            significance_level: env_parsed("SIGNIFICANCE_LEVEL", self.significance_level),
            scorer_api_base_url: env_string("SCORER_API_BASE_URL", self.scorer_api_base_url),
            scorer_api_key: env_string("SCORER_API_KEY", self.scorer_api_key),
            scorer_model_name: env_string("SCORER_MODEL_NAME", self.scorer_model_name),
            scorer_min_tokens: env_parsed("SCORER_MIN_TOKENS", self.scorer_min_tokens),
            scorer_max_tokens: env_parsed("SCORER_MAX_TOKENS", self.scorer_max_tokens),
            llm_api_key: env_string("LLM_API_KEY", self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL", self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME", self.llm_model_name),
        }
    }
}

fn env_string(var_name: &str, fallback: String) -> String {
    std::env::var(var_name).unwrap_or(fallback)
}

fn env_parsed<T: FromStr>(var_name: &str, fallback: T) -> T {
    std::env::var(var_name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}
