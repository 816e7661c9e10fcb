use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 语料解析错误
    #[error("语料错误: {0}")]
    Corpus(#[from] CorpusError),
    /// 表格读写错误
    #[error("表格错误: {0}")]
    Table(#[from] TableError),
    /// 困惑度评分错误
    #[error("评分错误: {0}")]
    Scoring(#[from] ScoringError),
    /// 统计分析错误
    #[error("分析错误: {0}")]
    Analysis(#[from] AnalysisError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 单个 XML 文档的解析错误
///
/// 只影响当前文档，调用方跳过该文档后继续处理
#[derive(Debug, Error)]
pub enum CorpusError {
    /// 语料目录不存在
    #[error("语料目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// 读取文档失败
    #[error("读取文档失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// XML 格式错误
    #[error("XML 解析失败 ({path}): {source}")]
    MalformedXml {
        path: String,
        #[source]
        source: roxmltree::Error,
    },
    /// 字段提取失败
    #[error("字段提取失败 ({path}): {reason}")]
    FieldExtraction { path: String, reason: String },
}

/// CSV 表格错误
#[derive(Debug, Error)]
pub enum TableError {
    /// 表格文件不存在
    #[error("表格文件不存在: {path}")]
    NotFound { path: String },
    /// 读取表格失败
    #[error("读取表格失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入表格失败
    #[error("写入表格失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 表格内容无法解析
    #[error("表格内容无法解析 ({path}, 第 {row} 行): {source}")]
    Malformed {
        path: String,
        row: usize,
        #[source]
        source: csv::Error,
    },
    /// 序列化行失败
    #[error("序列化表格失败 ({path}): {source}")]
    SerializeFailed {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// 困惑度评分错误
#[derive(Debug, Error)]
pub enum ScoringError {
    /// 请求模型接口失败
    #[error("模型接口请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 接口返回中缺少 logprobs
    #[error("模型接口未返回 logprobs ({endpoint})")]
    MissingLogprobs { endpoint: String },
}

/// 统计分析错误
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// 模板缺少必需的列
    #[error("模板缺少必需的列 ({path}): {}", columns.join(", "))]
    MissingColumns { path: String, columns: Vec<String> },
    /// 模板尚未填写任何评分
    #[error("模板尚未填写评分: {path}")]
    TemplateNotFilled { path: String },
    /// 样本数不足，无法进行 t 检验
    #[error("样本数不足 (low: {low}, high: {high})，t 检验至少每组需要 2 个评分")]
    InsufficientSamples { low: usize, high: usize },
    /// 两组合并方差为 0 且均值相同
    #[error("两组评分方差均为 0 且均值相同，t 统计量无定义")]
    ZeroVariance,
    /// t 分布构造失败
    #[error("t 分布构造失败: {reason}")]
    Distribution { reason: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建表格不存在错误
    pub fn table_not_found(path: impl Into<String>) -> Self {
        AppError::Table(TableError::NotFound { path: path.into() })
    }

    /// 创建语料目录不存在错误
    pub fn corpus_dir_not_found(path: impl Into<String>) -> Self {
        AppError::Corpus(CorpusError::DirectoryNotFound { path: path.into() })
    }

    /// 是否属于"输入缺失"类错误
    pub fn is_missing_input(&self) -> bool {
        matches!(
            self,
            AppError::Table(TableError::NotFound { .. })
                | AppError::Corpus(CorpusError::DirectoryNotFound { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
