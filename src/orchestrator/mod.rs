//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责读写表格、调用能力层并输出统计信息，是每个阶段的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `pipeline` - 流水线入口
//! - 初始化运行日志
//! - 按阶段分派
//!
//! ### `extract_stage` - 语料抽取
//! - 遍历 XML 语料树，逐篇解析
//! - 过滤母语者作文
//! - 输出母语分布和分数统计
//!
//! ### `score_stage` - 困惑度评分
//! - 逐篇调用评分器，丢弃无法评分的作文
//!
//! ### `partition_stage` - 测试集切分
//! - 高质量子集、low / high 分组、作文列表
//!
//! ### `judgment_stage` - LLM 评分
//! - 评分模板、自动评分、t 检验分析
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (分派阶段)
//!     ↓
//! *_stage (读表 → 处理 → 写表)
//!     ↓
//! services (能力层：parser / scorer / partitioner / llm / statistics)
//!     ↓
//! infrastructure (基础设施：XmlDocument)
//! ```
//!
//! 各阶段之间只通过文件通信，没有进程内调用

pub mod extract_stage;
pub mod judgment_stage;
pub mod partition_stage;
pub mod pipeline;
pub mod score_stage;

pub use pipeline::{App, Stage};
