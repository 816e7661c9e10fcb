//! # Essay Pipeline
//!
//! 学习者作文可预测性研究流水线
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有解析后的文档树，只暴露查询能力
//! - `XmlDocument` - 实现 `DocumentQuery`（按标签查找、摊平文本）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单篇作文或一组数值
//! - `essay_parser` - 一篇 XML → 一条 EssayRecord
//! - `PredictabilityScorer` - 困惑度评分能力
//! - `partitioner` - 高质量子集与 low / high 分组
//! - `LlmService` - LLM 评分能力
//! - `statistics` - 分位数、描述统计、t 检验
//! - `SkipWriter` - 记录被跳过的条目
//!
//! ### ③ 数据层（Models）
//! - `models/` - 各阶段的行类型和 CSV 读写
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - 每个阶段：读表 → 调用能力 → 写表 → 输出统计
//!
//! ## 流水线
//!
//! ```text
//! extract → score → partition → template → (judge) → analyze
//! ```
//!
//! 阶段之间只通过文件通信。

pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{DocumentQuery, XmlDocument};
pub use models::{EssayRecord, JudgmentRow, PerplexityGroup, ScoredEssay, TestSetRow};
pub use orchestrator::{App, Stage};
pub use services::PredictabilityScorer;
pub use utils::logging;
