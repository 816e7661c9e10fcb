//! 命令行入口
//!
//! 每个阶段一个子命令，路径等参数全部来自配置

use crate::orchestrator::Stage;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "essay_pipeline",
    version,
    about = "学习者作文可预测性研究流水线：抽取 → 困惑度 → 分组 → LLM 评分分析"
)]
pub struct Cli {
    /// TOML 配置文件（不存在时使用默认值和环境变量）
    #[arg(long, global = true, default_value = "pipeline.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// 从标注 XML 语料中抽取非母语者作文
    Extract,
    /// 计算每篇作文的困惑度
    Score,
    /// 选出高分作文并切分为 low / high 困惑度两组
    Partition,
    /// 为测试集前几篇作文生成 LLM 评分模板
    Template,
    /// 调用配置的对话模型自动填写评分模板
    Judge,
    /// 比较两组的 LLM 评分
    Analyze,
    /// 依次运行 extract、score、partition 和 template
    All,
}

impl From<Commands> for Stage {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Extract => Stage::Extract,
            Commands::Score => Stage::Score,
            Commands::Partition => Stage::Partition,
            Commands::Template => Stage::Template,
            Commands::Judge => Stage::Judge,
            Commands::Analyze => Stage::Analyze,
            Commands::All => Stage::All,
        }
    }
}
