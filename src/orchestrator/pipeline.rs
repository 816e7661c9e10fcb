//! 流水线入口 - 编排层
//!
//! 持有配置、初始化运行日志，并按阶段分派

use crate::config::Config;
use crate::orchestrator::{extract_stage, judgment_stage, partition_stage, score_stage};
use crate::utils::logging::init_log_file;
use anyhow::Result;
use tracing::info;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 从 XML 语料抽取作文
    Extract,
    /// 计算困惑度
    Score,
    /// 切分测试集
    Partition,
    /// 生成评分模板
    Template,
    /// LLM 自动评分
    Judge,
    /// 分析评分
    Analyze,
    /// 依次运行 extract → score → partition → template
    All,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Score => "score",
            Stage::Partition => "partition",
            Stage::Template => "template",
            Stage::Judge => "judge",
            Stage::Analyze => "analyze",
            Stage::All => "all",
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config, stage: Stage) -> Result<Self> {
        init_log_file(&config.output_log_file, stage.name())?;
        log_startup(&config, stage);
        Ok(Self { config })
    }

    /// 运行指定阶段
    pub async fn run(&self, stage: Stage) -> Result<()> {
        let config = &self.config;
        match stage {
            Stage::Extract => {
                extract_stage::run(config).await?;
            }
            Stage::Score => {
                score_stage::run(config).await?;
            }
            Stage::Partition => {
                partition_stage::run(config).await?;
            }
            Stage::Template => {
                judgment_stage::run_template(config).await?;
            }
            Stage::Judge => {
                judgment_stage::run_judge(config).await?;
            }
            Stage::Analyze => judgment_stage::run_analyze(config).await?,
            Stage::All => {
                extract_stage::run(config).await?;
                score_stage::run(config).await?;
                partition_stage::run(config).await?;
                judgment_stage::run_template(config).await?;
                info!("\n💡 填写评分后运行 analyze 子命令查看结果");
            }
        }
        Ok(())
    }
}

fn log_startup(config: &Config, stage: Stage) {
    info!("{}", "=".repeat(60));
    info!("🚀 作文可预测性流水线 - 阶段: {}", stage.name());
    info!("📝 运行日志: {}", config.output_log_file);
    info!("{}", "=".repeat(60));
}
