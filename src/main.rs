use clap::Parser;
use essay_pipeline::cli::Cli;
use essay_pipeline::{logging, App, Config, Stage};
use std::process::ExitCode;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 加载配置
    let config = match Config::load(Some(cli.config.as_path())) {
        Ok(config) => config,
        Err(e) => {
            logging::init(false);
            error!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    let stage = Stage::from(cli.command);
    let result = match App::initialize(config, stage) {
        Ok(app) => app.run(stage).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ 阶段 {} 失败: {:#}", stage.name(), e);
            ExitCode::FAILURE
        }
    }
}
