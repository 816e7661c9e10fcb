//! 跳过记录服务 - 业务能力层
//!
//! 只负责"把被跳过的条目追加到运行日志"能力

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

/// 跳过记录写入服务
///
/// 职责：
/// - 将解析失败、无法评分的条目写入运行日志
/// - 只处理单个条目
/// - 不关心流程顺序
pub struct SkipWriter {
    log_file_path: String,
}

impl SkipWriter {
    /// 使用运行日志路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            log_file_path: path.into(),
        }
    }

    /// 追加一条跳过记录
    ///
    /// # 参数
    /// - `item`: 条目标识（文档路径或文件名）
    /// - `reason`: 跳过原因
    pub fn write(&self, item: &str, reason: &str) -> Result<()> {
        debug!("记录跳过: {} | {}", item, reason);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)?;

        writeln!(file, "跳过 | {} | {}", item, reason)?;

        Ok(())
    }

    /// 追加一行普通文本（阶段汇总等）
    pub fn note(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
