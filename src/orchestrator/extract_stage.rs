//! 语料抽取阶段 - 编排层
//!
//! 遍历 XML 语料树 → 逐篇解析 → 过滤母语者 → 写出作文表

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{write_table, EssayRecord};
use crate::services::essay_parser::{is_native_speaker, parse_essay};
use crate::services::{statistics, SkipWriter};
use crate::utils::logging::{log_stage_complete, log_stage_start};
use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// 所在目录路径包含该片段的文档被排除
pub const EXCLUDED_PATH_TOKEN: &str = "outliers";

/// 抽取统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStats {
    /// 找到的候选文档数
    pub discovered: usize,
    /// 成功解析的文档数
    pub parsed: usize,
    /// 过滤后保留的文档数
    pub retained: usize,
    /// 因文件名重复被跳过的文档数
    pub duplicates: usize,
}

/// 抽取结果
#[derive(Debug)]
pub struct Extraction {
    pub records: Vec<EssayRecord>,
    pub stats: ExtractionStats,
}

/// 运行抽取阶段
pub async fn run(config: &Config) -> Result<ExtractionStats> {
    log_stage_start("extract", "从 XML 语料抽取非母语者作文");

    let dataset_dir = Path::new(&config.dataset_dir);
    if !dataset_dir.is_dir() {
        return Err(AppError::corpus_dir_not_found(&config.dataset_dir).into());
    }
    info!("📁 语料目录: {}", dataset_dir.display());

    let skip_writer = SkipWriter::with_path(&config.output_log_file);
    let extraction = extract_corpus(dataset_dir, &skip_writer).await?;

    let output = Path::new(&config.extracted_csv);
    write_table(output, &EssayRecord::COLUMNS, &extraction.records)
        .await
        .with_context(|| format!("无法写出作文表: {}", output.display()))?;

    log_summary(&extraction);
    let summary = format!(
        "抽取完成: 候选 {} | 解析 {} | 保留 {}",
        extraction.stats.discovered, extraction.stats.parsed, extraction.stats.retained
    );
    if let Err(e) = skip_writer.note(&summary) {
        warn!("写入运行日志失败: {}", e);
    }
    log_stage_complete("extract", &config.extracted_csv, extraction.records.len());

    Ok(extraction.stats)
}

/// 抽取整个语料树
///
/// 单篇文档读取或解析失败只会被跳过并记录，不会中断整个阶段
pub async fn extract_corpus(root: &Path, skip_writer: &SkipWriter) -> AppResult<Extraction> {
    if !root.is_dir() {
        return Err(AppError::corpus_dir_not_found(root.display().to_string()));
    }

    let documents = discover_documents(root);
    let mut stats = ExtractionStats {
        discovered: documents.len(),
        ..Default::default()
    };
    info!("🔍 找到 {} 个候选文档", stats.discovered);

    let mut parsed = Vec::with_capacity(documents.len());
    for path in &documents {
        match load_document(path).await {
            Ok(record) => {
                debug!("✓ {} ({} 词)", record.filename, record.length);
                parsed.push((path, record));
            }
            Err(e) => {
                warn!("⚠️ 跳过文档: {}", e);
                record_skip(skip_writer, path, &e.to_string());
            }
        }
    }
    stats.parsed = parsed.len();

    // filename 是后续阶段的连接键，同名文档只保留遍历顺序中的第一篇
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(parsed.len());
    for (path, record) in parsed {
        if is_native_speaker(&record) {
            continue;
        }
        if !seen.insert(record.filename.clone()) {
            warn!("⚠️ 文件名重复，跳过: {}", path.display());
            record_skip(skip_writer, path, "文件名与已保留的文档重复");
            stats.duplicates += 1;
            continue;
        }
        records.push(record);
    }
    stats.retained = records.len();

    Ok(Extraction { records, stats })
}

/// 递归查找候选文档
///
/// 只保留 `.xml` 文件，跳过所在目录路径包含 `outliers` 的文件；
/// 按文件名排序遍历，保证结果确定
pub fn discover_documents(root: &Path) -> Vec<PathBuf> {
    let mut documents = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("⚠️ 无法访问目录项: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_xml = path
            .file_name()
            .map(|name| name.to_string_lossy().ends_with(".xml"))
            .unwrap_or(false);
        if !is_xml {
            continue;
        }

        let in_excluded_dir = path
            .parent()
            .map(|dir| dir.to_string_lossy().contains(EXCLUDED_PATH_TOKEN))
            .unwrap_or(false);
        if in_excluded_dir {
            debug!("排除 outliers 文档: {}", path.display());
            continue;
        }

        documents.push(path.to_path_buf());
    }

    documents
}

fn record_skip(skip_writer: &SkipWriter, path: &Path, reason: &str) {
    if let Err(e) = skip_writer.write(&path.display().to_string(), reason) {
        warn!("写入运行日志失败: {}", e);
    }
}

async fn load_document(path: &Path) -> AppResult<EssayRecord> {
    let content = fs::read_to_string(path).await.map_err(|source| {
        crate::error::CorpusError::ReadFailed {
            path: path.display().to_string(),
            source,
        }
    })?;
    Ok(parse_essay(path, &content)?)
}

/// 按母语统计篇数（篇数降序，同数按名称升序）
pub fn language_distribution(records: &[EssayRecord]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.language.as_str()).or_default() += 1;
    }

    let mut distribution: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(language, count)| (language.to_string(), count))
        .collect();
    distribution.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    distribution
}

fn log_summary(extraction: &Extraction) {
    let stats = &extraction.stats;
    info!("📊 候选 {} 篇，解析成功 {} 篇", stats.discovered, stats.parsed);
    info!("✓ 保留非母语者作文 {} 篇", stats.retained);
    if stats.duplicates > 0 {
        warn!("⚠️ {} 篇文档因文件名重复被跳过", stats.duplicates);
    }

    info!("\n母语分布:");
    for (language, count) in language_distribution(&extraction.records) {
        info!("  {}: {}", language, count);
    }

    let scores: Vec<f64> = extraction.records.iter().map(|r| r.score).collect();
    match statistics::min_max_mean(&scores) {
        Some((min, max, mean)) => {
            info!("\n分数分布:");
            info!("  Min: {:.1}", min);
            info!("  Max: {:.1}", max);
            info!("  Mean: {:.1}", mean);
        }
        None => warn!("⚠️ 没有保留任何作文，写出空表"),
    }
}
