//! 作文解析服务 - 业务能力层
//!
//! 只负责"把一篇文档变成一条 EssayRecord"，不关心目录遍历和过滤

use crate::error::CorpusError;
use crate::infrastructure::{DocumentQuery, XmlDocument};
use crate::models::EssayRecord;
use std::path::Path;

/// 字段缺失时的默认值
pub const UNKNOWN: &str = "Unknown";

/// 母语为该值（不区分大小写）的作文被排除
pub const NATIVE_LANGUAGE: &str = "english";

/// 解析一篇 XML 文档
///
/// # 参数
/// - `path`: 文档路径（文件名作为记录标识）
/// - `content`: 文档内容
///
/// # 返回
/// 解析成功返回 EssayRecord，格式错误返回 CorpusError
pub fn parse_essay(path: &Path, content: &str) -> Result<EssayRecord, CorpusError> {
    let path_str = path.display().to_string();
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CorpusError::FieldExtraction {
            path: path_str.clone(),
            reason: "路径没有文件名".to_string(),
        })?;

    let doc = XmlDocument::parse(content, &path_str)?;
    Ok(extract_record(&doc, filename))
}

/// 从任意实现了 DocumentQuery 的文档中抽取字段
pub fn extract_record(doc: &impl DocumentQuery, filename: String) -> EssayRecord {
    let language = doc
        .first_text("language")
        .unwrap_or_else(|| UNKNOWN.to_string());
    let age = doc.first_text("age").unwrap_or_else(|| UNKNOWN.to_string());
    let score = doc.first_text("score").map_or(0.0, |text| parse_score(&text));
    let essay_text = join_answer_blocks(doc.flattened_texts("coded_answer"));
    let length = essay_text.split_whitespace().count();

    EssayRecord {
        filename,
        language,
        age,
        score,
        length,
        essay_text,
    }
}

/// 是否为母语者作文
pub fn is_native_speaker(record: &EssayRecord) -> bool {
    record.language.to_lowercase() == NATIVE_LANGUAGE
}

/// 解析分数，非数字与非有限值都按 0.0 处理
fn parse_score(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// 每段去除首尾空白，丢弃空段，用单个空格拼接
fn join_answer_blocks(blocks: Vec<String>) -> String {
    blocks
        .iter()
        .map(|block| block.trim())
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
