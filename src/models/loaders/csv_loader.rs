use crate::error::{AppResult, TableError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::fs;

/// 读取 CSV 表格并反序列化为行对象列表
///
/// 按表头名称匹配字段，多余的列会被忽略
pub async fn read_table<T: DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    let content = read_content(path).await?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<T>().enumerate() {
        let row = result.map_err(|source| TableError::Malformed {
            path: path.display().to_string(),
            row: idx + 2,
            source,
        })?;
        rows.push(row);
    }

    tracing::debug!("从 {} 读取 {} 行", path.display(), rows.len());
    Ok(rows)
}

/// 只读取表头
pub async fn read_headers(path: &Path) -> AppResult<Vec<String>> {
    let content = read_content(path).await?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers().map_err(|source| TableError::Malformed {
        path: path.display().to_string(),
        row: 1,
        source,
    })?;
    Ok(headers.iter().map(str::to_string).collect())
}

/// 写入 CSV 表格
///
/// 表头总是写出，即使没有任何数据行
///
/// # 参数
/// - `path`: 输出路径（父目录不存在时自动创建）
/// - `header`: 表头，必须与行类型的字段顺序一致
/// - `rows`: 数据行
pub async fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> AppResult<()> {
    let path_str = path.display().to_string();
    let serialize_err = |source: csv::Error| TableError::SerializeFailed {
        path: path_str.clone(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(header).map_err(serialize_err)?;
    for row in rows {
        writer.serialize(row).map_err(serialize_err)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| TableError::WriteFailed {
            path: path_str.clone(),
            source: e.into_error(),
        })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| TableError::WriteFailed {
                    path: path_str.clone(),
                    source,
                })?;
        }
    }

    fs::write(path, bytes)
        .await
        .map_err(|source| TableError::WriteFailed {
            path: path_str.clone(),
            source,
        })?;

    tracing::debug!("写入 {} 行到 {}", rows.len(), path_str);
    Ok(())
}

async fn read_content(path: &Path) -> AppResult<String> {
    if !path.exists() {
        return Err(TableError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| TableError::ReadFailed {
            path: path.display().to_string(),
            source,
        })?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::EssayRecord;

    fn record(filename: &str, text: &str) -> EssayRecord {
        EssayRecord {
            filename: filename.to_string(),
            language: "Polish".to_string(),
            age: "Unknown".to_string(),
            score: 0.0,
            length: text.split_whitespace().count(),
            essay_text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_table_still_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("empty.csv");

        write_table::<EssayRecord>(&path, &EssayRecord::COLUMNS, &[])
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "filename,language,age,score,length,essay_text\n");
    }

    #[tokio::test]
    async fn test_written_rows_follow_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("essays.csv");
        let rows = vec![record("a.xml", "Hello, \"quoted\" world")];

        write_table(&path, &EssayRecord::COLUMNS, &rows).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let second_line = content.lines().nth(1).unwrap();
        assert_eq!(
            second_line,
            "a.xml,Polish,Unknown,0.0,3,\"Hello, \"\"quoted\"\" world\""
        );

        let loaded: Vec<EssayRecord> = read_table(&path).await.unwrap();
        assert_eq!(loaded, rows);
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let err = read_table::<EssayRecord>(Path::new("/nonexistent/table.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Table(TableError::NotFound { .. })));
        assert!(err.is_missing_input());
    }

    #[tokio::test]
    async fn test_read_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();

        let headers = read_headers(&path).await.unwrap();
        assert_eq!(headers, vec!["a", "b", "c"]);
    }
}
