//! XML 文档查询 - 基础设施层
//!
//! 持有解析后的文档树，只暴露"按标签查找"的能力

use crate::error::CorpusError;
use roxmltree::{Document, Node, ParsingOptions};

/// 文档查询能力
///
/// 调用方只关心"找到第一个某标签的后代"和"把所有某标签的后代摊平成文本"，
/// 不关心底层用什么解析器
pub trait DocumentQuery {
    /// 第一个标签为 `tag` 的后代元素的直接文本（原样返回，空文本视为不存在）
    fn first_text(&self, tag: &str) -> Option<String>;

    /// 所有标签为 `tag` 的后代元素，各自递归拼接全部文本节点（按文档顺序）
    fn flattened_texts(&self, tag: &str) -> Vec<String>;
}

/// 基于 roxmltree 的 XML 文档
///
/// 职责：
/// - 持有解析后的文档树
/// - 实现 DocumentQuery
/// - 不认识 EssayRecord
pub struct XmlDocument<'input> {
    doc: Document<'input>,
}

impl<'input> XmlDocument<'input> {
    /// 解析 XML 文本
    ///
    /// # 参数
    /// - `text`: 文档内容
    /// - `path`: 文档路径（仅用于错误信息）
    pub fn parse(text: &'input str, path: &str) -> Result<Self, CorpusError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(text, options).map_err(|source| {
            CorpusError::MalformedXml {
                path: path.to_string(),
                source,
            }
        })?;
        Ok(Self { doc })
    }

    /// 根元素以下（不含根元素本身）所有标签匹配的元素
    fn descendants_named<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
        self.doc
            .root_element()
            .descendants()
            .skip(1)
            .filter(move |n| n.is_element() && n.tag_name().name() == tag)
    }
}

impl DocumentQuery for XmlDocument<'_> {
    fn first_text(&self, tag: &str) -> Option<String> {
        self.descendants_named(tag)
            .next()
            .and_then(|node| node.text())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    }

    fn flattened_texts(&self, tag: &str) -> Vec<String> {
        self.descendants_named(tag)
            .map(|node| {
                node.descendants()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect::<String>()
            })
            .collect()
    }
}
