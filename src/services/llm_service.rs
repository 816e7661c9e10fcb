//! LLM 评审服务 - 业务能力层
//!
//! 只负责"让 LLM 给一篇作文打分"能力，不关心模板和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::config::Config;

/// 系统提示词
pub const JUDGE_SYSTEM_PROMPT: &str =
    "You are an experienced writing instructor evaluating student essays.";

/// 评分提示词，占位符会被替换为作文正文
pub const JUDGE_PROMPT: &str = "Score this essay on a scale of 1-10 based solely on the quality of \
its argument, use of evidence, and logical reasoning. Ignore minor grammar errors and focus only \
on the strength and development of ideas. Provide only the score as a number.

[PASTE ESSAY TEXT HERE]";

const ESSAY_PLACEHOLDER: &str = "[PASTE ESSAY TEXT HERE]";

/// 评分范围
const SCORE_RANGE: std::ops::RangeInclusive<f64> = 1.0..=10.0;

/// LLM 评审服务
///
/// 职责：
/// - 调用 LLM API 给单篇作文打分
/// - 只处理单篇作文
/// - 不读写模板文件
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.7)
            .max_tokens(16u32)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }

    /// 给一篇作文打分
    ///
    /// # 返回
    /// - `Ok(Some(score))`: 解析出 1-10 的分数
    /// - `Ok(None)`: 回复中没有合法分数
    pub async fn judge_essay(&self, essay_text: &str) -> Result<Option<f64>> {
        let prompt = build_judge_prompt(essay_text);
        let response = self
            .send_to_llm(&prompt, Some(JUDGE_SYSTEM_PROMPT))
            .await?;

        let score = parse_score_response(&response);
        if score.is_none() {
            warn!("无法从 LLM 响应中解析分数: '{}'", response);
        }
        Ok(score)
    }
}

/// 把作文正文填入评分提示词
pub fn build_judge_prompt(essay_text: &str) -> String {
    JUDGE_PROMPT.replace(ESSAY_PLACEHOLDER, essay_text)
}

/// 解析 LLM 的评分回复
///
/// 取回复中第一个落在 1-10 之间的数字
pub fn parse_score_response(response: &str) -> Option<f64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let number = NUMBER.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("合法的正则表达式"));

    number
        .find_iter(response)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .find(|score| SCORE_RANGE.contains(score))
}
