//! 困惑度评分服务 - 业务能力层
//!
//! 只负责"给一篇作文算困惑度"能力
//!
//! ## 技术栈
//! - 使用 `reqwest` 调用兼容 OpenAI 的 `/completions` 接口
//! - 通过 `echo` + `logprobs` 拿到提示词本身每个 token 的对数概率
//! - 困惑度 = exp(-平均对数概率)

use crate::config::Config;
use crate::error::ScoringError;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// 可预测性评分能力
///
/// 返回 None 表示"无法评分"（文本过短或调用失败），调用方应丢弃该作文
#[allow(async_fn_in_trait)]
pub trait PredictabilityScorer {
    async fn score(&self, text: &str) -> Option<f64>;
}

/// 基于 completions logprobs 的困惑度评分
pub struct CompletionLogprobScorer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_name: String,
    min_tokens: usize,
    max_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    logprobs: Option<CompletionLogprobs>,
}

#[derive(Debug, Deserialize)]
struct CompletionLogprobs {
    #[serde(default)]
    token_logprobs: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: usize,
}

impl CompletionLogprobScorer {
    /// 创建新的困惑度评分服务
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!(
                "{}/completions",
                config.scorer_api_base_url.trim_end_matches('/')
            ),
            api_key: config.scorer_api_key.clone(),
            model_name: config.scorer_model_name.clone(),
            min_tokens: config.scorer_min_tokens,
            max_tokens: config.scorer_max_tokens,
        }
    }

    /// 请求接口并计算困惑度
    ///
    /// # 返回
    /// - `Ok(Some(ppl))`: 评分成功
    /// - `Ok(None)`: 文本 token 数不足
    /// - `Err(_)`: 接口调用或解析失败
    async fn request_perplexity(&self, text: &str) -> Result<Option<f64>, ScoringError> {
        let body = json!({
            "model": self.model_name,
            "prompt": text,
            "max_tokens": 1,
            "echo": true,
            "logprobs": 0,
            "temperature": 0.0,
        });

        let request_failed = |source: reqwest::Error| ScoringError::RequestFailed {
            endpoint: self.endpoint.clone(),
            source,
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response: CompletionResponse = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(request_failed)?
            .json()
            .await
            .map_err(request_failed)?;

        let token_logprobs = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.logprobs)
            .map(|logprobs| logprobs.token_logprobs)
            .ok_or_else(|| ScoringError::MissingLogprobs {
                endpoint: self.endpoint.clone(),
            })?;

        // 没有 usage 时，echo 结果末尾多出的是生成的那一个 token
        let prompt_tokens = response
            .usage
            .map(|u| u.prompt_tokens)
            .unwrap_or_else(|| token_logprobs.len().saturating_sub(1));

        Ok(perplexity_from_logprobs(
            &token_logprobs,
            prompt_tokens,
            self.min_tokens,
            self.max_tokens,
        ))
    }
}

impl PredictabilityScorer for CompletionLogprobScorer {
    async fn score(&self, text: &str) -> Option<f64> {
        match self.request_perplexity(text).await {
            Ok(Some(ppl)) => {
                debug!("困惑度: {:.2}", ppl);
                Some(ppl)
            }
            Ok(None) => {
                debug!("文本过短，跳过评分");
                None
            }
            Err(e) => {
                warn!("困惑度计算失败: {}", e);
                None
            }
        }
    }
}

/// 由提示词 token 的对数概率计算困惑度
///
/// # 参数
/// - `token_logprobs`: 每个 token 的对数概率（第一个 token 没有上文，为 None）
/// - `prompt_tokens`: 提示词 token 数，之后的条目是生成的 token，不参与计算
/// - `min_tokens`: 少于该 token 数返回 None
/// - `max_tokens`: 只使用前 `max_tokens` 个 token
pub fn perplexity_from_logprobs(
    token_logprobs: &[Option<f64>],
    prompt_tokens: usize,
    min_tokens: usize,
    max_tokens: usize,
) -> Option<f64> {
    let usable = prompt_tokens.min(token_logprobs.len()).min(max_tokens);
    if usable < min_tokens {
        return None;
    }

    let logprobs: Vec<f64> = token_logprobs[..usable]
        .iter()
        .flatten()
        .copied()
        .filter(|lp| lp.is_finite())
        .collect();
    if logprobs.is_empty() {
        return None;
    }

    let mean_logprob = logprobs.iter().sum::<f64>() / logprobs.len() as f64;
    Some((-mean_logprob).exp())
}
