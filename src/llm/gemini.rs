// Google Gemini 提供商实现 - 图片以内联 base64 方式随提示词一起发送

use super::plugin::VisionModel;
use crate::models::Frame;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini提供商
pub struct GeminiProvider {
    api_key: Option<String>,
    model: String,
    client: Client,
    base_url: String,
}

impl GeminiProvider {
    /// 创建新的Gemini提供商（接受共享的HTTP客户端以复用连接池）
    pub fn new(client: Client) -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// 设置API密钥，空字符串视为未配置
    pub fn set_api_key(&mut self, api_key: Option<String>) {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
    }

    pub fn set_model(&mut self, model: String) {
        self.model = model;
    }

    pub fn set_base_url(&mut self, base_url: String) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// 构建 generateContent 请求体：先提示词，后每帧一个 inline_data
pub fn build_request_body(prompt: &str, frames: &[Frame]) -> Value {
    let mut parts = Vec::with_capacity(frames.len() + 1);
    parts.push(json!({ "text": prompt }));

    for frame in frames {
        parts.push(json!({
            "inline_data": {
                "mime_type": Frame::MIME_TYPE,
                "data": frame.to_base64()
            }
        }));
    }

    json!({
        "contents": [
            {
                "role": "user",
                "parts": parts
            }
        ],
        "generationConfig": {
            "temperature": 0.4
        }
    })
}

/// 从响应中取出第一个候选的全部文本
fn extract_text(response: GeminiResponse) -> Result<String> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(anyhow!("请求被Gemini拦截: {}", reason));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Gemini未返回任何候选结果"))?;

    if candidate.finish_reason.as_deref() == Some("MAX_TOKENS") {
        warn!("Gemini 响应因达到 token 限制而被截断");
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(anyhow!(
            "Gemini返回了空内容 (finish_reason={:?})",
            candidate.finish_reason
        ));
    }
    Ok(text)
}

#[async_trait]
impl VisionModel for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str, frames: &[Frame]) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Gemini API key未配置"))?;

        let payload_chars: usize = frames.iter().map(|f| f.jpeg.len().div_ceil(3) * 4).sum();
        info!(
            "发送 {} 帧到 Gemini ({}), 约 {} KB, 估计 {} tokens",
            frames.len(),
            self.model,
            payload_chars / 1024,
            payload_chars / 4
        );

        let request_body = build_request_body(prompt, frames);
        let start_time = Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API错误 ({}): {}", status, error_text);
            return Err(anyhow!("Gemini API调用失败 ({}): {}", status, error_text));
        }

        let response_data: GeminiResponse = response.json().await?;
        let text = extract_text(response_data)?;

        debug!(
            "Gemini 响应: {} 字符, 耗时 {}ms",
            text.chars().count(),
            start_time.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Gemini API响应结构
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>, // STOP, MAX_TOKENS, SAFETY ...
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
