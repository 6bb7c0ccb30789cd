// 视觉模型接口定义

use crate::models::Frame;
use anyhow::Result;
use async_trait::async_trait;

/// 视觉模型提供商
///
/// 接收一段固定提示词和若干帧图片，返回模型的原始文本回复。
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// 提供商名称
    fn name(&self) -> &str;

    /// 是否已配置凭证
    fn is_configured(&self) -> bool;

    /// 发送请求并返回文本回复
    async fn generate(&self, prompt: &str, frames: &[Frame]) -> Result<String>;
}
