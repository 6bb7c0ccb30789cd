// LLM模块 - 外部视觉模型接入

pub mod gemini;
pub mod plugin;
pub mod prompt;

pub use gemini::GeminiProvider;
pub use plugin::VisionModel;
pub use prompt::ANALYSIS_PROMPT;

use crate::settings::Settings;
use reqwest::Client;
use tracing::{info, warn};

/// 根据配置创建视觉模型
///
/// 缺少 API key 不会导致启动失败，此时每次分析都会使用演示数据。
pub fn build_provider(client: Client, settings: &Settings) -> GeminiProvider {
    let mut provider = GeminiProvider::new(client);
    provider.set_model(settings.model.clone());
    provider.set_base_url(settings.base_url.clone());
    provider.set_api_key(settings.api_key.clone());

    if provider.is_configured() {
        info!("已配置视觉模型: {} ({})", provider.name(), settings.model);
    } else {
        warn!("未配置 GEMINI_API_KEY，分析将返回演示数据");
    }
    provider
}
