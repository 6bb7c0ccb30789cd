// 配置管理 - JSON 配置文件 + 环境变量覆盖

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::models::ExtractionRequest;
use crate::utils::validation::MAX_UPLOAD_BYTES;

/// API 密钥环境变量
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// 模型名称环境变量
pub const MODEL_ENV: &str = "PETVISION_MODEL";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Gemini API key（通常由环境变量提供）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// 模型请求超时（秒）
    pub request_timeout_secs: u64,
    /// 单帧 seek 超时（秒）
    pub seek_timeout_secs: u64,
    /// 自定义 ffmpeg 路径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
    /// 日志目录，未设置时使用系统默认位置
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// 抽帧参数
    pub extraction: ExtractionRequest,
    /// 上传文件大小上限（字节）
    pub max_upload_bytes: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 60,
            seek_timeout_secs: 15,
            ffmpeg_path: None,
            log_dir: None,
            extraction: ExtractionRequest::default(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    /// 读取配置
    ///
    /// 指定的配置文件不存在时写入默认配置；未指定时直接使用默认值。
    /// 读取后应用环境变量覆盖并校验。
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::load_file(path).await?,
            None => Self::default(),
        };

        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    async fn load_file(path: &Path) -> Result<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) if !bytes.is_empty() => {
                let settings = serde_json::from_slice::<Settings>(&bytes)
                    .map_err(|e| anyhow!("配置文件格式错误 {}: {}", path.display(), e))?;
                info!("已加载配置文件: {}", path.display());
                Ok(settings)
            }
            Ok(_) => Ok(Self::default()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let default = Self::default();
                if let Err(e) = default.save(path).await {
                    warn!("写入默认配置失败: {}", e);
                }
                Ok(default)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 保存配置（不包含 API key）
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut persisted = self.clone();
        persisted.api_key = None;
        let json = serde_json::to_string_pretty(&persisted)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// 应用环境变量覆盖
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.model = model;
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        let extraction = &self.extraction;
        if extraction.frame_count == 0 {
            return Err(anyhow!("frame_count 至少为 1"));
        }
        if !(extraction.quality > 0.0 && extraction.quality <= 1.0) {
            return Err(anyhow!("quality 必须在 (0, 1] 范围内: {}", extraction.quality));
        }
        if extraction.max_edge == 0 {
            return Err(anyhow!("max_edge 至少为 1"));
        }
        if !(extraction.max_span_secs.is_finite() && extraction.max_span_secs > 0.0) {
            return Err(anyhow!("max_span_secs 必须大于 0"));
        }
        if self.request_timeout_secs == 0 || self.seek_timeout_secs == 0 {
            return Err(anyhow!("超时时间必须大于 0"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn seek_timeout(&self) -> Duration {
        Duration::from_secs(self.seek_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.extraction.frame_count, 100);
        assert_eq!(settings.extraction.max_span_secs, 10.0);
        assert_eq!(settings.max_upload_bytes, 100 * 1024 * 1024);
        assert!(settings.api_key.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings.apply_env(|key| match key {
            API_KEY_ENV => Some("secret".to_string()),
            MODEL_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(settings.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_validate_rejects_bad_extraction() {
        let mut settings = Settings::default();
        settings.extraction.quality = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.extraction.frame_count = 0;
        assert!(settings.validate().is_err());
    }

    #[tokio::test]
    async fn test_missing_file_written_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.json");

        let settings = Settings::load_file(&path).await.unwrap();
        assert_eq!(settings.request_timeout_secs, 60);
        assert!(path.exists());

        let written: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(written["extraction"]["max_edge"], 640);
        assert!(written.get("api_key").is_none());
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, r#"{"extraction": {"frame_count": 24}, "seek_timeout_secs": 5}"#)
            .await
            .unwrap();

        let settings = Settings::load_file(&path).await.unwrap();
        assert_eq!(settings.extraction.frame_count, 24);
        assert_eq!(settings.extraction.max_edge, 640);
        assert_eq!(settings.seek_timeout(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        assert!(Settings::load_file(&path).await.is_err());
    }
}
