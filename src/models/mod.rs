// 数据模型模块 - 定义分析流程中的所有数据结构

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::utils::validation::media_type_for_path;

/// 默认品种（模型未提供时）
pub const DEFAULT_BREED: &str = "Not specified";
/// 默认视频时长描述
pub const DEFAULT_VIDEO_DURATION: &str = "10 seconds";
/// 默认关注等级
pub const DEFAULT_CONCERN_LEVEL: &str = "Medium";

/// 宠物信息（仅作展示用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetInfo {
    /// 品种
    pub breed: String,
    /// 视频时长描述
    pub video_duration: String,
}

impl Default for PetInfo {
    fn default() -> Self {
        Self {
            breed: DEFAULT_BREED.to_string(),
            video_duration: DEFAULT_VIDEO_DURATION.to_string(),
        }
    }
}

/// 健康评估结果
///
/// 所有字段都有默认值，解析失败的部分保持默认。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub pet_info: PetInfo,
    /// 关注等级，预期为 Low/Medium/High，按原文保存
    pub concern_level: String,
    pub summary: String,
    pub observations: Vec<String>,
    pub possible_causes: Vec<String>,
    pub recommendations: Vec<String>,
    pub veterinary_recommendation: String,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            pet_info: PetInfo::default(),
            concern_level: DEFAULT_CONCERN_LEVEL.to_string(),
            summary: String::new(),
            observations: Vec::new(),
            possible_causes: Vec::new(),
            recommendations: Vec::new(),
            veterinary_recommendation: String::new(),
        }
    }
}

impl AnalysisResult {
    /// 关注等级分档（用于结果页展示）
    pub fn concern_tier(&self) -> ConcernTier {
        ConcernTier::from_label(&self.concern_level)
    }
}

/// 关注等级分档
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcernTier {
    Low,
    Medium,
    High,
    Unknown, // 模型返回了无法识别的等级
}

impl ConcernTier {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unknown,
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            Self::Low => "[LOW]",
            Self::Medium => "[MEDIUM]",
            Self::High => "[HIGH]",
            Self::Unknown => "[?]",
        }
    }
}

/// 帧采样请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRequest {
    /// 目标帧数
    pub frame_count: usize,
    /// 最大采样时长（秒）
    pub max_span_secs: f64,
    /// 输出图片最长边（像素）
    pub max_edge: u32,
    /// JPEG 质量（0-1）
    pub quality: f32,
}

impl Default for ExtractionRequest {
    fn default() -> Self {
        Self {
            frame_count: 100,
            max_span_secs: 10.0,
            max_edge: 640,
            quality: 0.7,
        }
    }
}

impl ExtractionRequest {
    /// 换算为编码器使用的 1-100 质量值
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.frame_count = frame_count;
        self
    }
}

/// 单帧 JPEG 图像
#[derive(Debug, Clone)]
pub struct Frame {
    /// 采样序号
    pub index: usize,
    /// 采样时间点（秒）
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    /// JPEG 编码数据
    pub jpeg: Vec<u8>,
}

impl Frame {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    /// 转为 base64（不带 data: 前缀）
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.jpeg)
    }
}

/// 用户选择的视频文件
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub path: PathBuf,
    pub file_name: String,
    /// 声明的视频类型
    pub mime_type: String,
    pub size_bytes: u64,
}

impl VideoUpload {
    /// 读取文件元数据；未指定类型时根据扩展名推断
    pub async fn from_path(path: &Path, mime_type: Option<String>) -> Result<Self> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("无法读取视频文件: {}", path.display()))?;
        if !metadata.is_file() {
            return Err(anyhow!("不是文件: {}", path.display()));
        }

        let mime_type = mime_type
            .or_else(|| media_type_for_path(path).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            mime_type,
            size_bytes: metadata.len(),
        })
    }
}

/// 分析结果来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// 模型分析完成
    Completed,
    /// 使用内置演示数据
    Fallback { reason: String },
}

/// 交给结果页的分析报告
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub id: Uuid,
    pub result: AnalysisResult,
    pub outcome: AnalysisOutcome,
    /// 发送给模型的帧数
    pub frames_sent: usize,
    pub completed_at: DateTime<Local>,
}

impl AnalysisReport {
    pub fn completed(result: AnalysisResult, frames_sent: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            result,
            outcome: AnalysisOutcome::Completed,
            frames_sent,
            completed_at: Local::now(),
        }
    }

    pub fn fallback(result: AnalysisResult, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            result,
            outcome: AnalysisOutcome::Fallback {
                reason: reason.into(),
            },
            frames_sent: 0,
            completed_at: Local::now(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, AnalysisOutcome::Fallback { .. })
    }
}
