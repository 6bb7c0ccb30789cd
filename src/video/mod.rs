// 视频处理模块 - 负责上传视频的暂存、探测和抽帧

pub mod ffmpeg_helper;
pub mod sampler;

pub use sampler::{
    encode_jpeg, sample_frames, sample_timestamps, scale_to_fit, write_frames, FfmpegSource,
    FrameExtractor, FrameSampler, FrameSource,
};

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// 待分析视频的临时副本
///
/// 整个抽帧过程持有该句柄，句柄被 drop 时临时文件随之删除，
/// 成功和失败路径都一样。
pub struct VideoSource {
    staged: NamedTempFile,
    file_name: String,
}

impl VideoSource {
    /// 将上传的视频复制到临时目录
    pub async fn stage(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video")
            .to_string();
        let suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let staged = tempfile::Builder::new()
            .prefix("petvision-")
            .suffix(&suffix)
            .tempfile()
            .context("创建临时视频文件失败")?;

        tokio::fs::copy(path, staged.path())
            .await
            .with_context(|| format!("无法读取视频文件: {}", path.display()))?;

        debug!("视频已暂存: {} -> {:?}", file_name, staged.path());
        Ok(Self { staged, file_name })
    }

    pub fn path(&self) -> &Path {
        self.staged.path()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        debug!("释放临时视频文件: {:?}", self.staged.path());
    }
}

/// 视频信息
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VideoInfo {
    /// 时长（秒）
    pub duration: f64,
    pub resolution: (u32, u32),
    pub fps: f32,
    pub codec: String,
    pub format: String,
}

/// 使用 ffprobe 获取视频文件信息
pub async fn probe_video(ffprobe_path: &Path, video_path: &Path) -> Result<VideoInfo> {
    let output = tokio::process::Command::new(ffprobe_path)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(video_path)
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("无法执行ffprobe: {:?}", ffprobe_path))?;

    if !output.status.success() {
        return Err(anyhow!("ffprobe无法解析视频: {}", video_path.display()));
    }

    let json_str = String::from_utf8(output.stdout)?;
    parse_probe_output(&json_str)
}

/// 解析 ffprobe 的 JSON 输出
fn parse_probe_output(json_str: &str) -> Result<VideoInfo> {
    let info: serde_json::Value = serde_json::from_str(json_str)?;

    let streams = info["streams"]
        .as_array()
        .ok_or_else(|| anyhow!("无法解析视频流信息"))?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"] == "video")
        .ok_or_else(|| anyhow!("未找到视频流"))?;

    let width = video_stream["width"].as_u64().unwrap_or(0) as u32;
    let height = video_stream["height"].as_u64().unwrap_or(0) as u32;
    let fps = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("0/1"));

    // 容器时长优先，缺失时退回视频流时长
    let format = &info["format"];
    let duration = format["duration"]
        .as_str()
        .or_else(|| video_stream["duration"].as_str())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| anyhow!("无法获取视频时长"))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(anyhow!("视频时长无效: {}", duration));
    }

    Ok(VideoInfo {
        duration,
        resolution: (width, height),
        fps,
        codec: video_stream["codec_name"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
        format: format["format_name"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
    })
}

/// 解析帧率字符串（如 "30/1" -> 30.0）
fn parse_frame_rate(rate_str: &str) -> f32 {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let numerator = parts[0].parse::<f32>().unwrap_or(0.0);
        let denominator = parts[1].parse::<f32>().unwrap_or(1.0);
        if denominator != 0.0 {
            return numerator / denominator;
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), 30.0);
        assert_eq!(parse_frame_rate("0/0"), 0.0);
        assert_eq!(parse_frame_rate("garbage"), 0.0);
    }

    #[test]
    fn test_parse_probe_output() {
        let json = r#"{
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080, "r_frame_rate": "30/1"}
            ],
            "format": {"duration": "12.480000", "format_name": "mov,mp4,m4a,3gp,3g2,mj2"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.resolution, (1920, 1080));
        assert_eq!(info.codec, "h264");
        assert!((info.duration - 12.48).abs() < 1e-9);
        assert_eq!(info.fps, 30.0);
    }

    #[test]
    fn test_parse_probe_output_rejects_missing_duration() {
        let json = r#"{
            "streams": [{"codec_type": "video", "width": 640, "height": 480}],
            "format": {}
        }"#;
        assert!(parse_probe_output(json).is_err());

        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        assert!(parse_probe_output(json).is_err());
    }

    #[tokio::test]
    async fn test_staged_video_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("dog.mp4");
        tokio::fs::write(&original, b"not really a video").await.unwrap();

        let source = VideoSource::stage(&original).await.unwrap();
        let staged_path = source.path().to_path_buf();
        assert!(staged_path.exists());
        assert_eq!(source.file_name(), "dog.mp4");
        assert_eq!(
            staged_path.extension().and_then(|e| e.to_str()),
            Some("mp4")
        );

        drop(source);
        assert!(!staged_path.exists());
        assert!(original.exists());
    }

    #[tokio::test]
    async fn test_stage_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = VideoSource::stage(&dir.path().join("missing.mov")).await;
        assert!(result.is_err());
    }
}
