// 帧采样器 - 从视频前 N 秒均匀抽取若干帧并压缩为 JPEG

use super::{ffmpeg_helper, probe_video, VideoInfo, VideoSource};
use crate::models::{ExtractionRequest, Frame};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 可按时间点取帧的视频源
#[async_trait]
pub trait FrameSource: Send {
    /// 视频时长（秒）
    fn duration(&self) -> f64;

    /// 定位到指定时间点并取出当前帧
    async fn capture_at(&mut self, timestamp: f64) -> Result<DynamicImage>;
}

/// 基于 ffmpeg 的视频源，每次取帧执行一次 seek
pub struct FfmpegSource {
    ffmpeg_path: PathBuf,
    video_path: PathBuf,
    info: VideoInfo,
    seek_timeout: Duration,
}

impl FfmpegSource {
    /// 打开视频并读取时长，失败即视为视频无法加载
    pub async fn open(ffmpeg_path: &Path, video_path: &Path, seek_timeout: Duration) -> Result<Self> {
        let ffprobe_path = ffmpeg_helper::ffprobe_path_for(ffmpeg_path);
        let info = probe_video(&ffprobe_path, video_path)
            .await
            .context("视频加载失败")?;

        debug!(
            "视频信息: 时长 {:.2}s, 分辨率 {}x{}, 编码 {}",
            info.duration, info.resolution.0, info.resolution.1, info.codec
        );

        Ok(Self {
            ffmpeg_path: ffmpeg_path.to_path_buf(),
            video_path: video_path.to_path_buf(),
            info,
            seek_timeout,
        })
    }
}

#[async_trait]
impl FrameSource for FfmpegSource {
    fn duration(&self) -> f64 {
        self.info.duration
    }

    async fn capture_at(&mut self, timestamp: f64) -> Result<DynamicImage> {
        let seek = format!("{:.3}", timestamp);
        let mut command = tokio::process::Command::new(&self.ffmpeg_path);
        command
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .args(["-ss", &seek])
            .arg("-i")
            .arg(&self.video_path)
            .args(["-frames:v", "1", "-an", "-sn"])
            .args(["-f", "image2pipe", "-vcodec", "png", "-"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.seek_timeout, command.output())
            .await
            .map_err(|_| anyhow!("取帧超时 ({:?})", self.seek_timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("ffmpeg取帧失败: {}", stderr.trim()));
        }
        if output.stdout.is_empty() {
            return Err(anyhow!("时间点 {}s 没有可用的帧", seek));
        }

        Ok(image::load_from_memory_with_format(&output.stdout, ImageFormat::Png)?)
    }
}

/// 从暂存视频中抽帧（分析流程依赖此接口）
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    async fn extract(&self, video: VideoSource, request: &ExtractionRequest) -> Result<Vec<Frame>>;
}

/// 帧采样器
pub struct FrameSampler {
    ffmpeg_path: PathBuf,
    seek_timeout: Duration,
}

impl FrameSampler {
    pub fn new(ffmpeg_path: PathBuf, seek_timeout: Duration) -> Self {
        Self {
            ffmpeg_path,
            seek_timeout,
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    /// 从暂存的视频中抽帧
    ///
    /// 视频无法加载时整体失败；单帧失败只记录日志并跳过。
    /// 无论结果如何，返回前都会释放临时视频文件。
    pub async fn extract_frames(
        &self,
        video: VideoSource,
        request: &ExtractionRequest,
    ) -> Result<Vec<Frame>> {
        let start_time = Instant::now();

        let result = match FfmpegSource::open(&self.ffmpeg_path, video.path(), self.seek_timeout).await {
            Ok(mut source) => Ok(sample_frames(&mut source, request).await),
            Err(e) => Err(e),
        };

        let file_name = video.file_name().to_string();
        drop(video);

        if let Ok(frames) = &result {
            info!(
                "抽帧完成: {} 共 {} 帧, 耗时 {}ms",
                file_name,
                frames.len(),
                start_time.elapsed().as_millis()
            );
        }
        result
    }
}

#[async_trait]
impl FrameExtractor for FrameSampler {
    async fn extract(&self, video: VideoSource, request: &ExtractionRequest) -> Result<Vec<Frame>> {
        self.extract_frames(video, request).await
    }
}

/// 计算采样时间点
///
/// 采样范围为 min(视频时长, 最大时长)，间隔均匀，超出范围的时间点被跳过。
pub fn sample_timestamps(duration: f64, request: &ExtractionRequest) -> Vec<f64> {
    if request.frame_count == 0 || !duration.is_finite() {
        return Vec::new();
    }

    let span = duration.min(request.max_span_secs).max(0.0);
    let interval = span / request.frame_count as f64;

    (0..request.frame_count)
        .map(|i| i as f64 * interval)
        .filter(|t| *t < span)
        .collect()
}

/// 等比缩放，使最长边不超过 max_edge
pub fn scale_to_fit(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }

    if width > height {
        let scaled = (height as f64 / width as f64 * max_edge as f64).round() as u32;
        (max_edge, scaled.max(1))
    } else {
        let scaled = (width as f64 / height as f64 * max_edge as f64).round() as u32;
        (scaled.max(1), max_edge)
    }
}

/// 编码为 JPEG
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?;
    Ok(buffer)
}

/// 按顺序逐帧采样
///
/// 每次 seek 完成后才进行下一次，输出顺序即采样顺序。
pub async fn sample_frames<S>(source: &mut S, request: &ExtractionRequest) -> Vec<Frame>
where
    S: FrameSource + ?Sized,
{
    let timestamps = sample_timestamps(source.duration(), request);
    let quality = request.jpeg_quality();
    let mut frames = Vec::with_capacity(timestamps.len());

    for (index, timestamp) in timestamps.into_iter().enumerate() {
        let image = match source.capture_at(timestamp).await {
            Ok(image) => image,
            Err(e) => {
                warn!("提取第 {} 帧失败 (t={:.3}s): {}", index, timestamp, e);
                continue;
            }
        };

        let (width, height) = scale_to_fit(image.width(), image.height(), request.max_edge);
        let image = if (width, height) != (image.width(), image.height()) {
            image.resize_exact(width, height, FilterType::Triangle)
        } else {
            image
        };

        match encode_jpeg(&image, quality) {
            Ok(jpeg) => frames.push(Frame {
                index,
                timestamp,
                width,
                height,
                jpeg,
            }),
            Err(e) => warn!("第 {} 帧编码失败: {}", index, e),
        }
    }

    frames
}

/// 将帧写入目录（frame_000.jpg, frame_001.jpg, ...）
pub async fn write_frames(frames: &[Frame], dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;

    let mut paths = Vec::with_capacity(frames.len());
    for (position, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("frame_{:03}.jpg", position));
        tokio::fs::write(&path, &frame.jpeg).await?;
        paths.push(path);
    }
    Ok(paths)
}
