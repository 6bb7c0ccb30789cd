// FFmpeg辅助模块 - 查找并校验 ffmpeg/ffprobe 可执行文件

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 常见的 ffmpeg 安装路径
const COMMON_PATHS: &[&str] = &[
    "/opt/homebrew/bin/ffmpeg", // Apple Silicon Homebrew
    "/usr/local/bin/ffmpeg",    // Intel Homebrew
    "/opt/local/bin/ffmpeg",    // MacPorts
    "/usr/bin/ffmpeg",
];

fn runs_version(path: &Path) -> bool {
    std::process::Command::new(path)
        .arg("-version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// 获取FFmpeg可执行文件的路径
///
/// 优先使用配置中指定的路径，其次是常见安装路径，最后是 PATH。
pub fn get_ffmpeg_path(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if runs_version(path) {
            info!("使用配置的FFmpeg: {:?}", path);
            return Ok(path.to_path_buf());
        }
        warn!("配置的FFmpeg不可用: {:?}，尝试其他位置", path);
    }

    for path_str in COMMON_PATHS {
        let path = PathBuf::from(path_str);
        if path.exists() && runs_version(&path) {
            info!("使用系统FFmpeg: {:?}", path);
            return Ok(path);
        }
    }

    let path = PathBuf::from("ffmpeg");
    if runs_version(&path) {
        info!("使用PATH中的FFmpeg");
        return Ok(path);
    }

    Err(anyhow!(
        "未找到FFmpeg。请安装 ffmpeg（例如 brew install ffmpeg 或 apt install ffmpeg）"
    ))
}

/// 根据 ffmpeg 路径推导 ffprobe 路径（同目录）
pub fn ffprobe_path_for(ffmpeg_path: &Path) -> PathBuf {
    if ffmpeg_path == Path::new("ffmpeg") {
        return PathBuf::from("ffprobe");
    }

    ffmpeg_path.with_file_name(if cfg!(target_os = "windows") {
        "ffprobe.exe"
    } else {
        "ffprobe"
    })
}

/// 检查FFmpeg是否可用
pub async fn check_ffmpeg_available(ffmpeg_path: &Path) -> bool {
    match tokio::process::Command::new(ffmpeg_path)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) if output.status.success() => {
            debug!("FFmpeg可用: {:?}", ffmpeg_path);
            true
        }
        Ok(_) => {
            warn!("FFmpeg执行失败: {:?}", ffmpeg_path);
            false
        }
        Err(e) => {
            warn!("无法执行FFmpeg: {}", e);
            false
        }
    }
}
