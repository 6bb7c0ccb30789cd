//! 抽帧调试命令

use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;

use crate::video::{ffmpeg_helper, write_frames, VideoSource};
use crate::AppState;

/// 抽帧并写入目录（frame_000.jpg, frame_001.jpg, ...）
pub async fn dump_frames(
    state: &AppState,
    video: &Path,
    out: &Path,
    frames: Option<usize>,
) -> Result<()> {
    if !ffmpeg_helper::check_ffmpeg_available(state.sampler.ffmpeg_path()).await {
        bail!("ffmpeg is not available, install it or set ffmpeg_path in the settings file");
    }

    let mut request = state.settings.extraction.clone();
    if let Some(n) = frames {
        request = request.with_frame_count(n);
    }

    let source = VideoSource::stage(video).await?;
    let sampled = state.sampler.extract_frames(source, &request).await?;
    let written = write_frames(&sampled, out).await?;

    info!("已写入 {} 帧到 {}", written.len(), out.display());
    for path in &written {
        println!("{}", path.display());
    }
    Ok(())
}
