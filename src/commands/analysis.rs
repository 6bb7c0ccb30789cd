//! 分析命令
//!
//! - 分析视频并显示结果页
//! - 离线解析保存的模型回复

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::analysis::interpret_response;
use crate::app::{render_landing, render_results, Route};
use crate::models::{AnalysisReport, VideoUpload};
use crate::AppState;

/// 分析视频
///
/// 上传被拒绝时停留在首页并返回错误；其余失败由演示数据兜底。
pub async fn analyze_video(
    state: &AppState,
    video: &Path,
    mime_type: Option<String>,
    frames: Option<usize>,
    json: bool,
) -> Result<()> {
    let upload = VideoUpload::from_path(video, mime_type).await?;
    let analyzer = state.analyzer(frames);

    let report = match analyzer.analyze_or_fallback(&upload).await {
        Ok(report) => report,
        Err(e) => {
            warn!("上传被拒绝: {}", e);
            return Err(e.into());
        }
    };

    if report.is_degraded() {
        warn!("分析 {} 使用演示数据", report.id);
    } else {
        info!("分析 {} 完成, 共发送 {} 帧", report.id, report.frames_sent);
    }

    show_results(state, report, json).await
}

/// 解析保存的模型回复文本
pub async fn interpret_file(state: &AppState, file: &Path, json: bool) -> Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("无法读取文件: {}", file.display()))?;

    let report = interpret_response(&raw);
    info!("已解析模型回复: {} ({} 字符)", file.display(), raw.len());
    show_results(state, report, json).await
}

/// 保存报告并跳转到结果页
async fn show_results(state: &AppState, report: AnalysisReport, json: bool) -> Result<()> {
    let mut session = state.session.lock().await;
    session.complete(report);

    match (session.navigate(Route::Results), session.report()) {
        (Route::Results, Some(report)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(report)?);
            } else {
                print!("{}", render_results(report));
            }
        }
        _ => print!("{}", render_landing(&state.settings)),
    }
    Ok(())
}
