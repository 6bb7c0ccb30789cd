//! 应用程序启动与页面状态
//!
//! 负责命令行应用的启动流程：
//! - 配置加载与日志初始化
//! - ffmpeg 定位、视觉模型创建
//! - 进度事件订阅
//! - 命令分发
//!
//! 以及首页/结果页两个视图的状态与文本渲染。

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::commands::{self, Cli, Commands};
use crate::event_bus::AppEvent;
use crate::llm;
use crate::logger;
use crate::models::{AnalysisOutcome, AnalysisReport};
use crate::settings::Settings;
use crate::utils::validation::{format_megabytes, ACCEPTED_MEDIA_TYPES};
use crate::video::{ffmpeg_helper, FrameSampler};
use crate::AppState;

/// 页面
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Route {
    #[default]
    Landing,
    Results,
}

/// 页面间共享的会话状态，分析报告只保存在内存中
#[derive(Debug, Default)]
pub struct AppSession {
    current: Route,
    last_report: Option<AnalysisReport>,
}

impl AppSession {
    /// 保存分析报告并进入结果页
    pub fn complete(&mut self, report: AnalysisReport) {
        self.last_report = Some(report);
        self.current = Route::Results;
    }

    /// 跳转页面；没有分析报告时结果页重定向到首页
    pub fn navigate(&mut self, route: Route) -> Route {
        let target = match route {
            Route::Results if self.last_report.is_none() => Route::Landing,
            other => other,
        };
        self.current = target;
        target
    }

    pub fn current(&self) -> Route {
        self.current
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        self.last_report.as_ref()
    }
}

/// 渲染首页
pub fn render_landing(settings: &Settings) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "PetVision AI - Pet Health Analysis");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Upload a short video of your pet to get AI-powered health insights."
    );
    let _ = writeln!(out, "Accepted formats: {}", ACCEPTED_MEDIA_TYPES.join(", "));
    let _ = writeln!(
        out,
        "Maximum size: {}MB",
        format_megabytes(&settings.max_upload_bytes)
    );
    let _ = writeln!(
        out,
        "Up to {} frames are sampled from the first {} seconds.",
        settings.extraction.frame_count, settings.extraction.max_span_secs
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Usage: pet-vision analyze <VIDEO>");
    out
}

fn write_list(out: &mut String, title: &str, items: &[String]) {
    let _ = writeln!(out, "{}", title);
    if items.is_empty() {
        let _ = writeln!(out, "  (none reported)");
    }
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", i + 1, item);
    }
    let _ = writeln!(out);
}

/// 渲染结果页
pub fn render_results(report: &AnalysisReport) -> String {
    let result = &report.result;
    let mut out = String::new();

    let _ = writeln!(out, "Pet Health Analysis");
    let _ = writeln!(
        out,
        "Analysis completed on {}",
        report.completed_at.format("%Y-%m-%d")
    );
    if let AnalysisOutcome::Fallback { reason } = &report.outcome {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "NOTE: The video could not be analyzed ({}). Showing a demonstration result.",
            reason
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Pet Information");
    let _ = writeln!(out, "  Breed: {}", result.pet_info.breed);
    let _ = writeln!(out, "  Duration: {}", result.pet_info.video_duration);
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "Concern Level: {} {}",
        result.concern_tier().badge(),
        result.concern_level
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Summary");
    let _ = writeln!(out, "  {}", result.summary);
    let _ = writeln!(out);

    write_list(&mut out, "Key Observations", &result.observations);
    write_list(&mut out, "Possible Causes", &result.possible_causes);
    write_list(&mut out, "Recommendations", &result.recommendations);

    let _ = writeln!(out, "Veterinary Recommendation");
    let _ = writeln!(out, "  {}", result.veterinary_recommendation);
    out
}

/// 进度事件的显示文本
pub fn progress_line(event: &AppEvent) -> String {
    match event {
        AppEvent::UploadAccepted {
            file_name,
            size_bytes,
        } => format!(
            "Analyzing {} ({:.1} MB)...",
            file_name,
            *size_bytes as f64 / (1024.0 * 1024.0)
        ),
        AppEvent::UploadRejected { file_name, reason } => {
            format!("Rejected {}: {}", file_name, reason)
        }
        AppEvent::FramesExtracted { count } => format!("Extracted {} frames", count),
        AppEvent::ModelResponded { chars } => format!("Received analysis ({} chars)", chars),
        AppEvent::AnalysisCompleted { degraded, .. } => {
            if *degraded {
                "Analysis unavailable, showing demonstration result".to_string()
            } else {
                "Analysis complete".to_string()
            }
        }
    }
}

/// 应用程序入口点
///
/// 1. 加载配置、初始化日志
/// 2. 定位 ffmpeg、创建视觉模型
/// 3. 订阅进度事件
/// 4. 执行命令
pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).await?;
    let _guard = logger::init(settings.log_dir.clone(), cli.verbose)?;

    let Some(command) = cli.command else {
        print!("{}", render_landing(&settings));
        return Ok(());
    };

    // 找不到 ffmpeg 不影响启动，抽帧失败时分析会返回演示数据
    let ffmpeg_path = match ffmpeg_helper::get_ffmpeg_path(settings.ffmpeg_path.as_deref()) {
        Ok(path) => {
            info!("使用 ffmpeg: {:?}", path);
            path
        }
        Err(e) => {
            warn!("{}", e);
            "ffmpeg".into()
        }
    };

    let client = reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()?;
    let model = Arc::new(llm::build_provider(client, &settings));
    let sampler = Arc::new(FrameSampler::new(ffmpeg_path, settings.seek_timeout()));
    let state = AppState::new(settings, sampler, model);

    // 所有发送端释放后接收循环结束
    let mut receiver = state.event_bus.subscribe();
    let printer = tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match receiver.recv().await {
                Ok(event) => eprintln!("{}", progress_line(&event)),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = match command {
        Commands::Analyze {
            video,
            mime_type,
            frames,
            json,
        } => commands::analyze_video(&state, &video, mime_type, frames, json).await,
        Commands::Interpret { file, json } => commands::interpret_file(&state, &file, json).await,
        Commands::Frames { video, out, frames } => {
            commands::dump_frames(&state, &video, &out, frames).await
        }
    };

    drop(state);
    let _ = printer.await;
    result
}
