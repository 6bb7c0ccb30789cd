// 宠物视频健康分析 - 主库

// 声明模块
pub mod analysis;
pub mod app;
pub mod commands;
pub mod event_bus;
pub mod llm;
pub mod logger;
pub mod models;
pub mod settings;
pub mod utils;
pub mod video;

use std::sync::Arc;

use analysis::Analyzer;
use event_bus::EventBus;
use llm::VisionModel;
use settings::Settings;
use tokio::sync::Mutex;
use video::{FrameExtractor, FrameSampler};

pub use app::run;

/// 应用状态
///
/// 各命令共享的组件：
/// - 抽帧器：ffmpeg 采样
/// - 视觉模型：外部分析服务
/// - 事件总线：分析进度通知
/// - 会话：页面间传递的分析报告
pub struct AppState {
    pub settings: Settings,
    pub sampler: Arc<FrameSampler>,
    pub model: Arc<dyn VisionModel>,
    pub event_bus: Arc<EventBus>,
    pub session: Mutex<app::AppSession>,
}

impl AppState {
    pub fn new(settings: Settings, sampler: Arc<FrameSampler>, model: Arc<dyn VisionModel>) -> Self {
        Self {
            settings,
            sampler,
            model,
            event_bus: Arc::new(EventBus::default()),
            session: Mutex::new(app::AppSession::default()),
        }
    }

    /// 创建分析器，可覆盖本次抽帧数量
    pub fn analyzer(&self, frame_count: Option<usize>) -> Analyzer {
        let extractor: Arc<dyn FrameExtractor> = self.sampler.clone();
        let analyzer = Analyzer::new(
            extractor,
            self.model.clone(),
            self.event_bus.clone(),
            &self.settings,
        );
        match frame_count {
            Some(n) => analyzer.with_frame_count(n),
            None => analyzer,
        }
    }
}
