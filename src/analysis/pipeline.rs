//! 分析流程
//!
//! 校验上传 -> 抽帧 -> 调用视觉模型 -> 解析回复。
//!
//! [`Analyzer::analyze`] 如实返回每一种失败；[`Analyzer::analyze_or_fallback`]
//! 是展示层的入口：除上传校验失败外，所有错误都换成内置的演示数据，
//! 并在报告中标记为降级结果。

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{error, info, warn};

use super::error::AnalysisError;
use super::interpreter::parse_analysis;
use crate::event_bus::{AppEvent, EventBus};
use crate::llm::{VisionModel, ANALYSIS_PROMPT};
use crate::models::{AnalysisReport, AnalysisResult, ExtractionRequest, PetInfo, VideoUpload};
use crate::settings::Settings;
use crate::utils::validation::{validate_upload, UploadError};
use crate::video::{FrameExtractor, VideoSource};

// 演示数据
const DEMO_BREED: &str = "Golden Retriever";
const DEMO_VIDEO_DURATION: &str = "10 seconds";
const DEMO_CONCERN_LEVEL: &str = "Medium";
const DEMO_SUMMARY: &str = "The pet shows signs of mild discomfort in the right hind leg, with occasional limping and weight shifting. Overall energy level appears normal, but there are indications of potential joint discomfort.";
const DEMO_OBSERVATIONS: &[&str] = &[
    "Intermittent limping on right hind leg",
    "Weight shifting away from right side when standing",
    "Slight hesitation before jumping or running",
    "Normal breathing pattern",
    "Alert and responsive to surroundings",
];
const DEMO_POSSIBLE_CAUSES: &[&str] = &[
    "Early-stage arthritis or joint inflammation",
    "Minor soft tissue injury (strain or sprain)",
    "Hip dysplasia (common in this breed)",
    "Recent overexertion during exercise",
];
const DEMO_RECOMMENDATIONS: &[&str] = &[
    "Limit high-impact activities for 7-10 days",
    "Apply warm compress to the affected leg for 10-15 minutes twice daily",
    "Consider joint supplements containing glucosamine and chondroitin",
    "Monitor for worsening symptoms",
    "Ensure the pet maintains a healthy weight to reduce joint stress",
];
const DEMO_VETERINARY_RECOMMENDATION: &str = "A veterinary examination is recommended within the next 1-2 weeks if symptoms persist. If limping worsens or the pet shows signs of increased pain, seek veterinary care sooner.";

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// 内置演示数据，无法完成真实分析时使用
pub fn demo_record() -> AnalysisResult {
    AnalysisResult {
        pet_info: PetInfo {
            breed: DEMO_BREED.to_string(),
            video_duration: DEMO_VIDEO_DURATION.to_string(),
        },
        concern_level: DEMO_CONCERN_LEVEL.to_string(),
        summary: DEMO_SUMMARY.to_string(),
        observations: to_strings(DEMO_OBSERVATIONS),
        possible_causes: to_strings(DEMO_POSSIBLE_CAUSES),
        recommendations: to_strings(DEMO_RECOMMENDATIONS),
        veterinary_recommendation: DEMO_VETERINARY_RECOMMENDATION.to_string(),
    }
}

/// 宠物视频分析器
pub struct Analyzer {
    extractor: Arc<dyn FrameExtractor>,
    model: Arc<dyn VisionModel>,
    events: Arc<EventBus>,
    request: ExtractionRequest,
    max_upload_bytes: u64,
    request_timeout: Duration,
}

impl Analyzer {
    pub fn new(
        extractor: Arc<dyn FrameExtractor>,
        model: Arc<dyn VisionModel>,
        events: Arc<EventBus>,
        settings: &Settings,
    ) -> Self {
        Self {
            extractor,
            model,
            events,
            request: settings.extraction.clone(),
            max_upload_bytes: settings.max_upload_bytes,
            request_timeout: settings.request_timeout(),
        }
    }

    /// 覆盖本次使用的帧数
    pub fn with_frame_count(mut self, frame_count: usize) -> Self {
        self.request.frame_count = frame_count;
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// 校验上传文件
    pub fn check_upload(&self, upload: &VideoUpload) -> Result<(), UploadError> {
        match validate_upload(upload, self.max_upload_bytes) {
            Ok(()) => {
                self.events.publish(AppEvent::UploadAccepted {
                    file_name: upload.file_name.clone(),
                    size_bytes: upload.size_bytes,
                });
                Ok(())
            }
            Err(e) => {
                warn!("拒绝上传 {}: {}", upload.file_name, e);
                self.events.publish(AppEvent::UploadRejected {
                    file_name: upload.file_name.clone(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// 分析视频，返回解析结果或具体的失败原因
    pub async fn analyze(&self, upload: &VideoUpload) -> Result<AnalysisResult, AnalysisError> {
        self.run(upload).await.map(|(result, _)| result)
    }

    /// 分析视频；除上传校验失败外，其余失败都返回演示数据
    pub async fn analyze_or_fallback(
        &self,
        upload: &VideoUpload,
    ) -> Result<AnalysisReport, AnalysisError> {
        let report = match self.run(upload).await {
            Ok((result, frames_sent)) => AnalysisReport::completed(result, frames_sent),
            Err(e) if e.is_user_facing() => return Err(e),
            Err(e) => {
                warn!("分析失败，使用演示数据: {}", e);
                AnalysisReport::fallback(demo_record(), e.to_string())
            }
        };

        self.events.publish(AppEvent::AnalysisCompleted {
            analysis_id: report.id,
            degraded: report.is_degraded(),
        });
        Ok(report)
    }

    async fn run(&self, upload: &VideoUpload) -> Result<(AnalysisResult, usize), AnalysisError> {
        self.check_upload(upload)?;

        if !self.model.is_configured() {
            return Err(AnalysisError::MissingCredential);
        }

        info!(
            "开始分析视频: {} ({:.2} MB)",
            upload.file_name,
            upload.size_bytes as f64 / (1024.0 * 1024.0)
        );

        let video = VideoSource::stage(&upload.path)
            .await
            .map_err(AnalysisError::Extraction)?;
        let frames = self
            .extractor
            .extract(video, &self.request)
            .await
            .map_err(AnalysisError::Extraction)?;

        if frames.is_empty() {
            return Err(AnalysisError::Extraction(anyhow!("no frames could be extracted")));
        }
        self.events.publish(AppEvent::FramesExtracted {
            count: frames.len(),
        });

        let response = tokio::time::timeout(
            self.request_timeout,
            self.model.generate(ANALYSIS_PROMPT, &frames),
        )
        .await
        .map_err(|_| AnalysisError::Timeout(self.request_timeout))?
        .map_err(|e| {
            error!("调用视觉模型 {} 失败: {:#}", self.model.name(), e);
            AnalysisError::Upstream(e)
        })?;

        self.events.publish(AppEvent::ModelResponded {
            chars: response.chars().count(),
        });

        Ok((parse_analysis(&response), frames.len()))
    }
}

/// 直接解析已保存的模型回复
pub fn interpret_response(raw: &str) -> AnalysisReport {
    AnalysisReport::completed(parse_analysis(raw), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisOutcome, Frame};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MB: u64 = 1024 * 1024;

    const MODEL_REPLY: &str = "CONCERN_LEVEL: High

SUMMARY: Noticeable lameness on the left hind limb.

OBSERVATIONS:
- Toe-touching on the left hind leg
- Shortened stride
- Reluctance to sit

POSSIBLE_CAUSES:
- Cruciate ligament injury
- Patellar luxation

RECOMMENDATIONS:
- Strict rest
- Avoid stairs

VETERINARY_RECOMMENDATION: See a veterinarian within 48 hours.";

    /// 返回固定帧数的抽帧器
    struct StubExtractor {
        frames: usize,
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubExtractor {
        fn new(frames: usize) -> Self {
            Self {
                frames,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl FrameExtractor for StubExtractor {
        async fn extract(
            &self,
            video: VideoSource,
            request: &ExtractionRequest,
        ) -> anyhow::Result<Vec<Frame>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(video.path().exists());
            if self.fail {
                return Err(anyhow!("cannot decode"));
            }
            Ok((0..self.frames.min(request.frame_count))
                .map(|index| Frame {
                    index,
                    timestamp: index as f64 * 0.1,
                    width: 4,
                    height: 4,
                    jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
                })
                .collect())
        }
    }

    enum Reply {
        Text(&'static str),
        Fail,
        Hang,
    }

    struct MockModel {
        configured: bool,
        reply: Reply,
        calls: AtomicUsize,
    }

    impl MockModel {
        fn new(reply: Reply) -> Self {
            Self {
                configured: true,
                reply,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VisionModel for MockModel {
        fn name(&self) -> &str {
            "mock"
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(&self, prompt: &str, frames: &[Frame]) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(prompt, ANALYSIS_PROMPT);
            assert!(!frames.is_empty());
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Fail => Err(anyhow!("quota exceeded")),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(String::new())
                }
            }
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        upload: VideoUpload,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buddy.mp4");
        tokio::fs::write(&path, b"fake mp4 bytes").await.unwrap();
        let upload = VideoUpload::from_path(&path, None).await.unwrap();
        Fixture { _dir: dir, upload }
    }

    fn analyzer(extractor: Arc<StubExtractor>, model: Arc<MockModel>) -> Analyzer {
        let settings = Settings {
            request_timeout_secs: 1,
            ..Default::default()
        };
        Analyzer::new(extractor, model, Arc::new(EventBus::new(32)), &settings)
    }

    fn upload(mime_type: &str, size_bytes: u64) -> VideoUpload {
        VideoUpload {
            path: PathBuf::from("/nonexistent/pet"),
            file_name: "pet".to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
        }
    }

    #[tokio::test]
    async fn test_successful_analysis() {
        let fx = fixture().await;
        let extractor = Arc::new(StubExtractor::new(5));
        let model = Arc::new(MockModel::new(Reply::Text(MODEL_REPLY)));
        let analyzer = analyzer(extractor.clone(), model.clone());

        let report = analyzer.analyze_or_fallback(&fx.upload).await.unwrap();

        assert_eq!(report.outcome, AnalysisOutcome::Completed);
        assert_eq!(report.frames_sent, 5);
        assert_eq!(report.result.concern_level, "High");
        assert_eq!(report.result.observations.len(), 3);
        assert_eq!(report.result.possible_causes.len(), 2);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_webm_rejected_before_any_work() {
        let extractor = Arc::new(StubExtractor::new(5));
        let model = Arc::new(MockModel::new(Reply::Text(MODEL_REPLY)));
        let analyzer = analyzer(extractor.clone(), model.clone());

        let err = analyzer
            .analyze_or_fallback(&upload("video/webm", MB))
            .await
            .unwrap_err();

        assert!(err.is_user_facing());
        assert!(matches!(
            err,
            AnalysisError::InvalidUpload(UploadError::UnsupportedType(_))
        ));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_mp4_rejected_for_size() {
        let extractor = Arc::new(StubExtractor::new(5));
        let model = Arc::new(MockModel::new(Reply::Text(MODEL_REPLY)));
        let analyzer = analyzer(extractor.clone(), model);

        let err = analyzer
            .analyze(&upload("video/mp4", 101 * MB))
            .await
            .unwrap_err();

        assert!(err.is_user_facing());
        assert!(matches!(
            err,
            AnalysisError::InvalidUpload(UploadError::TooLarge { .. })
        ));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_falls_back_to_demo() {
        let fx = fixture().await;
        let analyzer = analyzer(
            Arc::new(StubExtractor::new(3)),
            Arc::new(MockModel::new(Reply::Fail)),
        );

        let err = analyzer.analyze(&fx.upload).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Upstream(_)));
        assert!(!err.is_user_facing());

        let report = analyzer.analyze_or_fallback(&fx.upload).await.unwrap();
        assert!(report.is_degraded());
        assert_eq!(report.result.pet_info.breed, "Golden Retriever");
        assert_eq!(report.result.concern_level, "Medium");
        assert_eq!(report.result, demo_record());
    }

    #[tokio::test]
    async fn test_timeout_treated_as_upstream_failure() {
        let fx = fixture().await;
        let analyzer = analyzer(
            Arc::new(StubExtractor::new(3)),
            Arc::new(MockModel::new(Reply::Hang)),
        );

        let err = analyzer.analyze(&fx.upload).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_missing_credential_skips_extraction() {
        let fx = fixture().await;
        let extractor = Arc::new(StubExtractor::new(3));
        let mut model = MockModel::new(Reply::Text(MODEL_REPLY));
        model.configured = false;
        let analyzer = analyzer(extractor.clone(), Arc::new(model));

        let report = analyzer.analyze_or_fallback(&fx.upload).await.unwrap();
        assert!(report.is_degraded());
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extraction_failures_fall_back() {
        let fx = fixture().await;

        let mut failing = StubExtractor::new(3);
        failing.fail = true;
        let analyzer_a = analyzer(
            Arc::new(failing),
            Arc::new(MockModel::new(Reply::Text(MODEL_REPLY))),
        );
        assert!(matches!(
            analyzer_a.analyze(&fx.upload).await,
            Err(AnalysisError::Extraction(_))
        ));

        let model = Arc::new(MockModel::new(Reply::Text(MODEL_REPLY)));
        let analyzer_b = analyzer(Arc::new(StubExtractor::new(0)), model.clone());
        let report = analyzer_b.analyze_or_fallback(&fx.upload).await.unwrap();
        assert!(report.is_degraded());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_frame_count_override() {
        let fx = fixture().await;
        let analyzer = analyzer(
            Arc::new(StubExtractor::new(50)),
            Arc::new(MockModel::new(Reply::Text(MODEL_REPLY))),
        )
        .with_frame_count(12);

        let report = analyzer.analyze_or_fallback(&fx.upload).await.unwrap();
        assert_eq!(report.frames_sent, 12);
    }

    #[tokio::test]
    async fn test_progress_events() {
        let fx = fixture().await;
        let analyzer = analyzer(
            Arc::new(StubExtractor::new(2)),
            Arc::new(MockModel::new(Reply::Text(MODEL_REPLY))),
        );
        let mut receiver = analyzer.events().subscribe();

        let report = analyzer.analyze_or_fallback(&fx.upload).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], AppEvent::UploadAccepted { .. }));
        assert_eq!(events[1], AppEvent::FramesExtracted { count: 2 });
        assert!(matches!(events[2], AppEvent::ModelResponded { .. }));
        assert_eq!(
            events[3],
            AppEvent::AnalysisCompleted {
                analysis_id: report.id,
                degraded: false
            }
        );
    }

    #[test]
    fn test_interpret_response() {
        let report = interpret_response("CONCERN_LEVEL: Low");
        assert_eq!(report.result.concern_level, "Low");
        assert!(!report.is_degraded());
    }
}
