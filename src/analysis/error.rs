use std::time::Duration;

use thiserror::Error;

use crate::utils::validation::UploadError;

/// 分析流程错误
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// 上传校验失败，唯一需要用户处理的错误
    #[error(transparent)]
    InvalidUpload(#[from] UploadError),

    #[error("Video could not be processed: {0:#}")]
    Extraction(anyhow::Error),

    #[error("Vision model request failed: {0:#}")]
    Upstream(anyhow::Error),

    #[error("Vision model did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Vision model API key is not configured")]
    MissingCredential,
}

impl AnalysisError {
    /// 是否应直接展示给用户（其余错误由演示数据兜底）
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::InvalidUpload(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_only_upload_errors_are_user_facing() {
        let rejected: AnalysisError = UploadError::UnsupportedType("video/webm".to_string()).into();
        assert!(rejected.is_user_facing());
        assert_eq!(
            rejected.to_string(),
            "Please upload an MP4, MOV, or QuickTime video file."
        );

        assert!(!AnalysisError::Extraction(anyhow!("bad file")).is_user_facing());
        assert!(!AnalysisError::Upstream(anyhow!("503")).is_user_facing());
        assert!(!AnalysisError::Timeout(Duration::from_secs(60)).is_user_facing());
        assert!(!AnalysisError::MissingCredential.is_user_facing());
    }
}
