//! 输入验证工具函数
//!
//! 上传的视频在进入任何处理之前先检查声明的类型和文件大小。

use crate::models::VideoUpload;
use std::path::Path;

/// 上传大小上限（100MB）
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// 允许的视频类型
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["video/mp4", "video/quicktime", "video/x-msvideo"];

/// 上传被拒绝的原因（直接展示给用户）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Please upload an MP4, MOV, or QuickTime video file.")]
    UnsupportedType(String),

    #[error("File size exceeds {}MB limit.", format_megabytes(.limit))]
    TooLarge { size: u64, limit: u64 },
}

/// 校验上传文件：先检查类型，再检查大小
///
/// # 参数
/// - `upload`: 上传的视频
/// - `max_bytes`: 大小上限（字节）
pub fn validate_upload(upload: &VideoUpload, max_bytes: u64) -> Result<(), UploadError> {
    let mime_type = upload.mime_type.trim().to_ascii_lowercase();
    if !ACCEPTED_MEDIA_TYPES.contains(&mime_type.as_str()) {
        return Err(UploadError::UnsupportedType(upload.mime_type.clone()));
    }

    if upload.size_bytes > max_bytes {
        return Err(UploadError::TooLarge {
            size: upload.size_bytes,
            limit: max_bytes,
        });
    }

    Ok(())
}

/// 字节数换算为 MB 文本，整数时不带小数（100, 2.5, 0.75）
pub fn format_megabytes(bytes: &u64) -> String {
    let megabytes = format!("{:.2}", *bytes as f64 / (1024.0 * 1024.0));
    megabytes
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// 根据扩展名推断视频类型
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "mov" | "qt" => Some("video/quicktime"),
        "avi" => Some("video/x-msvideo"),
        "webm" => Some("video/webm"),
        "mkv" => Some("video/x-matroska"),
        _ => None,
    }
}
