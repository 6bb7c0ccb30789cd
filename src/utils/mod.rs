//! 工具函数模块
//!
//! - 上传视频的输入验证

pub mod validation;

pub use validation::*;
