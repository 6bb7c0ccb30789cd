//! 宠物视频分析模块
//!
//! - 模型回复解析（interpreter）
//! - 上传校验、抽帧、调用模型的完整流程（pipeline）
//! - 流程错误分类（error）

pub mod error;
pub mod interpreter;
pub mod pipeline;

pub use error::AnalysisError;
pub use interpreter::parse_analysis;
pub use pipeline::{demo_record, interpret_response, Analyzer};
