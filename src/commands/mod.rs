//! 命令行接口
//!
//! 参数定义使用 clap derive，按功能分组：
//! - analysis: 视频分析、离线解析模型回复
//! - frames: 抽帧调试

pub mod analysis;
pub mod frames;

pub use analysis::*;
pub use frames::*;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "pet-vision")]
#[command(author, version, about = "Pet health insights from a short video")]
pub struct Cli {
    /// Path to the JSON settings file (created with defaults if missing)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// 子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a pet video and print the results
    Analyze {
        /// Video file (MP4, MOV or AVI)
        #[arg(value_name = "VIDEO")]
        video: PathBuf,
        /// Declared media type, inferred from the extension when omitted
        #[arg(long, value_name = "MIME")]
        mime_type: Option<String>,
        /// Number of frames to sample
        #[arg(short, long, value_name = "N")]
        frames: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interpret a saved model answer without calling the model
    Interpret {
        /// Text file holding the raw model answer
        #[arg(value_name = "TEXT_FILE")]
        file: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the sampled frames of a video to a directory
    Frames {
        #[arg(value_name = "VIDEO")]
        video: PathBuf,
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,
        /// Number of frames to sample
        #[arg(short, long, value_name = "N")]
        frames: Option<usize>,
    },
}
