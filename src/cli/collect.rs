//! # collect 子命令 CLI 定义
//!
//! 重新解析已有作业目录中的 pw.x 输出，不运行求解器。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/collect.rs`

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// 横坐标来源
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AxisArg {
    /// k-grid density taken from the job directory name
    Kgrid,
    /// Final cell volume reported in the output
    Volume,
}

impl std::fmt::Display for AxisArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisArg::Kgrid => write!(f, "kgrid"),
            AxisArg::Volume => write!(f, "volume"),
        }
    }
}

/// collect 子命令参数
#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Sweep directory containing job folders (or a single output file)
    pub dir: PathBuf,

    /// Quantity used as the abscissa
    #[arg(long, value_enum, default_value_t = AxisArg::Volume)]
    pub axis: AxisArg,

    /// Output file name pattern (comma-separated, * and ? allowed)
    #[arg(long, default_value = "pwscf.out")]
    pub pattern: String,

    /// Search subdirectories recursively
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Write the series to this CSV file
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Plot the curve to this file (.png or .svg)
    #[arg(long)]
    pub plot: Option<PathBuf>,
}
