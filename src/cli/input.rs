//! # input 子命令 CLI 定义
//!
//! 打印单个点的 pw.x 输入文件，不运行任何程序。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 复用 `cli/sweep.rs` 的参数组
//! - 参数传递给 `commands/input.rs`

use super::sweep::{PseudoArgs, SystemArgs};
use clap::Args;
use std::path::PathBuf;

/// input 子命令参数
#[derive(Args, Debug)]
pub struct InputArgs {
    #[command(flatten)]
    pub system: SystemArgs,

    #[command(flatten)]
    pub pseudo: PseudoArgs,

    /// Value written as outdir in the CONTROL namelist
    #[arg(long, default_value = ".")]
    pub outdir: PathBuf,

    /// Write the deck to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
