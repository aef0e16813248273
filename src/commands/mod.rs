//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `builders/`, `parsers/`, `report/`, `utils/`
//! - 子模块: sweep, collect, input

pub mod collect;
pub mod input;
pub mod sweep;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands, quiet: bool) -> Result<()> {
    match cmd {
        Commands::Sweep(args) => sweep::execute(args, quiet),
        Commands::Collect(args) => collect::execute(args, quiet),
        Commands::Input(args) => input::execute(args),
    }
}
