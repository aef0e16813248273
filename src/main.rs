//! # qsweep - pw.x 参数扫描驱动
//!
//! 由标量晶格参数构造结构，组装 pw.x 运行配置，在隔离目录中执行求解器，
//! 解析总能并汇总为有序的扫描序列（k 点收敛、状态方程）。
//!
//! ## 子命令
//! - `sweep`   - 运行参数扫描
//! - `collect` - 重新解析已有作业目录
//! - `input`   - 打印单个点的 pw.x 输入
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── batch/     (作业执行与扫描控制)
//!   │     ├── builders/  (结构与配置构造)
//!   │     ├── parsers/   (pw.x 输入/输出)
//!   │     ├── report/    (表格、CSV、曲线图)
//!   │     └── models/    (数据模型)
//!   ├── settings.rs (运行设置)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod builders;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod report;
mod settings;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = utils::logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())
    {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }

    if let Err(e) = commands::run(cli.command, cli.quiet) {
        tracing::error!(error = %e, "command failed");
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
