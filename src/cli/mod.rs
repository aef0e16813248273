//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `sweep`: 运行参数扫描（k 点收敛 / 状态方程）
//! - `collect`: 重新解析已有作业目录
//! - `input`: 打印单个点的 pw.x 输入
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: sweep, collect, input

pub mod collect;
pub mod input;
pub mod sweep;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// qsweep - pw.x 参数扫描驱动
#[derive(Parser)]
#[command(name = "qsweep")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Parametric pw.x sweep driver for convergence and equation-of-state scans", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Silence logs and progress bars
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Run a parameter sweep and report the energy curve
    Sweep(sweep::SweepArgs),

    /// Re-parse pw.x outputs in existing job directories
    Collect(collect::CollectArgs),

    /// Print the pw.x input deck for a single point
    Input(input::InputArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sweep() {
        let cli = Cli::try_parse_from([
            "qsweep",
            "-vv",
            "sweep",
            "--rule",
            "kgrid",
            "--values",
            "3,5,7",
            "--potentials-root",
            "/pp",
            "--calculation",
            "vc-relax",
            "--jobs",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Sweep(args) => {
                assert_eq!(args.rule, sweep::RuleArg::Kgrid);
                assert_eq!(args.values, "3,5,7");
                assert_eq!(args.system.calculation, sweep::CalculationArg::VcRelax);
                assert_eq!(args.pseudo.pseudo, vec!["Fe=Fe.pbe-nd-rrkjus.UPF"]);
                assert_eq!(args.jobs, 2);
                assert_eq!(args.run.ncpu, 2);
                assert!(!args.fail_fast);
            }
            _ => panic!("expected sweep"),
        }
    }
}
