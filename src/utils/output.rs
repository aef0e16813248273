//! # 美化输出工具
//!
//! 提供统一的终端输出样式。
//!
//! ## 依赖关系
//! - 被所有 `commands/` 模块使用
//! - 使用 `models/sweep.rs` 的 SweepPoint
//! - 使用 `colored` crate

use crate::models::{PointOutcome, SweepPoint};

use colored::Colorize;

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印警告消息
pub fn print_warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印跳过消息
pub fn print_skip(msg: &str) {
    println!("{} {}", "[SKIP]".dimmed(), msg);
}

/// 打印完成消息
pub fn print_done(msg: &str) {
    println!("{} {}", "[DONE]".green().bold(), msg);
}

/// 打印键值对（设置摘要）
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<18} {}", format!("{}:", key).dimmed(), value);
}

/// 打印单个扫描点的状态行
pub fn print_outcome(point: &SweepPoint) {
    match &point.outcome {
        PointOutcome::Success(r) => print_success(&format!(
            "{} {} {:.6} eV",
            point.job_name,
            "->".cyan(),
            r.energy_ev
        )),
        PointOutcome::Failed(f) => print_warning(&format!(
            "{} {} {}",
            point.job_name,
            format!("[{}]", f.kind).red(),
            f.message
        )),
        PointOutcome::Skipped => print_skip(&point.job_name),
    }
}

/// 打印标题栏
pub fn print_header(title: &str) {
    let line = "─".repeat(60);
    println!("\n{}", line.dimmed());
    println!("  {}", title.bold());
    println!("{}\n", line.dimmed());
}

/// 打印分隔线
pub fn print_separator() {
    println!("{}", "─".repeat(60).dimmed());
}
