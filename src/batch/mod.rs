//! # 批量执行模块
//!
//! 扫描点的作业执行、有序并行调度与已有结果的收集。
//!
//! ## 功能
//! - 隔离工作目录中运行 pw.x
//! - 按输入顺序汇总扫描结果
//! - 并行处理与进度反馈
//! - 收集已有作业目录中的输出
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod job;
pub mod runner;
pub mod sweep;

pub use collector::OutputCollector;
pub use job::PwRunner;
pub use runner::effective_jobs;
pub use sweep::{BaseParameters, FailurePolicy, SweepController};
