//! # 结果报告模块
//!
//! 扫描序列的终端表格、CSV 导出与曲线图。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/sweep.rs`
//! - 子模块: table, export, plot

pub mod export;
pub mod plot;
pub mod table;

pub use export::save_csv;
pub use plot::{generate_curve_plot, PlotOptions};
pub use table::render_table;
