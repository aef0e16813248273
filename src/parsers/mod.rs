//! # 解析器模块
//!
//! pw.x 输入文件的生成与输出文件的解析。
//!
//! ## 依赖关系
//! - 被 `batch/` 和 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: pwscf_in, pwscf_out

pub mod pwscf_in;
pub mod pwscf_out;

pub use pwscf_in::to_pwscf_input;
pub use pwscf_out::{parse_job, parse_pwscf_output};
