//! # 构造器模块
//!
//! 纯函数式的结构与配置构造，无任何副作用。
//!
//! ## 依赖关系
//! - 被 `batch/sweep.rs`, `commands/` 使用
//! - 使用 `models/`
//! - 子模块: structure, config

pub mod config;
pub mod structure;

pub use config::{ConfigAssembler, ElectronicSettings};
pub use structure::{Prototype, SpeciesPolicy, StructureBuilder};
