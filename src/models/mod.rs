//! # 数据模型模块
//!
//! 定义晶体结构、运行配置、求解器结果与扫描序列的数据模型。
//!
//! ## 依赖关系
//! - 被 `builders/`, `parsers/`, `batch/`, `report/`, `commands/` 使用
//! - 子模块: structure, element, config, calculation, sweep

pub mod calculation;
pub mod config;
pub mod element;
pub mod structure;
pub mod sweep;

pub use calculation::SolverResult;
pub use config::{
    ensure_table_covers, CalculationKind, KPointScheme, KPoints, ParamValue, PotentialKind,
    PseudopotentialSpec, PseudopotentialTable, RunConfiguration, Section,
};
pub use structure::{Atom, Crystal, Lattice, LatticeParameters};
pub use sweep::{PointFailure, PointOutcome, SubstitutionRule, SweepPoint, SweepSeries};
