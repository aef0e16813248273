//! # 计算配置数据模型
//!
//! pw.x 运行配置的层级表示：五个固定 namelist 段、k 点采样与赝势表。
//! 所有映射均使用 `BTreeMap`，保证相同输入得到逐字段相同的配置。
//!
//! ## 依赖关系
//! - 被 `builders/config.rs` 构造
//! - 被 `parsers/pwscf_in.rs` 序列化
//! - 被 `batch/job.rs` 读取（工作目录、物种校验）

use crate::error::{QsweepError, Result};
use crate::models::Crystal;

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// pw.x 计算类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalculationKind {
    /// 同时弛豫离子与晶胞
    VcRelax,
    /// 固定几何的自洽场计算
    Scf,
}

impl CalculationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationKind::VcRelax => "vc-relax",
            CalculationKind::Scf => "scf",
        }
    }
}

impl std::fmt::Display for CalculationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// namelist 段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Section {
    Control,
    System,
    Electrons,
    Ions,
    Cell,
}

impl Section {
    /// 按 pw.x 要求的顺序排列
    pub const ALL: [Section; 5] = [
        Section::Control,
        Section::System,
        Section::Electrons,
        Section::Ions,
        Section::Cell,
    ];

    pub fn namelist(&self) -> &'static str {
        match self {
            Section::Control => "CONTROL",
            Section::System => "SYSTEM",
            Section::Electrons => "ELECTRONS",
            Section::Ions => "IONS",
            Section::Cell => "CELL",
        }
    }
}

/// namelist 中的标量值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// k 点采样方案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KPointScheme {
    /// Monkhorst-Pack 自动网格
    Automatic,
}

impl KPointScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            KPointScheme::Automatic => "automatic",
        }
    }
}

/// k 点采样设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KPoints {
    pub grid: [u32; 3],
    pub scheme: KPointScheme,
    /// 是否半格点偏移
    pub shifted: bool,
}

/// 赝势类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PotentialKind {
    Paw,
    Uspp,
    Nc,
}

impl std::str::FromStr for PotentialKind {
    type Err = QsweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "paw" => Ok(PotentialKind::Paw),
            "uspp" | "us" => Ok(PotentialKind::Uspp),
            "nc" | "norm-conserving" => Ok(PotentialKind::Nc),
            other => Err(QsweepError::InvalidArgument(format!(
                "unknown pseudopotential kind '{}'",
                other
            ))),
        }
    }
}

/// 单个元素的赝势描述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PseudopotentialSpec {
    pub element: String,
    /// 泛函族，如 GGA
    pub functional: String,
    pub kind: PotentialKind,
    /// 赝势文件名（写入 ATOMIC_SPECIES）
    pub file_name: String,
    /// 已解析的完整路径
    pub path: PathBuf,
}

/// 元素 -> 赝势
pub type PseudopotentialTable = BTreeMap<String, PseudopotentialSpec>;

/// 完整的 pw.x 运行配置
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfiguration {
    pub kind: CalculationKind,
    /// 作业工作目录，同时作为 pw.x 的 outdir
    pub output_directory: PathBuf,
    pub sections: BTreeMap<Section, BTreeMap<String, ParamValue>>,
    pub kpoints: KPoints,
    pub pseudopotentials: PseudopotentialTable,
}

impl RunConfiguration {
    /// 获取某段
    pub fn section(&self, section: Section) -> Option<&BTreeMap<String, ParamValue>> {
        self.sections.get(&section)
    }

    /// 获取某段中的某个键
    pub fn get(&self, section: Section, key: &str) -> Option<&ParamValue> {
        self.sections.get(&section).and_then(|s| s.get(key))
    }

    /// 平面波截断能 (Ry)
    pub fn ecutwfc(&self) -> Option<f64> {
        self.get(Section::System, "ecutwfc").and_then(|v| v.as_f64())
    }

    /// 电荷密度截断能 (Ry)
    pub fn ecutrho(&self) -> Option<f64> {
        self.get(Section::System, "ecutrho").and_then(|v| v.as_f64())
    }

    /// 确认结构中的每个元素都有对应赝势
    pub fn ensure_species_covered(&self, structure: &Crystal) -> Result<()> {
        ensure_table_covers(&self.pseudopotentials, structure)
    }
}

/// 赝势表是否覆盖结构中的全部元素；缺失的元素按符号列出
pub fn ensure_table_covers(table: &PseudopotentialTable, structure: &Crystal) -> Result<()> {
    let missing: Vec<String> = structure
        .species()
        .into_iter()
        .filter(|el| !table.contains_key(el))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(QsweepError::MissingPseudopotential { species: missing })
    }
}
