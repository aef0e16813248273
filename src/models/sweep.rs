//! # 扫描序列数据模型
//!
//! 一次扫描的有序结果：每个输入值对应一个点，失败点保留失败标记而不是被丢弃。
//!
//! ## 依赖关系
//! - 被 `batch/sweep.rs` 构造
//! - 被 `report/`, `commands/` 消费

use crate::error::{ErrorKind, QsweepError};
use crate::models::SolverResult;

use serde::Serialize;

/// 扫描值代入基准参数的规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubstitutionRule {
    /// 值为体积比 s：晶格长度乘以 ∛s，横坐标 V0·s
    VolumeScale,
    /// 值为线性缩放 s：晶格长度乘以 s，横坐标 V0·s³
    LatticeScale,
    /// 值为 k 网格密度 nk：网格 [nk, nk, nk]
    KGridDensity,
}

impl SubstitutionRule {
    /// 扫描变量的坐标轴标题
    pub fn axis_label(&self) -> &'static str {
        match self {
            SubstitutionRule::VolumeScale | SubstitutionRule::LatticeScale => {
                "Unit-cell volume (Å³)"
            }
            SubstitutionRule::KGridDensity => "k-point grid density (nk)",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SubstitutionRule::VolumeScale | SubstitutionRule::LatticeScale => {
                "Equation of state"
            }
            SubstitutionRule::KGridDensity => "k-point convergence",
        }
    }

    /// 作业目录名中的规则标记
    pub fn tag(&self) -> &'static str {
        match self {
            SubstitutionRule::VolumeScale => "volume",
            SubstitutionRule::LatticeScale => "lattice",
            SubstitutionRule::KGridDensity => "kgrid",
        }
    }
}

impl std::fmt::Display for SubstitutionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubstitutionRule::VolumeScale => write!(f, "volume-scale"),
            SubstitutionRule::LatticeScale => write!(f, "lattice-scale"),
            SubstitutionRule::KGridDensity => write!(f, "kgrid-density"),
        }
    }
}

/// 失败点标记
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&QsweepError> for PointFailure {
    fn from(err: &QsweepError) -> Self {
        PointFailure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// 单点结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PointOutcome {
    /// 计算成功
    Success(SolverResult),
    /// 计算失败
    Failed(PointFailure),
    /// 未执行（试运行或快速失败后）
    Skipped,
}

impl PointOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            PointOutcome::Success(_) => "ok",
            PointOutcome::Failed(_) => "failed",
            PointOutcome::Skipped => "skipped",
        }
    }
}

/// 扫描中的一个点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    /// 输入序号（从 0 开始）
    pub index: usize,
    /// 输入的扫描值
    pub value: f64,
    /// 绘图横坐标（nk 或晶胞体积）
    pub abscissa: f64,
    /// 作业目录名
    pub job_name: String,
    pub outcome: PointOutcome,
}

impl SweepPoint {
    pub fn result(&self) -> Option<&SolverResult> {
        match &self.outcome {
            PointOutcome::Success(r) => Some(r),
            _ => None,
        }
    }

    pub fn energy_ev(&self) -> Option<f64> {
        self.result().map(|r| r.energy_ev)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PointOutcome::Success(_))
    }
}

/// 有序扫描序列
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSeries {
    pub rule: SubstitutionRule,
    pub points: Vec<SweepPoint>,
}

impl SweepSeries {
    pub fn new(rule: SubstitutionRule, points: Vec<SweepPoint>) -> Self {
        SweepSeries { rule, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 成功点数量
    pub fn successes(&self) -> usize {
        self.points.iter().filter(|p| p.is_success()).count()
    }

    /// 失败点数量
    pub fn failures(&self) -> usize {
        self.points
            .iter()
            .filter(|p| matches!(p.outcome, PointOutcome::Failed(_)))
            .count()
    }

    /// 跳过点数量
    pub fn skipped(&self) -> usize {
        self.points
            .iter()
            .filter(|p| matches!(p.outcome, PointOutcome::Skipped))
            .count()
    }

    /// 按输入顺序给出 (横坐标, 能量或空)
    pub fn curve(&self) -> Vec<(f64, Option<f64>)> {
        self.points
            .iter()
            .map(|p| (p.abscissa, p.energy_ev()))
            .collect()
    }

    /// 成功点中的最低能量 (eV)
    pub fn min_energy(&self) -> Option<f64> {
        self.points
            .iter()
            .filter_map(|p| p.energy_ev())
            .fold(None, |acc, e| match acc {
                Some(m) if m <= e => Some(m),
                _ => Some(e),
            })
    }
}
