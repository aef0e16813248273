//! # sweep 子命令 CLI 定义
//!
//! 参数扫描的全部参数，以及被 `input` 子命令复用的结构/配置参数组。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs`, `cli/input.rs` 使用
//! - 参数传递给 `commands/sweep.rs`

use crate::models::{CalculationKind, SubstitutionRule};

use clap::{Args, ValueEnum};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// 枚举参数
// ─────────────────────────────────────────────────────────────

/// 扫描规则
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum RuleArg {
    /// Values are k-point grid densities (nk -> nk x nk x nk)
    Kgrid,
    /// Values are volume ratios (lengths scaled by the cube root)
    Volume,
    /// Values scale both lattice lengths linearly
    Lattice,
}

impl From<RuleArg> for SubstitutionRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::Kgrid => SubstitutionRule::KGridDensity,
            RuleArg::Volume => SubstitutionRule::VolumeScale,
            RuleArg::Lattice => SubstitutionRule::LatticeScale,
        }
    }
}

/// 计算类型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CalculationArg {
    /// Variable-cell relaxation
    VcRelax,
    /// Single-point self-consistent field
    Scf,
}

impl From<CalculationArg> for CalculationKind {
    fn from(kind: CalculationArg) -> Self {
        match kind {
            CalculationArg::VcRelax => CalculationKind::VcRelax,
            CalculationArg::Scf => CalculationKind::Scf,
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 共享参数组
// ─────────────────────────────────────────────────────────────

/// 结构与单点计算参数
#[derive(Args, Debug, Clone)]
pub struct SystemArgs {
    /// Element placed on every site of the hcp cell
    #[arg(long, default_value = "Fe")]
    pub element: String,

    /// Per-site species overriding --element (comma-separated, one per site)
    #[arg(long, value_delimiter = ',')]
    pub species: Option<Vec<String>>,

    /// In-plane lattice constant a (Å)
    #[arg(long, default_value_t = 3.0)]
    pub alat: f64,

    /// Out-of-plane lattice constant c (Å)
    #[arg(long, default_value_t = 4.0)]
    pub clat: f64,

    /// Wavefunction cutoff ecutwfc (Ry); ecutrho is 8x this value
    #[arg(long, default_value_t = 30.0)]
    pub ecut: f64,

    /// k-point grid density used when the k-grid is not swept
    #[arg(long, default_value_t = 9)]
    pub nk: i64,

    /// Calculation kind
    #[arg(long, value_enum, default_value_t = CalculationArg::Scf)]
    pub calculation: CalculationArg,

    /// Spin polarisation (1 or 2)
    #[arg(long, default_value_t = 1)]
    pub nspin: i64,

    /// Starting magnetization for spin-polarised runs
    #[arg(long)]
    pub starting_magnetization: Option<f64>,

    /// Smearing scheme
    #[arg(long, default_value = "mp")]
    pub smearing: String,

    /// Smearing width (Ry)
    #[arg(long, default_value_t = 0.02)]
    pub degauss: f64,

    /// Charge-density mixing factor
    #[arg(long, default_value_t = 0.5)]
    pub mixing_beta: f64,

    /// SCF convergence threshold (Ry)
    #[arg(long, default_value_t = 1e-7)]
    pub conv_thr: f64,

    /// Shift the Monkhorst-Pack grid by half a step
    #[arg(long, default_value_t = false)]
    pub shifted_grid: bool,
}

/// 赝势参数
#[derive(Args, Debug, Clone)]
pub struct PseudoArgs {
    /// Directory containing pseudopotential files
    #[arg(long, env = "QE_POTENTIALS")]
    pub potentials_root: PathBuf,

    /// Pseudopotential as EL=FILE[:kind[:functional]] (repeatable)
    #[arg(long = "pseudo", default_value = "Fe=Fe.pbe-nd-rrkjus.UPF")]
    pub pseudo: Vec<String>,
}

/// 求解器执行参数
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Root directory under which job directories are created
    #[arg(long, env = "WORKDIR", default_value = ".")]
    pub work_root: PathBuf,

    /// Subdirectory of the work root holding this sweep
    #[arg(long, default_value = "qsweep")]
    pub run_subdir: PathBuf,

    /// pw.x executable (extra arguments allowed)
    #[arg(long, env = "QSWEEP_PW_COMMAND", default_value = "pw.x")]
    pub pw_command: String,

    /// MPI launcher used when --ncpu > 1
    #[arg(long, env = "QSWEEP_MPI_LAUNCHER", default_value = "mpirun")]
    pub launcher: String,

    /// MPI processes per job
    #[arg(long, default_value_t = 2)]
    pub ncpu: u32,

    /// Per-job timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

// ─────────────────────────────────────────────────────────────
// sweep 子命令
// ─────────────────────────────────────────────────────────────

/// sweep 子命令参数
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// How each value is substituted into the base parameters
    #[arg(long, value_enum)]
    pub rule: RuleArg,

    /// Values to sweep: '3,5,7' or 'start:stop:count'
    #[arg(long, allow_hyphen_values = true)]
    pub values: String,

    /// Reference volume V0 (Å³) for volume abscissas [default: base cell volume]
    #[arg(long)]
    pub reference_volume: Option<f64>,

    #[command(flatten)]
    pub system: SystemArgs,

    #[command(flatten)]
    pub pseudo: PseudoArgs,

    #[command(flatten)]
    pub run: RunArgs,

    /// Number of sweep points run concurrently (clamped to cores / ncpu)
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Stop launching new points after the first failure
    #[arg(long, default_value_t = false)]
    pub fail_fast: bool,

    /// Write input decks without running the solver
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Write the series to this CSV file
    #[arg(long)]
    pub output_csv: Option<PathBuf>,

    /// Plot the curve to this file (.png or .svg)
    #[arg(long)]
    pub plot: Option<PathBuf>,
}
