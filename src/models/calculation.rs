//! # 求解器结果数据模型
//!
//! 存储从 pw.x 输出中提取的标量/矢量结果。
//!
//! ## 依赖关系
//! - 被 `parsers/pwscf_out.rs` 构造
//! - 被 `batch/sweep.rs`, `report/` 使用

use serde::Serialize;

/// Rydberg -> eV
pub const RY_TO_EV: f64 = 13.605698066;

/// Bohr -> Å
pub const BOHR_TO_ANGSTROM: f64 = 0.529177249;

/// pw.x 计算结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolverResult {
    /// 总能 (Ry)
    pub energy_ry: f64,

    /// 总能 (eV)
    pub energy_ev: f64,

    /// 应力张量 (kbar)
    pub stress_kbar: Option<[[f64; 3]; 3]>,

    /// 压力 (kbar)
    pub pressure_kbar: Option<f64>,

    /// 每个原子的力 (Ry/bohr)
    pub forces: Option<Vec<[f64; 3]>>,

    /// 总力 (eV/Å)
    pub total_force: Option<f64>,

    /// 晶胞体积 (bohr³)
    pub cell_volume_bohr3: Option<f64>,

    /// 最后一次 SCF 迭代序号
    pub scf_iterations: Option<u32>,

    /// 墙钟时间 (s)
    pub wall_time_seconds: Option<f64>,

    /// 是否达到收敛
    pub converged: bool,
}

impl SolverResult {
    pub fn from_energy_ry(energy_ry: f64) -> Self {
        SolverResult {
            energy_ry,
            energy_ev: energy_ry * RY_TO_EV,
            stress_kbar: None,
            pressure_kbar: None,
            forces: None,
            total_force: None,
            cell_volume_bohr3: None,
            scf_iterations: None,
            wall_time_seconds: None,
            converged: false,
        }
    }

    /// 晶胞体积 (Å³)
    pub fn cell_volume_angstrom3(&self) -> Option<f64> {
        self.cell_volume_bohr3
            .map(|v| v * BOHR_TO_ANGSTROM.powi(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_conversion() {
        let result = SolverResult::from_energy_ry(-2.0);
        assert!((result.energy_ev - (-27.211396132)).abs() < 1e-9);
        assert!(!result.converged);
    }
}
