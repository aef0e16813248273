//! # 配置组装器
//!
//! 将少量数值/扫描参数组装为完整、已校验的 pw.x 运行配置。
//!
//! ## 约定
//! - `ecutrho` 恒等于 `ecutwfc × 8`，不作为独立参数
//! - k 网格必须三维全部为正
//! - 计算类型只改变 IONS/CELL 段内容，段集合始终相同
//! - 物种与赝势的交叉校验在 `batch/job.rs` 提交前执行
//!
//! ## 依赖关系
//! - 被 `batch/sweep.rs`, `commands/input.rs` 调用
//! - 使用 `models/config.rs`

use crate::error::{QsweepError, Result};
use crate::models::{
    CalculationKind, KPointScheme, KPoints, ParamValue, PseudopotentialTable, RunConfiguration,
    Section,
};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 电荷密度截断能与波函数截断能之比
pub const DENSITY_CUTOFF_FACTOR: f64 = 8.0;

/// 固定的电子结构设置
#[derive(Debug, Clone, PartialEq)]
pub struct ElectronicSettings {
    pub nspin: i64,
    /// nspin = 2 时写入 starting_magnetization(1)
    pub starting_magnetization: Option<f64>,
    pub smearing: String,
    pub degauss: f64,
    pub diagonalization: String,
    pub mixing_beta: f64,
    pub conv_thr: f64,
}

impl Default for ElectronicSettings {
    fn default() -> Self {
        ElectronicSettings {
            nspin: 1,
            starting_magnetization: None,
            smearing: "mp".to_string(),
            degauss: 0.02,
            diagonalization: "david".to_string(),
            mixing_beta: 0.5,
            conv_thr: 1e-7,
        }
    }
}

/// 配置组装器
#[derive(Debug, Clone)]
pub struct ConfigAssembler {
    pseudo_dir: PathBuf,
    prefix: String,
    electronic: ElectronicSettings,
    shifted_grid: bool,
}

impl ConfigAssembler {
    pub fn new(pseudo_dir: impl Into<PathBuf>) -> Self {
        ConfigAssembler {
            pseudo_dir: pseudo_dir.into(),
            prefix: "pwscf".to_string(),
            electronic: ElectronicSettings::default(),
            shifted_grid: false,
        }
    }

    pub fn with_electronic(mut self, electronic: ElectronicSettings) -> Self {
        self.electronic = electronic;
        self
    }

    pub fn with_shifted_grid(mut self, shifted: bool) -> Self {
        self.shifted_grid = shifted;
        self
    }

    /// 组装运行配置
    pub fn assemble(
        &self,
        kind: CalculationKind,
        ecutwfc: f64,
        k_grid: [i64; 3],
        output_directory: &Path,
        pseudopotentials: &PseudopotentialTable,
    ) -> Result<RunConfiguration> {
        if !ecutwfc.is_finite() || ecutwfc <= 0.0 {
            return Err(QsweepError::InvalidCutoff(format!(
                "ecutwfc must be positive and finite, got {}",
                ecutwfc
            )));
        }
        let kpoints = self.pack_kpoints(k_grid)?;
        self.validate_electronic()?;

        let mut sections: BTreeMap<Section, BTreeMap<String, ParamValue>> = Section::ALL
            .iter()
            .map(|s| (*s, BTreeMap::new()))
            .collect();

        let outdir = output_directory.display().to_string();
        let pseudo_dir = self.pseudo_dir.display().to_string();

        let control = [
            ("calculation", ParamValue::from(kind.as_str())),
            ("prefix", ParamValue::from(self.prefix.as_str())),
            ("pseudo_dir", ParamValue::from(pseudo_dir)),
            ("outdir", ParamValue::from(outdir)),
            ("tstress", ParamValue::from(true)),
            ("tprnfor", ParamValue::from(true)),
            ("disk_io", ParamValue::from("none")),
        ];
        insert_all(&mut sections, Section::Control, control);

        let e = &self.electronic;
        let mut system = vec![
            ("ecutwfc", ParamValue::from(ecutwfc)),
            ("ecutrho", ParamValue::from(ecutwfc * DENSITY_CUTOFF_FACTOR)),
            ("nspin", ParamValue::from(e.nspin)),
            ("occupations", ParamValue::from("smearing")),
            ("smearing", ParamValue::from(e.smearing.as_str())),
            ("degauss", ParamValue::from(e.degauss)),
        ];
        if e.nspin == 2 {
            if let Some(m) = e.starting_magnetization {
                system.push(("starting_magnetization(1)", ParamValue::from(m)));
            }
        }
        insert_all(&mut sections, Section::System, system);

        let electrons = [
            ("diagonalization", ParamValue::from(e.diagonalization.as_str())),
            ("mixing_beta", ParamValue::from(e.mixing_beta)),
            ("conv_thr", ParamValue::from(e.conv_thr)),
        ];
        insert_all(&mut sections, Section::Electrons, electrons);

        if kind == CalculationKind::VcRelax {
            insert_all(
                &mut sections,
                Section::Ions,
                [("ion_dynamics", ParamValue::from("bfgs"))],
            );
            insert_all(
                &mut sections,
                Section::Cell,
                [("cell_dynamics", ParamValue::from("bfgs"))],
            );
        }

        Ok(RunConfiguration {
            kind,
            output_directory: output_directory.to_path_buf(),
            sections,
            kpoints,
            pseudopotentials: pseudopotentials.clone(),
        })
    }

    /// 打包 k 网格，不允许部分网格
    fn pack_kpoints(&self, k_grid: [i64; 3]) -> Result<KPoints> {
        let mut grid = [0u32; 3];
        for (slot, &n) in grid.iter_mut().zip(k_grid.iter()) {
            if n <= 0 || n > u32::MAX as i64 {
                return Err(QsweepError::InvalidSampling(format!(
                    "k-grid dimensions must be positive, got {:?}",
                    k_grid
                )));
            }
            *slot = n as u32;
        }
        Ok(KPoints {
            grid,
            scheme: KPointScheme::Automatic,
            shifted: self.shifted_grid,
        })
    }

    fn validate_electronic(&self) -> Result<()> {
        let e = &self.electronic;
        let positives = [
            ("degauss", e.degauss),
            ("mixing_beta", e.mixing_beta),
            ("conv_thr", e.conv_thr),
        ];
        for (name, v) in positives {
            if !v.is_finite() || v <= 0.0 {
                return Err(QsweepError::InvalidArgument(format!(
                    "{} must be positive and finite, got {}",
                    name, v
                )));
            }
        }
        if e.nspin != 1 && e.nspin != 2 {
            return Err(QsweepError::InvalidArgument(format!(
                "nspin must be 1 or 2, got {}",
                e.nspin
            )));
        }
        Ok(())
    }
}

fn insert_all<I>(
    sections: &mut BTreeMap<Section, BTreeMap<String, ParamValue>>,
    section: Section,
    items: I,
) where
    I: IntoIterator<Item = (&'static str, ParamValue)>,
{
    let entry = sections.entry(section).or_default();
    for (k, v) in items {
        entry.insert(k.to_string(), v);
    }
}
