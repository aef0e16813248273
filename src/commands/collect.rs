//! # collect 命令实现
//!
//! 重新解析已有扫描目录中的 pw.x 输出，生成与 `sweep` 相同的表格、CSV 与曲线图。
//!
//! ## 功能
//! - 按文件名模式收集输出文件（默认每个作业目录下的 `pwscf.out`）
//! - 横坐标取自作业目录名中的 k 网格，或输出中的最终晶胞体积
//! - 无法解析的输出记为失败点，不中断收集
//!
//! ## 依赖关系
//! - 使用 `cli/collect.rs` 定义的参数
//! - 使用 `batch/collector.rs`, `parsers/pwscf_out.rs`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::batch::OutputCollector;
use crate::cli::collect::{AxisArg, CollectArgs};
use crate::commands::sweep::report_series;
use crate::error::{QsweepError, Result};
use crate::models::{PointFailure, PointOutcome, SubstitutionRule, SweepPoint, SweepSeries};
use crate::parsers::parse_pwscf_output;
use crate::utils::{output, progress};

use regex::Regex;
use std::path::Path;

/// 执行 collect 命令
pub fn execute(args: CollectArgs, quiet: bool) -> Result<()> {
    output::print_header("Collecting Sweep Results");

    if !args.dir.exists() {
        return Err(QsweepError::DirectoryNotFound {
            path: args.dir.display().to_string(),
        });
    }

    output::print_info(&format!(
        "Scanning '{}' for '{}' ({} axis)...",
        args.dir.display(),
        args.pattern,
        args.axis
    ));

    let files = OutputCollector::new(&args.dir)
        .with_pattern(&args.pattern)
        .recursive(args.recursive)
        .collect();

    if files.is_empty() {
        output::print_warning("No solver outputs found.");
        return Ok(());
    }

    output::print_info(&format!("Found {} output files", files.len()));

    let series = collect_series(&files, args.axis, quiet);
    report_series(&series, args.output_csv.as_deref(), args.plot.as_deref())
}

/// 解析所有输出文件，顺序与路径顺序一致
pub(crate) fn collect_series<P: AsRef<Path>>(files: &[P], axis: AxisArg, quiet: bool) -> SweepSeries {
    let pb = if quiet {
        progress::create_hidden_bar(files.len() as u64)
    } else {
        progress::create_progress_bar(files.len() as u64, "Parsing")
    };

    let mut points = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let file = file.as_ref();
        let job_name = file
            .parent()
            .and_then(|p| p.file_name())
            .or_else(|| file.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let parsed = parse_pwscf_output(file);
        let abscissa = match axis {
            AxisArg::Kgrid => kgrid_from_name(&job_name).map(f64::from),
            AxisArg::Volume => parsed
                .as_ref()
                .ok()
                .and_then(|r| r.cell_volume_angstrom3()),
        }
        .unwrap_or(f64::NAN);

        let outcome = match parsed {
            Ok(result) => PointOutcome::Success(result),
            Err(e) => PointOutcome::Failed(PointFailure::from(&e)),
        };

        points.push(SweepPoint {
            index,
            value: abscissa,
            abscissa,
            job_name,
            outcome,
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    let rule = match axis {
        AxisArg::Kgrid => SubstitutionRule::KGridDensity,
        AxisArg::Volume => SubstitutionRule::VolumeScale,
    };
    SweepSeries::new(rule, points)
}

/// 从作业目录名读取 k 网格密度，如 `p002_Fe2_scf_kgrid_a3.000000_c4.000000_ecut30_k7x7x7`
fn kgrid_from_name(name: &str) -> Option<u32> {
    let re = Regex::new(r"_k(\d+)x\d+x\d+").ok()?;
    re.captures(name)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_kgrid_from_name() {
        assert_eq!(
            kgrid_from_name("p002_Fe2_scf_kgrid_a3.000000_c4.000000_ecut30_k7x7x7"),
            Some(7)
        );
        assert_eq!(
            kgrid_from_name("p0010_K2_vc-relax_kgrid_a3.0_c4.0_ecut30_k13x13x13"),
            Some(13)
        );
        assert_eq!(kgrid_from_name("Fe_a_3.0"), None);
    }

    #[test]
    fn test_collect_series_marks_unparseable_outputs() {
        let root = tempfile::tempdir().unwrap();
        let good = root.path().join("p000_Fe2_scf_kgrid_a3.000000_c4.000000_ecut30_k3x3x3");
        let bad = root.path().join("p001_Fe2_scf_kgrid_a3.000000_c4.000000_ecut30_k5x5x5");
        fs::create_dir_all(&good).unwrap();
        fs::create_dir_all(&bad).unwrap();
        fs::write(
            good.join("pwscf.out"),
            "     unit-cell volume          =     210.0000 (a.u.)^3\n\
             !    total energy              =    -330.25000000 Ry\n",
        )
        .unwrap();
        fs::write(bad.join("pwscf.out"), "     Error in routine cdiaghg\n").unwrap();

        let files = OutputCollector::new(root.path()).collect();
        let series = collect_series(&files, AxisArg::Kgrid, true);

        assert_eq!(series.len(), 2);
        assert_eq!(series.points[0].abscissa, 3.0);
        assert_eq!(series.points[0].result().unwrap().energy_ry, -330.25);
        assert_eq!(series.points[1].abscissa, 5.0);
        match &series.points[1].outcome {
            PointOutcome::Failed(f) => assert_eq!(f.kind, crate::error::ErrorKind::Parse),
            other => panic!("unexpected outcome {:?}", other),
        }

        let by_volume = collect_series(&files, AxisArg::Volume, true);
        let v = by_volume.points[0].abscissa;
        assert!((v - 210.0 * 0.529177249_f64.powi(3)).abs() < 1e-9);
        assert!(by_volume.points[1].abscissa.is_nan());
    }
}
