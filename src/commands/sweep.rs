//! # sweep 命令实现
//!
//! 解析设置后驱动 `SweepController`，打印结果表格并按需导出 CSV 与曲线图。
//!
//! ## 功能
//! - 扫描值解析：逗号列表或 `start:stop:count`
//! - 启动期校验（赝势根目录、赝势文件、ncpu、基准晶胞与元素赝势覆盖）
//! - 外层并行数按 核数 / ncpu 限制
//! - 失败点计数与提示
//!
//! ## 依赖关系
//! - 使用 `cli/sweep.rs` 定义的参数
//! - 使用 `batch/`, `builders/`, `report/`, `settings.rs`
//! - 使用 `utils/output.rs`

use crate::batch::{effective_jobs, BaseParameters, FailurePolicy, PwRunner, SweepController};
use crate::builders::{
    ConfigAssembler, ElectronicSettings, Prototype, SpeciesPolicy, StructureBuilder,
};
use crate::cli::sweep::{PseudoArgs, RunArgs, SweepArgs, SystemArgs};
use crate::error::{QsweepError, Result};
use crate::models::{ensure_table_covers, LatticeParameters, SubstitutionRule, SweepSeries};
use crate::report::{self, PlotOptions};
use crate::settings::{Settings, SolverSettings};
use crate::utils::output;

use std::path::Path;
use std::time::Duration;

/// 执行 sweep 命令
pub fn execute(args: SweepArgs, quiet: bool) -> Result<()> {
    output::print_header("Running Parameter Sweep");

    let values = parse_values(&args.values)?;
    let rule = SubstitutionRule::from(args.rule);
    let settings = resolve_settings(&args.pseudo, &args.run)?;

    let builder = structure_builder(&args.system);
    let assembler = config_assembler(&args.system, &settings.potentials_root);
    let base = BaseParameters {
        lattice: LatticeParameters::new(args.system.alat, args.system.clat),
        ecutwfc: args.system.ecut,
        nk: args.system.nk,
        kind: args.system.calculation.into(),
        reference_volume: args.reference_volume,
    };

    // 任何作业启动之前
    let cell = builder.build(&base.lattice)?;
    ensure_table_covers(&settings.pseudopotentials, &cell)?;

    let jobs = effective_jobs(args.jobs, settings.solver.ncpu, num_cpus::get());
    if jobs < args.jobs {
        output::print_warning(&format!(
            "Requested {} concurrent jobs; limited to {} ({} cores, {} MPI processes per job)",
            args.jobs,
            jobs,
            num_cpus::get(),
            settings.solver.ncpu
        ));
    }

    output::print_info(&format!("Sweeping {} values ({})", values.len(), rule));
    output::print_kv("Work directory", &settings.work_root.display().to_string());
    output::print_kv(
        "Base lattice",
        &format!("a = {} Å, c = {} Å", base.lattice.a, base.lattice.c),
    );
    output::print_kv(
        "Base cell",
        &format!(
            "{} ({}), V = {:.4} Å³, {:.4} Å³/atom",
            cell.formula(),
            cell.name,
            cell.volume(),
            cell.volume_per_atom()
        ),
    );
    output::print_kv(
        "Calculation",
        &format!("{}, ecutwfc = {} Ry, nk = {}", base.kind, base.ecutwfc, base.nk),
    );
    output::print_kv(
        "Solver",
        &format!("{} (ncpu = {})", settings.solver.command, settings.solver.ncpu),
    );
    output::print_kv("Concurrent jobs", &jobs.to_string());
    if args.dry_run {
        output::print_info("Dry run: input decks only, solver will not be started");
    }

    let runner = PwRunner::new(settings.solver.clone()).dry_run(args.dry_run);
    let policy = if args.fail_fast {
        FailurePolicy::Abort
    } else {
        FailurePolicy::Continue
    };

    let controller = SweepController::new(
        builder,
        assembler,
        runner,
        settings.pseudopotentials.clone(),
        &settings.work_root,
    )
    .with_policy(policy)
    .with_jobs(jobs)
    .with_progress(!quiet);

    let series = controller.run_sweep(&base, &values, rule);

    report_series(&series, args.output_csv.as_deref(), args.plot.as_deref())
}

/// 打印表格与汇总，并写出请求的文件
pub(crate) fn report_series(
    series: &SweepSeries,
    output_csv: Option<&Path>,
    plot: Option<&Path>,
) -> Result<()> {
    output::print_header(&format!("{} ({})", series.rule.title(), series.rule.axis_label()));
    println!("{}", report::render_table(series));

    if let Some(min) = series.min_energy() {
        output::print_info(&format!("Lowest energy: {:.6} eV", min));
    }

    output::print_separator();
    output::print_done(&format!(
        "{} points: {} ok, {} failed, {} skipped",
        series.len(),
        series.successes(),
        series.failures(),
        series.skipped()
    ));
    for point in series.points.iter().filter(|p| !p.is_success()) {
        output::print_outcome(point);
    }

    if let Some(path) = output_csv {
        report::save_csv(series, path)?;
        output::print_success(&format!("Series saved to '{}'", path.display()));
    }

    if let Some(path) = plot {
        if series.successes() == 0 {
            output::print_warning("No successful points, plot not written");
        } else {
            report::generate_curve_plot(series, path, &PlotOptions::for_series(series))?;
            output::print_success(&format!("Plot saved to '{}'", path.display()));
        }
    }

    Ok(())
}

/// 启动期设置解析
pub(crate) fn resolve_settings(pseudo: &PseudoArgs, run: &RunArgs) -> Result<Settings> {
    let solver = SolverSettings {
        command: run.pw_command.clone(),
        launcher: run.launcher.clone(),
        ncpu: run.ncpu,
        timeout: run.timeout.map(Duration::from_secs),
    };
    Settings::resolve(
        &pseudo.potentials_root,
        &run.work_root.join(&run.run_subdir),
        solver,
        &pseudo.pseudo,
    )
}

pub(crate) fn structure_builder(system: &SystemArgs) -> StructureBuilder {
    let species = match &system.species {
        Some(list) => SpeciesPolicy::PerSite(list.clone()),
        None => SpeciesPolicy::Uniform(system.element.clone()),
    };
    StructureBuilder::new(Prototype::Hcp, species)
}

pub(crate) fn config_assembler(system: &SystemArgs, pseudo_dir: &Path) -> ConfigAssembler {
    ConfigAssembler::new(pseudo_dir)
        .with_electronic(ElectronicSettings {
            nspin: system.nspin,
            starting_magnetization: system.starting_magnetization,
            smearing: system.smearing.clone(),
            degauss: system.degauss,
            mixing_beta: system.mixing_beta,
            conv_thr: system.conv_thr,
            ..ElectronicSettings::default()
        })
        .with_shifted_grid(system.shifted_grid)
}

/// 解析扫描值
///
/// 支持 `3,5,7` 与 `1.25:1.75:5`（含端点的等间距序列）。
pub fn parse_values(raw: &str) -> Result<Vec<f64>> {
    let raw = raw.trim();
    let invalid = |reason: &str| {
        QsweepError::InvalidArgument(format!("invalid sweep values '{}': {}", raw, reason))
    };

    let values = if raw.contains(':') {
        let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(invalid("expected start:stop:count"));
        }
        let start: f64 = parts[0].parse().map_err(|_| invalid("bad start"))?;
        let stop: f64 = parts[1].parse().map_err(|_| invalid("bad stop"))?;
        let count: usize = parts[2].parse().map_err(|_| invalid("bad count"))?;
        linspace(start, stop, count)
    } else {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>().map_err(|_| invalid(&format!("'{}' is not a number", s))))
            .collect::<Result<Vec<f64>>>()?
    };

    if values.is_empty() {
        return Err(invalid("no values given"));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(invalid("values must be finite"));
    }
    Ok(values)
}

fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        stop
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}
