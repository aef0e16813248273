//! # 参数扫描控制器
//!
//! 对每个扫描值依次执行 结构构造 → 配置组装 → 作业提交 → 输出解析，
//! 得到与输入顺序一致的 `SweepSeries`。
//!
//! ## 功能
//! - 三种代入规则：体积比、线性缩放、k 网格密度
//! - 单点失败隔离（默认），或首个失败后跳过剩余点
//! - 可选外层并行，结果顺序不变
//! - 试运行：只写输入文件
//!
//! ## 依赖关系
//! - 被 `commands/sweep.rs` 调用
//! - 使用 `builders/`, `batch/job.rs`, `batch/runner.rs`, `parsers/pwscf_out.rs`

use crate::batch::job::{JobRunner, JobStatus};
use crate::batch::runner::BatchRunner;
use crate::builders::{ConfigAssembler, StructureBuilder};
use crate::error::{QsweepError, Result};
use crate::models::{
    CalculationKind, Crystal, LatticeParameters, PointFailure, PointOutcome,
    PseudopotentialTable, SolverResult, SubstitutionRule, SweepPoint, SweepSeries,
};
use crate::parsers::parse_job;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, info_span, warn};

/// 单点失败后的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// 记录失败并继续
    #[default]
    Continue,
    /// 记录失败，其后的点全部跳过
    Abort,
}

/// 扫描的基准参数
#[derive(Debug, Clone, PartialEq)]
pub struct BaseParameters {
    pub lattice: LatticeParameters,
    /// 波函数截断能 (Ry)
    pub ecutwfc: f64,
    /// 非 k 网格扫描时使用的 k 网格密度
    pub nk: i64,
    pub kind: CalculationKind,
    /// 参考体积 V0 (Å³)，缺省为基准结构的体积
    pub reference_volume: Option<f64>,
}

/// 扫描控制器
pub struct SweepController<R: JobRunner> {
    builder: StructureBuilder,
    assembler: ConfigAssembler,
    runner: R,
    pseudopotentials: PseudopotentialTable,
    work_root: PathBuf,
    policy: FailurePolicy,
    batch: BatchRunner,
}

impl<R: JobRunner> SweepController<R> {
    pub fn new(
        builder: StructureBuilder,
        assembler: ConfigAssembler,
        runner: R,
        pseudopotentials: PseudopotentialTable,
        work_root: impl Into<PathBuf>,
    ) -> Self {
        SweepController {
            builder,
            assembler,
            runner,
            pseudopotentials,
            work_root: work_root.into(),
            policy: FailurePolicy::default(),
            batch: BatchRunner::new(1),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 外层并行数（调用方负责按核数限制）
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.batch = BatchRunner::new(jobs.max(1));
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.batch = self.batch.with_progress(show);
        self
    }

    /// 执行扫描
    ///
    /// 返回序列长度恒等于 `values.len()`，单点错误不会向外传播。
    pub fn run_sweep(
        &self,
        base: &BaseParameters,
        values: &[f64],
        rule: SubstitutionRule,
    ) -> SweepSeries {
        let reference_volume = base.reference_volume.or_else(|| {
            self.builder
                .build(&base.lattice)
                .ok()
                .map(|c| c.volume())
        });

        info!(
            rule = %rule,
            points = values.len(),
            jobs = self.batch.jobs(),
            "starting sweep"
        );

        let naming = JobNaming::new(values.len(), base.kind, rule, base.ecutwfc);
        let aborted = AtomicBool::new(false);
        let items: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();

        let mut points = self.batch.run(&items, "Sweeping", |&(index, value)| {
            let abscissa = abscissa_for(rule, value, reference_volume);
            let point = if self.policy == FailurePolicy::Abort && aborted.load(Ordering::SeqCst)
            {
                SweepPoint {
                    index,
                    value,
                    abscissa,
                    job_name: self.job_name_for(base, &naming, index, value, rule),
                    outcome: PointOutcome::Skipped,
                }
            } else {
                self.run_point(base, &naming, index, value, abscissa, rule)
            };

            if matches!(point.outcome, PointOutcome::Failed(_)) {
                aborted.store(true, Ordering::SeqCst);
            }
            point
        });

        if self.policy == FailurePolicy::Abort {
            skip_after_first_failure(&mut points);
        }

        let series = SweepSeries::new(rule, points);
        info!(
            ok = series.successes(),
            failed = series.failures(),
            skipped = series.skipped(),
            "sweep finished"
        );
        series
    }

    /// 单个扫描点
    fn run_point(
        &self,
        base: &BaseParameters,
        naming: &JobNaming,
        index: usize,
        value: f64,
        abscissa: f64,
        rule: SubstitutionRule,
    ) -> SweepPoint {
        let _span = info_span!("point", index, value).entered();

        let (job_name, outcome) = match self.prepare(base, value, rule) {
            Ok((crystal, lattice, k_grid)) => {
                let job_name = naming.dir_name(index, &crystal.formula(), &lattice, k_grid);
                let outcome = match self.execute(base, &crystal, k_grid, &job_name) {
                    Ok(Some(result)) => PointOutcome::Success(result),
                    Ok(None) => PointOutcome::Skipped,
                    Err(e) => PointOutcome::Failed(PointFailure::from(&e)),
                };
                (job_name, outcome)
            }
            Err(e) => (
                naming.invalid(index),
                PointOutcome::Failed(PointFailure::from(&e)),
            ),
        };

        match &outcome {
            PointOutcome::Failed(failure) => {
                warn!(job = %job_name, kind = %failure.kind, "{}", failure.message)
            }
            other => info!(job = %job_name, status = other.status(), "point finished"),
        }

        SweepPoint {
            index,
            value,
            abscissa,
            job_name,
            outcome,
        }
    }

    /// 组装 → 提交 → 解析；试运行返回 None
    fn execute(
        &self,
        base: &BaseParameters,
        crystal: &Crystal,
        k_grid: [i64; 3],
        job_name: &str,
    ) -> Result<Option<SolverResult>> {
        let workdir = self.work_root.join(job_name);
        let config = self.assembler.assemble(
            base.kind,
            base.ecutwfc,
            k_grid,
            &workdir,
            &self.pseudopotentials,
        )?;

        let handle = self.runner.submit(crystal, &config)?;
        if handle.status == JobStatus::Prepared {
            debug!(input = %handle.input_path.display(), "dry run, input only");
            return Ok(None);
        }
        parse_job(&handle).map(Some)
    }

    /// 代入扫描值并构造该点的结构
    fn prepare(
        &self,
        base: &BaseParameters,
        value: f64,
        rule: SubstitutionRule,
    ) -> Result<(Crystal, LatticeParameters, [i64; 3])> {
        let (lattice, k_grid) = self.substitute(base, value, rule)?;
        let crystal = self.builder.build(&lattice)?;
        Ok((crystal, lattice, k_grid))
    }

    /// 将扫描值代入基准参数
    fn substitute(
        &self,
        base: &BaseParameters,
        value: f64,
        rule: SubstitutionRule,
    ) -> Result<(LatticeParameters, [i64; 3])> {
        let base_grid = [base.nk; 3];
        let base_scale = base.lattice.scale.unwrap_or(1.0);

        match rule {
            SubstitutionRule::KGridDensity => {
                if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
                    return Err(QsweepError::InvalidSampling(format!(
                        "k-grid density must be a positive integer, got {}",
                        value
                    )));
                }
                let nk = value as i64;
                Ok((base.lattice, [nk; 3]))
            }
            SubstitutionRule::VolumeScale => {
                check_ratio(value)?;
                let base_volume = self.builder.build(&base.lattice)?.volume();
                let target = match base.reference_volume {
                    Some(v0) => v0 * value,
                    None => base_volume * value,
                };
                let factor = (target / base_volume).cbrt();
                Ok((base.lattice.with_scale(base_scale * factor), base_grid))
            }
            SubstitutionRule::LatticeScale => {
                check_ratio(value)?;
                Ok((base.lattice.with_scale(base_scale * value), base_grid))
            }
        }
    }

    fn job_name_for(
        &self,
        base: &BaseParameters,
        naming: &JobNaming,
        index: usize,
        value: f64,
        rule: SubstitutionRule,
    ) -> String {
        match self.prepare(base, value, rule) {
            Ok((crystal, lattice, k_grid)) => {
                naming.dir_name(index, &crystal.formula(), &lattice, k_grid)
            }
            Err(_) => naming.invalid(index),
        }
    }
}

fn check_ratio(value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(QsweepError::InvalidLattice(format!(
            "scale factor must be positive and finite, got {}",
            value
        )));
    }
    Ok(())
}

/// 绘图横坐标；参考体积未知时退回扫描值本身
fn abscissa_for(rule: SubstitutionRule, value: f64, reference_volume: Option<f64>) -> f64 {
    match (rule, reference_volume) {
        (SubstitutionRule::KGridDensity, _) => value,
        (SubstitutionRule::VolumeScale, Some(v0)) => v0 * value,
        (SubstitutionRule::LatticeScale, Some(v0)) => v0 * value.powi(3),
        (_, None) => value,
    }
}

/// 作业目录命名
///
/// `p{序号}_{化学式}_{计算类型}_{规则}_a{a}_c{c}_ecut{E}_k{n}x{n}x{n}`，
/// 不同扫描在同一根目录下不会互相覆盖。序号补零到点数所需的位数（至少 3 位），
/// 目录名的字典序即扫描顺序。
#[derive(Debug, Clone, Copy)]
struct JobNaming {
    width: usize,
    kind: CalculationKind,
    rule: SubstitutionRule,
    ecutwfc: f64,
}

impl JobNaming {
    fn new(points: usize, kind: CalculationKind, rule: SubstitutionRule, ecutwfc: f64) -> Self {
        JobNaming {
            width: index_width(points),
            kind,
            rule,
            ecutwfc,
        }
    }

    fn dir_name(
        &self,
        index: usize,
        formula: &str,
        lattice: &LatticeParameters,
        k_grid: [i64; 3],
    ) -> String {
        format!(
            "p{:0width$}_{}_{}_{}_a{:.6}_c{:.6}_ecut{}_k{}x{}x{}",
            index,
            formula,
            self.kind,
            self.rule.tag(),
            lattice.effective_a(),
            lattice.effective_c(),
            self.ecutwfc,
            k_grid[0],
            k_grid[1],
            k_grid[2],
            width = self.width
        )
    }

    /// 代入失败的点没有结构，只用序号命名
    fn invalid(&self, index: usize) -> String {
        format!("p{:0width$}_invalid", index, width = self.width)
    }
}

/// 序号位数：最大序号的十进制位数，至少 3 位
fn index_width(points: usize) -> usize {
    points.saturating_sub(1).to_string().len().max(3)
}

/// 首个失败点之后的点一律标记为跳过
fn skip_after_first_failure(points: &mut [SweepPoint]) {
    if let Some(first) = points
        .iter()
        .position(|p| matches!(p.outcome, PointOutcome::Failed(_)))
    {
        for point in points.iter_mut().skip(first + 1) {
            point.outcome = PointOutcome::Skipped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::job::{JobHandle, PwRunner, OUTPUT_FILE};
    use crate::error::ErrorKind;
    use crate::models::{PotentialKind, PseudopotentialSpec, RunConfiguration};
    use crate::settings::SolverSettings;
    use std::fs;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    /// 记录每次提交的假执行器；序号在 `fail_on` 中的点以非零状态退出
    #[derive(Default)]
    struct StubRunner {
        fail_on: Vec<usize>,
        delay_ms: u64,
        seen: Mutex<Vec<Submission>>,
    }

    #[derive(Debug, Clone)]
    struct Submission {
        index: usize,
        volume: f64,
        grid: [u32; 3],
        ecutwfc: Option<f64>,
        kind: CalculationKind,
    }

    impl StubRunner {
        fn failing_on(fail_on: Vec<usize>) -> Self {
            StubRunner {
                fail_on,
                ..Default::default()
            }
        }

        fn submissions(&self) -> Vec<Submission> {
            let mut seen = self.seen.lock().unwrap().clone();
            seen.sort_by_key(|s| s.index);
            seen
        }
    }

    impl JobRunner for StubRunner {
        fn submit(&self, structure: &Crystal, config: &RunConfiguration) -> Result<JobHandle> {
            let workdir = config.output_directory.clone();
            let name = workdir.file_name().unwrap().to_string_lossy().to_string();
            let index: usize = name[1..].split('_').next().unwrap().parse().unwrap();

            if self.delay_ms > 0 {
                thread::sleep(Duration::from_millis(self.delay_ms * (10 - index as u64 % 10)));
            }

            self.seen.lock().unwrap().push(Submission {
                index,
                volume: structure.volume(),
                grid: config.kpoints.grid,
                ecutwfc: config.ecutwfc(),
                kind: config.kind,
            });

            fs::create_dir_all(&workdir).unwrap();
            let output_path = workdir.join(OUTPUT_FILE);
            let status = if self.fail_on.contains(&index) {
                JobStatus::Exited {
                    code: Some(1),
                    timed_out: false,
                }
            } else {
                fs::write(
                    &output_path,
                    format!(
                        "!    total energy              =   {:.8} Ry\n",
                        -1.0 - index as f64
                    ),
                )
                .unwrap();
                JobStatus::Completed
            };

            Ok(JobHandle {
                name,
                input_path: workdir.join("pwscf.in"),
                workdir,
                output_path,
                status,
            })
        }
    }

    struct LaunchFailRunner;

    impl JobRunner for LaunchFailRunner {
        fn submit(&self, _: &Crystal, _: &RunConfiguration) -> Result<JobHandle> {
            Err(QsweepError::SolverLaunch {
                command: "pw.x".to_string(),
                reason: "not found".to_string(),
            })
        }
    }

    fn iron_table() -> PseudopotentialTable {
        let mut table = PseudopotentialTable::new();
        table.insert(
            "Fe".to_string(),
            PseudopotentialSpec {
                element: "Fe".to_string(),
                functional: "GGA".to_string(),
                kind: PotentialKind::Uspp,
                file_name: "Fe.UPF".to_string(),
                path: PathBuf::from("/pseudo/Fe.UPF"),
            },
        );
        table
    }

    fn controller<R: JobRunner>(runner: R, root: &std::path::Path) -> SweepController<R> {
        SweepController::new(
            StructureBuilder::hcp_iron(),
            ConfigAssembler::new("/pseudo"),
            runner,
            iron_table(),
            root,
        )
        .with_progress(false)
    }

    fn base(kind: CalculationKind, reference_volume: Option<f64>) -> BaseParameters {
        BaseParameters {
            lattice: LatticeParameters::new(3.0, 4.0),
            ecutwfc: 30.0,
            nk: 9,
            kind,
            reference_volume,
        }
    }

    fn statuses(series: &SweepSeries) -> Vec<&'static str> {
        series.points.iter().map(|p| p.outcome.status()).collect()
    }

    #[test]
    fn test_kgrid_sweep() {
        let root = tempfile::tempdir().unwrap();
        let ctrl = controller(StubRunner::default(), root.path());
        let series = ctrl.run_sweep(
            &base(CalculationKind::VcRelax, None),
            &[3.0, 5.0, 7.0],
            SubstitutionRule::KGridDensity,
        );

        assert_eq!(series.len(), 3);
        assert_eq!(
            series.points.iter().map(|p| p.abscissa).collect::<Vec<_>>(),
            vec![3.0, 5.0, 7.0]
        );
        assert_eq!(series.points[2].energy_ev(), Some(-3.0 * 13.605698066));

        let seen = ctrl.runner.submissions();
        let grids: Vec<[u32; 3]> = seen.iter().map(|s| s.grid).collect();
        assert_eq!(grids, vec![[3, 3, 3], [5, 5, 5], [7, 7, 7]]);
        assert!(seen.iter().all(|s| s.ecutwfc == Some(30.0)));
        assert!(seen.iter().all(|s| s.kind == CalculationKind::VcRelax));
    }

    #[test]
    fn test_volume_sweep_with_failed_middle_point() {
        let root = tempfile::tempdir().unwrap();
        let ctrl = controller(StubRunner::failing_on(vec![1]), root.path());
        let series = ctrl.run_sweep(
            &base(CalculationKind::Scf, Some(10.0)),
            &[0.8, 1.0, 1.2],
            SubstitutionRule::VolumeScale,
        );

        let abscissas: Vec<f64> = series.points.iter().map(|p| p.abscissa).collect();
        assert_eq!(abscissas, vec![8.0, 10.0, 12.0]);
        assert_eq!(statuses(&series), vec!["ok", "failed", "ok"]);
        assert_eq!(series.curve()[1], (10.0, None));

        let volumes: Vec<f64> = ctrl.runner.submissions().iter().map(|s| s.volume).collect();
        for (v, expected) in volumes.iter().zip([8.0, 10.0, 12.0]) {
            assert!((v - expected).abs() < 1e-9, "{} vs {}", v, expected);
        }
    }

    #[test]
    fn test_lattice_scale_abscissa() {
        let root = tempfile::tempdir().unwrap();
        let ctrl = controller(StubRunner::default(), root.path());
        let series = ctrl.run_sweep(
            &base(CalculationKind::Scf, Some(10.0)),
            &[0.5, 2.0],
            SubstitutionRule::LatticeScale,
        );
        assert_eq!(series.points[0].abscissa, 1.25);
        assert_eq!(series.points[1].abscissa, 80.0);
        assert!(series.points[1].job_name.contains("_a6.000000_c8.000000_"));
    }

    #[test]
    fn test_all_points_fail() {
        let root = tempfile::tempdir().unwrap();
        let ctrl = controller(LaunchFailRunner, root.path());
        let series = ctrl.run_sweep(
            &base(CalculationKind::Scf, None),
            &[3.0, 5.0, 7.0, 9.0],
            SubstitutionRule::KGridDensity,
        );

        assert_eq!(series.len(), 4);
        assert_eq!(series.failures(), 4);
        for point in &series.points {
            match &point.outcome {
                PointOutcome::Failed(f) => assert_eq!(f.kind, ErrorKind::SolverLaunch),
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }

    #[test]
    fn test_abort_policy_skips_remaining_points() {
        let root = tempfile::tempdir().unwrap();
        let ctrl = controller(StubRunner::failing_on(vec![1]), root.path())
            .with_policy(FailurePolicy::Abort);
        let series = ctrl.run_sweep(
            &base(CalculationKind::Scf, None),
            &[3.0, 5.0, 7.0, 9.0],
            SubstitutionRule::KGridDensity,
        );

        assert_eq!(series.len(), 4);
        assert_eq!(statuses(&series), vec!["ok", "failed", "skipped", "skipped"]);
        assert_eq!(ctrl.runner.submissions().len(), 2);
    }

    #[test]
    fn test_parallel_sweep_keeps_input_order() {
        let root = tempfile::tempdir().unwrap();
        let runner = StubRunner {
            delay_ms: 5,
            ..Default::default()
        };
        let ctrl = controller(runner, root.path()).with_jobs(4);
        let values: Vec<f64> = (1..=8).map(|n| n as f64).collect();
        let series = ctrl.run_sweep(
            &base(CalculationKind::Scf, None),
            &values,
            SubstitutionRule::KGridDensity,
        );

        let indices: Vec<usize> = series.points.iter().map(|p| p.index).collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
        assert_eq!(
            series.points.iter().map(|p| p.value).collect::<Vec<_>>(),
            values
        );
        assert_eq!(series.successes(), 8);
    }

    #[test]
    fn test_invalid_kgrid_value_creates_no_directory() {
        let root = tempfile::tempdir().unwrap();
        let ctrl = controller(StubRunner::default(), root.path());
        let series = ctrl.run_sweep(
            &base(CalculationKind::Scf, None),
            &[0.0, 2.5, 4.0],
            SubstitutionRule::KGridDensity,
        );

        assert_eq!(statuses(&series), vec!["failed", "failed", "ok"]);
        match &series.points[1].outcome {
            PointOutcome::Failed(f) => assert_eq!(f.kind, ErrorKind::InvalidSampling),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_invalid_cutoff_fails_every_point() {
        let root = tempfile::tempdir().unwrap();
        let ctrl = controller(StubRunner::default(), root.path());
        let mut params = base(CalculationKind::Scf, None);
        params.ecutwfc = -5.0;
        let series = ctrl.run_sweep(&params, &[3.0, 5.0], SubstitutionRule::KGridDensity);

        assert_eq!(series.failures(), 2);
        assert!(ctrl.runner.submissions().is_empty());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_dry_run_marks_points_skipped() {
        let root = tempfile::tempdir().unwrap();
        let runner = PwRunner::new(SolverSettings::default()).dry_run(true);
        let ctrl = controller(runner, root.path());
        let series = ctrl.run_sweep(
            &base(CalculationKind::Scf, None),
            &[3.0, 5.0],
            SubstitutionRule::KGridDensity,
        );

        assert_eq!(series.skipped(), 2);
        for point in &series.points {
            assert!(root.path().join(&point.job_name).join("pwscf.in").is_file());
        }
    }

    #[test]
    fn test_job_dir_name() {
        let naming = JobNaming::new(
            8,
            CalculationKind::VcRelax,
            SubstitutionRule::KGridDensity,
            30.0,
        );
        let lattice = LatticeParameters::new(3.0, 4.0);
        assert_eq!(
            naming.dir_name(3, "Fe2", &lattice, [7, 7, 7]),
            "p003_Fe2_vc-relax_kgrid_a3.000000_c4.000000_ecut30_k7x7x7"
        );
        assert_eq!(naming.invalid(3), "p003_invalid");
    }

    #[test]
    fn test_index_width_keeps_lexical_order() {
        assert_eq!(index_width(0), 3);
        assert_eq!(index_width(1000), 3);
        assert_eq!(index_width(1001), 4);

        let naming = JobNaming::new(
            1001,
            CalculationKind::Scf,
            SubstitutionRule::LatticeScale,
            30.0,
        );
        let lattice = LatticeParameters::new(3.0, 4.0);
        let mut names: Vec<String> = [1000, 100, 99, 7]
            .iter()
            .map(|&i| naming.dir_name(i, "Fe2", &lattice, [9, 9, 9]))
            .collect();
        names.sort();
        assert!(names[0].starts_with("p0007_"));
        assert!(names[1].starts_with("p0099_"));
        assert!(names[2].starts_with("p0100_"));
        assert!(names[3].starts_with("p1000_"));
    }

    #[test]
    fn test_different_sweeps_do_not_share_directories() {
        let root = tempfile::tempdir().unwrap();
        let runner = || PwRunner::new(SolverSettings::default()).dry_run(true);

        let kgrid = controller(runner(), root.path()).run_sweep(
            &base(CalculationKind::VcRelax, None),
            &[9.0],
            SubstitutionRule::KGridDensity,
        );
        let lattice = controller(runner(), root.path()).run_sweep(
            &base(CalculationKind::Scf, None),
            &[1.0],
            SubstitutionRule::LatticeScale,
        );

        let first = &kgrid.points[0].job_name;
        let second = &lattice.points[0].job_name;
        assert_ne!(first, second);
        assert!(first.starts_with("p000_Fe2_vc-relax_kgrid_"));
        assert!(second.starts_with("p000_Fe2_scf_lattice_"));

        let deck = fs::read_to_string(root.path().join(first).join("pwscf.in")).unwrap();
        assert!(deck.contains("vc-relax"));
        assert!(root.path().join(second).join("pwscf.in").is_file());
    }
}
