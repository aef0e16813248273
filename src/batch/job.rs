//! # 作业执行器
//!
//! 为单个扫描点准备隔离的工作目录，写入 pw.x 输入并阻塞式运行求解器。
//!
//! ## 功能
//! - 提交前校验物种与赝势，失败时不创建任何目录
//! - 同名旧目录先整体删除再重建，旧运行的残留文件不会进入新运行
//! - `<launcher> -np N <solver> -in pwscf.in`，stdout 写入 `pwscf.out`
//! - 可选超时，超时后杀死子进程
//! - 启动失败/非零退出记录在 JobHandle 中，由 `parsers/pwscf_out.rs` 转换为错误
//!
//! ## 依赖关系
//! - 被 `batch/sweep.rs` 调用
//! - 使用 `parsers/pwscf_in.rs` 生成输入
//! - 使用 `settings.rs` 的 SolverSettings

use crate::error::{QsweepError, Result};
use crate::models::{Crystal, RunConfiguration};
use crate::parsers::to_pwscf_input;
use crate::settings::SolverSettings;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 输入文件名
pub const INPUT_FILE: &str = "pwscf.in";
/// 输出文件名
pub const OUTPUT_FILE: &str = "pwscf.out";
/// 标准错误文件名
pub const ERROR_FILE: &str = "pwscf.err";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 作业状态
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// 求解器正常退出
    Completed,
    /// 仅写入输入，未运行
    Prepared,
    /// 无法启动求解器
    LaunchFailed { command: String, reason: String },
    /// 非零退出或超时
    Exited { code: Option<i32>, timed_out: bool },
}

/// 作业句柄
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    pub name: String,
    pub workdir: PathBuf,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub status: JobStatus,
}

/// 作业执行接口
pub trait JobRunner: Sync {
    /// 提交并等待作业完成
    fn submit(&self, structure: &Crystal, config: &RunConfiguration) -> Result<JobHandle>;
}

/// pw.x 子进程执行器
#[derive(Debug, Clone)]
pub struct PwRunner {
    solver: SolverSettings,
    dry_run: bool,
}

impl PwRunner {
    pub fn new(solver: SolverSettings) -> Self {
        PwRunner {
            solver,
            dry_run: false,
        }
    }

    /// 只写输入文件，不启动求解器
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 组装命令行
    fn build_command(&self, workdir: &Path) -> Result<(Command, String)> {
        let mut solver_parts = self.solver.command.split_whitespace();
        let program = solver_parts.next().ok_or_else(|| {
            QsweepError::InvalidArgument("solver command must not be empty".to_string())
        })?;

        let mut cmd = if self.solver.ncpu > 1 {
            let mut c = Command::new(&self.solver.launcher);
            c.arg("-np").arg(self.solver.ncpu.to_string()).arg(program);
            c
        } else {
            Command::new(program)
        };
        cmd.args(solver_parts);
        cmd.args(["-in", INPUT_FILE]);

        let stdout = create_file(&workdir.join(OUTPUT_FILE))?;
        let stderr = create_file(&workdir.join(ERROR_FILE))?;
        cmd.current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        let command_line = if self.solver.ncpu > 1 {
            format!(
                "{} -np {} {} -in {}",
                self.solver.launcher, self.solver.ncpu, self.solver.command, INPUT_FILE
            )
        } else {
            format!("{} -in {}", self.solver.command, INPUT_FILE)
        };

        Ok((cmd, command_line))
    }

    /// 等待子进程，超时则杀死
    fn wait(&self, child: &mut Child) -> std::io::Result<(Option<ExitStatus>, bool)> {
        let timeout = match self.solver.timeout {
            Some(t) => t,
            None => return child.wait().map(|s| (Some(s), false)),
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok((Some(status), false));
            }
            if Instant::now() >= deadline {
                child.kill().ok();
                child.wait().ok();
                return Ok((None, true));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl JobRunner for PwRunner {
    fn submit(&self, structure: &Crystal, config: &RunConfiguration) -> Result<JobHandle> {
        config.ensure_species_covered(structure)?;

        let workdir = config.output_directory.clone();
        let name = workdir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| workdir.display().to_string());

        let deck = to_pwscf_input(config, structure)?;
        prepare_workdir(&workdir)?;

        let input_path = workdir.join(INPUT_FILE);
        let output_path = workdir.join(OUTPUT_FILE);
        fs::write(&input_path, deck).map_err(|e| {
            QsweepError::FileWriteError {
                path: input_path.display().to_string(),
                source: e,
            }
        })?;

        let mut handle = JobHandle {
            name,
            workdir: workdir.clone(),
            input_path,
            output_path,
            status: JobStatus::Prepared,
        };

        debug!(
            job = %handle.name,
            formula = %structure.formula(),
            kind = %config.kind,
            ecutwfc = ?config.ecutwfc(),
            ecutrho = ?config.ecutrho(),
            kpoints = ?config.kpoints.grid,
            "input written"
        );

        if self.dry_run {
            debug!(job = %handle.name, "dry run, solver not started");
            return Ok(handle);
        }

        let (mut cmd, command_line) = self.build_command(&workdir)?;
        info!(job = %handle.name, command = %command_line, "launching solver");
        let started = Instant::now();

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                warn!(job = %handle.name, error = %e, "solver failed to start");
                handle.status = JobStatus::LaunchFailed {
                    command: command_line,
                    reason: e.to_string(),
                };
                return Ok(handle);
            }
        };

        let (status, timed_out) = self.wait(&mut child).map_err(|e| {
            QsweepError::Other(format!(
                "failed to wait for solver in {}: {}",
                workdir.display(),
                e
            ))
        })?;

        handle.status = match status {
            Some(s) if s.success() => JobStatus::Completed,
            Some(s) => JobStatus::Exited {
                code: s.code(),
                timed_out: false,
            },
            None => JobStatus::Exited {
                code: None,
                timed_out,
            },
        };

        info!(
            job = %handle.name,
            elapsed_s = started.elapsed().as_secs_f64(),
            status = ?handle.status,
            "solver finished"
        );

        Ok(handle)
    }
}

/// 获取干净的工作目录
fn prepare_workdir(workdir: &Path) -> Result<()> {
    if workdir.exists() {
        debug!(dir = %workdir.display(), "removing stale job directory");
        fs::remove_dir_all(workdir).map_err(|e| QsweepError::FileWriteError {
            path: workdir.display().to_string(),
            source: e,
        })?;
    }
    fs::create_dir_all(workdir).map_err(|e| QsweepError::FileWriteError {
        path: workdir.display().to_string(),
        source: e,
    })
}

fn create_file(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| QsweepError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::builders::{ConfigAssembler, Prototype, SpeciesPolicy, StructureBuilder};
    use crate::models::{
        CalculationKind, LatticeParameters, PotentialKind, PseudopotentialSpec,
        PseudopotentialTable,
    };
    use crate::parsers::parse_job;

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

    fn iron_job(workdir: &Path, table: &PseudopotentialTable) -> (Crystal, RunConfiguration) {
        let crystal = StructureBuilder::hcp_iron()
            .build(&LatticeParameters::new(2.46, 3.88))
            .unwrap();
        let config = ConfigAssembler::new("/pseudo")
            .assemble(CalculationKind::Scf, 30.0, [3, 3, 3], workdir, table)
            .unwrap();
        (crystal, config)
    }

    /// 以 `sh script` 方式运行假求解器
    fn fake_solver(dir: &Path, body: &str, timeout: Option<Duration>) -> PwRunner {
        let script = dir.join("fake_pw.sh");
        fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        PwRunner::new(SolverSettings {
            command: format!("sh {}", script.display()),
            launcher: "mpirun".to_string(),
            ncpu: 1,
            timeout,
        })
    }

    #[test]
    fn test_successful_run_writes_output() {
        let root = tempfile::tempdir().unwrap();
        let runner = fake_solver(
            root.path(),
            "test -f pwscf.in || exit 3\necho '!    total energy              =     -10.5 Ry'",
            None,
        );
        let workdir = root.path().join("p000_job");
        let (crystal, config) = iron_job(&workdir, &iron_table());

        let handle = runner.submit(&crystal, &config).unwrap();
        assert_eq!(handle.status, JobStatus::Completed);
        assert_eq!(handle.name, "p000_job");
        assert!(handle.input_path.is_file());

        let result = parse_job(&handle).unwrap();
        assert_eq!(result.energy_ry, -10.5);
    }

    #[test]
    fn test_nonzero_exit_is_recorded() {
        let root = tempfile::tempdir().unwrap();
        let runner = fake_solver(root.path(), "exit 7", None);
        let workdir = root.path().join("job");
        let (crystal, config) = iron_job(&workdir, &iron_table());

        let handle = runner.submit(&crystal, &config).unwrap();
        assert_eq!(
            handle.status,
            JobStatus::Exited {
                code: Some(7),
                timed_out: false
            }
        );
        assert!(matches!(
            parse_job(&handle),
            Err(QsweepError::SolverExit { code: Some(7), .. })
        ));
    }

    #[test]
    fn test_missing_executable_is_launch_failure() {
        let root = tempfile::tempdir().unwrap();
        let runner = PwRunner::new(SolverSettings {
            command: "qsweep-no-such-solver-binary".to_string(),
            launcher: "mpirun".to_string(),
            ncpu: 1,
            timeout: None,
        });
        let workdir = root.path().join("job");
        let (crystal, config) = iron_job(&workdir, &iron_table());

        let handle = runner.submit(&crystal, &config).unwrap();
        assert!(matches!(handle.status, JobStatus::LaunchFailed { .. }));
        assert!(matches!(
            parse_job(&handle),
            Err(QsweepError::SolverLaunch { .. })
        ));
    }

    #[test]
    fn test_timeout_kills_solver() {
        let root = tempfile::tempdir().unwrap();
        let runner = fake_solver(
            root.path(),
            "sleep 5",
            Some(Duration::from_millis(200)),
        );
        let workdir = root.path().join("job");
        let (crystal, config) = iron_job(&workdir, &iron_table());

        let started = Instant::now();
        let handle = runner.submit(&crystal, &config).unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(
            handle.status,
            JobStatus::Exited {
                code: None,
                timed_out: true
            }
        );
    }

    #[test]
    fn test_stale_files_do_not_leak() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("job");
        fs::create_dir_all(&workdir).unwrap();
        fs::write(workdir.join("leftover.dat"), "old").unwrap();
        fs::write(
            workdir.join(OUTPUT_FILE),
            "!    total energy              =     -99.0 Ry\n",
        )
        .unwrap();

        let runner = fake_solver(root.path(), "exit 0", None);
        let (crystal, config) = iron_job(&workdir, &iron_table());
        let handle = runner.submit(&crystal, &config).unwrap();

        assert!(!workdir.join("leftover.dat").exists());
        assert_eq!(handle.status, JobStatus::Completed);
        assert!(matches!(
            parse_job(&handle),
            Err(QsweepError::ParseError { .. })
        ));
    }

    #[test]
    fn test_missing_pseudopotential_creates_nothing() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("job");
        let (crystal, config) = iron_job(&workdir, &PseudopotentialTable::new());

        let runner = fake_solver(root.path(), "exit 0", None);
        let result = runner.submit(&crystal, &config);
        assert!(matches!(
            result,
            Err(QsweepError::MissingPseudopotential { .. })
        ));
        assert!(!workdir.exists());
    }

    #[test]
    fn test_unknown_element_creates_nothing() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("job");
        let mut table = iron_table();
        let mut spec = table["Fe"].clone();
        spec.element = "Xx".to_string();
        table.insert("Xx".to_string(), spec);

        let crystal = StructureBuilder::new(Prototype::Hcp, SpeciesPolicy::Uniform("Xx".into()))
            .build(&LatticeParameters::new(2.46, 3.88))
            .unwrap();
        let config = ConfigAssembler::new("/pseudo")
            .assemble(CalculationKind::Scf, 30.0, [3, 3, 3], &workdir, &table)
            .unwrap();

        let runner = fake_solver(root.path(), "exit 0", None);
        assert!(matches!(
            runner.submit(&crystal, &config),
            Err(QsweepError::InvalidBasis(_))
        ));
        assert!(!workdir.exists());
    }

    #[test]
    fn test_dry_run_only_writes_input() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("job");
        let (crystal, config) = iron_job(&workdir, &iron_table());

        let runner = fake_solver(root.path(), "exit 9", None).dry_run(true);
        let handle = runner.submit(&crystal, &config).unwrap();
        assert_eq!(handle.status, JobStatus::Prepared);
        assert!(handle.input_path.is_file());
        assert!(!handle.output_path.exists());
    }
}
