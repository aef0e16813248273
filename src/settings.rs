//! # 运行设置
//!
//! 进程级、启动时一次性解析的只读设置：赝势根目录、工作根目录、求解器命令、
//! 并行进程数、超时以及已解析的赝势表。
//!
//! 赝势根目录或具体文件缺失属于启动期配置错误，而不是单个作业的错误。
//!
//! ## 依赖关系
//! - 被 `commands/` 构造
//! - 被 `batch/job.rs`, `batch/sweep.rs` 以引用方式使用
//! - 使用 `models/config.rs`

use crate::error::{QsweepError, Result};
use crate::models::{PotentialKind, PseudopotentialSpec, PseudopotentialTable};

use std::path::{Path, PathBuf};
use std::time::Duration;

/// 求解器调用设置
#[derive(Debug, Clone, PartialEq)]
pub struct SolverSettings {
    /// pw.x 可执行文件
    pub command: String,
    /// MPI 启动器（ncpu > 1 时使用）
    pub launcher: String,
    /// 每个作业的 MPI 进程数
    pub ncpu: u32,
    /// 单个作业的超时
    pub timeout: Option<Duration>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            command: "pw.x".to_string(),
            launcher: "mpirun".to_string(),
            ncpu: 2,
            timeout: None,
        }
    }
}

/// 全局只读设置
#[derive(Debug, Clone)]
pub struct Settings {
    pub potentials_root: PathBuf,
    /// 所有作业目录的父目录
    pub work_root: PathBuf,
    pub solver: SolverSettings,
    pub pseudopotentials: PseudopotentialTable,
}

impl Settings {
    /// 解析并校验设置
    ///
    /// `pseudo_specs` 形如 `Fe=Fe.pbe-nd-rrkjus.UPF[:kind[:functional]]`。
    pub fn resolve(
        potentials_root: &Path,
        work_root: &Path,
        solver: SolverSettings,
        pseudo_specs: &[String],
    ) -> Result<Self> {
        if !potentials_root.is_dir() {
            return Err(QsweepError::DirectoryNotFound {
                path: potentials_root.display().to_string(),
            });
        }
        if solver.ncpu == 0 {
            return Err(QsweepError::InvalidArgument(
                "ncpu must be at least 1".to_string(),
            ));
        }
        if solver.command.trim().is_empty() {
            return Err(QsweepError::InvalidArgument(
                "solver command must not be empty".to_string(),
            ));
        }

        let mut pseudopotentials = PseudopotentialTable::new();
        for raw in pseudo_specs {
            let spec = parse_pseudo_spec(raw, potentials_root)?;
            if !spec.path.is_file() {
                return Err(QsweepError::FileNotFound {
                    path: spec.path.display().to_string(),
                });
            }
            pseudopotentials.insert(spec.element.clone(), spec);
        }

        Ok(Settings {
            potentials_root: potentials_root.to_path_buf(),
            work_root: work_root.to_path_buf(),
            solver,
            pseudopotentials,
        })
    }
}

/// 解析单个赝势描述
pub fn parse_pseudo_spec(raw: &str, potentials_root: &Path) -> Result<PseudopotentialSpec> {
    let (element, rest) = raw.split_once('=').ok_or_else(|| {
        QsweepError::InvalidArgument(format!(
            "pseudopotential '{}' must look like EL=FILE[:kind[:functional]]",
            raw
        ))
    })?;

    let element = element.trim();
    if element.is_empty() {
        return Err(QsweepError::InvalidArgument(format!(
            "missing element in pseudopotential '{}'",
            raw
        )));
    }

    let mut parts = rest.split(':').map(str::trim);
    let file_name = parts.next().filter(|s| !s.is_empty()).ok_or_else(|| {
        QsweepError::InvalidArgument(format!("missing file name in pseudopotential '{}'", raw))
    })?;
    let kind = match parts.next() {
        Some(k) if !k.is_empty() => k.parse::<PotentialKind>()?,
        _ => PotentialKind::Uspp,
    };
    let functional = parts
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("GGA")
        .to_string();

    Ok(PseudopotentialSpec {
        element: element.to_string(),
        functional,
        kind,
        file_name: file_name.to_string(),
        path: potentials_root.join(file_name),
    })
}
