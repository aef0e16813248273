//! # 统一错误处理模块
//!
//! 定义 qsweep 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分层
//! - 校验错误（晶格、k 点、截断能、赝势）：在启动任何外部进程之前抛出
//! - 执行错误（求解器启动/退出）：局限于单个扫描点
//! - 解析错误：局限于单个扫描点
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use serde::Serialize;
use thiserror::Error;

/// qsweep 统一错误类型
#[derive(Error, Debug)]
pub enum QsweepError {
    // ─────────────────────────────────────────────────────────────
    // 校验错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid lattice: {0}")]
    InvalidLattice(String),

    #[error("Invalid basis: {0}")]
    InvalidBasis(String),

    #[error("Invalid k-point sampling: {0}")]
    InvalidSampling(String),

    #[error("Invalid cutoff energy: {0}")]
    InvalidCutoff(String),

    #[error("Missing pseudopotential for species: {}", .species.join(", "))]
    MissingPseudopotential { species: Vec<String> },

    // ─────────────────────────────────────────────────────────────
    // 外部求解器错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to launch solver '{command}': {reason}")]
    SolverLaunch { command: String, reason: String },

    #[error("Solver exited abnormally in {workdir}: {}", describe_exit(.code, .timed_out))]
    SolverExit {
        workdir: String,
        code: Option<i32>,
        timed_out: bool,
    },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} output: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

fn describe_exit(code: &Option<i32>, timed_out: &bool) -> String {
    match (*timed_out, *code) {
        (true, _) => "timed out and was killed".to_string(),
        (false, Some(c)) => format!("exit status {}", c),
        (false, None) => "terminated by signal".to_string(),
    }
}

/// 错误类别，用于在扫描序列中记录失败点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidLattice,
    InvalidSampling,
    InvalidCutoff,
    MissingPseudopotential,
    SolverLaunch,
    SolverExit,
    Parse,
    Io,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidLattice => "invalid-lattice",
            ErrorKind::InvalidSampling => "invalid-sampling",
            ErrorKind::InvalidCutoff => "invalid-cutoff",
            ErrorKind::MissingPseudopotential => "missing-pseudopotential",
            ErrorKind::SolverLaunch => "solver-launch",
            ErrorKind::SolverExit => "solver-exit",
            ErrorKind::Parse => "parse",
            ErrorKind::Io => "io",
            ErrorKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

impl QsweepError {
    /// 错误所属类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            QsweepError::InvalidLattice(_) | QsweepError::InvalidBasis(_) => {
                ErrorKind::InvalidLattice
            }
            QsweepError::InvalidSampling(_) => ErrorKind::InvalidSampling,
            QsweepError::InvalidCutoff(_) => ErrorKind::InvalidCutoff,
            QsweepError::MissingPseudopotential { .. } => ErrorKind::MissingPseudopotential,
            QsweepError::SolverLaunch { .. } => ErrorKind::SolverLaunch,
            QsweepError::SolverExit { .. } => ErrorKind::SolverExit,
            QsweepError::ParseError { .. } => ErrorKind::Parse,
            QsweepError::FileReadError { .. }
            | QsweepError::FileWriteError { .. }
            | QsweepError::DirectoryNotFound { .. }
            | QsweepError::FileNotFound { .. }
            | QsweepError::CsvError(_) => ErrorKind::Io,
            QsweepError::InvalidArgument(_) | QsweepError::Other(_) => ErrorKind::Other,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, QsweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_exit_message() {
        let err = QsweepError::SolverExit {
            workdir: "/tmp/job".to_string(),
            code: Some(3),
            timed_out: false,
        };
        assert!(err.to_string().contains("exit status 3"));
        assert_eq!(err.kind(), ErrorKind::SolverExit);

        let err = QsweepError::SolverExit {
            workdir: "/tmp/job".to_string(),
            code: None,
            timed_out: true,
        };
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_missing_pseudopotential_lists_species() {
        let err = QsweepError::MissingPseudopotential {
            species: vec!["Co".to_string(), "Ni".to_string()],
        };
        assert_eq!(err.to_string(), "Missing pseudopotential for species: Co, Ni");
        assert_eq!(err.kind(), ErrorKind::MissingPseudopotential);
    }
}
