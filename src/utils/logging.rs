//! # 诊断日志
//!
//! 基于 `tracing-subscriber` 的日志初始化：stderr 紧凑输出，可选写入日志文件。
//! `RUST_LOG` 存在时优先于命令行的详细级别。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `tracing-subscriber` crate

use crate::error::{QsweepError, Result};

use std::fs::File;
use std::path::Path;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// 详细级别对应的日志级别
pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// 初始化全局日志
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity, quiet).into())
        .from_env_lossy();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path).map_err(|e| QsweepError::FileWriteError {
                path: path.display().to_string(),
                source: e,
            })?;
            Some(
                fmt::layer()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_thread_ids(true)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| QsweepError::Other(format!("failed to initialise logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info_span};

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0, false), LevelFilter::WARN);
        assert_eq!(level_for(1, false), LevelFilter::INFO);
        assert_eq!(level_for(2, false), LevelFilter::DEBUG);
        assert_eq!(level_for(7, false), LevelFilter::TRACE);
        assert_eq!(level_for(3, true), LevelFilter::OFF);
    }

    #[test]
    fn test_file_layer_records_fields() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("sweep.log");

        let file = File::create(&log_path).unwrap();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true),
        );

        tracing::subscriber::with_default(subscriber, || {
            let _span = info_span!("point", index = 3).entered();
            debug!(job = "p003", "point finished");
        });

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("point finished"));
        assert!(content.contains("job=\"p003\""));
        assert!(content.contains("index=3"));
    }

    #[test]
    fn test_invalid_log_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = setup_logging(0, true, Some(&dir.path().join("missing").join("x.log")));
        assert!(matches!(result, Err(QsweepError::FileWriteError { .. })));
    }
}
