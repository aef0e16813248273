//! # 扫描结果导出
//!
//! 将扫描序列写为 CSV。每个输入值一行、顺序不变；失败点的能量列留空，
//! 状态列为 `failed`，绝不写成 0。
//!
//! ## 依赖关系
//! - 被 `commands/sweep.rs`, `commands/collect.rs` 调用
//! - 使用 `csv` + `serde` 写入

use crate::error::{QsweepError, Result};
use crate::models::{PointOutcome, SweepSeries};

use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// CSV 行
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    index: usize,
    value: f64,
    abscissa: f64,
    energy_ry: Option<f64>,
    energy_ev: Option<f64>,
    pressure_kbar: Option<f64>,
    status: &'static str,
    message: &'a str,
}

/// 写入任意输出流
pub fn write_csv<W: Write>(series: &SweepSeries, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for p in &series.points {
        let result = p.result();
        let message = match &p.outcome {
            PointOutcome::Failed(f) => f.message.as_str(),
            _ => "",
        };
        wtr.serialize(CsvRow {
            index: p.index,
            value: p.value,
            abscissa: p.abscissa,
            energy_ry: result.map(|r| r.energy_ry),
            energy_ev: result.map(|r| r.energy_ev),
            pressure_kbar: result.and_then(|r| r.pressure_kbar),
            status: p.outcome.status(),
            message,
        })?;
    }

    wtr.flush()
        .map_err(|e| QsweepError::Other(format!("failed to flush CSV output: {}", e)))?;
    Ok(())
}

/// 保存到文件
pub fn save_csv(series: &SweepSeries, output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path).map_err(|e| QsweepError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;
    write_csv(series, file)
}
