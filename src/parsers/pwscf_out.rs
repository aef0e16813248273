//! # pw.x 输出解析器
//!
//! 解析 pw.x 标准输出，提取总能（必需）以及应力、力、压力、体积等（可选）。
//!
//! ## 约定
//! - 总能取最后一个 `!    total energy` 行（弛豫计算中即最终结构的能量）
//! - 缺少总能或无法解析时返回 `ParseError`，与求解器退出错误区分
//!
//! ## 依赖关系
//! - 被 `batch/sweep.rs`, `commands/collect.rs` 使用
//! - 使用 `batch/job.rs` 的 JobHandle
//! - 使用 `models/calculation.rs`

use crate::batch::job::{JobHandle, JobStatus};
use crate::error::{QsweepError, Result};
use crate::models::calculation::{BOHR_TO_ANGSTROM, RY_TO_EV};
use crate::models::SolverResult;

use regex::Regex;
use std::fs;
use std::path::Path;

const FORMAT: &str = "pw.x";

/// 解析作业句柄指向的输出
pub fn parse_job(handle: &JobHandle) -> Result<SolverResult> {
    match &handle.status {
        JobStatus::Completed => parse_pwscf_output(&handle.output_path),
        JobStatus::Prepared => Err(QsweepError::Other(format!(
            "job {} was prepared but never run",
            handle.name
        ))),
        JobStatus::LaunchFailed { command, reason } => Err(QsweepError::SolverLaunch {
            command: command.clone(),
            reason: reason.clone(),
        }),
        JobStatus::Exited { code, timed_out } => Err(QsweepError::SolverExit {
            workdir: handle.workdir.display().to_string(),
            code: *code,
            timed_out: *timed_out,
        }),
    }
}

/// 解析 pw.x 输出文件
pub fn parse_pwscf_output(path: &Path) -> Result<SolverResult> {
    let content = fs::read_to_string(path).map_err(|e| QsweepError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_pwscf_content(&content, &path.display().to_string())
}

/// 从文本内容解析
pub fn parse_pwscf_content(content: &str, source_name: &str) -> Result<SolverResult> {
    let energy_line = content
        .lines()
        .filter(|l| l.trim_start().starts_with('!') && l.contains("total energy"))
        .last()
        .ok_or_else(|| QsweepError::ParseError {
            format: FORMAT.to_string(),
            path: source_name.to_string(),
            reason: "total energy marker not found".to_string(),
        })?;

    let energy_ry = extract_value_after_eq(energy_line)
        .filter(|e| e.is_finite())
        .ok_or_else(|| QsweepError::ParseError {
            format: FORMAT.to_string(),
            path: source_name.to_string(),
            reason: format!("cannot read energy from '{}'", energy_line.trim()),
        })?;

    let mut result = SolverResult::from_energy_ry(energy_ry);

    for line in content.lines() {
        let trimmed = line.trim_start();

        // "Total force =     0.001234     Total SCF correction =     0.000012"
        if trimmed.starts_with("Total force") {
            if let Some(f) = extract_value_after_eq(line) {
                result.total_force = Some(f * RY_TO_EV / BOHR_TO_ANGSTROM);
            }
        }

        // "unit-cell volume          =     147.5036 (a.u.)^3"
        // "new unit-cell volume =     73.72361 a.u.^3 (    10.92465 Ang^3 )"
        if trimmed.starts_with("unit-cell volume") || trimmed.starts_with("new unit-cell volume")
        {
            if let Some(v) = extract_value_after_eq(line) {
                result.cell_volume_bohr3 = Some(v);
            }
        }

        // "iteration #  7     ecut=    30.00 Ry     beta= 0.50"
        if trimmed.starts_with("iteration #") {
            if let Some(n) = trimmed
                .trim_start_matches("iteration #")
                .split_whitespace()
                .next()
                .and_then(|s| s.parse::<u32>().ok())
            {
                result.scf_iterations = Some(n);
            }
        }

        // "PWSCF        :      1.23s CPU      1.50s WALL"
        if trimmed.starts_with("PWSCF") && line.contains("WALL") {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if let Some(idx) = tokens.iter().position(|&t| t == "WALL") {
                if idx > 0 {
                    result.wall_time_seconds = parse_time_string(tokens[idx - 1]);
                }
            }
        }
    }

    result.forces = parse_forces(content);
    if let Some((stress, pressure)) = parse_stress(content) {
        result.stress_kbar = Some(stress);
        result.pressure_kbar = Some(pressure);
    }

    result.converged = (content.contains("convergence has been achieved")
        || content.contains("End of BFGS Geometry Optimization"))
        && !content.contains("convergence NOT achieved");

    Ok(result)
}

/// 最后一个力块中的原子受力 (Ry/bohr)
fn parse_forces(content: &str) -> Option<Vec<[f64; 3]>> {
    let start = content.rfind("Forces acting on atoms")?;
    let re = Regex::new(
        r"atom\s+\d+\s+type\s+\d+\s+force\s+=\s+(-?[\d.]+)\s+(-?[\d.]+)\s+(-?[\d.]+)",
    )
    .ok()?;

    let mut forces = Vec::new();
    for line in content[start..].lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match re.captures(line) {
            Some(cap) => forces.push([
                cap.get(1)?.as_str().parse().ok()?,
                cap.get(2)?.as_str().parse().ok()?,
                cap.get(3)?.as_str().parse().ok()?,
            ]),
            None => break,
        }
    }

    if forces.is_empty() {
        None
    } else {
        Some(forces)
    }
}

/// 最后一个应力块：(kbar 张量, 压力 kbar)
fn parse_stress(content: &str) -> Option<([[f64; 3]; 3], f64)> {
    let start = content.rfind("total   stress")?;
    let mut lines = content[start..].lines();

    let header = lines.next()?;
    let pressure = header
        .split("P=")
        .nth(1)?
        .split_whitespace()
        .next()?
        .parse::<f64>()
        .ok()?;

    let mut tensor = [[0.0; 3]; 3];
    for row in tensor.iter_mut() {
        let values: Vec<f64> = lines
            .next()?
            .split_whitespace()
            .filter_map(|t| t.parse::<f64>().ok())
            .collect();
        if values.len() < 6 {
            return None;
        }
        row.copy_from_slice(&values[3..6]);
    }

    Some((tensor, pressure))
}

/// 提取等号后的数值
fn extract_value_after_eq(s: &str) -> Option<f64> {
    let pos = s.find('=')?;
    s[pos + 1..].split_whitespace().next()?.parse().ok()
}

/// 解析 "1h 2m 3.4s" / "1m23.45s" / "0.52s" 为秒
fn parse_time_string(s: &str) -> Option<f64> {
    let re = Regex::new(r"(?:(\d+)h)?\s*(?:(\d+)m)?\s*(?:([\d.]+)s)?").ok()?;
    let cap = re.captures(s)?;

    let hours = cap.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
    let minutes = cap.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
    let seconds = cap.get(3).and_then(|m| m.as_str().parse::<f64>().ok());

    if hours.is_none() && minutes.is_none() && seconds.is_none() {
        return None;
    }
    Some(hours.unwrap_or(0.0) * 3600.0 + minutes.unwrap_or(0.0) * 60.0 + seconds.unwrap_or(0.0))
}
