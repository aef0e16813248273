//! # 终端表格
//!
//! 将扫描序列渲染为 `tabled` 表格，失败点显示失败类型而不是能量。
//!
//! ## 依赖关系
//! - 被 `commands/sweep.rs`, `commands/collect.rs` 调用
//! - 使用 `models/sweep.rs`

use crate::models::{PointOutcome, SweepSeries};

use tabled::{Table, Tabled};

/// 表格行
#[derive(Debug, Clone, Tabled)]
struct CurveRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Abscissa")]
    abscissa: String,
    #[tabled(rename = "Energy (eV)")]
    energy: String,
    #[tabled(rename = "ΔE (meV)")]
    delta: String,
    #[tabled(rename = "P (kbar)")]
    pressure: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// 渲染扫描表格
pub fn render_table(series: &SweepSeries) -> String {
    let min_energy = series.min_energy();

    let rows: Vec<CurveRow> = series
        .points
        .iter()
        .map(|p| {
            let (energy, delta) = match (p.energy_ev(), min_energy) {
                (Some(e), Some(min)) => (format!("{:.6}", e), format!("{:.2}", (e - min) * 1000.0)),
                _ => ("-".to_string(), "-".to_string()),
            };
            let status = match &p.outcome {
                PointOutcome::Failed(f) => format!("failed ({})", f.kind),
                other => other.status().to_string(),
            };
            let pressure = p
                .result()
                .and_then(|r| r.pressure_kbar)
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string());
            CurveRow {
                index: p.index,
                value: format!("{}", p.value),
                abscissa: format!("{:.4}", p.abscissa),
                energy,
                delta,
                pressure,
                status,
            }
        })
        .collect();

    Table::new(&rows).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{PointFailure, SolverResult, SubstitutionRule, SweepPoint};

    #[test]
    fn test_failed_points_have_no_energy() {
        let series = SweepSeries::new(
            SubstitutionRule::KGridDensity,
            vec![
                SweepPoint {
                    index: 0,
                    value: 3.0,
                    abscissa: 3.0,
                    job_name: "p000".to_string(),
                    outcome: PointOutcome::Success(SolverResult::from_energy_ry(-1.0)),
                },
                SweepPoint {
                    index: 1,
                    value: 5.0,
                    abscissa: 5.0,
                    job_name: "p001".to_string(),
                    outcome: PointOutcome::Failed(PointFailure {
                        kind: ErrorKind::SolverExit,
                        message: "exit status 1".to_string(),
                    }),
                },
            ],
        );

        let table = render_table(&series);
        assert!(table.contains("Energy (eV)"));
        assert!(table.contains("-13.605698"));
        assert!(table.contains("failed (solver-exit)"));
        assert!(table.contains("0.00"));
    }
}
