//! # 扫描曲线图
//!
//! 使用 `plotters` 绘制 能量-扫描参数 曲线（k 点收敛或状态方程）。
//!
//! ## 功能
//! - 成功点按输入顺序连线并标记
//! - 失败点以灰色叉号画在图底部，与“能量为 0”区分
//! - 坐标轴标题随扫描规则变化
//! - 支持 PNG 和 SVG 输出
//!
//! ## 依赖关系
//! - 被 `commands/sweep.rs`, `commands/collect.rs` 调用
//! - 使用 `models/sweep.rs`
//! - 使用 `plotters` 渲染图表

use crate::error::{QsweepError, Result};
use crate::models::{PointOutcome, SweepSeries};

use plotters::prelude::*;
use std::path::Path;

/// 图表选项
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl PlotOptions {
    pub fn for_series(series: &SweepSeries) -> Self {
        PlotOptions {
            title: series.rule.title().to_string(),
            width: 900,
            height: 600,
        }
    }
}

/// 生成曲线图，扩展名为 `.svg` 时输出 SVG
pub fn generate_curve_plot(
    series: &SweepSeries,
    output_path: &Path,
    options: &PlotOptions,
) -> Result<()> {
    let data: Vec<(f64, f64)> = series
        .points
        .iter()
        .filter_map(|p| p.energy_ev().map(|e| (p.abscissa, e)))
        .filter(|(x, _)| x.is_finite())
        .collect();

    if data.is_empty() {
        return Err(QsweepError::Other(
            "No successful points to plot".to_string(),
        ));
    }

    let failed: Vec<f64> = series
        .points
        .iter()
        .filter(|p| matches!(p.outcome, PointOutcome::Failed(_)))
        .map(|p| p.abscissa)
        .filter(|x| x.is_finite())
        .collect();

    let use_svg = output_path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    let size = (options.width, options.height);
    if use_svg {
        let root = SVGBackend::new(output_path, size).into_drawing_area();
        draw_curve(&root, series, &data, &failed, &options.title)?;
        root.present()
            .map_err(|e| QsweepError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, size).into_drawing_area();
        draw_curve(&root, series, &data, &failed, &options.title)?;
        root.present()
            .map_err(|e| QsweepError::Other(e.to_string()))?;
    }
    Ok(())
}

/// 坐标范围，单点时左右各留 1 个单位
fn padded_range(values: impl Iterator<Item = f64> + Clone, fraction: f64) -> (f64, f64) {
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    if span.abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        (min - span * fraction, max + span * fraction)
    }
}

fn draw_curve<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    series: &SweepSeries,
    data: &[(f64, f64)],
    failed: &[f64],
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| QsweepError::Other(format!("{:?}", e)))?;

    let (x_min, x_max) = padded_range(
        data.iter().map(|(x, _)| *x).chain(failed.iter().copied()),
        0.05,
    );
    let (y_min, y_max) = padded_range(data.iter().map(|(_, y)| *y), 0.1);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| QsweepError::Other(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .x_desc(series.rule.axis_label())
        .y_desc("Total energy (eV)")
        .y_label_formatter(&|y| format!("{:.4}", y))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(|e| QsweepError::Other(format!("{:?}", e)))?;

    let line_color = RGBColor(0, 102, 204);
    chart
        .draw_series(LineSeries::new(
            data.iter().copied(),
            line_color.stroke_width(2),
        ))
        .map_err(|e| QsweepError::Other(format!("{:?}", e)))?;

    chart
        .draw_series(
            data.iter()
                .map(|&(x, y)| Circle::new((x, y), 5, line_color.filled())),
        )
        .map_err(|e| QsweepError::Other(format!("{:?}", e)))?
        .label("Total energy")
        .legend(move |(x, y)| Circle::new((x + 10, y), 5, line_color.filled()));

    // 标记最低点
    if let Some(&(min_x, min_y)) = data
        .iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    {
        chart
            .draw_series(std::iter::once(Circle::new(
                (min_x, min_y),
                8,
                GREEN.filled(),
            )))
            .map_err(|e| QsweepError::Other(format!("{:?}", e)))?
            .label("Minimum")
            .legend(|(x, y)| Circle::new((x + 10, y), 5, GREEN.filled()));
    }

    if !failed.is_empty() {
        let baseline = y_min + (y_max - y_min) * 0.03;
        chart
            .draw_series(
                failed
                    .iter()
                    .map(|&x| Cross::new((x, baseline), 6, BLACK.mix(0.4).stroke_width(2))),
            )
            .map_err(|e| QsweepError::Other(format!("{:?}", e)))?
            .label("Failed")
            .legend(|(x, y)| Cross::new((x + 10, y), 5, BLACK.mix(0.4)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| QsweepError::Other(format!("{:?}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{PointFailure, SubstitutionRule, SweepPoint};

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range([2.0, 4.0].into_iter(), 0.5), (1.0, 5.0));
        assert_eq!(padded_range([3.0].into_iter(), 0.1), (2.0, 4.0));
    }

    #[test]
    fn test_plot_requires_successful_points() {
        let series = SweepSeries::new(
            SubstitutionRule::KGridDensity,
            vec![SweepPoint {
                index: 0,
                value: 3.0,
                abscissa: 3.0,
                job_name: "p000".to_string(),
                outcome: PointOutcome::Failed(PointFailure {
                    kind: ErrorKind::SolverExit,
                    message: "exit status 1".to_string(),
                }),
            }],
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.png");
        let result = generate_curve_plot(&series, &path, &PlotOptions::for_series(&series));
        assert!(result.is_err());
        assert!(!path.exists());
    }
}
