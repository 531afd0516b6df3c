//! SVG charts.
//!
//! Two chart types are rendered with plotters' SVG backend:
//!
//! - a multi-series line chart of adjusted prices over the full history
//! - a per-stock scatter of monthly stock returns against monthly index
//!   returns, with the least-squares line drawn through it

use bilbao_data::PriceSeries;
use bilbao_regression::ols;
use chrono::NaiveDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while rendering a chart.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Nothing to plot.
    #[error("No data to chart: {0}")]
    NoData(String),

    /// Drawing backend error.
    #[error("Chart rendering error: {0}")]
    Plot(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for ChartError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        Self::Plot(err.to_string())
    }
}

/// Result type for chart rendering.
pub type Result<T> = std::result::Result<T, ChartError>;

/// Chart dimensions in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChartConfig {
    /// Width of the price chart.
    pub price_width: u32,
    /// Height of the price chart.
    pub price_height: u32,
    /// Side length of the square scatter charts.
    pub scatter_size: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            price_width: 1000,
            price_height: 600,
            scatter_size: 700,
        }
    }
}

/// Padded `[min, max]` of finite values, widened if the range is degenerate.
fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        min.abs().max(1.0) * 0.05
    };
    Some((min - pad, max + pad))
}

fn draw_price_chart(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    series: &[&PriceSeries],
    title: &str,
) -> Result<()> {
    let first = series.iter().filter_map(|s| s.first_date()).min();
    let last = series.iter().filter_map(|s| s.last_date()).max();
    let (Some(first), Some(last)) = (first, last) else {
        return Err(ChartError::NoData("price history is empty".to_string()));
    };
    let last = if last > first {
        last
    } else {
        first.succ_opt().unwrap_or(first)
    };
    let (y_min, y_max) = padded_range(series.iter().flat_map(|s| s.iter().map(|(_, p)| p)))
        .ok_or_else(|| ChartError::NoData("price history is empty".to_string()))?;

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(first..last, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Adjusted Price")
        .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
        .draw()?;

    for (idx, prices) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(prices.iter(), color.stroke_width(2)))?
            .label(prices.symbol())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Render the price development chart for the given series.
pub fn render_price_chart(
    path: &Path,
    series: &[&PriceSeries],
    config: &ChartConfig,
) -> Result<()> {
    let root =
        SVGBackend::new(path, (config.price_width, config.price_height)).into_drawing_area();
    draw_price_chart(&root, series, "Price Development of Assigned Stocks")?;
    debug!(path = %path.display(), series = series.len(), "rendered price chart");
    Ok(())
}

fn draw_scatter_chart(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    stock: &str,
    index: &str,
    points: &[(f64, f64)],
) -> Result<()> {
    let (x_min, x_max) = padded_range(points.iter().map(|(x, _)| *x))
        .ok_or_else(|| ChartError::NoData(format!("no paired returns for {stock}")))?;
    let (y_min, y_max) = padded_range(points.iter().map(|(_, y)| *y))
        .ok_or_else(|| ChartError::NoData(format!("no paired returns for {stock}")))?;

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("{stock} vs {index} Monthly Returns"),
            ("sans-serif", 20),
        )
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(index)
        .y_desc(stock)
        .draw()?;

    let point_color = Palette99::pick(0).to_rgba();
    chart.draw_series(
        points
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 4, point_color.mix(0.6).filled())),
    )?;

    let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
    let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
    match ols::fit_with_intercept(&ys, &[&xs]) {
        Ok(fit) => {
            let (a, b) = (fit.coefficients[0], fit.coefficients[1]);
            let line_color = Palette99::pick(1).to_rgba();
            chart.draw_series(LineSeries::new(
                [x_min, x_max].map(|x| (x, a + b * x)),
                line_color.stroke_width(2),
            ))?;
        }
        Err(e) => debug!(stock, error = %e, "skipping regression line"),
    }

    root.present()?;
    Ok(())
}

/// Render a scatter of stock returns (y) against index returns (x).
///
/// # Arguments
/// * `points` - `(index_return, stock_return)` pairs
pub fn render_scatter_chart(
    path: &Path,
    stock: &str,
    index: &str,
    points: &[(f64, f64)],
    config: &ChartConfig,
) -> Result<()> {
    let size = (config.scatter_size, config.scatter_size);
    let root = SVGBackend::new(path, size).into_drawing_area();
    draw_scatter_chart(&root, stock, index, points)?;
    debug!(path = %path.display(), stock, points = points.len(), "rendered scatter chart");
    Ok(())
}
