use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error as StdError;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::table::{CorrelationTable, PriceTable, ReturnsTable};

type DrawResult = std::result::Result<(), Box<dyn StdError>>;

const UNDEFINED_CELL: RGBColor = RGBColor(200, 200, 200);

/// One line per ticker over time.
pub fn plot_prices(prices: &PriceTable, output_path: &Path) -> Result<()> {
    finish(draw_prices(prices, output_path), output_path)
}

/// One box per ticker showing the spread of its daily returns.
pub fn plot_return_distribution(returns: &ReturnsTable, output_path: &Path) -> Result<()> {
    finish(draw_return_distribution(returns, output_path), output_path)
}

/// Annotated heatmap of the correlation table; values are rounded to two
/// decimals for display only.
pub fn plot_correlation_heatmap(corr: &CorrelationTable, output_path: &Path) -> Result<()> {
    finish(draw_correlation_heatmap(corr, output_path), output_path)
}

fn finish(drawn: DrawResult, output_path: &Path) -> Result<()> {
    drawn.map_err(|e| Error::Render {
        path: output_path.to_path_buf(),
        message: e.to_string(),
    })?;
    info!("Chart saved to file: {}", output_path.display());
    Ok(())
}

fn draw_prices(prices: &PriceTable, output_path: &Path) -> DrawResult {
    let caption = "Stock Prices Over Time";
    let root = BitMapBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    if prices.is_empty() {
        return draw_placeholder(&root, caption);
    }

    let dates = prices.index();
    let (y_min, y_max) = padded_range(prices.values().iter().copied(), 0.05);
    let x_max = (dates.len() - 1).max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|i| date_label(dates, *i))
        .x_desc("Date")
        .y_desc("Adjusted Close Price")
        .draw()?;

    for (j, ticker) in prices.columns().iter().enumerate() {
        let color = Palette99::pick(j).to_rgba();
        let points = prices
            .values()
            .column(j)
            .iter()
            .enumerate()
            .map(|(i, &p)| (i, p))
            .collect::<Vec<_>>();
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(ticker.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_return_distribution(returns: &ReturnsTable, output_path: &Path) -> DrawResult {
    let caption = "Return Distributions";
    let root = BitMapBackend::new(output_path, (800, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    // Undefined returns cannot be placed on an axis; they are left out of
    // the picture only.
    let series: Vec<Vec<f64>> = (0..returns.ncols())
        .map(|j| {
            returns
                .values()
                .column(j)
                .iter()
                .copied()
                .filter(|r| r.is_finite())
                .collect()
        })
        .collect();
    if returns.is_empty() || series.iter().all(Vec::is_empty) {
        return draw_placeholder(&root, caption);
    }

    let labels = returns.columns();
    let (y_min, y_max) = padded_range(series.iter().flatten().copied(), 0.1);

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..labels.len()).into_segmented(),
            y_min as f32..y_max as f32,
        )?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                labels.get(*i).cloned().unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        })
        .y_desc("Daily Return")
        .draw()?;

    chart.draw_series(
        series
            .iter()
            .enumerate()
            .filter(|(_, values)| !values.is_empty())
            .map(|(i, values)| {
                let quartiles = Quartiles::new(values);
                Boxplot::new_vertical(SegmentValue::CenterOf(i), &quartiles)
                    .width(30)
                    .whisker_width(0.5)
                    .style(Palette99::pick(i))
            }),
    )?;

    root.present()?;
    Ok(())
}

fn draw_correlation_heatmap(corr: &CorrelationTable, output_path: &Path) -> DrawResult {
    let caption = "Correlation Matrix";
    let root = BitMapBackend::new(output_path, (700, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    if corr.is_empty() {
        return draw_placeholder(&root, caption);
    }

    let n = corr.ncols();
    let labels = corr.columns();
    // Cell centres sit on integer coordinates; the first ticker is the top row.
    let span = -0.5..(n as f64 - 0.5);

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(span.clone(), span)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|x| axis_label(labels, *x, false))
        .y_label_formatter(&|y| axis_label(labels, *y, true))
        .draw()?;

    let values = corr.values();
    let cells = (0..n).flat_map(|i| (0..n).map(move |j| (i, j)));

    chart.draw_series(cells.clone().map(|(i, j)| {
        let (x, y) = (j as f64, (n - 1 - i) as f64);
        Rectangle::new(
            [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
            heat_color(values[[i, j]]).filled(),
        )
    }))?;

    chart.draw_series(cells.map(|(i, j)| {
        let value = values[[i, j]];
        let text_color = if value.abs() > 0.6 { WHITE } else { BLACK };
        let style = ("sans-serif", 16)
            .into_font()
            .color(&text_color)
            .pos(Pos::new(HPos::Center, VPos::Center));
        Text::new(
            format!("{value:.2}"),
            (j as f64, (n - 1 - i) as f64),
            style,
        )
    }))?;

    root.present()?;
    Ok(())
}

fn draw_placeholder(root: &DrawingArea<BitMapBackend<'_>, Shift>, caption: &str) -> DrawResult {
    root.titled(caption, ("sans-serif", 30))?;
    root.present()?;
    Ok(())
}

/// Min/max of the finite values, widened by `pad` of the span on each side.
fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return (0.0, 1.0);
    }
    let margin = if hi > lo {
        (hi - lo) * pad
    } else {
        lo.abs().max(1.0) * pad
    };
    (lo - margin, hi + margin)
}

fn date_label(dates: &[chrono::NaiveDate], i: usize) -> String {
    dates
        .get(i)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Ticker under an integer heatmap coordinate; blank between cells.
fn axis_label(labels: &[String], coord: f64, flipped: bool) -> String {
    let rounded = coord.round();
    if (coord - rounded).abs() > 1e-6 || rounded < 0.0 || rounded >= labels.len() as f64 {
        return String::new();
    }
    let idx = rounded as usize;
    let idx = if flipped { labels.len() - 1 - idx } else { idx };
    labels[idx].clone()
}

/// Diverging blue-white-red scale over [-1, 1].
fn heat_color(value: f64) -> RGBColor {
    if !value.is_finite() {
        return UNDEFINED_CELL;
    }
    const NEUTRAL: (f64, f64, f64) = (247.0, 247.0, 247.0);
    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let t = value.clamp(-1.0, 1.0);
    let (end, w) = if t < 0.0 { (COLD, -t) } else { (WARM, t) };
    let mix = |a: f64, b: f64| (a + (b - a) * w).round() as u8;
    RGBColor(
        mix(NEUTRAL.0, end.0),
        mix(NEUTRAL.1, end.1),
        mix(NEUTRAL.2, end.2),
    )
}
