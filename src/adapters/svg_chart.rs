//! SVG line chart of portfolio values over time, implementing ReportPort.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::backtest::{BacktestResult, MarketData};
use crate::domain::error::BacktestError;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_CHART: &str = "portfolio_values.svg";

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 600.0;
const PADDING: f64 = 60.0;
const LEGEND_HEIGHT: f64 = 20.0;
const PALETTE: [&str; 6] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
];

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// One polyline per portfolio; the best total return is drawn at double width.
/// Returns an empty string when there is nothing to plot.
pub fn generate_value_chart_svg(result: &BacktestResult) -> String {
    let len = result
        .portfolios
        .iter()
        .map(|p| p.run.values.len())
        .max()
        .unwrap_or(0);
    if len == 0 {
        return String::new();
    }

    let finite = result
        .portfolios
        .iter()
        .flat_map(|p| p.run.values.iter().copied())
        .filter(|v| v.is_finite());
    let (min_v, max_v) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min_v.is_finite() {
        return String::new();
    }

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING - LEGEND_HEIGHT;
    let range = max_v - min_v;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let scale_x = if len > 1 {
        plot_width / (len - 1) as f64
    } else {
        0.0
    };
    let bottom = HEIGHT - PADDING;

    let best = result.best_total_return().map(|p| p.portfolio.name.as_str());

    let mut lines = Vec::new();
    lines.push(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    ));
    lines.push(r#"<rect width="100%" height="100%" fill="white"/>"#.to_string());
    lines.push(format!(
        r#"<text x="{:.1}" y="30" font-size="18" text-anchor="middle">Portfolio Value Over Time</text>"#,
        WIDTH / 2.0
    ));
    lines.push(format!(
        r#"<line x1="{PADDING}" y1="{bottom}" x2="{:.1}" y2="{bottom}" stroke="black"/>"#,
        WIDTH - PADDING
    ));
    lines.push(format!(
        r#"<line x1="{PADDING}" y1="{:.1}" x2="{PADDING}" y2="{bottom}" stroke="black"/>"#,
        bottom - plot_height
    ));
    lines.push(format!(
        r#"<text x="{PADDING}" y="{:.1}" font-size="11" text-anchor="end" dx="-4">{max_v:.1}</text>"#,
        bottom - plot_height + 4.0
    ));
    lines.push(format!(
        r#"<text x="{PADDING}" y="{:.1}" font-size="11" text-anchor="end" dx="-4">{min_v:.1}</text>"#,
        bottom + 4.0
    ));

    if let (Some(first), Some(last)) = (
        result.portfolios.first().and_then(|p| p.run.dates.first()),
        result.portfolios.first().and_then(|p| p.run.dates.last()),
    ) {
        lines.push(format!(
            r#"<text x="{PADDING}" y="{:.1}" font-size="11">{first}</text>"#,
            bottom + 18.0
        ));
        lines.push(format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{last}</text>"#,
            WIDTH - PADDING,
            bottom + 18.0
        ));
    }
    lines.push(format!(
        r#"<text x="15" y="{:.1}" font-size="12" transform="rotate(-90 15 {:.1})" text-anchor="middle">Value (Indexed to {})</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0,
        result.initial_value
    ));

    for (i, p) in result.portfolios.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let stroke_width = if Some(p.portfolio.name.as_str()) == best {
            4
        } else {
            2
        };
        let points: Vec<String> = p
            .run
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(j, v)| {
                let x = PADDING + j as f64 * scale_x;
                let y = bottom - (v - min_v) * scale_y;
                format!("{:.1},{:.1}", x, y)
            })
            .collect();
        lines.push(format!(
            r#"<polyline fill="none" stroke="{color}" stroke-width="{stroke_width}" points="{}"/>"#,
            points.join(" ")
        ));

        let legend_x = PADDING + i as f64 * (plot_width / result.portfolios.len() as f64);
        let legend_y = PADDING - 10.0;
        lines.push(format!(
            r#"<rect x="{legend_x:.1}" y="{:.1}" width="12" height="4" fill="{color}"/><text x="{:.1}" y="{legend_y:.1}" font-size="12">{}</text>"#,
            legend_y - 6.0,
            legend_x + 16.0,
            escape(&p.portfolio.name)
        ));
    }

    lines.push("</svg>\n".to_string());
    lines.join("\n")
}

pub struct SvgChartReport;

impl SvgChartReport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SvgChartReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for SvgChartReport {
    fn write(
        &self,
        _market: &MarketData,
        result: &BacktestResult,
        output_path: &Path,
    ) -> Result<(), BacktestError> {
        let svg = generate_value_chart_svg(result);
        if svg.is_empty() {
            return Err(BacktestError::Export {
                reason: "no portfolio values to chart".into(),
            });
        }
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, svg)?;
        info!(path = %output_path.display(), "chart written");
        Ok(())
    }
}
