//! Excel workbook export implementing ReportPort.
//!
//! Five sheets, each a labelled table with the row index in column A:
//! `Price Data`, `Daily Returns`, `Portfolio Values`, `Performance Summary`
//! and `Asset Allocations`. Non-finite numbers are left as empty cells.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::info;

use crate::domain::backtest::{BacktestResult, MarketData};
use crate::domain::error::BacktestError;
use crate::domain::metrics::PerformanceSummary;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_WORKBOOK: &str = "portfolio_backtest_results.xlsx";

const SUMMARY_DECIMALS: i32 = 4;

impl From<XlsxError> for BacktestError {
    fn from(err: XlsxError) -> Self {
        BacktestError::Export {
            reason: err.to_string(),
        }
    }
}

/// A sheet's contents before it is written: column headers and labelled rows.
struct Table {
    name: &'static str,
    index_label: &'static str,
    columns: Vec<String>,
    rows: Vec<(String, Vec<f64>)>,
}

impl Table {
    fn to_worksheet(&self, header: &Format) -> Result<Worksheet, XlsxError> {
        let mut sheet = Worksheet::new();
        sheet.set_name(self.name)?;
        sheet.set_column_width(0, 14)?;

        sheet.write_string_with_format(0, 0, self.index_label, header)?;
        for (c, column) in self.columns.iter().enumerate() {
            sheet.write_string_with_format(0, c as u16 + 1, column.as_str(), header)?;
        }

        for (r, (label, values)) in self.rows.iter().enumerate() {
            let row = r as u32 + 1;
            sheet.write_string(row, 0, label.as_str())?;
            for (c, &v) in values.iter().enumerate() {
                if v.is_finite() {
                    sheet.write_number(row, c as u16 + 1, v)?;
                }
            }
        }
        Ok(sheet)
    }
}

fn date_label(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn build_tables(market: &MarketData, result: &BacktestResult) -> Vec<Table> {
    let prices = Table {
        name: "Price Data",
        index_label: "Date",
        columns: market.prices.tickers().to_vec(),
        rows: market
            .prices
            .dates()
            .iter()
            .zip(market.prices.rows())
            .map(|(&d, row)| (date_label(d), row.clone()))
            .collect(),
    };

    let returns = Table {
        name: "Daily Returns",
        index_label: "Date",
        columns: market.returns.tickers().to_vec(),
        rows: market
            .returns
            .dates()
            .iter()
            .zip(market.returns.rows())
            .map(|(&d, row)| (date_label(d), row.clone()))
            .collect(),
    };

    let values = Table {
        name: "Portfolio Values",
        index_label: "Date",
        columns: result
            .portfolios
            .iter()
            .map(|p| p.portfolio.name.clone())
            .collect(),
        rows: market
            .returns
            .dates()
            .iter()
            .enumerate()
            .map(|(i, &d)| {
                (
                    date_label(d),
                    result.portfolios.iter().map(|p| p.run.values[i]).collect(),
                )
            })
            .collect(),
    };

    let summary = Table {
        name: "Performance Summary",
        index_label: "",
        columns: PerformanceSummary::COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: result
            .portfolios
            .iter()
            .map(|p| {
                (
                    p.portfolio.name.clone(),
                    p.summary.rounded(SUMMARY_DECIMALS).as_row().to_vec(),
                )
            })
            .collect(),
    };

    let tickers = market.universe.tickers();
    let allocations = Table {
        name: "Asset Allocations",
        index_label: "",
        columns: tickers.clone(),
        rows: result
            .portfolios
            .iter()
            .map(|p| {
                (
                    p.portfolio.name.clone(),
                    tickers
                        .iter()
                        .map(|t| p.portfolio.weights.get(t).unwrap_or(f64::NAN))
                        .collect(),
                )
            })
            .collect(),
    };

    vec![prices, returns, values, summary, allocations]
}

pub struct XlsxReport;

impl XlsxReport {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XlsxReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for XlsxReport {
    fn write(
        &self,
        market: &MarketData,
        result: &BacktestResult,
        output_path: &Path,
    ) -> Result<(), BacktestError> {
        let header = Format::new().set_bold();
        let mut workbook = Workbook::new();
        for table in build_tables(market, result) {
            workbook.push_worksheet(table.to_worksheet(&header)?);
        }

        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        workbook.save(output_path)?;
        info!(path = %output_path.display(), "workbook written");
        Ok(())
    }
}
