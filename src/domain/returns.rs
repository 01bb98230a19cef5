//! Daily simple returns derived from an aligned price table.

use crate::domain::error::BacktestError;
use crate::domain::price::PriceTable;
use chrono::NaiveDate;

/// `r[t] = price[t] / price[t-1] - 1` per ticker; one row shorter than the prices.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTable {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl ReturnTable {
    pub fn from_prices(prices: &PriceTable) -> Result<Self, BacktestError> {
        if prices.len() < 2 {
            return Err(BacktestError::DataUnavailable {
                reason: format!(
                    "need at least 2 aligned price rows to compute returns, have {}",
                    prices.len()
                ),
            });
        }

        let rows = prices
            .rows()
            .windows(2)
            .map(|w| {
                w[1].iter()
                    .zip(&w[0])
                    .map(|(curr, prev)| curr / prev - 1.0)
                    .collect()
            })
            .collect();

        Ok(Self {
            tickers: prices.tickers().to_vec(),
            dates: prices.dates()[1..].to_vec(),
            rows,
        })
    }

    /// Build directly from rows, e.g. synthetic return scenarios.
    pub fn from_rows(
        tickers: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, BacktestError> {
        if dates.len() != rows.len() {
            return Err(BacktestError::DataUnavailable {
                reason: format!("{} dates but {} return rows", dates.len(), rows.len()),
            });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != tickers.len()) {
            return Err(BacktestError::DataUnavailable {
                reason: format!(
                    "return row has {} values for {} tickers",
                    bad.len(),
                    tickers.len()
                ),
            });
        }
        Ok(Self {
            tickers,
            dates,
            rows,
        })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
