//! Aligned adjusted-close price table and the common trading timeline.

use crate::domain::error::BacktestError;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub adj_close: f64,
}

/// One ticker's raw price history as delivered by a price source.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    /// Finite prices keyed by date; a repeated date keeps the last value.
    fn by_date(&self) -> BTreeMap<NaiveDate, f64> {
        self.points
            .iter()
            .filter(|p| p.adj_close.is_finite())
            .map(|p| (p.date, p.adj_close))
            .collect()
    }
}

/// Dates present (with a finite price) in every series, ascending.
pub fn build_common_timeline(series: &[PriceSeries]) -> Vec<NaiveDate> {
    let mut iter = series.iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let mut common: BTreeSet<NaiveDate> = first.by_date().into_keys().collect();
    for s in iter {
        let dates = s.by_date();
        common.retain(|d| dates.contains_key(d));
    }
    common.into_iter().collect()
}

/// Prices for a fixed set of tickers on a shared, strictly increasing date index.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl PriceTable {
    /// Align series onto their common dates, in the order given.
    pub fn align(series: &[PriceSeries]) -> Result<Self, BacktestError> {
        if series.is_empty() {
            return Err(BacktestError::DataUnavailable {
                reason: "no price series supplied".into(),
            });
        }

        let timeline = build_common_timeline(series);
        if timeline.is_empty() {
            return Err(BacktestError::DataUnavailable {
                reason: format!(
                    "no common trading dates across {}",
                    series
                        .iter()
                        .map(|s| s.ticker.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            });
        }

        let lookups: Vec<BTreeMap<NaiveDate, f64>> = series.iter().map(|s| s.by_date()).collect();
        let rows = timeline
            .iter()
            .map(|d| lookups.iter().map(|l| l[d]).collect())
            .collect();

        Ok(Self {
            tickers: series.iter().map(|s| s.ticker.clone()).collect(),
            dates: timeline,
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
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, ticker: &str) -> Option<Vec<f64>> {
        let idx = self.tickers.iter().position(|t| t == ticker)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }
}
