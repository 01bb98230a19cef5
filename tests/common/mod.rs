#![allow(dead_code)]

use allocbt::domain::asset::Universe;
use allocbt::domain::backtest::DataConfig;
use allocbt::domain::error::BacktestError;
pub use allocbt::domain::price::PricePoint;
use allocbt::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockPriceSource {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
    pub fetches: RefCell<Vec<String>>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            fetches: RefCell::new(Vec::new()),
        }
    }

    pub fn with_prices(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(ticker.to_string(), points);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_adjusted_close(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, BacktestError> {
        self.fetches.borrow_mut().push(ticker.to_string());
        if let Some(reason) = self.errors.get(ticker) {
            return Err(BacktestError::PriceData {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start_date && p.date < end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive calendar days from `start`, one point per price.
pub fn points(start: NaiveDate, prices: &[f64]) -> Vec<PricePoint> {
    prices
        .iter()
        .enumerate()
        .map(|(i, &adj_close)| PricePoint {
            date: start + chrono::Duration::days(i as i64),
            adj_close,
        })
        .collect()
}

/// Geometric path: `start_price * (1 + daily)^i`.
pub fn trending(start: NaiveDate, count: usize, start_price: f64, daily: f64) -> Vec<PricePoint> {
    let prices: Vec<f64> = (0..count)
        .map(|i| start_price * (1.0 + daily).powi(i as i32))
        .collect();
    points(start, &prices)
}

pub fn data_config() -> DataConfig {
    DataConfig {
        universe: Universe::default(),
        start_date: date(2024, 1, 1),
        end_date: date(2025, 1, 1),
    }
}

/// All four default tickers over the same `count` days.
pub fn full_universe_source(count: usize) -> MockPriceSource {
    let start = date(2024, 1, 1);
    MockPriceSource::new()
        .with_prices("SPY", trending(start, count, 470.0, 0.001))
        .with_prices("AGG", trending(start, count, 98.0, 0.0002))
        .with_prices("GLD", trending(start, count, 190.0, -0.0005))
        .with_prices(
            "BTC-USD",
            points(
                start,
                &(0..count)
                    .map(|i| 42_000.0 * (1.0 + 0.05 * ((i as f64) * 0.7).sin()))
                    .collect::<Vec<_>>(),
            ),
        )
}
