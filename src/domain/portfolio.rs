//! Named portfolios and their evaluation against a return table.

use chrono::NaiveDate;

use super::error::BacktestError;
use super::returns::ReturnTable;
use super::weights::WeightVector;

pub const DEFAULT_INITIAL_VALUE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ValuePoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub name: String,
    pub weights: WeightVector,
}

impl Portfolio {
    pub fn new(name: impl Into<String>, weights: WeightVector) -> Self {
        Self {
            name: name.into(),
            weights,
        }
    }
}

/// Indexed value series and the daily returns that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRun {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    pub daily_returns: Vec<f64>,
}

impl PortfolioRun {
    pub fn value_curve(&self) -> Vec<ValuePoint> {
        self.dates
            .iter()
            .zip(&self.values)
            .map(|(&date, &value)| ValuePoint { date, value })
            .collect()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Project daily asset returns through fixed weights.
///
/// Weights are applied to every day's raw returns, so the result is a
/// portfolio rebalanced back to its targets each day, not a buy-and-hold
/// position whose weights drift with prices. The first value already
/// includes one day of compounding from `initial_value`.
pub fn compute_portfolio(
    weights: &WeightVector,
    returns: &ReturnTable,
    initial_value: f64,
) -> Result<PortfolioRun, BacktestError> {
    let w: Vec<f64> = returns
        .tickers()
        .iter()
        .map(|t| {
            weights
                .get(t)
                .ok_or_else(|| BacktestError::MissingKey { key: t.clone() })
        })
        .collect::<Result<_, _>>()?;

    let daily_returns: Vec<f64> = returns
        .rows()
        .iter()
        .map(|row| row.iter().zip(&w).map(|(r, w)| r * w).sum())
        .collect();

    let mut growth = 1.0;
    let values = daily_returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r;
            growth * initial_value
        })
        .collect();

    Ok(PortfolioRun {
        dates: returns.dates().to_vec(),
        values,
        daily_returns,
    })
}
