//! Performance summary statistics for a portfolio run.

use super::portfolio::PortfolioRun;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSummary {
    pub total_return: f64,
    pub annual_return: f64,
    pub max_drawdown: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
}

impl PerformanceSummary {
    pub const COLUMNS: [&'static str; 6] = [
        "Total Return",
        "Annual Return",
        "Max Drawdown",
        "Volatility",
        "Sharpe Ratio",
        "Sortino Ratio",
    ];

    pub fn from_run(run: &PortfolioRun) -> Self {
        performance_summary(&run.values, &run.daily_returns)
    }

    /// Fields in [`Self::COLUMNS`] order.
    pub fn as_row(&self) -> [f64; 6] {
        [
            self.total_return,
            self.annual_return,
            self.max_drawdown,
            self.volatility,
            self.sharpe_ratio,
            self.sortino_ratio,
        ]
    }

    pub fn rounded(&self, places: i32) -> Self {
        let r = |v: f64| round_to(v, places);
        PerformanceSummary {
            total_return: r(self.total_return),
            annual_return: r(self.annual_return),
            max_drawdown: r(self.max_drawdown),
            volatility: r(self.volatility),
            sharpe_ratio: r(self.sharpe_ratio),
            sortino_ratio: r(self.sortino_ratio),
        }
    }

    fn undefined() -> Self {
        PerformanceSummary {
            total_return: f64::NAN,
            annual_return: f64::NAN,
            max_drawdown: f64::NAN,
            volatility: f64::NAN,
            sharpe_ratio: f64::NAN,
            sortino_ratio: f64::NAN,
        }
    }
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Six-number summary of an indexed value series and its daily returns.
///
/// Annualization uses the number of value observations as the day count.
/// Sharpe is annual return over volatility with no risk-free rate; both
/// ratios are NaN when their denominator is zero or undefined. An empty
/// value series gives an all-NaN summary.
pub fn performance_summary(values: &[f64], daily_returns: &[f64]) -> PerformanceSummary {
    let (Some(&first), Some(&last)) = (values.first(), values.last()) else {
        return PerformanceSummary::undefined();
    };

    let total_return = last / first - 1.0;
    let annual_return =
        (1.0 + total_return).powf(TRADING_DAYS_PER_YEAR / values.len() as f64) - 1.0;
    let max_drawdown = compute_max_drawdown(values);

    let annualizer = TRADING_DAYS_PER_YEAR.sqrt();
    let volatility = sample_stddev(daily_returns) * annualizer;
    let sharpe_ratio = ratio(annual_return, volatility);

    let losses: Vec<f64> = daily_returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_deviation = sample_stddev(&losses) * annualizer;
    let sortino_ratio = ratio(annual_return, downside_deviation);

    PerformanceSummary {
        total_return,
        annual_return,
        max_drawdown,
        volatility,
        sharpe_ratio,
        sortino_ratio,
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}

/// Most negative `value / running_peak - 1`; zero for a non-decreasing series.
pub fn compute_max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        let dd = v / peak - 1.0;
        if dd < max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

/// Standard deviation with an n - 1 denominator; NaN for fewer than two samples.
pub fn sample_stddev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return f64::NAN;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let variance = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}
