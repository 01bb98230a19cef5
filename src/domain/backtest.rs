//! Backtest pipeline: load prices once, then evaluate any number of portfolios.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::asset::Universe;
use super::error::BacktestError;
use super::metrics::PerformanceSummary;
use super::portfolio::{compute_portfolio, Portfolio, PortfolioRun, DEFAULT_INITIAL_VALUE};
use super::price::{PriceSeries, PriceTable};
use super::returns::ReturnTable;
use super::weights::{build_weights, check_weights, Allocation, WeightCheck, WeightVector};
use crate::ports::data_port::PriceSource;

/// Where and when to load prices from.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub universe: Universe,
    pub start_date: NaiveDate,
    /// Exclusive.
    pub end_date: NaiveDate,
}

/// One alternative-asset portfolio to build from the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSpec {
    /// The `N` of its `[portfolioN]` section.
    pub number: usize,
    pub name: Option<String>,
    pub allocation: Allocation,
}

impl PortfolioSpec {
    /// Display name: the explicit one, or `Portfolio {n}: BTC{x} GLD{y}`
    /// with percentages truncated to whole numbers.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!(
                "Portfolio {}: BTC{} GLD{}",
                self.number,
                (self.allocation.btc_pct * 100.0) as i64,
                (self.allocation.gld_pct * 100.0) as i64
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_value: f64,
    pub include_baseline: bool,
    pub baseline_name: String,
    pub baseline_equities: f64,
    pub baseline_bonds: f64,
    pub weight_check: WeightCheck,
    pub portfolios: Vec<PortfolioSpec>,
}

impl BacktestConfig {
    /// The two alternative portfolios offered by default.
    pub fn default_portfolios() -> Vec<PortfolioSpec> {
        vec![
            PortfolioSpec {
                number: 1,
                name: None,
                allocation: Allocation {
                    btc_pct: 0.02,
                    btc_from_equities_pct: 0.5,
                    gld_pct: 0.0,
                    gld_from_equities_pct: 0.5,
                },
            },
            PortfolioSpec {
                number: 2,
                name: None,
                allocation: Allocation {
                    btc_pct: 0.05,
                    btc_from_equities_pct: 0.5,
                    gld_pct: 0.05,
                    gld_from_equities_pct: 0.5,
                },
            },
        ]
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_value: DEFAULT_INITIAL_VALUE,
            include_baseline: true,
            baseline_name: "60/40".into(),
            baseline_equities: 0.60,
            baseline_bonds: 0.40,
            weight_check: WeightCheck::Permissive,
            portfolios: Self::default_portfolios(),
        }
    }
}

/// Aligned prices and derived returns, computed once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct MarketData {
    pub universe: Universe,
    pub prices: PriceTable,
    pub returns: ReturnTable,
}

impl MarketData {
    pub fn load(source: &dyn PriceSource, config: &DataConfig) -> Result<Self, BacktestError> {
        let mut series = Vec::new();
        for ticker in config.universe.tickers() {
            let points = source.fetch_adjusted_close(&ticker, config.start_date, config.end_date)?;
            debug!(ticker = %ticker, points = points.len(), "fetched prices");
            series.push(PriceSeries::new(ticker, points));
        }
        let market = Self::from_series(config.universe.clone(), &series)?;
        info!(
            rows = market.prices.len(),
            first = %market.prices.dates()[0],
            last = %market.prices.dates()[market.prices.len() - 1],
            "aligned price data"
        );
        Ok(market)
    }

    pub fn from_series(universe: Universe, series: &[PriceSeries]) -> Result<Self, BacktestError> {
        let prices = PriceTable::align(series)?;
        let returns = ReturnTable::from_prices(&prices)?;
        Ok(Self {
            universe,
            prices,
            returns,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PortfolioResult {
    pub portfolio: Portfolio,
    pub run: PortfolioRun,
    pub summary: PerformanceSummary,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub initial_value: f64,
    pub portfolios: Vec<PortfolioResult>,
}

impl BacktestResult {
    /// Portfolio with the highest total return, ignoring NaN.
    pub fn best_total_return(&self) -> Option<&PortfolioResult> {
        self.portfolios
            .iter()
            .filter(|p| !p.summary.total_return.is_nan())
            .max_by(|a, b| a.summary.total_return.total_cmp(&b.summary.total_return))
    }
}

/// Named weight vectors for the baseline (if included) and each configured portfolio, in order.
pub fn build_portfolios(
    universe: &Universe,
    config: &BacktestConfig,
) -> Result<Vec<Portfolio>, BacktestError> {
    let baseline =
        WeightVector::baseline(universe, config.baseline_equities, config.baseline_bonds);
    let mut portfolios = Vec::with_capacity(config.portfolios.len() + 1);

    if config.include_baseline {
        check_weights(&config.baseline_name, &baseline, config.weight_check)?;
        portfolios.push(Portfolio::new(config.baseline_name.clone(), baseline.clone()));
    }

    for spec in &config.portfolios {
        let name = spec.display_name();
        let weights = build_weights(universe, &baseline, &spec.allocation);
        check_weights(&name, &weights, config.weight_check)?;
        portfolios.push(Portfolio::new(name, weights));
    }
    Ok(portfolios)
}

/// Evaluates portfolios against market data injected at construction.
pub struct Backtester<'a> {
    data: &'a MarketData,
}

impl<'a> Backtester<'a> {
    pub fn new(data: &'a MarketData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &MarketData {
        self.data
    }

    pub fn evaluate(
        &self,
        portfolio: Portfolio,
        initial_value: f64,
    ) -> Result<PortfolioResult, BacktestError> {
        let run = compute_portfolio(&portfolio.weights, &self.data.returns, initial_value)?;
        let summary = PerformanceSummary::from_run(&run);
        debug!(
            portfolio = %portfolio.name,
            total_return = summary.total_return,
            "evaluated portfolio"
        );
        Ok(PortfolioResult {
            portfolio,
            run,
            summary,
        })
    }

    pub fn run(&self, config: &BacktestConfig) -> Result<BacktestResult, BacktestError> {
        let portfolios = build_portfolios(&self.data.universe, config)?;
        info!(count = portfolios.len(), "evaluating portfolios");
        let results = portfolios
            .into_iter()
            .map(|p| self.evaluate(p, config.initial_value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BacktestResult {
            initial_value: config.initial_value,
            portfolios: results,
        })
    }
}
