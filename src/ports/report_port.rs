//! Report generation port trait.

use std::path::Path;

use crate::domain::backtest::{BacktestResult, MarketData};
use crate::domain::error::BacktestError;

/// Port for writing backtest artifacts to disk.
pub trait ReportPort {
    fn write(
        &self,
        market: &MarketData,
        result: &BacktestResult,
        output_path: &Path,
    ) -> Result<(), BacktestError>;
}
