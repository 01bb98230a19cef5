//! Price data access port.

use crate::domain::error::BacktestError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;

/// Source of daily adjusted close prices.
pub trait PriceSource {
    /// Points for `ticker` with `start_date <= date < end_date`, ascending.
    fn fetch_adjusted_close(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, BacktestError>;
}
