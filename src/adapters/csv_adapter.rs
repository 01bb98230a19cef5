//! CSV file price source: one `<TICKER>.csv` per asset.

use crate::domain::error::BacktestError;
use crate::domain::price::PricePoint;
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const DATE_COLUMNS: [&str; 2] = ["date", "datetime"];
const ADJ_CLOSE_COLUMNS: [&str; 3] = ["adj close", "adj_close", "adjclose"];
const CLOSE_COLUMNS: [&str; 1] = ["close"];

pub struct CsvPriceSource {
    base_path: PathBuf,
}

impl CsvPriceSource {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
}

/// Blank, `null` and `NaN` cells mean "no price that day".
fn parse_price(cell: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("null") || cell.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    cell.parse::<f64>().map(Some)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(cell: &str) -> Result<NaiveDate, chrono::ParseError> {
    let cell = cell.trim();
    let day = cell.split([' ', 'T']).next().unwrap_or(cell);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
}

impl PriceSource for CsvPriceSource {
    fn fetch_adjusted_close(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, BacktestError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path).map_err(|e| BacktestError::PriceData {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| BacktestError::PriceData {
                reason: format!("{}: CSV header error: {}", path.display(), e),
            })?
            .clone();

        let date_col = find_column(&headers, &DATE_COLUMNS).ok_or_else(|| {
            BacktestError::PriceData {
                reason: format!("{}: missing date column", path.display()),
            }
        })?;
        let price_col = find_column(&headers, &ADJ_CLOSE_COLUMNS)
            .or_else(|| find_column(&headers, &CLOSE_COLUMNS))
            .ok_or_else(|| BacktestError::PriceData {
                reason: format!("{}: missing adjusted close column", path.display()),
            })?;

        let mut points = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| BacktestError::PriceData {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let date_str = record.get(date_col).unwrap_or_default();
            let date = parse_date(date_str).map_err(|e| BacktestError::PriceData {
                reason: format!(
                    "{} row {}: invalid date '{}': {}",
                    path.display(),
                    line + 1,
                    date_str,
                    e
                ),
            })?;

            if date < start_date || date >= end_date {
                continue;
            }

            let price_str = record.get(price_col).unwrap_or_default();
            let price = parse_price(price_str).map_err(|e| BacktestError::PriceData {
                reason: format!(
                    "{} row {}: invalid price '{}': {}",
                    path.display(),
                    line + 1,
                    price_str,
                    e
                ),
            })?;

            if let Some(adj_close) = price {
                points.push(PricePoint { date, adj_close });
            }
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("SPY.csv"),
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2024-01-03,470,472,468,471.0,465.5,1000\n\
             2024-01-02,472,474,470,472.0,466.0,1000\n\
             2024-01-04,471,473,469,470.0,464.5,1000\n",
        )
        .unwrap();
        fs::write(
            path.join("BTC-USD.csv"),
            "date,close\n\
             2024-01-02 00:00:00+00:00,45000.5\n\
             2024-01-03 00:00:00+00:00,null\n\
             2024-01-04 00:00:00+00:00,44000\n",
        )
        .unwrap();
        fs::write(path.join("BAD.csv"), "date,adj_close\n2024-01-02,abc\n").unwrap();
        fs::write(path.join("NODATE.csv"), "when,adj_close\n2024-01-02,1\n").unwrap();

        (dir, path)
    }

    #[test]
    fn reads_adj_close_and_sorts() {
        let (_dir, path) = setup_test_data();
        let source = CsvPriceSource::new(path);

        let points = source
            .fetch_adjusted_close("SPY", d("2024-01-01"), d("2024-02-01"))
            .unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, d("2024-01-02"));
        assert_eq!(points[0].adj_close, 466.0);
        assert_eq!(points[2].adj_close, 464.5);
    }

    #[test]
    fn end_date_is_exclusive() {
        let (_dir, path) = setup_test_data();
        let source = CsvPriceSource::new(path);

        let points = source
            .fetch_adjusted_close("SPY", d("2024-01-03"), d("2024-01-04"))
            .unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].date, d("2024-01-03"));
    }

    #[test]
    fn falls_back_to_close_and_skips_null() {
        let (_dir, path) = setup_test_data();
        let source = CsvPriceSource::new(path);

        let points = source
            .fetch_adjusted_close("BTC-USD", d("2024-01-01"), d("2024-02-01"))
            .unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].adj_close, 45000.5);
        assert_eq!(points[1].date, d("2024-01-04"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let (_dir, path) = setup_test_data();
        let source = CsvPriceSource::new(path);
        let result = source.fetch_adjusted_close("GLD", d("2024-01-01"), d("2024-02-01"));
        assert!(matches!(result, Err(BacktestError::PriceData { .. })));
    }

    #[test]
    fn unparsable_price_is_an_error() {
        let (_dir, path) = setup_test_data();
        let source = CsvPriceSource::new(path);
        let err = source
            .fetch_adjusted_close("BAD", d("2024-01-01"), d("2024-02-01"))
            .unwrap_err();
        assert!(err.to_string().contains("invalid price 'abc'"));
    }

    #[test]
    fn missing_date_column_is_an_error() {
        let (_dir, path) = setup_test_data();
        let source = CsvPriceSource::new(path);
        let err = source
            .fetch_adjusted_close("NODATE", d("2024-01-01"), d("2024-02-01"))
            .unwrap_err();
        assert!(err.to_string().contains("missing date column"));
    }
}
