//! Configuration validation.
//!
//! Validates all config fields before any data is loaded. Allocation limits
//! mirror the ranges the parameters are meant to be chosen from: bitcoin and
//! gold in [0, 0.2] by 0.01, funding splits in [0, 1] by 0.1.

use crate::domain::asset::{AssetRole, Universe};
use crate::domain::error::BacktestError;
use crate::domain::weights::WeightCheck;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use tracing::warn;

pub const PORTFOLIO_SECTION_PREFIX: &str = "portfolio";

pub const ALLOCATION_MAX: f64 = 0.2;
pub const ALLOCATION_STEP: f64 = 0.01;
pub const FUNDING_STEP: f64 = 0.1;

const STEP_TOLERANCE: f64 = 1e-9;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_dates(config)?;
    validate_universe(config)?;
    validate_initial_value(config)?;
    validate_baseline(config)?;
    validate_weight_check(config)?;
    parse_bool(config, "backtest", "include_baseline", true)?;
    for (_, section) in portfolio_sections(config)? {
        validate_portfolio(config, &section)?;
    }
    Ok(())
}

/// `[portfolioN]` sections as `(N, section)`, sorted by N.
///
/// Any other section starting with `portfolio` is an error, as is an N
/// claimed by two sections (`portfolio1` and `portfolio01`).
pub fn portfolio_sections(
    config: &dyn ConfigPort,
) -> Result<Vec<(usize, String)>, BacktestError> {
    let mut sections = Vec::new();
    for section in config.sections() {
        let Some(suffix) = section.strip_prefix(PORTFOLIO_SECTION_PREFIX) else {
            continue;
        };
        let number = suffix
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| suffix.parse::<usize>().ok())
            .flatten()
            .filter(|&n| n > 0)
            .ok_or_else(|| BacktestError::ConfigSection {
                section: section.clone(),
                reason: "expected [portfolioN] with N a positive integer".into(),
            })?;
        sections.push((number, section));
    }
    sections.sort();
    if let Some(pair) = sections.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(BacktestError::ConfigSection {
            section: pair[1].1.clone(),
            reason: format!("portfolio {} is already defined by [{}]", pair[0].0, pair[0].1),
        });
    }
    Ok(sections)
}

/// Role tickers from `[data]`, falling back to the defaults.
pub fn build_universe(config: &dyn ConfigPort) -> Universe {
    let ticker = |role: AssetRole| {
        config
            .get_string("data", role.config_key())
            .unwrap_or_else(|| role.default_ticker().to_string())
    };
    Universe {
        equities: ticker(AssetRole::Equities),
        bonds: ticker(AssetRole::Bonds),
        gold: ticker(AssetRole::Gold),
        bitcoin: ticker(AssetRole::Bitcoin),
    }
}

pub fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDate, BacktestError> {
    let value = config
        .get_string(section, key)
        .ok_or_else(|| BacktestError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        })?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
        BacktestError::config_invalid(section, key, "invalid date format (expected YYYY-MM-DD)")
    })
}

/// `default` when the key is absent; an error when it is present but not a number.
pub fn parse_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, BacktestError> {
    if config.get_string(section, key).is_none() {
        return Ok(default);
    }
    let value = config.get_double(section, key, f64::NAN);
    if value.is_nan() {
        return Err(BacktestError::config_invalid(section, key, "not a number"));
    }
    Ok(value)
}

/// `default` when the key is absent; an error when it is present but not a boolean.
pub fn parse_bool(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: bool,
) -> Result<bool, BacktestError> {
    if config.get_string(section, key).is_none() {
        return Ok(default);
    }
    // a recognised value ignores the fallback
    let value = config.get_bool(section, key, true);
    if value != config.get_bool(section, key, false) {
        return Err(BacktestError::config_invalid(
            section,
            key,
            "expected true/false, yes/no, on/off or 1/0",
        ));
    }
    Ok(value)
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let start = parse_date(config, "data", "start_date")?;
    let end = parse_date(config, "data", "end_date")?;
    if start >= end {
        return Err(BacktestError::config_invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_universe(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let universe = build_universe(config);
    if let Some(role) = universe.duplicate_role() {
        return Err(BacktestError::config_invalid(
            "data",
            role.config_key(),
            format!("ticker {} is already used by another asset", universe.ticker(role)),
        ));
    }
    Ok(())
}

fn validate_initial_value(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = parse_number(config, "backtest", "initial_value", 100.0)?;
    if !(value.is_finite() && value > 0.0) {
        return Err(BacktestError::config_invalid(
            "backtest",
            "initial_value",
            "initial_value must be positive",
        ));
    }
    Ok(())
}

fn validate_baseline(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for key in ["baseline_equities", "baseline_bonds"] {
        if !parse_number(config, "backtest", key, 0.0)?.is_finite() {
            return Err(BacktestError::config_invalid(
                "backtest",
                key,
                "weight must be a finite number",
            ));
        }
    }
    Ok(())
}

fn validate_weight_check(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if let Some(mode) = config.get_string("backtest", "weight_check") {
        mode.parse::<WeightCheck>()
            .map_err(|reason| BacktestError::config_invalid("backtest", "weight_check", reason))?;
    }
    Ok(())
}

fn validate_portfolio(config: &dyn ConfigPort, section: &str) -> Result<(), BacktestError> {
    validate_range(config, section, "btc", ALLOCATION_MAX, ALLOCATION_STEP)?;
    validate_range(config, section, "gld", ALLOCATION_MAX, ALLOCATION_STEP)?;
    validate_range(config, section, "btc_from_equities", 1.0, FUNDING_STEP)?;
    validate_range(config, section, "gld_from_equities", 1.0, FUNDING_STEP)?;
    Ok(())
}

fn validate_range(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    max: f64,
    step: f64,
) -> Result<(), BacktestError> {
    if config.get_string(section, key).is_none() {
        return Ok(());
    }
    let value = parse_number(config, section, key, f64::NAN)?;
    if !(0.0..=max + STEP_TOLERANCE).contains(&value) {
        return Err(BacktestError::config_invalid(
            section,
            key,
            format!("must be between 0 and {max}"),
        ));
    }
    if !on_step(value, step) {
        warn!(section, key, value, step, "value is not a multiple of the step size");
    }
    Ok(())
}

fn on_step(value: f64, step: f64) -> bool {
    let steps = value / step;
    (steps - steps.round()).abs() < 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn config(ini: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(ini).unwrap()
    }

    const DATES: &str = "[data]\nstart_date = 2016-01-01\nend_date = 2025-07-01\n";

    #[test]
    fn minimal_config_is_valid() {
        assert!(validate_config(&config(DATES)).is_ok());
    }

    #[test]
    fn missing_start_date() {
        let err = validate_config(&config("[data]\nend_date = 2025-07-01\n")).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_date_format() {
        let err = validate_config(&config(
            "[data]\nstart_date = 2016/01/01\nend_date = 2025-07-01\n",
        ))
        .unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn start_after_end() {
        let err = validate_config(&config(
            "[data]\nstart_date = 2025-07-01\nend_date = 2016-01-01\n",
        ))
        .unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { .. }));
    }

    #[test]
    fn non_positive_initial_value() {
        let ini = format!("{DATES}[backtest]\ninitial_value = 0\n");
        let err = validate_config(&config(&ini)).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "initial_value"));
    }

    #[test]
    fn unknown_weight_check() {
        let ini = format!("{DATES}[backtest]\nweight_check = lenient\n");
        let err = validate_config(&config(&ini)).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "weight_check"));
    }

    #[test]
    fn allocation_above_range() {
        let ini = format!("{DATES}[portfolio1]\nbtc = 0.25\n");
        let err = validate_config(&config(&ini)).unwrap_err();
        assert!(
            matches!(err, BacktestError::ConfigInvalid { section, key, .. } if section == "portfolio1" && key == "btc")
        );
    }

    #[test]
    fn funding_split_below_range() {
        let ini = format!("{DATES}[portfolio2]\ngld_from_equities = -0.1\n");
        assert!(validate_config(&config(&ini)).is_err());
    }

    #[test]
    fn non_numeric_allocation() {
        let ini = format!("{DATES}[portfolio1]\ngld = lots\n");
        let err = validate_config(&config(&ini)).unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    #[test]
    fn boundary_values_accepted() {
        let ini = format!(
            "{DATES}[portfolio1]\nbtc = 0.2\ngld = 0\nbtc_from_equities = 1.0\ngld_from_equities = 0.0\n"
        );
        assert!(validate_config(&config(&ini)).is_ok());
    }

    #[test]
    fn off_step_value_only_warns() {
        let ini = format!("{DATES}[portfolio1]\nbtc = 0.015\n");
        assert!(validate_config(&config(&ini)).is_ok());
        assert!(!on_step(0.015, ALLOCATION_STEP));
        assert!(on_step(0.07, ALLOCATION_STEP));
        assert!(on_step(0.3, FUNDING_STEP));
    }

    #[test]
    fn portfolio_sections_sorted_by_number() {
        let ini: String = (1..=11)
            .rev()
            .map(|n| format!("[portfolio{n}]\nbtc = 0\n"))
            .collect();
        let sections = portfolio_sections(&config(&ini)).unwrap();
        let numbers: Vec<usize> = sections.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, (1..=11).collect::<Vec<_>>());
        assert_eq!(sections[9], (10, "portfolio10".to_string()));
    }

    #[test]
    fn portfolio_section_without_number() {
        for bad in ["portfolios", "portfolio", "portfolio0", "portfolio-1"] {
            let ini = format!("{DATES}[{bad}]\nbtc = 0\n");
            let err = validate_config(&config(&ini)).unwrap_err();
            assert!(
                matches!(&err, BacktestError::ConfigSection { section, .. } if section == bad),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn portfolio_number_defined_twice() {
        let c = config("[portfolio1]\nbtc = 0\n[portfolio01]\nbtc = 0\n");
        let err = portfolio_sections(&c).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigSection { .. }));
    }

    #[test]
    fn shared_ticker_rejected() {
        let ini = format!("{DATES}gold = SPY\n");
        let err = validate_config(&config(&ini)).unwrap_err();
        assert!(
            matches!(err, BacktestError::ConfigInvalid { section, key, .. } if section == "data" && key == "gold")
        );
    }

    #[test]
    fn universe_from_data_section() {
        let u = build_universe(&config("[data]\nequities = VTI\n"));
        assert_eq!(u.equities, "VTI");
        assert_eq!(u.bonds, "AGG");
    }

    #[test]
    fn non_numeric_initial_value() {
        let ini = format!("{DATES}[backtest]\ninitial_value = abc\n");
        let err = validate_config(&config(&ini)).unwrap_err();
        assert!(
            matches!(err, BacktestError::ConfigInvalid { key, reason, .. } if key == "initial_value" && reason == "not a number")
        );
    }

    #[test]
    fn non_numeric_baseline_weights() {
        for key in ["baseline_equities", "baseline_bonds"] {
            let ini = format!("{DATES}[backtest]\n{key} = lots\n");
            let err = validate_config(&config(&ini)).unwrap_err();
            assert!(
                matches!(&err, BacktestError::ConfigInvalid { key: k, .. } if k == key),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn unrecognised_include_baseline() {
        let ini = format!("{DATES}[backtest]\ninclude_baseline = maybe\n");
        let err = validate_config(&config(&ini)).unwrap_err();
        assert!(
            matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "include_baseline")
        );
    }

    #[test]
    fn parse_helpers_fall_back_when_absent() {
        let c = config("[backtest]\ninclude_baseline = no\ninitial_value = 250\n");
        assert!(!parse_bool(&c, "backtest", "include_baseline", true).unwrap());
        assert!(parse_bool(&c, "backtest", "missing", true).unwrap());
        assert_eq!(parse_number(&c, "backtest", "initial_value", 100.0).unwrap(), 250.0);
        assert_eq!(parse_number(&c, "backtest", "missing", 100.0).unwrap(), 100.0);
    }
}
