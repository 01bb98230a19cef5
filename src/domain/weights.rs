//! Weight vectors and the alternative-asset weight builder.

use crate::domain::asset::{AssetRole, Universe};
use crate::domain::error::BacktestError;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

const SUM_TOLERANCE: f64 = 1e-9;

/// Ticker to allocation fraction, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightVector {
    entries: Vec<(String, f64)>,
}

impl WeightVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline over the universe with gold and bitcoin at zero.
    pub fn baseline(universe: &Universe, equities: f64, bonds: f64) -> Self {
        let mut w = Self::new();
        w.set(universe.ticker(AssetRole::Equities), equities);
        w.set(universe.ticker(AssetRole::Bonds), bonds);
        w.set(universe.ticker(AssetRole::Gold), 0.0);
        w.set(universe.ticker(AssetRole::Bitcoin), 0.0);
        w
    }

    pub fn get(&self, ticker: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|&(_, w)| w)
    }

    pub fn set(&mut self, ticker: &str, weight: f64) {
        match self.entries.iter_mut().find(|(t, _)| t == ticker) {
            Some(entry) => entry.1 = weight,
            None => self.entries.push((ticker.to_string(), weight)),
        }
    }

    fn adjust(&mut self, ticker: &str, delta: f64) {
        let current = self.get(ticker).unwrap_or(0.0);
        self.set(ticker, current + delta);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(t, w)| (t.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }
}

impl FromIterator<(String, f64)> for WeightVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut w = WeightVector::new();
        for (ticker, weight) in iter {
            w.set(&ticker, weight);
        }
        w
    }
}

/// Target bitcoin/gold allocations and the share of each funded from equities
/// (the remainder comes out of bonds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Allocation {
    pub btc_pct: f64,
    pub btc_from_equities_pct: f64,
    pub gld_pct: f64,
    pub gld_from_equities_pct: f64,
}

/// Carve bitcoin and gold out of the baseline's equities and bonds.
///
/// No clamping or renormalization: inconsistent inputs (alternatives larger
/// than the equities/bonds they are funded from) yield negative weights. Use
/// [`check_weights`] to detect that.
pub fn build_weights(
    universe: &Universe,
    baseline: &WeightVector,
    alloc: &Allocation,
) -> WeightVector {
    let mut weights = baseline.clone();
    weights.adjust(
        universe.ticker(AssetRole::Equities),
        -(alloc.btc_pct * alloc.btc_from_equities_pct
            + alloc.gld_pct * alloc.gld_from_equities_pct),
    );
    weights.adjust(
        universe.ticker(AssetRole::Bonds),
        -(alloc.btc_pct * (1.0 - alloc.btc_from_equities_pct)
            + alloc.gld_pct * (1.0 - alloc.gld_from_equities_pct)),
    );
    weights.set(universe.ticker(AssetRole::Bitcoin), alloc.btc_pct);
    weights.set(universe.ticker(AssetRole::Gold), alloc.gld_pct);
    weights
}

/// How strictly built weights are checked before evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeightCheck {
    /// Accept any arithmetic result.
    #[default]
    Permissive,
    /// Log a warning for negative weights or a sum away from 1.
    Warn,
    /// Reject negative weights or a sum away from 1.
    Strict,
}

impl FromStr for WeightCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(WeightCheck::Permissive),
            "warn" => Ok(WeightCheck::Warn),
            "strict" => Ok(WeightCheck::Strict),
            other => Err(format!(
                "unknown weight check '{other}' (expected permissive, warn or strict)"
            )),
        }
    }
}

impl fmt::Display for WeightCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WeightCheck::Permissive => "permissive",
            WeightCheck::Warn => "warn",
            WeightCheck::Strict => "strict",
        };
        f.write_str(s)
    }
}

fn weight_problems(weights: &WeightVector) -> Vec<String> {
    let mut problems: Vec<String> = weights
        .iter()
        .filter(|&(_, w)| w < 0.0)
        .map(|(t, w)| format!("{t} is negative ({w:.4})"))
        .collect();
    let sum = weights.sum();
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        problems.push(format!("weights sum to {sum:.6}, not 1"));
    }
    problems
}

pub fn check_weights(
    portfolio: &str,
    weights: &WeightVector,
    mode: WeightCheck,
) -> Result<(), BacktestError> {
    if mode == WeightCheck::Permissive {
        return Ok(());
    }
    let problems = weight_problems(weights);
    if problems.is_empty() {
        return Ok(());
    }
    let reason = problems.join("; ");
    match mode {
        WeightCheck::Strict => Err(BacktestError::InvalidWeights {
            portfolio: portfolio.to_string(),
            reason,
        }),
        _ => {
            warn!(portfolio, %reason, "suspicious portfolio weights");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sixty_forty() -> (Universe, WeightVector) {
        let u = Universe::default();
        let base = WeightVector::baseline(&u, 0.60, 0.40);
        (u, base)
    }

    #[test]
    fn baseline_has_all_four_tickers() {
        let (_, base) = sixty_forty();
        let tickers: Vec<&str> = base.iter().map(|(t, _)| t).collect();
        assert_eq!(tickers, vec!["SPY", "AGG", "GLD", "BTC-USD"]);
        assert_relative_eq!(base.sum(), 1.0);
    }

    #[test]
    fn btc_split_evenly() {
        let (u, base) = sixty_forty();
        let alloc = Allocation {
            btc_pct: 0.02,
            btc_from_equities_pct: 0.5,
            gld_pct: 0.0,
            gld_from_equities_pct: 0.5,
        };
        let w = build_weights(&u, &base, &alloc);
        assert_relative_eq!(w.get("SPY").unwrap(), 0.59, epsilon = 1e-12);
        assert_relative_eq!(w.get("AGG").unwrap(), 0.39, epsilon = 1e-12);
        assert_relative_eq!(w.get("GLD").unwrap(), 0.0);
        assert_relative_eq!(w.get("BTC-USD").unwrap(), 0.02);
    }

    #[test]
    fn gold_funded_entirely_from_bonds() {
        let (u, base) = sixty_forty();
        let alloc = Allocation {
            btc_pct: 0.05,
            btc_from_equities_pct: 1.0,
            gld_pct: 0.10,
            gld_from_equities_pct: 0.0,
        };
        let w = build_weights(&u, &base, &alloc);
        assert_relative_eq!(w.get("SPY").unwrap(), 0.55, epsilon = 1e-12);
        assert_relative_eq!(w.get("AGG").unwrap(), 0.30, epsilon = 1e-12);
        assert_relative_eq!(w.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn baseline_is_not_mutated() {
        let (u, base) = sixty_forty();
        let before = base.clone();
        let alloc = Allocation {
            btc_pct: 0.2,
            btc_from_equities_pct: 0.3,
            gld_pct: 0.2,
            gld_from_equities_pct: 0.7,
        };
        let _ = build_weights(&u, &base, &alloc);
        assert_eq!(base, before);
    }

    #[test]
    fn oversized_allocation_goes_negative_without_clamping() {
        let u = Universe::default();
        let base = WeightVector::baseline(&u, 0.10, 0.05);
        let alloc = Allocation {
            btc_pct: 0.2,
            btc_from_equities_pct: 1.0,
            gld_pct: 0.0,
            gld_from_equities_pct: 0.5,
        };
        let w = build_weights(&u, &base, &alloc);
        assert_relative_eq!(w.get("SPY").unwrap(), -0.10, epsilon = 1e-12);
    }

    #[test]
    fn set_overwrites_in_place() {
        let mut w = WeightVector::new();
        w.set("SPY", 0.5);
        w.set("AGG", 0.5);
        w.set("SPY", 0.4);
        assert_eq!(w.len(), 2);
        assert_eq!(w.get("SPY"), Some(0.4));
        assert_eq!(w.get("GLD"), None);
    }

    #[test]
    fn weight_check_parses() {
        assert_eq!("Strict".parse::<WeightCheck>(), Ok(WeightCheck::Strict));
        assert_eq!(" warn ".parse::<WeightCheck>(), Ok(WeightCheck::Warn));
        assert!("loose".parse::<WeightCheck>().is_err());
        assert_eq!(WeightCheck::default(), WeightCheck::Permissive);
    }

    #[test]
    fn check_weights_modes() {
        let u = Universe::default();
        let bad = WeightVector::baseline(&u, -0.1, 0.5);

        assert!(check_weights("p", &bad, WeightCheck::Permissive).is_ok());
        assert!(check_weights("p", &bad, WeightCheck::Warn).is_ok());
        let err = check_weights("p", &bad, WeightCheck::Strict).unwrap_err();
        match err {
            BacktestError::InvalidWeights { portfolio, reason } => {
                assert_eq!(portfolio, "p");
                assert!(reason.contains("SPY is negative"));
                assert!(reason.contains("sum"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn check_weights_accepts_consistent_vector() {
        let (_, base) = sixty_forty();
        assert!(check_weights("60/40", &base, WeightCheck::Strict).is_ok());
    }
}
