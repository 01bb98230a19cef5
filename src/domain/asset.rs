//! Asset universe: the four roles a ticker can play in a blended portfolio.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRole {
    Equities,
    Bonds,
    Gold,
    Bitcoin,
}

impl AssetRole {
    pub const ALL: [AssetRole; 4] = [
        AssetRole::Equities,
        AssetRole::Bonds,
        AssetRole::Gold,
        AssetRole::Bitcoin,
    ];

    /// Config key under `[data]` naming the ticker for this role.
    pub fn config_key(self) -> &'static str {
        match self {
            AssetRole::Equities => "equities",
            AssetRole::Bonds => "bonds",
            AssetRole::Gold => "gold",
            AssetRole::Bitcoin => "bitcoin",
        }
    }

    pub fn default_ticker(self) -> &'static str {
        match self {
            AssetRole::Equities => "SPY",
            AssetRole::Bonds => "AGG",
            AssetRole::Gold => "GLD",
            AssetRole::Bitcoin => "BTC-USD",
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Ticker bound to each role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    pub equities: String,
    pub bonds: String,
    pub gold: String,
    pub bitcoin: String,
}

impl Universe {
    pub fn ticker(&self, role: AssetRole) -> &str {
        match role {
            AssetRole::Equities => &self.equities,
            AssetRole::Bonds => &self.bonds,
            AssetRole::Gold => &self.gold,
            AssetRole::Bitcoin => &self.bitcoin,
        }
    }

    /// Tickers in column order: equities, bonds, gold, bitcoin.
    pub fn tickers(&self) -> Vec<String> {
        AssetRole::ALL
            .iter()
            .map(|&role| self.ticker(role).to_string())
            .collect()
    }

    /// First role whose ticker is already bound to an earlier role.
    pub fn duplicate_role(&self) -> Option<AssetRole> {
        AssetRole::ALL.iter().enumerate().find_map(|(i, &role)| {
            AssetRole::ALL[..i]
                .iter()
                .any(|&earlier| self.ticker(earlier) == self.ticker(role))
                .then_some(role)
        })
    }
}

impl Default for Universe {
    fn default() -> Self {
        Universe {
            equities: AssetRole::Equities.default_ticker().into(),
            bonds: AssetRole::Bonds.default_ticker().into(),
            gold: AssetRole::Gold.default_ticker().into(),
            bitcoin: AssetRole::Bitcoin.default_ticker().into(),
        }
    }
}
