//! Domain error types.

/// Top-level error type for allocbt.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("price data error: {reason}")]
    PriceData { reason: String },

    #[error("data unavailable: {reason}")]
    DataUnavailable { reason: String },

    #[error("weight vector has no entry for {key}")]
    MissingKey { key: String },

    #[error("invalid weights for {portfolio}: {reason}")]
    InvalidWeights { portfolio: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid config section [{section}]: {reason}")]
    ConfigSection { section: String, reason: String },

    #[error("export failed: {reason}")]
    Export { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        BacktestError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) | BacktestError::Export { .. } => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. }
            | BacktestError::ConfigSection { .. } => 2,
            BacktestError::PriceData { .. } => 3,
            BacktestError::MissingKey { .. } | BacktestError::InvalidWeights { .. } => 4,
            BacktestError::DataUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
