//! Domain error types.

/// Top-level error type for valmo.
#[derive(Debug, thiserror::Error)]
pub enum ValmoError {
    #[error("insufficient data for {symbol} ({indicator}): have {have} points, need {need}")]
    InsufficientData {
        symbol: String,
        indicator: String,
        have: usize,
        need: usize,
    },

    #[error("{symbol} has no bar on {date}")]
    NoBar { symbol: String, date: chrono::NaiveDate },

    #[error("no fundamentals available for {symbol}")]
    NoFundamentals { symbol: String },

    #[error("invalid price series for {symbol}: {reason}")]
    InvalidSeries { symbol: String, reason: String },

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

    #[error("nothing to rank for strategy {strategy}")]
    EmptyUniverse { strategy: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("backtest of {strategy} cancelled")]
    Cancelled { strategy: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ValmoError {
    /// True for the problems that only disqualify a single symbol from a run.
    pub fn is_per_symbol(&self) -> bool {
        matches!(
            self,
            ValmoError::InsufficientData { .. }
                | ValmoError::NoBar { .. }
                | ValmoError::NoFundamentals { .. }
                | ValmoError::InvalidSeries { .. }
        )
    }

    /// True for configuration errors (fatal for the affected strategy).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ValmoError::ConfigParse { .. }
                | ValmoError::ConfigMissing { .. }
                | ValmoError::ConfigInvalid { .. }
        )
    }
}

impl From<&ValmoError> for std::process::ExitCode {
    fn from(err: &ValmoError) -> Self {
        let code: u8 = match err {
            ValmoError::Io(_) | ValmoError::Cancelled { .. } => 1,
            ValmoError::ConfigParse { .. }
            | ValmoError::ConfigMissing { .. }
            | ValmoError::ConfigInvalid { .. } => 2,
            ValmoError::Data { .. } | ValmoError::InvalidSeries { .. } => 3,
            ValmoError::InsufficientData { .. }
            | ValmoError::NoBar { .. }
            | ValmoError::NoFundamentals { .. }
            | ValmoError::EmptyUniverse { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
