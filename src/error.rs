//! Unified error handling for the regime detector
//!
//! Every stage of the pipeline returns `RegimeResult<T>`. Failures that the
//! caller has to act on (too little data, flat prices, misconfigured filters)
//! get their own variants so the CLI and any API layer can map them to
//! distinct responses.

use std::fmt;
use std::io;

/// Main error type for the regime detector
#[derive(Debug)]
pub enum RegimeError {
    // Pipeline errors
    InsufficientData(String),
    DegenerateInput(String),
    MissingColumn(String),
    InvalidParameter(String, String), // (parameter_name, reason)

    // Configuration errors
    ConfigParse(String),
    ConfigValidation(String),

    // Data source errors
    ApiConnection(String),
    ApiResponse(String),
    DataParse(String),

    // IO errors
    FileNotFound(String),
    FileRead(String),
    FileWrite(String),

    // General errors
    Internal(String),
}

impl RegimeError {
    /// Get a user-friendly error message with helpful context
    pub fn user_message(&self) -> String {
        match self {
            RegimeError::InsufficientData(msg) => {
                format!(
                    "Not enough price history: {}\n\n\
                    💡 Try:\n\
                    - An earlier --start date\n\
                    - A daily interval (the 200-period average needs ~200 bars of warm-up)",
                    msg
                )
            }
            RegimeError::DegenerateInput(msg) => {
                format!(
                    "Price series cannot be modelled: {}\n\n\
                    💡 The smoothed returns have no variation.\n\
                    Check that the symbol is actively traded over the period.",
                    msg
                )
            }
            RegimeError::ConfigValidation(msg) => {
                format!(
                    "Configuration validation error: {}\n\n\
                    💡 Check regime.toml for:\n\
                    - An odd smoothing window larger than the polynomial order\n\
                    - A positive iteration cap\n\
                    - At least 10 k-means restarts",
                    msg
                )
            }
            RegimeError::ApiConnection(msg) => {
                format!(
                    "Could not reach the market data API: {}\n\n\
                    💡 Check your network connection, or use --input with a saved series",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            RegimeError::InsufficientData(_)
            | RegimeError::DegenerateInput(_)
            | RegimeError::MissingColumn(_)
            | RegimeError::InvalidParameter(_, _) => "pipeline",

            RegimeError::ConfigParse(_)
            | RegimeError::ConfigValidation(_) => "config",

            RegimeError::ApiConnection(_)
            | RegimeError::ApiResponse(_)
            | RegimeError::DataParse(_) => "data",

            RegimeError::FileNotFound(_)
            | RegimeError::FileRead(_)
            | RegimeError::FileWrite(_) => "io",

            RegimeError::Internal(_) => "internal",
        }
    }
}

impl fmt::Display for RegimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegimeError::InsufficientData(msg) => {
                write!(f, "Insufficient data: {}", msg)
            }
            RegimeError::DegenerateInput(msg) => {
                write!(f, "Degenerate input: {}", msg)
            }
            RegimeError::MissingColumn(column) => {
                write!(f, "Missing column '{}'", column)
            }
            RegimeError::InvalidParameter(param, reason) => {
                write!(f, "Invalid parameter '{}': {}", param, reason)
            }

            RegimeError::ConfigParse(msg) => {
                write!(f, "Configuration parse error: {}", msg)
            }
            RegimeError::ConfigValidation(msg) => {
                write!(f, "Configuration validation error: {}", msg)
            }

            RegimeError::ApiConnection(msg) => {
                write!(f, "API connection error: {}", msg)
            }
            RegimeError::ApiResponse(msg) => {
                write!(f, "API response error: {}", msg)
            }
            RegimeError::DataParse(msg) => {
                write!(f, "Data parse error: {}", msg)
            }

            RegimeError::FileNotFound(path) => {
                write!(f, "File not found: {}", path)
            }
            RegimeError::FileRead(msg) => {
                write!(f, "File read error: {}", msg)
            }
            RegimeError::FileWrite(msg) => {
                write!(f, "File write error: {}", msg)
            }

            RegimeError::Internal(msg) => {
                write!(f, "Internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for RegimeError {}

// Conversion implementations for common error types

impl From<io::Error> for RegimeError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => RegimeError::FileNotFound(err.to_string()),
            io::ErrorKind::PermissionDenied => RegimeError::FileRead(err.to_string()),
            _ => RegimeError::Internal(format!("IO error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for RegimeError {
    fn from(err: serde_json::Error) -> Self {
        RegimeError::DataParse(format!("JSON parse error: {}", err))
    }
}

impl From<toml::de::Error> for RegimeError {
    fn from(err: toml::de::Error) -> Self {
        RegimeError::ConfigParse(format!("TOML parse error: {}", err))
    }
}

impl From<crate::config::ConfigError> for RegimeError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::FileRead(msg) => RegimeError::FileRead(msg),
            ConfigError::FileWrite(msg) => RegimeError::FileWrite(msg),
            ConfigError::Parse(msg) => RegimeError::ConfigParse(msg),
            ConfigError::Serialize(msg) => RegimeError::Internal(msg),
            ConfigError::Validation(msg) => RegimeError::ConfigValidation(msg),
        }
    }
}

impl From<crate::data::kraken_api::KrakenApiError> for RegimeError {
    fn from(err: crate::data::kraken_api::KrakenApiError) -> Self {
        use crate::data::kraken_api::KrakenApiError;
        match err {
            KrakenApiError::NetworkError(msg) => RegimeError::ApiConnection(msg),
            KrakenApiError::HttpError(status) => {
                RegimeError::ApiResponse(format!("HTTP status {}", status))
            }
            KrakenApiError::ApiError(msg) => RegimeError::ApiResponse(msg),
            KrakenApiError::ParseError(msg) => RegimeError::DataParse(msg),
            KrakenApiError::InvalidInterval(interval) => RegimeError::InvalidParameter(
                "interval".to_string(),
                format!("unsupported interval '{}'", interval),
            ),
            KrakenApiError::MissingHistory(msg) => RegimeError::InsufficientData(msg),
        }
    }
}

/// Result type alias using RegimeError
pub type RegimeResult<T> = Result<T, RegimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegimeError::MissingColumn("regime".to_string());
        assert_eq!(err.to_string(), "Missing column 'regime'");

        let err = RegimeError::InvalidParameter("window_length".into(), "must be odd".into());
        assert!(err.to_string().contains("window_length"));
    }

    #[test]
    fn test_error_category() {
        assert_eq!(RegimeError::InsufficientData("x".into()).category(), "pipeline");
        assert_eq!(RegimeError::ConfigParse("x".into()).category(), "config");
        assert_eq!(RegimeError::ApiResponse("x".into()).category(), "data");
        assert_eq!(RegimeError::FileWrite("x".into()).category(), "io");
    }

    #[test]
    fn test_user_message() {
        let msg = RegimeError::InsufficientData("12 rows".into()).user_message();
        assert!(msg.contains("12 rows"));
        assert!(msg.contains("💡"));
    }

    #[test]
    fn test_missing_history_is_insufficient_data() {
        use crate::data::kraken_api::KrakenApiError;
        let err: RegimeError = KrakenApiError::MissingHistory("first candle is 2023-11-01".into()).into();
        assert!(matches!(err, RegimeError::InsufficientData(msg) if msg.contains("2023-11-01")));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing.json");
        let err: RegimeError = io_err.into();
        assert!(matches!(err, RegimeError::FileNotFound(_)));
    }
}
