use thiserror::Error;

#[derive(Error, Debug)]
pub enum FarmError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input '{value}' for field '{field}': {reason}")]
    InvalidFieldError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Location unavailable: {reason}")]
    LocationUnavailable { reason: String },

    #[error("Market data fetch failed: {message}")]
    MarketFetchError { message: String },

    #[error("Not enough data: {needed} points needed, {got} available")]
    InsufficientData { needed: usize, got: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    System,
    Configuration,
    Input,
    Location,
    MarketData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FarmError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FarmError::IoError(_) | FarmError::SerializationError(_) => ErrorCategory::System,
            FarmError::ConfigError { .. }
            | FarmError::ConfigValidationError { .. }
            | FarmError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            FarmError::InvalidFieldError { .. } => ErrorCategory::Input,
            FarmError::LocationUnavailable { .. } => ErrorCategory::Location,
            FarmError::MarketFetchError { .. } | FarmError::InsufficientData { .. } => {
                ErrorCategory::MarketData
            }
        }
    }

    /// Location errors fall back to the default reference and are not failures.
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Location => ErrorSeverity::Low,
            ErrorCategory::MarketData => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FarmError::MarketFetchError { .. })
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            FarmError::IoError(_) => "Check that the file exists and is readable".to_string(),
            FarmError::SerializationError(_) => "Check the JSON payload format".to_string(),
            FarmError::ConfigError { .. } | FarmError::ConfigValidationError { .. } => {
                "Review the TOML configuration file".to_string()
            }
            FarmError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the configuration", field)
            }
            FarmError::InvalidFieldError { field, .. } => {
                format!("Enter a valid value for '{}'", field)
            }
            FarmError::LocationUnavailable { .. } => {
                "Allow location access or pass --latitude/--longitude".to_string()
            }
            FarmError::MarketFetchError { .. } => "Retry the market refresh".to_string(),
            FarmError::InsufficientData { .. } => {
                "Wait for more market history before computing variations".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::System => format!("Unexpected system error: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Invalid input: {}", self),
            ErrorCategory::Location => {
                "Could not get your location; using the default reference point".to_string()
            }
            ErrorCategory::MarketData => format!("Market data unavailable: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, FarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_errors_are_low_severity() {
        let err = FarmError::LocationUnavailable {
            reason: "permission denied".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Location);
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_market_fetch_is_retryable() {
        let err = FarmError::MarketFetchError {
            message: "timeout".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("timeout"));
    }

    #[test]
    fn test_invalid_field_suggestion_names_field() {
        let err = FarmError::InvalidFieldError {
            field: "latitude".to_string(),
            value: "abc".to_string(),
            reason: "not a number".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.recovery_suggestion().contains("latitude"));
    }
}
