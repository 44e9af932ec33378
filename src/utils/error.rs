use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Failed to parse spreadsheet: {message}")]
    ParseError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Delivery failed for {failed} of {total} events")]
    DeliveryError { failed: usize, total: usize },

    #[error("Server error: {message}")]
    ServerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Input,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl RelayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::HttpError(_) | RelayError::DeliveryError { .. } => ErrorCategory::Network,
            RelayError::CsvError(_)
            | RelayError::ParseError { .. }
            | RelayError::ValidationError { .. }
            | RelayError::SerializationError(_) => ErrorCategory::Input,
            RelayError::ConfigError { .. }
            | RelayError::ConfigValidationError { .. }
            | RelayError::InvalidConfigValueError { .. }
            | RelayError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RelayError::IoError(_) | RelayError::ServerError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RelayError::HttpError(_) => "Check that the target URL is reachable and try again",
            RelayError::DeliveryError { .. } => {
                "Check the failed events listed above; only those rows need to be sent again"
            }
            RelayError::CsvError(_) | RelayError::ParseError { .. } => {
                "Export the first worksheet as CSV with a header row and at least one data row"
            }
            RelayError::ValidationError { .. } => "Fix the listed rows and upload the file again",
            RelayError::SerializationError(_) => "Check that the request body is valid JSON",
            RelayError::ConfigError { .. }
            | RelayError::ConfigValidationError { .. }
            | RelayError::InvalidConfigValueError { .. }
            | RelayError::MissingConfigError { .. } => {
                "Review the configuration file and command line flags"
            }
            RelayError::IoError(_) => "Check that the file exists and is readable",
            RelayError::ServerError { .. } => "Check the bind address and that the port is free",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RelayError::HttpError(e) => format!("Could not reach the target endpoint: {}", e),
            RelayError::CsvError(e) => format!("The uploaded file could not be read: {}", e),
            RelayError::ParseError { message } => message.clone(),
            RelayError::MissingConfigError { field } => {
                format!("The setting '{}' is required", field)
            }
            RelayError::InvalidConfigValueError { field, reason, .. } => {
                format!("The setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
