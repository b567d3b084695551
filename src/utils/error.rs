use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Format not supported: {format}")]
    UnsupportedSourceFormat { format: String },

    #[error("No data source was given")]
    MissingSource,

    #[error("Bad data source {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Output format not found: {format}")]
    FormatNotFound { format: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Request,
    Upstream,
    Output,
    Internal,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::UnsupportedSourceFormat { .. } | ApiError::MissingSource => {
                ErrorCategory::Request
            }
            ApiError::Fetch { .. } | ApiError::Http(_) | ApiError::Csv(_) => {
                ErrorCategory::Upstream
            }
            ApiError::FormatNotFound { .. } => ErrorCategory::Output,
            ApiError::Serialization(_) | ApiError::Io(_) => ErrorCategory::Internal,
            ApiError::ConfigValidation { .. } | ApiError::InvalidConfigValue { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Output => ErrorSeverity::Low,
            ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Request | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// HTTP status class a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Request => 400,
            ErrorCategory::Upstream => 502,
            ErrorCategory::Output => 404,
            ErrorCategory::Internal | ErrorCategory::Configuration => 500,
        }
    }

    /// Only a missing serializer is left for the caller to surface.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ApiError::FormatNotFound { .. })
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            ApiError::UnsupportedSourceFormat { .. } => {
                "Pass source_format=csv or point source at a .csv/.tsv file".to_string()
            }
            ApiError::MissingSource => "Add a source=<url> parameter to the query".to_string(),
            ApiError::Fetch { .. } | ApiError::Http(_) => {
                "Check that the source URL is reachable and returns data".to_string()
            }
            ApiError::Csv(_) => "Check that the source is well-formed delimited text".to_string(),
            ApiError::FormatNotFound { .. } => "Use format=json, xml or html".to_string(),
            ApiError::Serialization(_) | ApiError::Io(_) => {
                "Retry the request; report the issue if it persists".to_string()
            }
            ApiError::ConfigValidation { field, .. }
            | ApiError::InvalidConfigValue { field, .. } => {
                format!("Fix the '{}' entry in the service configuration", field)
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ApiError::UnsupportedSourceFormat { .. } => "Format not supported".to_string(),
            ApiError::MissingSource => "No data source given".to_string(),
            ApiError::Fetch { .. } | ApiError::Http(_) | ApiError::Csv(_) => {
                "Bad data source".to_string()
            }
            ApiError::FormatNotFound { format } => {
                format!("Output format '{}' is not available", format)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
