use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("{resource} '{name}' not found")]
    NotFound { resource: String, name: String },

    #[error("Unexpected status {status} from {url}: {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode response from {url}: {message}")]
    DecodeError {
        url: String,
        message: String,
        body_preview: String,
    },

    #[error("Invalid next page URL '{url}': {reason}")]
    InvalidNextUrl { url: String, reason: String },

    #[error("Table {table} requires a qual on one of: {}", .columns.join(", "))]
    MissingKeyColumn { table: String, columns: Vec<String> },

    #[error("Unknown column '{column}' for table {table}")]
    UnknownColumn { table: String, column: String },

    #[error("Column '{column}' expects {expected}, got {actual}")]
    ColumnTypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, PluginError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Query,
    Configuration,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PluginError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PluginError::ApiError(_) => ErrorCategory::Network,
            PluginError::NotFound { .. }
            | PluginError::UnexpectedStatus { .. }
            | PluginError::DecodeError { .. }
            | PluginError::InvalidNextUrl { .. } => ErrorCategory::Upstream,
            PluginError::MissingKeyColumn { .. }
            | PluginError::UnknownColumn { .. }
            | PluginError::ColumnTypeMismatch { .. } => ErrorCategory::Query,
            PluginError::ConfigValidationError { .. }
            | PluginError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            PluginError::CsvError(_)
            | PluginError::IoError(_)
            | PluginError::SerializationError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PluginError::NotFound { .. } => ErrorSeverity::Low,
            PluginError::ApiError(_) | PluginError::UnexpectedStatus { .. } => {
                ErrorSeverity::Medium
            }
            PluginError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// True for a 404 from the detail endpoint.
    pub fn is_not_found(&self) -> bool {
        matches!(self, PluginError::NotFound { .. })
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and the configured base_url",
            ErrorCategory::Upstream => "The remote API returned an unexpected response; try again later",
            ErrorCategory::Query => "Check the requested columns and the key column quals",
            ErrorCategory::Configuration => "Fix the configuration file or command line flags",
            ErrorCategory::Output => "Check the output destination is writable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PluginError::ApiError(e) if e.is_timeout() => {
                "The remote API did not respond in time".to_string()
            }
            PluginError::NotFound { resource, name } => {
                format!("No {} named '{}' exists", resource, name)
            }
            PluginError::MissingKeyColumn { columns, .. } => {
                format!("A value for {} is required", columns.join(" or "))
            }
            other => other.to_string(),
        }
    }
}
