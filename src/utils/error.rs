use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Missing required sheet: {sheet}")]
    MissingSheet { sheet: String },

    #[error("Sheet {sheet} not found")]
    UnknownSheet { sheet: String },

    #[error("Sheet {sheet} is missing required column '{column}'")]
    MissingColumn { sheet: String, column: String },

    #[error("Sheet {sheet} has no data rows")]
    EmptySheet { sheet: String },

    #[error("Invalid value '{value}' in {sheet}.{column} (row {row})")]
    InvalidCell {
        sheet: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("Unsupported workbook format: {path}")]
    UnsupportedFormat { path: String },

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("{provider} request failed ({kind:?}): {message}")]
    LlmError {
        provider: String,
        kind: LlmErrorKind,
        message: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    RateLimit,
    QuotaExceeded,
    InvalidApiKey,
    ModelNotFound,
    ServerError,
    NetworkError,
    EmptyResponse,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Network,
    Model,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl InsightError {
    pub fn llm(provider: &str, kind: LlmErrorKind, message: impl Into<String>) -> Self {
        InsightError::LlmError {
            provider: provider.to_string(),
            kind,
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            InsightError::ConfigError { .. }
            | InsightError::MissingConfigError { .. }
            | InsightError::InvalidConfigValueError { .. }
            | InsightError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            InsightError::MissingSheet { .. }
            | InsightError::UnknownSheet { .. }
            | InsightError::MissingColumn { .. }
            | InsightError::EmptySheet { .. }
            | InsightError::InvalidCell { .. }
            | InsightError::UnsupportedFormat { .. }
            | InsightError::SpreadsheetError(_)
            | InsightError::CsvError(_) => ErrorCategory::Input,
            InsightError::ApiError(_) => ErrorCategory::Network,
            InsightError::LlmError { kind, .. } => match kind {
                LlmErrorKind::NetworkError => ErrorCategory::Network,
                LlmErrorKind::InvalidApiKey => ErrorCategory::Configuration,
                _ => ErrorCategory::Model,
            },
            InsightError::ZipError(_) | InsightError::IoError(_) => ErrorCategory::Storage,
            InsightError::SerializationError(_)
            | InsightError::InvalidDimension { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            InsightError::LlmError { kind, .. } => match kind {
                LlmErrorKind::RateLimit
                | LlmErrorKind::ServerError
                | LlmErrorKind::NetworkError
                | LlmErrorKind::EmptyResponse => ErrorSeverity::Medium,
                _ => ErrorSeverity::High,
            },
            InsightError::ApiError(_) => ErrorSeverity::Medium,
            InsightError::IoError(_) | InsightError::ZipError(_) => ErrorSeverity::Critical,
            InsightError::InvalidDimension { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            InsightError::LlmError { kind, .. } => matches!(
                kind,
                LlmErrorKind::RateLimit | LlmErrorKind::ServerError | LlmErrorKind::NetworkError
            ),
            InsightError::ApiError(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            InsightError::MissingSheet { sheet } => format!(
                "Add a '{}' sheet to the workbook (sheet names are case-sensitive)",
                sheet
            ),
            InsightError::UnknownSheet { .. } => {
                "Use one of the sheet names listed by the summary command".to_string()
            }
            InsightError::MissingColumn { column, .. } => {
                format!("Add a '{}' header to the first row of the sheet", column)
            }
            InsightError::EmptySheet { .. } => {
                "Make sure the sheet has at least one data row below the header".to_string()
            }
            InsightError::InvalidCell { .. } => {
                "Fix the cell value; dates should look like 2024-03-31".to_string()
            }
            InsightError::UnsupportedFormat { .. } => {
                "Provide an .xlsx/.xls/.ods workbook, a .zip of CSV sheets or a directory of CSV sheets"
                    .to_string()
            }
            InsightError::LlmError { kind, .. } => match kind {
                LlmErrorKind::InvalidApiKey => {
                    "Check GEMINI_API_KEY or the [llm].api_key setting".to_string()
                }
                LlmErrorKind::RateLimit => "Wait a moment and try again".to_string(),
                LlmErrorKind::QuotaExceeded => {
                    "The API quota is exhausted; try another model or later".to_string()
                }
                LlmErrorKind::ModelNotFound => {
                    "Set [llm].model to a model available for your key".to_string()
                }
                LlmErrorKind::ServerError | LlmErrorKind::NetworkError => {
                    "Check the network connection and retry".to_string()
                }
                LlmErrorKind::EmptyResponse | LlmErrorKind::Other => {
                    "Retry the request; run with --verbose for details".to_string()
                }
            },
            InsightError::ApiError(_) => "Check the network connection and retry".to_string(),
            InsightError::MissingConfigError { field } => {
                format!("Set '{}' in the config file or environment", field)
            }
            InsightError::ConfigError { .. }
            | InsightError::InvalidConfigValueError { .. }
            | InsightError::ConfigValidationError { .. } => {
                "Review the configuration file and command-line flags".to_string()
            }
            InsightError::IoError(_) | InsightError::ZipError(_) => {
                "Check file paths and permissions".to_string()
            }
            InsightError::SpreadsheetError(_) | InsightError::CsvError(_) => {
                "Make sure the workbook is not corrupted or password-protected".to_string()
            }
            InsightError::SerializationError(_)
            | InsightError::InvalidDimension { .. } => {
                "Run with --verbose and report the log output".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Could not read the workbook: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Model => format!("The AI model request failed: {}", self),
            ErrorCategory::Storage => format!("File system problem: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
        }
    }
}

impl From<toml::de::Error> for InsightError {
    fn from(e: toml::de::Error) -> Self {
        InsightError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
