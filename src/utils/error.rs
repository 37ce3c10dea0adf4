use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to read domain source '{source_name}': {reason}")]
    SourceFetch { source_name: String, reason: String },

    #[error("No valid domains found in '{source_name}'")]
    Validation { source_name: String },

    #[error("URL list '{name}' not found; available lists: {}", format_names(.available))]
    ListNotFound { name: String, available: Vec<String> },

    #[error("Authorization rejected (HTTP {status}) during {operation}")]
    Auth { operation: String, status: u16 },

    #[error("{operation} still failing after {retries} retries: {reason}")]
    Transient {
        operation: String,
        retries: u32,
        reason: String,
    },

    #[error("{operation} rejected with HTTP {status}: {body}")]
    ApiRejected {
        operation: String,
        status: u16,
        body: String,
    },

    #[error(
        "Chunk {chunk}/{total} failed after {retries} retries: {reason} \
         ({applied} chunk(s) already applied, not rolled back)"
    )]
    SyncFailed {
        chunk: usize,
        total: usize,
        applied: usize,
        retries: u32,
        reason: String,
        /// Category of the underlying failure (network, auth, remote list...).
        cause: ErrorCategory,
    },

    #[error("Deploy failed: {reason}")]
    Deploy { reason: String },

    #[error("Unexpected API response for {operation}: {message}")]
    UnexpectedResponse { operation: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Data,
    RemoteList,
    Authentication,
    Network,
    Deploy,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

fn format_names(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

impl SyncError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::SourceFetch { .. } => ErrorCategory::Source,
            SyncError::Validation { .. } | SyncError::CsvError(_) => ErrorCategory::Data,
            SyncError::ListNotFound { .. } | SyncError::UnexpectedResponse { .. } => {
                ErrorCategory::RemoteList
            }
            SyncError::Auth { .. } => ErrorCategory::Authentication,
            SyncError::SyncFailed { cause, .. } => *cause,
            SyncError::Transient { .. } | SyncError::ApiRejected { .. } => ErrorCategory::Network,
            SyncError::Deploy { .. } => ErrorCategory::Deploy,
            SyncError::ConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SyncError::IoError(_) | SyncError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 清單已同步，只有部署失敗；Medium 專屬於此情況
            SyncError::Deploy { .. } => ErrorSeverity::Medium,
            SyncError::IoError(_) | SyncError::SerializationError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            SyncError::SourceFetch { .. } => {
                "Check that the source file exists or that the feed URL is reachable".to_string()
            }
            SyncError::Validation { .. } => {
                "Make sure the source has an 'AdresDomeny' column or one domain per line"
                    .to_string()
            }
            SyncError::ListNotFound { .. } => {
                "Use one of the listed names, or pass -c/--create to create the list".to_string()
            }
            SyncError::Auth { .. } => {
                "Verify the API token and that it has access to the URL list endpoints"
                    .to_string()
            }
            SyncError::Transient { .. } => {
                "The tenant API is overloaded or unreachable; rerun later".to_string()
            }
            SyncError::ApiRejected { .. } | SyncError::UnexpectedResponse { .. } => {
                "Inspect the API response above; the request shape may not match this tenant"
                    .to_string()
            }
            SyncError::SyncFailed {
                cause: ErrorCategory::Authentication,
                applied,
                ..
            } => format!(
                "Verify the API token; {} chunk(s) already on the list, rerun the sync once access is fixed",
                applied
            ),
            SyncError::SyncFailed { applied, .. } if *applied > 0 => {
                "The list is partially updated; rerun the sync to converge".to_string()
            }
            SyncError::SyncFailed { .. } => "Rerun the sync once the API recovers".to_string(),
            SyncError::Deploy { .. } => {
                "List content is updated; deploy pending changes from the console or rerun with -d"
                    .to_string()
            }
            SyncError::ConfigError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. } => {
                "Check the command line flags and the TOML configuration file".to_string()
            }
            SyncError::IoError(_) => "Check file permissions and disk state".to_string(),
            SyncError::CsvError(_) => "Check the tabular source for malformed rows".to_string(),
            SyncError::SerializationError(_) => {
                "Unexpected JSON payload; rerun with --verbose for details".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::ListNotFound { name, available } => format!(
                "URL list '{}' does not exist. Available lists: {}",
                name,
                format_names(available)
            ),
            SyncError::Auth { status, .. } => {
                format!("Authorization failed (HTTP {}). Check the API token.", status)
            }
            SyncError::SyncFailed {
                chunk,
                total,
                applied,
                ..
            } => format!(
                "Sync aborted at chunk {}/{}; {} chunk(s) were applied and remain on the list",
                chunk, total, applied
            ),
            other => other.to_string(),
        }
    }
}
