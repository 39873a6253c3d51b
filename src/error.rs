use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Credentials error: {0}")]
    CredentialsError(String),

    #[error("Index registry is empty")]
    EmptyRegistry,

    #[error("Duplicate index name: {0}")]
    DuplicateIndex(String),

    // Quote Source Errors
    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Upstream returned unusable data: {0}")]
    UpstreamDataError(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Insufficient data: need at least 2 points, got {0}")]
    InsufficientData(usize),

    // Store Errors
    #[error("Store read failed: {0}")]
    StoreReadError(String),

    #[error("Store write failed for {key}: {reason}")]
    StoreWriteError {
        key: String,
        reason: String,
    },

    #[error("Store unreachable: {0}")]
    StoreUnreachable(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    // Scheduler Errors
    #[error("Refresh cycle aborted: {0}")]
    CycleAborted(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Whether a fetch that failed with this error is worth another attempt.
    /// Data errors are retried the same way as transport errors.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::TransportError(_)
                | Error::UpstreamDataError(_)
                | Error::SymbolNotFound(_)
                | Error::InsufficientData(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
