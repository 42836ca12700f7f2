use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Provider unavailable: {provider}: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("Provider timed out: {provider} after {timeout_ms}ms")]
    ProviderTimeout { provider: String, timeout_ms: u64 },

    #[error("Invalid query: {0}")]
    QueryInvalid(String),

    #[error("Search failed on every path: semantic: {semantic}; structured: {structured}")]
    CombinedSearchFailure {
        semantic: Box<Error>,
        structured: Box<Error>,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn unavailable(provider: impl Into<String>, reason: impl ToString) -> Self {
        Error::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    pub fn timeout(provider: impl Into<String>, timeout: std::time::Duration) -> Self {
        Error::ProviderTimeout {
            provider: provider.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Whether a failure in the semantic branch may advance the fallback chain.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ProviderUnavailable { .. } | Error::ProviderTimeout { .. } | Error::Storage(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
