//! Error types for MailCheck

use thiserror::Error;

/// Main error type for MailCheck
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("DNS query failed: {0}")]
    Dns(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for MailCheck
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Dns(_) => "DNS_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Output(_) => "OUTPUT_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error means the record is absent rather than unreachable
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
