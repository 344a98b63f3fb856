use thiserror::Error;

use crate::dns::ParseError;
use crate::dns::name::NameError;
use crate::dnssec::TrustAnchorError;

/// Errors that end a validation run without producing a result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("invalid domain name '{input}': {source}")]
    InvalidDomain {
        input: String,
        #[source]
        source: NameError,
    },

    #[error("validation cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid resolver address: {0}")]
    InvalidResolver(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("Invalid trust anchor: {0}")]
    InvalidTrustAnchor(#[from] TrustAnchorError),

    #[error("Failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

/// Transport and protocol failures of a single exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("query timed out after {0} ms")]
    Timeout(u64),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("server returned rcode {0}")]
    ServerFailure(u16),
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err.to_string())
    }
}

impl From<ParseError> for FetchError {
    fn from(err: ParseError) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
