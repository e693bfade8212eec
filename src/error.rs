//! Error types
//!
//! [`ConfigError`] covers startup failures. [`ServiceError`] classifies a
//! failed request and decides what the client gets to see.

use hyper::StatusCode;
use std::net::AddrParseError;
use thiserror::Error;

/// Startup / configuration failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid address '{addr}': {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("served root '{path}' is unusable: {source}")]
    InvalidRoot {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A request that could not be completed
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Missing file parameter")]
    MissingFileParameter,

    #[error("Invalid file parameter")]
    InvalidFileName,

    #[error("path '{0}' escapes the served root")]
    PathEscapesRoot(String),

    #[error("request body exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("File not found")]
    NotFound,

    #[error("{source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingFileParameter | Self::InvalidFileName | Self::BodyRead(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::PathEscapesRoot(_) => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Write { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text sent back to the client.
    ///
    /// Write failures only carry the OS error text when `expose_details` is set.
    pub fn client_message(&self, expose_details: bool) -> String {
        match self {
            Self::Write { source, .. } if expose_details => source.to_string(),
            Self::Write { .. } => "Internal Server Error".to_string(),
            Self::PathEscapesRoot(_) => "Forbidden".to_string(),
            Self::PayloadTooLarge { .. } => "Payload Too Large".to_string(),
            Self::BodyRead(_) => "Bad Request".to_string(),
            other => other.to_string(),
        }
    }
}
