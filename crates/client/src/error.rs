// crates/client/src/error.rs
use std::path::PathBuf;

use stockcart_types::InvalidSessionKey;
use thiserror::Error;

/// Failures of request/response calls and of input validated before them.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: u16,
        /// Error text extracted from the response body, if any.
        message: Option<String>,
    },

    #[error("Unexpected response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid input: {0}")]
    Validation(String),
}

impl ClientError {
    /// Text meant for the user: the server's own message when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            Self::Validation(message) => Some(message),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors reading or writing the persisted session key.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("IO error accessing session key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Invalid(#[from] InvalidSessionKey),
}

impl KeyStoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("{name} must use one of {expected}, got {value}")]
    UnsupportedScheme {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
}
