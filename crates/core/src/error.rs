use crate::config::ConfigError;

use thiserror::Error;

/// Result type alias for notechat-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types shared by every notechat crate
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-success status from the completion or Notion endpoint.
    ///
    /// The body is kept verbatim so it can be shown to the user as-is.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection-level failure (DNS, refused, reset, body read)
    #[error("transport error: {0}")]
    Transport(String),

    /// A completion response did not have the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A call needed a secret that was never supplied
    #[error("missing secret: {0}")]
    MissingSecret(&'static str),

    /// Parse/serialization errors
    #[error("parse error: {0}")]
    Parse(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build an HTTP error from a status code and response body
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http { status, body: body.into() }
    }

    /// The HTTP status, if this is an HTTP error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
