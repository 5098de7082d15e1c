use thiserror::Error;

use crate::types::Origin;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("{origin} backend failed: {message}")]
    Backend { origin: Origin, message: String },

    #[error("{origin} backend timed out after {after_ms} ms")]
    Timeout { origin: Origin, after_ms: u64 },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Request aborted")]
    Aborted,

    #[error("Query superseded by a newer query")]
    Superseded,
}

impl Error {
    pub fn backend(origin: Origin, message: impl Into<String>) -> Self {
        Self::Backend { origin, message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
