//! Error types for the management API client.

use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

/// Errors returned by [`Client`](crate::Client) calls.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Building, sending or reading the request failed.
    #[error(transparent)]
    Web(#[from] rmq_web::Error),

    /// The management API answered with a status outside 2xx.
    ///
    /// `url` has any password redacted; `body` is what the server sent.
    #[error("request failed: {status} ( url: {url} )")]
    Status {
        status: StatusCode,
        url: String,
        body: Bytes,
    },

    /// A body could not be parsed or serialized as JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A caller-supplied value was rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The setting name is not one of [`Config::KEYS`](crate::Config::KEYS).
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// A binding refers to an exchange or queue missing from the definitions.
    #[error("invalid topology: {0}")]
    Topology(String),

    /// Writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// The HTTP status, for errors returned by the server.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for management API calls.
pub type Result<T> = std::result::Result<T, ApiError>;
