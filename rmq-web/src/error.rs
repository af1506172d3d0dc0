//! Error types.

use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by processors, handlers and codecs.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error that can be handed out more than once, e.g. by a cached body.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for builder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The builder was configured in a way that cannot produce a request.
    Config,
    /// A request or response processor rejected the exchange.
    Processor,
    /// The transport failed to deliver the request or receive the response.
    Transport,
    /// The request body could not be encoded.
    Encode,
    /// The response body could not be decoded.
    Decode,
    /// The request body source failed.
    Body,
    /// The response body handler failed.
    Handler,
    /// Local I/O failed.
    Io,
    /// The context was cancelled.
    Cancelled,
    /// The context deadline passed.
    Timeout,
}

/// Errors produced while building, sending or handling a request.
#[derive(Debug, Error)]
pub enum Error {
    /// The base URL could not be parsed or the host override was rejected.
    #[error("could not initialize with base URL {url:?}: {source}")]
    InvalidUrl {
        /// The URL text that failed.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },

    /// The scheme override cannot be applied to the base URL.
    #[error("cannot change URL scheme to {0:?}")]
    InvalidScheme(String),

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header {name:?}: {message}")]
    InvalidHeader {
        /// Header name as configured.
        name: String,
        /// What was wrong with it.
        message: String,
    },

    /// More than one one-shot body handler was passed to `invoke_with`.
    #[error("only one response handler allowed")]
    TooManyHandlers,

    /// `body_encode` was used without any request encoding.
    #[error("no request encoder configured")]
    NoEncoder,

    /// A single-use request body was requested a second time.
    #[error("request body was already consumed")]
    BodyConsumed,

    /// A request processor returned an error.
    #[error("request processor failed: {0}")]
    RequestProcessor(#[source] BoxError),

    /// A response processor returned an error.
    #[error("response processor failed: {0}")]
    ResponseProcessor(#[source] BoxError),

    /// Underlying HTTP client error.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// Request body encoding failed.
    #[error("request body encoding failed: {0}")]
    Encode(#[source] SharedError),

    /// Response body decoding failed.
    #[error("decoding the response failed: {0}")]
    Decode(#[source] BoxError),

    /// None of the configured decoders accepts the response content type.
    #[error("no response encoding configured for content type {0:?}")]
    UnsupportedContentType(String),

    /// The request body source returned an error.
    #[error("request body unavailable: {0}")]
    Body(#[source] SharedError),

    /// The response body handler returned an error.
    #[error("response body handler failed: {0}")]
    Handler(#[source] BoxError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The context was cancelled before the operation completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed before the operation completed.
    #[error("deadline exceeded")]
    Timeout,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidUrl { .. }
            | Self::InvalidScheme(_)
            | Self::InvalidHeader { .. }
            | Self::TooManyHandlers
            | Self::NoEncoder
            | Self::BodyConsumed => ErrorKind::Config,
            Self::RequestProcessor(_) | Self::ResponseProcessor(_) => ErrorKind::Processor,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Decode(_) | Self::UnsupportedContentType(_) => ErrorKind::Decode,
            Self::Body(_) => ErrorKind::Body,
            Self::Handler(_) => ErrorKind::Handler,
            Self::Io(_) => ErrorKind::Io,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Timeout => ErrorKind::Timeout,
        }
    }

    /// Check if a request processor caused this error.
    pub fn is_request_processor_error(&self) -> bool {
        matches!(self, Self::RequestProcessor(_))
    }

    /// Check if a response processor caused this error.
    pub fn is_response_processor_error(&self) -> bool {
        matches!(self, Self::ResponseProcessor(_))
    }

    /// Check if any processor caused this error.
    pub fn is_processor_error(&self) -> bool {
        self.kind() == ErrorKind::Processor
    }

    /// Check if this is a timeout, either from the context or the transport.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout) || matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_processor_errors_keep_their_cause() {
        let err = Error::ResponseProcessor("status 418".into());

        assert_eq!(err.kind(), ErrorKind::Processor);
        assert!(err.is_response_processor_error());
        assert!(!err.is_request_processor_error());
        assert_eq!(err.source().map(|e| e.to_string()).as_deref(), Some("status 418"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::TooManyHandlers.kind(), ErrorKind::Config);
        assert_eq!(Error::NoEncoder.kind(), ErrorKind::Config);
        assert_eq!(
            Error::UnsupportedContentType("text/plain".into()).kind(),
            ErrorKind::Decode
        );
        assert_eq!(Error::Cancelled.kind(), ErrorKind::Cancelled);
        assert!(Error::Timeout.is_timeout());
    }
}
