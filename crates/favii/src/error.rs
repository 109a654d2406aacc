//! Error types for Favii

use thiserror::Error;

/// Errors returned by [`Favii`](crate::Favii) lookups
#[derive(Debug, Error)]
pub enum FaviiError {
    /// Input is not a valid absolute URL
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// URL parsed but carries no host to key the page on
    #[error("Invalid URL: {0} has no host")]
    MissingHost(String),

    /// Fetching the page failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The page body could not be tokenized
    #[error("Failed to tokenize page: {0}")]
    Tokenize(#[from] TokenizeError),

    /// The blocking extraction task panicked or was cancelled
    #[error("Extraction task failed")]
    Extraction(#[source] tokio::task::JoinError),
}

/// Errors raised by a [`Transport`](crate::Transport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// URL has a scheme the transport cannot fetch
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request timed out before the server responded
    #[error("Request timed out")]
    Timeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),
}

impl TransportError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::ConnectError(err)
        } else {
            TransportError::RequestError(err.to_string())
        }
    }
}

/// Errors reported by the token stream, other than end of input
#[derive(Debug, Error)]
pub enum TokenizeError {
    /// Reading the body failed
    #[error("I/O error while reading markup")]
    Io(#[from] std::io::Error),

    /// A single token grew past the configured limit
    #[error("Token exceeds maximum length of {limit} bytes")]
    TokenTooLarge { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TransportError::InvalidUrlScheme.to_string(),
            "Invalid URL: must start with http:// or https://"
        );
        assert_eq!(TransportError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            TokenizeError::TokenTooLarge { limit: 16 }.to_string(),
            "Token exceeds maximum length of 16 bytes"
        );
        assert_eq!(
            FaviiError::MissingHost("mailto:a@b.c".to_string()).to_string(),
            "Invalid URL: mailto:a@b.c has no host"
        );
    }

    #[test]
    fn test_invalid_url_keeps_source() {
        let source = url::Url::parse("lol-lol.com").unwrap_err();
        let err = FaviiError::InvalidUrl {
            url: "lol-lol.com".to_string(),
            source,
        };
        assert_eq!(err.to_string(), "Invalid URL: lol-lol.com");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err = FaviiError::from(TransportError::Timeout);
        assert_eq!(err.to_string(), "Request timed out");
    }
}
