// src/error.rs

//! Unified error handling for the rank synchronization pipeline.

use std::fmt;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// How the retry policy should treat a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    /// Abort immediately, no further attempts.
    Fatal,
    /// Provider asked us to slow down.
    RateLimited,
    /// Timeout, connection failure or server-side hiccup.
    Transient,
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The access token environment variable is not set
    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),

    /// The remote API rejected the token (401)
    #[error("Authentication failed: token is invalid or expired")]
    Auth,

    /// The remote API is rate limiting us (429)
    #[error("Rate limited by remote API")]
    RateLimited,

    /// Any other non-success status code
    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Retry budget exhausted
    #[error("{operation} failed after {attempts} attempts: {last}")]
    ExhaustedRetries {
        operation: String,
        attempts: u32,
        last: Box<AppError>,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap the last failure once the retry budget is spent.
    pub fn exhausted(operation: impl fmt::Display, attempts: u32, last: AppError) -> Self {
        Self::ExhaustedRetries {
            operation: operation.to_string(),
            attempts,
            last: Box::new(last),
        }
    }

    /// Classify this error for the retry policy.
    ///
    /// Only network-level failures and non-auth HTTP statuses are worth
    /// another attempt; everything local is fatal.
    pub fn disposition(&self) -> RetryDisposition {
        match self {
            Self::RateLimited => RetryDisposition::RateLimited,
            Self::Status { .. } => RetryDisposition::Transient,
            Self::Http(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                RetryDisposition::Transient
            }
            Self::Http(e) if e.status().is_some_and(|s| s.is_server_error()) => {
                RetryDisposition::Transient
            }
            _ => RetryDisposition::Fatal,
        }
    }

    /// Whether this error aborts a whole batch rather than a single item.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Auth | Self::MissingCredential(_) => true,
            Self::ExhaustedRetries { last, .. } => last.is_auth(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition() {
        assert_eq!(AppError::Auth.disposition(), RetryDisposition::Fatal);
        assert_eq!(
            AppError::RateLimited.disposition(),
            RetryDisposition::RateLimited
        );
        let status = AppError::Status {
            status: 503,
            body: String::new(),
        };
        assert_eq!(status.disposition(), RetryDisposition::Transient);
        assert_eq!(
            AppError::validation("bad").disposition(),
            RetryDisposition::Fatal
        );
    }

    #[test]
    fn test_exhausted_message() {
        let err = AppError::exhausted("search offset=50", 3, AppError::RateLimited);
        assert_eq!(
            err.to_string(),
            "search offset=50 failed after 3 attempts: Rate limited by remote API"
        );
    }
}
