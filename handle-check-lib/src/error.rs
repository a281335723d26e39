//! Error handling for handle checking operations.
//!
//! Two layers live here. `HandleCheckError` covers failures of the run as a
//! whole (bad input file, unusable config, client construction). `FetchFailure`
//! is the typed outcome of one HTTP attempt against one handle; the retry
//! state machine matches on its variants instead of re-parsing exception text.

use std::fmt;

/// Main error type for handle checking operations.
///
/// These are the failures that abort an operation and surface to the caller,
/// as opposed to per-attempt failures which are folded into a status.
#[derive(Debug, Clone)]
pub enum HandleCheckError {
    /// Invalid handle name (empty after trimming, etc.)
    InvalidHandle { name: String, reason: String },

    /// File I/O errors when reading handle lists or writing partitions
    FileError { path: String, message: String },

    /// Configuration errors (invalid settings, unparseable config file)
    ConfigError { message: String },

    /// Network-level errors outside a single attempt (client construction)
    NetworkError { message: String, source: Option<String> },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl HandleCheckError {
    /// Create a new invalid handle error.
    pub fn invalid_handle<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Self::InvalidHandle {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl fmt::Display for HandleCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandle { name, reason } => {
                write!(f, "Invalid handle '{}': {}", name, reason)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for HandleCheckError {}

impl From<std::io::Error> for HandleCheckError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<serde_json::Error> for HandleCheckError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}

/// Typed outcome of a single failed fetch attempt.
///
/// Transient variants feed the backoff loop; `Unexpected` short-circuits it.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchFailure {
    /// The request exceeded the configured deadline.
    Timeout,

    /// The service answered HTTP 429.
    RateLimited,

    /// Any other non-2xx HTTP response.
    HttpStatus(u16),

    /// Connection-level failure (refused, reset, DNS, ...).
    Network(String),

    /// Anything that doesn't look like transient network noise.
    Unexpected(String),
}

impl FetchFailure {
    /// Whether this failure kind should be retried with backoff.
    ///
    /// Everything except `Unexpected` is treated as transient: rate limiting
    /// and server errors clear up, timeouts and resets are network weather.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Unexpected(_))
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::RateLimited => write!(f, "rate limited (HTTP 429)"),
            Self::HttpStatus(code) => write!(f, "HTTP error {}", code),
            Self::Network(message) => write!(f, "network error: {}", message),
            Self::Unexpected(message) => write!(f, "unexpected error: {}", message),
        }
    }
}

impl From<reqwest::Error> for FetchFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() || err.is_request() || err.is_body() || err.is_decode() {
            Self::Network(err.to_string())
        } else {
            Self::Unexpected(err.to_string())
        }
    }
}
