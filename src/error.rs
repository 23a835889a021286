//! Error types for the content client.

use std::fmt;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by the client.
///
/// Only validation and transport failures ever reach the caller. Storage
/// failures (quota, unavailable backend, corrupted entries) are absorbed by
/// the storage adapters and the [`Cache`](crate::cache::Cache) and show up as
/// cache misses instead.
#[derive(Debug, Clone)]
pub enum Error {
    /// An argument failed validation before any I/O happened.
    ///
    /// Raised for malformed project ids, collection slugs, asset ids, item
    /// ids, locales, and non-positive transform dimensions. Never retried.
    InvalidArgument(String),

    /// The remote service answered with a non-2xx status.
    ///
    /// `message` is the best human-readable message found in the response
    /// body, or the status line when the body has none.
    Http {
        /// HTTP status code
        status: u16,
        /// Extracted message
        message: String,
        /// Parsed JSON body, when the body was JSON
        details: Option<serde_json::Value>,
    },

    /// The request did not complete within the configured timeout.
    Timeout(String),

    /// The request failed before a response was received
    /// (DNS, connection refused, TLS, reset).
    Network(String),

    /// A response body or cached value could not be decoded.
    DeserializationError(String),

    /// A value could not be encoded.
    SerializationError(String),

    /// Client configuration is invalid (e.g. unparsable base URL).
    ConfigError(String),
}

impl Error {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a 404-class response.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::Http {
                status, message, ..
            } => write!(f, "HTTP {}: {}", status, message),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::Network(msg) => write!(f, "Network error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::Network(e.to_string())
        } else if e.is_syntax() || e.is_data() || e.is_eof() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if e.is_decode() {
            Error::DeserializationError(e.to_string())
        } else if e.is_builder() {
            Error::ConfigError(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidArgument("bad slug".to_string());
        assert_eq!(err.to_string(), "Invalid argument: bad slug");

        let err = Error::Http {
            status: 500,
            message: "boom".to_string(),
            details: None,
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }

    #[test]
    fn test_not_found_detection() {
        let not_found = Error::Http {
            status: 404,
            message: "missing".to_string(),
            details: None,
        };
        assert!(not_found.is_not_found());
        assert_eq!(not_found.status(), Some(404));

        let timeout = Error::Timeout("10s".to_string());
        assert!(!timeout.is_not_found());
        assert!(timeout.is_timeout());
        assert_eq!(timeout.status(), None);
    }

    #[test]
    fn test_error_from_json() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::DeserializationError(_)));
    }
}
