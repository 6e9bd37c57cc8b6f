//! Error types for the cache abstraction layer.
//!
//! Data-level conditions (absent, expired, corrupt) are never expressed as
//! errors; read paths collapse them into a miss. The variants here cover
//! environment failures and programmer errors only.

use std::fmt;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An instance name or folder failed validation.
    #[error("Invalid cache name {name:?}: {reason}")]
    InvalidName {
        /// The rejected name or folder.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The cache settings are unusable.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// Failed to connect to the cache backend.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// The backend store rejected or failed a command.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },

    /// A filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the operation touched.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A payload could not be encoded for storage.
    #[error("Encoding error: {message}")]
    Encoding {
        /// Description of the encoding failure.
        message: String,
    },

    /// An internal cache error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl CacheError {
    /// Creates a new `InvalidName` error.
    #[must_use]
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a new `Io` error.
    #[must_use]
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an invalid name error.
    #[must_use]
    pub fn is_invalid_name(&self) -> bool {
        matches!(self, Self::InvalidName { .. })
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidName { .. } => ErrorCategory::Validation,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Connection { .. } => ErrorCategory::Infrastructure,
            Self::Backend { .. } => ErrorCategory::Infrastructure,
            Self::Io { .. } => ErrorCategory::Infrastructure,
            Self::Encoding { .. } => ErrorCategory::Encoding,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of cache errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Programmer error rejected at construction.
    Validation,
    /// Unusable settings.
    Configuration,
    /// Environment failure (connection, filesystem).
    Infrastructure,
    /// Payload encoding failure.
    Encoding,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Configuration => write!(f, "configuration"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Encoding => write!(f, "encoding"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::invalid_name("a/b", "contains a path separator");
        assert_eq!(
            err.to_string(),
            "Invalid cache name \"a/b\": contains a path separator"
        );

        let err = CacheError::connection("refused");
        assert_eq!(err.to_string(), "Connection error: refused");

        let err = CacheError::io(
            "/tmp/cache",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "I/O error at /tmp/cache: denied");
    }

    #[test]
    fn test_error_predicates() {
        assert!(CacheError::invalid_name("x", "y").is_invalid_name());
        assert!(!CacheError::invalid_name("x", "y").is_connection());
        assert!(CacheError::connection("down").is_connection());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            CacheError::invalid_name("x", "y").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            CacheError::connection("down").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            CacheError::backend("SET failed").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            CacheError::configuration("bad").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            CacheError::encoding("nan").category(),
            ErrorCategory::Encoding
        );
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Infrastructure.to_string(), "infrastructure");
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
    }
}
