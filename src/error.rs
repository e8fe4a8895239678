use crate::config::ConfigError;
use thiserror::Error;

/// Categorizes errors for caller decision-making.
///
/// Lightweight, cloneable view of [`Error`] for matching without borrowing
/// the error's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Endpoint specification missing or malformed
    InvalidEndpoint,
    /// No physical connection is available
    NotConnected,
    /// Operation invoked on the wrong object
    InvalidOperation,
    /// Configuration rejected by the builder
    Config,
    /// Collaborator refused a connect or subscribe
    Connection,
    /// No async runtime available
    Runtime,
}

/// Errors that can occur in broker-failover
#[derive(Error, Debug)]
pub enum Error {
    /// Endpoint specification is missing or contains something other than
    /// strings and lists
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Subscribe attempted with no live physical connection
    #[error("Not connected")]
    NotConnected,

    /// Operation is only meaningful on another object (message or subscription)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Configuration validation failed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Protocol client failed to connect or subscribe
    #[error("Connection error: {0}")]
    Connection(String),

    /// Activation requires a Tokio runtime
    #[error("Runtime unavailable: {0}")]
    Runtime(String),
}

impl Error {
    /// Get the kind of this error for decision-making.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidEndpoint(_) => ErrorKind::InvalidEndpoint,
            Error::NotConnected => ErrorKind::NotConnected,
            Error::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Error::Config(_) => ErrorKind::Config,
            Error::Connection(_) => ErrorKind::Connection,
            Error::Runtime(_) => ErrorKind::Runtime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            Error::InvalidEndpoint("x".to_string()).kind(),
            ErrorKind::InvalidEndpoint
        );
        assert_eq!(Error::NotConnected.kind(), ErrorKind::NotConnected);
        assert_eq!(
            Error::from(ConfigError::InvalidInterval("zero".to_string())).kind(),
            ErrorKind::Config
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidOperation("Ack must be called on the message".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid operation: Ack must be called on the message"
        );
        assert_eq!(Error::NotConnected.to_string(), "Not connected");
    }
}
