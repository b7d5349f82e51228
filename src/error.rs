//! Error types for webcam discovery

use thiserror::Error;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for discovery operations
#[derive(Error, Debug)]
pub enum Error {
    /// A single device handle failed to open, close or report properties
    #[error("Driver error: {0}")]
    Driver(String),

    /// A requested device does not exist in the registry
    #[error("Camera device not found: {0}")]
    DeviceNotFound(String),

    /// The device registry could not be cleared or rescanned
    #[error("Device registry error: {0}")]
    Registry(String),

    /// Attributes could not be projected into the generic key/value form
    #[error("Attribute serialization failed: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Other(format!("Discovery task failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_errors_are_serialization_defects() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(Error::from(err), Error::Serialization(_)));
    }

    #[test]
    fn test_display() {
        let err = Error::Registry("rescan failed".to_string());
        assert_eq!(err.to_string(), "Device registry error: rescan failed");
    }
}
