//! Error types for board operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the board adapter and its hardware providers
#[derive(Error, Debug)]
pub enum BoardError {
    /// A GPIO line, chip or SPI device could not be reserved or opened
    #[error("{resource} unavailable: {reason}")]
    HardwareUnavailable {
        /// What was being acquired, e.g. "LED line gpiochip0:18"
        resource: String,
        /// Underlying cause reported by the kernel interface
        reason: String,
    },

    /// Operation invoked outside its lifecycle window
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Caller passed arguments the operation cannot accept
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// DIO index outside the 0..=5 range of the radio module
    #[error("invalid DIO index {0}, expected 0-5")]
    InvalidDio(u8),

    /// Pin map failed validation or could not be parsed
    #[error("invalid board configuration: {0}")]
    Config(String),

    /// Reading or writing a pin-map file failed
    #[error("failed to access {path}: {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BoardError {
    /// Shorthand for [`BoardError::HardwareUnavailable`]
    pub fn unavailable(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::HardwareUnavailable {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for [`BoardError::InvalidState`]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn is_hardware_unavailable(&self) -> bool {
        matches!(self, Self::HardwareUnavailable { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, BoardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_message() {
        let err = BoardError::unavailable("LED line gpiochip0:18", "Device or resource busy");
        assert!(err.is_hardware_unavailable());
        assert_eq!(
            err.to_string(),
            "LED line gpiochip0:18 unavailable: Device or resource busy"
        );
    }

    #[test]
    fn test_invalid_dio_message() {
        assert_eq!(
            BoardError::InvalidDio(7).to_string(),
            "invalid DIO index 7, expected 0-5"
        );
    }
}
