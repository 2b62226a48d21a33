//! Centralized error types for the link
//!
//! All link errors are represented by the `LinkError` enum.
//! Use `Result<T>` as shorthand for `std::result::Result<T, LinkError>`.
//!
//! Only the operation-entry errors (`AlreadyConnected`, `DeviceNotFound`,
//! `SocketFailure`, `NotConnected`, `WriteFailed`) ever leave the connection
//! manager. Reader and cleanup failures are absorbed internally.

use std::fmt;
use std::path::PathBuf;

/// All link errors
#[derive(Debug)]
pub enum LinkError {
    // === Connection lifecycle ===
    /// `connect` called while a session is connecting, connected or closing
    AlreadyConnected,
    /// The remote device could not be resolved from its address
    DeviceNotFound { address: String },
    /// Transport-level open/handshake failure
    SocketFailure {
        address: String,
        source: std::io::Error,
    },
    /// `write` attempted without a connected session
    NotConnected,
    /// The stream rejected a write (only with `WriteFailurePolicy::Surface`)
    WriteFailed { source: std::io::Error },

    // === Config ===
    /// Config file could not be read or written
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Invalid config value
    ConfigValidation { field: &'static str, reason: String },
    /// Service identifier is not a UUID
    InvalidServiceId { value: String },
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SocketFailure { source, .. }
            | Self::WriteFailed { source }
            | Self::ConfigRead { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyConnected => write!(f, "Already connected"),
            Self::DeviceNotFound { address } => write!(f, "Device not found: {}", address),
            Self::SocketFailure { address, source } => {
                write!(f, "Socket connection to {} failed: {}", address, source)
            }
            Self::NotConnected => write!(f, "Not connected"),
            Self::WriteFailed { source } => write!(f, "Write failed: {}", source),
            Self::ConfigRead { path, .. } => write!(f, "Cannot access config: {}", path.display()),
            Self::ConfigValidation { field, reason } => {
                write!(f, "Invalid {}: {}", field, reason)
            }
            Self::InvalidServiceId { value } => write!(f, "Invalid service UUID: {}", value),
        }
    }
}

/// Alias for Result with LinkError
pub type Result<T> = std::result::Result<T, LinkError>;
