//! Unified error type for the bindicate-lib crate.
//!
//! [`BindicateError`] wraps the BLE stack error and domain-specific error
//! kinds (`Config`, `Encode`). `From` impls allow `?` to propagate across
//! module boundaries seamlessly.

use std::fmt;

/// Unified error type for bindicate-lib operations.
#[derive(Debug)]
pub enum BindicateError {
    /// Bluetooth stack error (adapter, scan, connect, write).
    Ble(btleplug::Error),
    /// Standard I/O error (file read/write, config persistence).
    Io(std::io::Error),
    /// No Bluetooth adapter is available on this host.
    NoAdapter,
    /// The link is not in the `Ready` state; nothing was written.
    NotConnected,
    /// A characteristic write was attempted and failed.
    WriteFailed(String),
    /// Configuration validation error.
    Config(String),
    /// Command encoding error (e.g. missing strip length).
    Encode(String),
}

impl fmt::Display for BindicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindicateError::Ble(e) => write!(f, "Bluetooth error: {e}"),
            BindicateError::Io(e) => write!(f, "I/O error: {e}"),
            BindicateError::NoAdapter => write!(f, "No Bluetooth adapter found"),
            BindicateError::NotConnected => write!(f, "Bluetooth device not connected"),
            BindicateError::WriteFailed(e) => write!(f, "Write failed: {e}"),
            BindicateError::Config(e) => write!(f, "Config error: {e}"),
            BindicateError::Encode(e) => write!(f, "Encode error: {e}"),
        }
    }
}

impl std::error::Error for BindicateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindicateError::Ble(e) => Some(e),
            BindicateError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<btleplug::Error> for BindicateError {
    fn from(e: btleplug::Error) -> Self {
        BindicateError::Ble(e)
    }
}

impl From<std::io::Error> for BindicateError {
    fn from(e: std::io::Error) -> Self {
        BindicateError::Io(e)
    }
}

/// Crate-level Result alias using [`BindicateError`].
pub type Result<T> = std::result::Result<T, BindicateError>;
