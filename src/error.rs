//! Error types for the bridge

pub use crate::protocol::FrameError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse error
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Readiness wait failed with something other than a signal interrupt
    #[error("Readiness wait error: {0}")]
    Wait(#[from] nix::errno::Errno),

    /// Invalid sensor frame
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Unrecoverable error condition reported on a polled handle
    #[error("Unrecoverable error condition on {0}")]
    Device(&'static str),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
