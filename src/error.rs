//! Error taxonomy for the acquisition and decode pipeline
//!
//! Only [`DeviceError`] and [`DecodeError::InvalidImage`] ever reach a caller,
//! and even those arrive folded into a [`crate::ScanReport`]. Read misses and
//! validation failures are recovered inside the scan loop.

use std::path::PathBuf;

/// Failure to acquire a capture device
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// No device answers at this index
    #[error("no capture device at index {0}")]
    Unavailable(u32),
    /// The device is already held by another session
    #[error("capture device {0} is already in use")]
    Busy(u32),
    /// The driver rejected the request
    #[error("capture backend failure: {0}")]
    Backend(String),
}

/// Failure to pull a frame from an open source
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// Nothing available on this poll; try again
    #[error("no frame available")]
    NoFrame,
    /// The source will never produce another frame
    #[error("frame source exhausted")]
    Exhausted,
}

/// Failure to turn input bytes into a frame
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Corrupt or unsupported image container
    #[error("invalid image: {0}")]
    InvalidImage(String),
    /// Container decoded to a zero-sized raster
    #[error("image has no pixels")]
    EmptyFrame,
}

/// Post-decode rejection of a payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// EAN-13 check digit does not match the first twelve digits
    #[error("check digit mismatch: expected {expected}, found {found}")]
    ChecksumMismatch {
        /// Check digit computed from the payload
        expected: u8,
        /// Check digit carried by the payload
        found: u8,
    },
    /// Wrong length, charset or encoding for the symbology
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Failure to load a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file {0}: {1}")]
    ReadFile(PathBuf, std::io::Error),
    /// The file is not valid TOML for [`crate::ScanConfig`]
    #[error("failed to parse config: {0}")]
    Parse(String),
}
