//! Error types for sysfs PCI access

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Linux sysfs PCI access errors
#[derive(Debug, Error)]
pub enum SysfsError {
    /// The PCI device directory does not exist
    #[error("PCI sysfs directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Listing the device directory failed
    #[error("Failed to scan {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to read sysfs attribute
    #[error("Failed to read sysfs attribute '{}': {source}", .path.display())]
    SysfsRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to parse sysfs attribute
    #[error("Failed to parse sysfs attribute '{}': {value}", .path.display())]
    SysfsParse { path: PathBuf, value: String },

    /// Reading the config file failed
    #[error("Failed to read PCI config at {bdf} reg {register:#x}: {source}")]
    ConfigRead {
        bdf: String,
        register: u8,
        #[source]
        source: io::Error,
    },

    /// Read reaches past the standard header
    #[error("Config read of {len} bytes at {register:#x} is outside the {limit:#x}-byte header")]
    OutOfRange { register: u8, len: usize, limit: u8 },
}

impl From<SysfsError> for pciheader_core::Error {
    fn from(err: SysfsError) -> Self {
        pciheader_core::Error::bus(err)
    }
}

/// Result type for sysfs operations
pub type Result<T> = std::result::Result<T, SysfsError>;
