//! Error types for pciheader-core

use crate::access::DeviceId;
use thiserror::Error;

/// Boxed error coming out of a bus access backend
pub type BusError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// How a field descriptor breaks the schema layout rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Field width outside 1..=4 bytes
    BadSize,
    /// Offset is lower than the end of the previous field
    Overlap,
    /// Offset leaves a hole after the previous field
    Gap,
    /// Field bytes span two 4-byte read windows
    CrossesWindow,
    /// Name does not fit its column or the 64 character limit
    NameTooLong,
    /// Last entry is not the `End` sentinel at the header span
    MissingSentinel,
    /// The sentinel was handed to the value decoder
    SentinelDecoded,
    /// Field does not start inside the window it was decoded from
    OutsideWindow,
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Self::BadSize => "field size must be 1 to 4 bytes",
            Self::Overlap => "field overlaps the previous field",
            Self::Gap => "field leaves a gap after the previous field",
            Self::CrossesWindow => "field crosses a 4-byte register boundary",
            Self::NameTooLong => "field name does not fit its column",
            Self::MissingSentinel => "schema is not terminated by the End sentinel",
            Self::SentinelDecoded => "End sentinel cannot be decoded",
            Self::OutsideWindow => "field is outside the register window",
        };
        f.write_str(msg)
    }
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Wrong number of command line arguments
    #[error("expected {expected} arguments, got {got}")]
    InvalidArgumentCount {
        /// Number of arguments required
        expected: usize,
        /// Number of arguments supplied
        got: usize,
    },

    /// No device on the bus matches the requested address
    #[error("No device found with {0}")]
    DeviceNotFound(DeviceId),

    /// Failure reported by the bus access layer
    #[error("bus access failed: {0}")]
    BusAccess(#[source] BusError),

    /// A field descriptor breaks the header layout rules
    #[error("schema violation at {field} (offset {offset:#04x}): {violation}")]
    SchemaViolation {
        /// Name of the offending field
        field: &'static str,
        /// Offset of the offending field
        offset: u8,
        /// Which rule was broken
        violation: Violation,
    },
}

impl Error {
    /// Wrap a backend error as a bus access failure
    pub fn bus(err: impl Into<BusError>) -> Self {
        Self::BusAccess(err.into())
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
