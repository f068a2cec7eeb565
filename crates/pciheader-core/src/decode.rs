//! Field extraction from raw register reads
//!
//! Configuration space is read one aligned dword at a time. A register
//! narrower than a dword is pulled out of that window by masking and
//! shifting; the mask is built in 64 bits so that a full 4-byte field
//! (`1 << 32`) does not overflow.

use crate::error::{Error, Result, Violation};
use crate::schema::{FieldDescriptor, REGISTER_WIDTH};

/// One dword of configuration space and the address it was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWindow {
    /// Dword-aligned offset of the read
    pub address: u8,
    /// Raw value in host order
    pub value: u32,
}

impl RegisterWindow {
    /// Create a window for a read at `address`
    pub const fn new(address: u8, value: u32) -> Self {
        Self { address, value }
    }

    /// Returns true if `field` starts inside this window
    pub fn contains(&self, field: &FieldDescriptor) -> bool {
        field.offset >= self.address && (field.offset - self.address) < REGISTER_WIDTH
    }

    /// Extract `field` from this window
    pub fn extract(&self, field: &FieldDescriptor) -> Result<u32> {
        extract(self.value, self.address, field)
    }
}

/// Mask selecting a `size`-byte field that starts `shift_bytes` into a dword
///
/// Callers must have checked `1 <= size` and `size + shift_bytes <= 4`.
const fn field_mask(size: u8, shift_bytes: u8) -> u64 {
    debug_assert!(size >= 1 && size <= REGISTER_WIDTH);
    debug_assert!(size + shift_bytes <= REGISTER_WIDTH);
    ((1u64 << (size as u32 * 8)) - 1) << (8 * shift_bytes as u32)
}

/// Extract `field` from `value`, a dword read at aligned offset `address`
///
/// The field must start inside `[address, address + 4)` and fit entirely in
/// that dword. Anything else is a broken schema and is reported as
/// [`Error::SchemaViolation`] rather than truncated.
pub fn extract(value: u32, address: u8, field: &FieldDescriptor) -> Result<u32> {
    let violation = |violation| Error::SchemaViolation {
        field: field.name,
        offset: field.offset,
        violation,
    };

    if field.is_sentinel() {
        return Err(violation(Violation::SentinelDecoded));
    }
    if field.size == 0 || field.size > REGISTER_WIDTH {
        return Err(violation(Violation::BadSize));
    }
    if field.offset < address || field.offset - address >= REGISTER_WIDTH {
        return Err(violation(Violation::OutsideWindow));
    }
    let shift = field.offset - address;
    if shift + field.size > REGISTER_WIDTH {
        return Err(violation(Violation::CrossesWindow));
    }

    let mask = field_mask(field.size, shift);
    Ok(((value as u64 & mask) >> (8 * shift as u32)) as u32)
}

/// Format `value` as `0x` followed by exactly `2 * size` upper case hex digits
pub fn format_hex(value: u32, size: u8) -> String {
    format!("0x{:0width$X}", value, width = 2 * size as usize)
}
