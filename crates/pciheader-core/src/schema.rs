//! PCI configuration header layouts
//!
//! The first 64 bytes of every PCI function's configuration space follow one
//! of a few fixed layouts, selected by the header type register at 0x0E.
//! Each layout is described here as plain data: an ordered table of
//! [`FieldDescriptor`]s terminated by an `End` sentinel sitting at the header
//! span (0x40). Nothing in the decoder or renderer knows about individual
//! registers; they only walk these tables.
//!
//! Both built-in tables are checked at compile time by [`check_layout`], so a
//! bad edit (overlap, gap, a field straddling a 32-bit register) fails the
//! build instead of producing a garbled table.

use crate::error::{Error, Result, Violation};

/// Size of the standard header, also the offset of the `End` sentinel
pub const HEADER_END: u8 = 0x40;

/// Offset of the header type register
pub const HEADER_TYPE_REG: u8 = 0x0E;

/// Width of one configuration space read (a dword)
pub const REGISTER_WIDTH: u8 = 4;

/// Size value reserved for the `End` sentinel
pub const SENTINEL_SIZE: u8 = 5;

/// Longest register name a descriptor may carry
pub const MAX_NAME_LEN: usize = 64;

/// Column width in characters for a field `size` bytes wide
///
/// Every byte gets 14 characters, plus one separator between adjacent bytes,
/// so a 4-byte field spans the same 59 characters as four 1-byte fields.
pub const fn column_width(size: u8) -> usize {
    14 * size as usize + (size as usize).saturating_sub(1)
}

/// A named register inside the configuration header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Register name as printed in the table
    pub name: &'static str,
    /// Byte offset from the start of configuration space
    pub offset: u8,
    /// Width in bytes (1-4, or [`SENTINEL_SIZE`] for the terminator)
    pub size: u8,
}

impl FieldDescriptor {
    /// Create a new descriptor
    pub const fn new(name: &'static str, offset: u8, size: u8) -> Self {
        Self { name, offset, size }
    }

    /// Returns true for the `End` terminator entry
    pub const fn is_sentinel(&self) -> bool {
        self.size == SENTINEL_SIZE
    }

    /// One past the last byte covered by this field
    pub const fn end(&self) -> u16 {
        self.offset as u16 + self.size as u16
    }

    /// Aligned address of the dword holding the first byte of this field
    pub const fn window(&self) -> u8 {
        self.offset & !(REGISTER_WIDTH - 1)
    }

    /// Column width used for this field in the rendered table
    pub const fn column_width(&self) -> usize {
        column_width(self.size)
    }
}

const fn field(name: &'static str, offset: u8, size: u8) -> FieldDescriptor {
    FieldDescriptor::new(name, offset, size)
}

const END: FieldDescriptor = field("End", HEADER_END, SENTINEL_SIZE);

/// Header type 0 (general device / endpoint)
pub const TYPE0_FIELDS: &[FieldDescriptor] = &[
    field("Vendor ID", 0x00, 2),
    field("Device ID", 0x02, 2),
    field("Command", 0x04, 2),
    field("Status", 0x06, 2),
    field("Revision ID", 0x08, 1),
    field("Class Code", 0x09, 3),
    field("Cache Line S", 0x0C, 1),
    field("Lat. Timer", 0x0D, 1),
    field("Header Type", 0x0E, 1),
    field("BIST", 0x0F, 1),
    field("BAR 0", 0x10, 4),
    field("BAR 1", 0x14, 4),
    field("BAR 2", 0x18, 4),
    field("BAR 3", 0x1C, 4),
    field("BAR 4", 0x20, 4),
    field("BAR 5", 0x24, 4),
    field("Cardbus CIS Pointer", 0x28, 4),
    field("Subsystem Vendor ID", 0x2C, 2),
    field("Subsystem ID", 0x2E, 2),
    field("Expansion ROM Address", 0x30, 4),
    field("Cap. Pointer", 0x34, 1),
    field("Reserved", 0x35, 3),
    field("Reserved", 0x38, 4),
    field("IRQ", 0x3C, 1),
    field("IRQ Pin", 0x3D, 1),
    field("Min Gnt.", 0x3E, 1),
    field("Max Lat.", 0x3F, 1),
    END,
];

/// Header type 1 (PCI-to-PCI bridge)
pub const TYPE1_FIELDS: &[FieldDescriptor] = &[
    field("Vendor ID", 0x00, 2),
    field("Device ID", 0x02, 2),
    field("Command", 0x04, 2),
    field("Status", 0x06, 2),
    field("Revision ID", 0x08, 1),
    field("Class Code", 0x09, 3),
    field("Cache Line S", 0x0C, 1),
    field("Lat. Timer", 0x0D, 1),
    field("Header Type", 0x0E, 1),
    field("BIST", 0x0F, 1),
    field("BAR 0", 0x10, 4),
    field("BAR 1", 0x14, 4),
    field("Primary Bus", 0x18, 1),
    field("Secondary Bus", 0x19, 1),
    field("Sub Bus", 0x1A, 1),
    field("Sec Lat timer", 0x1B, 1),
    field("IO Base", 0x1C, 1),
    field("IO Limit", 0x1D, 1),
    field("Sec. Status", 0x1E, 2),
    field("Memory Base", 0x20, 2),
    field("Memory Limit", 0x22, 2),
    field("Pref. Memory Base", 0x24, 2),
    field("Pref. Memory Limit", 0x26, 2),
    field("Pref. Memory Base U", 0x28, 4),
    field("Pref. Memory Limit U", 0x2C, 4),
    field("IO Base Upper", 0x30, 2),
    field("IO Limit Upper", 0x32, 2),
    field("Cap. Pointer", 0x34, 1),
    field("Reserved", 0x35, 3),
    field("Exp. ROM Base Addr", 0x38, 4),
    field("IRQ Line", 0x3C, 1),
    field("IRQ Pin", 0x3D, 1),
    field("Bridge Control", 0x3E, 2),
    END,
];

const _: () = assert!(check_layout(TYPE0_FIELDS).is_none());
const _: () = assert!(check_layout(TYPE1_FIELDS).is_none());

/// Check a descriptor table against the layout rules
///
/// Returns the index of the first offending entry and the rule it breaks.
/// Usable in const context so the built-in tables are checked at build time.
pub const fn check_layout(fields: &[FieldDescriptor]) -> Option<(usize, Violation)> {
    if fields.is_empty() {
        return Some((0, Violation::MissingSentinel));
    }
    let last = fields.len() - 1;
    if !fields[last].is_sentinel() || fields[last].offset != HEADER_END {
        return Some((last, Violation::MissingSentinel));
    }

    let mut expected: u16 = 0;
    let mut i = 0;
    while i < fields.len() {
        let f = &fields[i];
        if i < last {
            if f.size == 0 || f.size > REGISTER_WIDTH {
                return Some((i, Violation::BadSize));
            }
            let len = f.name.len();
            if len > MAX_NAME_LEN || len > f.column_width() {
                return Some((i, Violation::NameTooLong));
            }
        }
        if (f.offset as u16) < expected {
            return Some((i, Violation::Overlap));
        }
        if (f.offset as u16) > expected {
            return Some((i, Violation::Gap));
        }
        if i < last {
            let width = REGISTER_WIDTH as u16;
            if f.offset as u16 / width != (f.end() - 1) / width {
                return Some((i, Violation::CrossesWindow));
            }
        }
        expected = f.end();
        i += 1;
    }
    None
}

/// Header layout variant, chosen by bit 0 of the header type register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    /// Type 0 header (general device)
    Endpoint,
    /// Type 1 header (PCI-to-PCI bridge)
    Bridge,
}

impl HeaderKind {
    /// Select the header kind from a raw header type register value
    ///
    /// Only bit 0 is examined; the multi-function bit and the remaining
    /// layout bits are ignored.
    pub const fn from_header_type(header_type: u8) -> Self {
        match header_type & 0x1 {
            0 => Self::Endpoint,
            _ => Self::Bridge,
        }
    }

    /// The descriptor table for this header kind
    pub const fn schema(self) -> Schema {
        match self {
            Self::Endpoint => Schema::TYPE0,
            Self::Bridge => Schema::TYPE1,
        }
    }

    /// Human readable name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Endpoint => "Endpoint",
            Self::Bridge => "Bridge",
        }
    }

    /// Name with its indefinite article ("an Endpoint", "a Bridge")
    pub const fn with_article(self) -> &'static str {
        match self {
            Self::Endpoint => "an Endpoint",
            Self::Bridge => "a Bridge",
        }
    }
}

impl core::fmt::Display for HeaderKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the schema for a header type bit (0 = endpoint, 1 = bridge)
pub const fn schema_for(header_type_bit: u8) -> Schema {
    HeaderKind::from_header_type(header_type_bit).schema()
}

/// An ordered, sentinel-terminated table of field descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    fields: &'static [FieldDescriptor],
}

impl Schema {
    /// Endpoint layout
    pub const TYPE0: Schema = Schema {
        fields: TYPE0_FIELDS,
    };

    /// Bridge layout
    pub const TYPE1: Schema = Schema {
        fields: TYPE1_FIELDS,
    };

    /// Wrap a custom descriptor table
    ///
    /// The table is not checked here; call [`Schema::validate`] before use.
    pub const fn new(fields: &'static [FieldDescriptor]) -> Self {
        Self { fields }
    }

    /// All descriptors, sentinel included
    pub const fn fields(&self) -> &'static [FieldDescriptor] {
        self.fields
    }

    /// Number of descriptors, sentinel included
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the table has no entries at all
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over the real registers, stopping before the sentinel
    pub fn registers(&self) -> impl Iterator<Item = &'static FieldDescriptor> {
        self.fields.iter().take_while(|f| !f.is_sentinel())
    }

    /// Total header span, taken from the sentinel offset
    pub fn span(&self) -> Option<u8> {
        self.fields
            .last()
            .filter(|f| f.is_sentinel())
            .map(|f| f.offset)
    }

    /// Look a register up by name (first match)
    pub fn find(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.registers().find(|f| f.name == name)
    }

    /// Check the table against the layout rules
    pub fn validate(&self) -> Result<()> {
        match check_layout(self.fields) {
            None => Ok(()),
            Some((index, violation)) => {
                let (field, offset) = self
                    .fields
                    .get(index)
                    .map(|f| (f.name, f.offset))
                    .unwrap_or(("<empty>", 0));
                Err(Error::SchemaViolation {
                    field,
                    offset,
                    violation,
                })
            }
        }
    }
}

impl core::ops::Index<usize> for Schema {
    type Output = FieldDescriptor;

    fn index(&self, index: usize) -> &Self::Output {
        &self.fields[index]
    }
}
