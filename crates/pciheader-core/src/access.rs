//! Bus access abstraction
//!
//! The decoder never talks to hardware directly. Everything it needs from the
//! platform goes through [`BusAccess`]: enumerating functions, reading bytes
//! and dwords of configuration space, and filling in identity details.
//!
//! A backend acquires whatever it needs (sysfs handles, port access, an
//! in-memory image) when it is constructed and releases it when dropped, so
//! holding the value *is* holding the access handle.

use crate::error::Result;
use bitflags::bitflags;

/// Bus/device/function address of a PCI function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    /// Bus number
    pub bus: u8,
    /// Device (slot) number
    pub device: u8,
    /// Function number
    pub function: u8,
}

impl DeviceId {
    /// Create a new device address
    pub const fn new(bus: u8, device: u8, function: u8) -> Self {
        Self {
            bus,
            device,
            function,
        }
    }
}

/// Formats as `bus:device:function` in bare hex, e.g. `0:1f:3`
impl core::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:x}:{:x}:{:x}", self.bus, self.device, self.function)
    }
}

bitflags! {
    /// Which identity details [`BusAccess::fill_info`] should populate
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FillFlags: u32 {
        /// Vendor and device IDs
        const IDENT = 1 << 0;
        /// Class code and revision
        const CLASS = 1 << 1;
    }
}

/// A PCI function as seen by the bus access layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PciDevice {
    /// PCI domain (usually 0)
    pub domain: u16,
    /// Bus/device/function address
    pub id: DeviceId,
    /// Vendor ID
    pub vendor_id: u16,
    /// Device ID
    pub device_id: u16,
    /// Revision ID
    pub revision_id: u8,
    /// Class code (base class, subclass, programming interface)
    pub class: u32,
    /// Details already filled in
    pub known: FillFlags,
}

impl PciDevice {
    /// Create a device with only its address known
    pub fn new(id: DeviceId) -> Self {
        Self {
            domain: 0,
            id,
            vendor_id: 0,
            device_id: 0,
            revision_id: 0,
            class: 0,
            known: FillFlags::empty(),
        }
    }

    /// Check if this device sits at the given address
    pub fn matches(&self, id: DeviceId) -> bool {
        self.id == id
    }

    /// Get the BDF string in lspci notation (`bb:dd.f`)
    pub fn bdf(&self) -> String {
        format!(
            "{:02x}:{:02x}.{:x}",
            self.id.bus, self.id.device, self.id.function
        )
    }
}

/// Access to PCI configuration space
///
/// Offsets are byte offsets into configuration space and must be inside the
/// standard header. `read_long` is only ever called on dword-aligned offsets
/// and returns the value in host order.
pub trait BusAccess {
    /// List every function visible on the bus
    fn enumerate(&mut self) -> Result<Vec<PciDevice>>;

    /// Read one byte of configuration space
    fn read_byte(&mut self, dev: &PciDevice, offset: u8) -> Result<u8>;

    /// Read one aligned dword of configuration space
    fn read_long(&mut self, dev: &PciDevice, offset: u8) -> Result<u32>;

    /// Populate the identity details selected by `flags`
    fn fill_info(&mut self, dev: &mut PciDevice, flags: FillFlags) -> Result<()>;
}

impl<B: BusAccess + ?Sized> BusAccess for &mut B {
    fn enumerate(&mut self) -> Result<Vec<PciDevice>> {
        (**self).enumerate()
    }

    fn read_byte(&mut self, dev: &PciDevice, offset: u8) -> Result<u8> {
        (**self).read_byte(dev, offset)
    }

    fn read_long(&mut self, dev: &PciDevice, offset: u8) -> Result<u32> {
        (**self).read_long(dev, offset)
    }

    fn fill_info(&mut self, dev: &mut PciDevice, flags: FillFlags) -> Result<()> {
        (**self).fill_info(dev, flags)
    }
}

impl<B: BusAccess + ?Sized> BusAccess for Box<B> {
    fn enumerate(&mut self) -> Result<Vec<PciDevice>> {
        (**self).enumerate()
    }

    fn read_byte(&mut self, dev: &PciDevice, offset: u8) -> Result<u8> {
        (**self).read_byte(dev, offset)
    }

    fn read_long(&mut self, dev: &PciDevice, offset: u8) -> Result<u32> {
        (**self).read_long(dev, offset)
    }

    fn fill_info(&mut self, dev: &mut PciDevice, flags: FillFlags) -> Result<()> {
        (**self).fill_info(dev, flags)
    }
}
