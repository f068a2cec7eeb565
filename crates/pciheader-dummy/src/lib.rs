//! pciheader-dummy - In-memory PCI bus emulator for testing
//!
//! This crate provides a bus access backend that serves configuration space
//! from memory. It's useful for testing and development without touching
//! real hardware, and for trying the tool on machines without sysfs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pciheader_core::schema::{HEADER_END, HEADER_TYPE_REG, REGISTER_WIDTH};
use pciheader_core::{BusAccess, DeviceId, Error, FillFlags, PciDevice, Result};

/// Size of one emulated configuration space
pub const CONFIG_SIZE: usize = 256;

/// An emulated PCI function
#[derive(Debug, Clone)]
pub struct DummyFunction {
    /// PCI domain
    pub domain: u16,
    /// Bus/device/function address
    pub id: DeviceId,
    config: [u8; CONFIG_SIZE],
}

impl DummyFunction {
    /// Create a function whose configuration space is all zeros
    pub fn new(id: DeviceId) -> Self {
        Self {
            domain: 0,
            id,
            config: [0; CONFIG_SIZE],
        }
    }

    /// Create a type 0 function with the given IDs
    pub fn endpoint(id: DeviceId, vendor_id: u16, device_id: u16) -> Self {
        Self::new(id)
            .with_u16(0x00, vendor_id)
            .with_u16(0x02, device_id)
            .with_u8(HEADER_TYPE_REG, 0x00)
    }

    /// Create a type 1 function bridging `primary` to `secondary..=subordinate`
    pub fn bridge(
        id: DeviceId,
        vendor_id: u16,
        device_id: u16,
        primary: u8,
        secondary: u8,
        subordinate: u8,
    ) -> Self {
        Self::new(id)
            .with_u16(0x00, vendor_id)
            .with_u16(0x02, device_id)
            .with_u8(HEADER_TYPE_REG, 0x01)
            .with_class(0x06_0400)
            .with_u8(0x18, primary)
            .with_u8(0x19, secondary)
            .with_u8(0x1A, subordinate)
    }

    /// Set the 24-bit class code (base class, subclass, prog-if)
    pub fn with_class(self, class: u32) -> Self {
        let bytes = class.to_le_bytes();
        self.with_u8(0x09, bytes[0])
            .with_u8(0x0A, bytes[1])
            .with_u8(0x0B, bytes[2])
    }

    /// Set the revision ID
    pub fn with_revision(self, revision: u8) -> Self {
        self.with_u8(0x08, revision)
    }

    /// Set the multi-function bit of the header type register
    pub fn multifunction(self) -> Self {
        let header_type = self.config[HEADER_TYPE_REG as usize] | 0x80;
        self.with_u8(HEADER_TYPE_REG, header_type)
    }

    /// Store a byte at `offset`
    pub fn with_u8(mut self, offset: u8, value: u8) -> Self {
        self.config[offset as usize] = value;
        self
    }

    /// Store a little-endian word at `offset`
    pub fn with_u16(mut self, offset: u8, value: u16) -> Self {
        let o = offset as usize;
        self.config[o..o + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// Store a little-endian dword at `offset`
    pub fn with_u32(mut self, offset: u8, value: u32) -> Self {
        let o = offset as usize;
        self.config[o..o + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// Raw configuration space
    pub fn config(&self) -> &[u8] {
        &self.config
    }

    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.config[offset], self.config[offset + 1]])
    }
}

/// Counters of bus traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    /// Calls to `enumerate`
    pub enumerations: usize,
    /// Calls to `read_byte`
    pub byte_reads: usize,
    /// Calls to `read_long`
    pub long_reads: usize,
}

/// In-memory PCI bus
///
/// Dropping the bus marks it closed; tests can watch for that through
/// [`DummyBus::closed_flag`].
#[derive(Debug)]
pub struct DummyBus {
    functions: Vec<DummyFunction>,
    stats: DummyStats,
    closed: Arc<AtomicBool>,
}

impl DummyBus {
    /// Create a bus holding `functions`
    pub fn new(functions: Vec<DummyFunction>) -> Self {
        log::debug!("Opened dummy PCI bus with {} functions", functions.len());
        Self {
            functions,
            stats: DummyStats::default(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A small example topology: host bridge, root port, VGA and NIC
    pub fn sample() -> Self {
        Self::new(vec![
            DummyFunction::endpoint(DeviceId::new(0, 0, 0), 0x8086, 0x1237)
                .with_class(0x06_0000)
                .with_revision(0x02)
                .with_u16(0x04, 0x0006)
                .with_u16(0x06, 0x0000),
            DummyFunction::bridge(DeviceId::new(0, 1, 0), 0x8086, 0x7191, 0, 1, 1)
                .with_revision(0x03)
                .with_u16(0x04, 0x0107)
                .with_u16(0x06, 0x0220)
                .with_u8(0x0D, 0x40)
                .with_u8(0x1B, 0x40)
                .with_u16(0x20, 0xF800)
                .with_u16(0x22, 0xFBF0)
                .with_u16(0x24, 0xE001)
                .with_u16(0x26, 0xF7F1)
                .with_u8(0x34, 0xA0)
                .with_u16(0x3E, 0x0008),
            DummyFunction::endpoint(DeviceId::new(0, 2, 0), 0x8086, 0x1234)
                .with_class(0x03_0000)
                .with_revision(0x02)
                .with_u16(0x04, 0x0007)
                .with_u32(0x10, 0xFD00_0008)
                .with_u32(0x18, 0xFEBF_0000)
                .with_u16(0x2C, 0x1AF4)
                .with_u16(0x2E, 0x1100)
                .with_u8(0x3C, 0x0B)
                .with_u8(0x3D, 0x01),
            DummyFunction::endpoint(DeviceId::new(1, 0, 0), 0x10EC, 0x8168)
                .with_class(0x02_0000)
                .with_revision(0x15)
                .with_u16(0x04, 0x0407)
                .with_u16(0x06, 0x0010)
                .with_u32(0x10, 0x0000_E001)
                .with_u32(0x18, 0xF7C0_0004)
                .with_u16(0x2C, 0x1043)
                .with_u16(0x2E, 0x8677)
                .with_u8(0x34, 0x40)
                .with_u8(0x3C, 0x0A)
                .with_u8(0x3D, 0x01),
        ])
    }

    /// Traffic seen so far
    pub fn stats(&self) -> DummyStats {
        self.stats
    }

    /// Flag set once this bus has been dropped
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn function(&self, dev: &PciDevice) -> Result<&DummyFunction> {
        self.functions
            .iter()
            .find(|f| f.domain == dev.domain && f.id == dev.id)
            .ok_or_else(|| Error::bus(format!("no function at {}", dev.bdf())))
    }

    fn check_range(offset: u8, len: u8) -> Result<()> {
        if offset as u16 + len as u16 > HEADER_END as u16 {
            return Err(Error::bus(format!(
                "config read of {} bytes at {:#x} is outside the header",
                len, offset
            )));
        }
        Ok(())
    }
}

impl BusAccess for DummyBus {
    fn enumerate(&mut self) -> Result<Vec<PciDevice>> {
        self.stats.enumerations += 1;
        Ok(self
            .functions
            .iter()
            .map(|f| {
                let mut dev = PciDevice::new(f.id);
                dev.domain = f.domain;
                dev
            })
            .collect())
    }

    fn read_byte(&mut self, dev: &PciDevice, offset: u8) -> Result<u8> {
        self.stats.byte_reads += 1;
        Self::check_range(offset, 1)?;
        Ok(self.function(dev)?.config[offset as usize])
    }

    fn read_long(&mut self, dev: &PciDevice, offset: u8) -> Result<u32> {
        self.stats.long_reads += 1;
        if offset % REGISTER_WIDTH != 0 {
            return Err(Error::bus(format!("unaligned dword read at {:#x}", offset)));
        }
        Self::check_range(offset, REGISTER_WIDTH)?;
        let config = &self.function(dev)?.config;
        let o = offset as usize;
        Ok(u32::from_le_bytes([
            config[o],
            config[o + 1],
            config[o + 2],
            config[o + 3],
        ]))
    }

    fn fill_info(&mut self, dev: &mut PciDevice, flags: FillFlags) -> Result<()> {
        let function = self.function(dev)?;
        if flags.contains(FillFlags::IDENT) {
            dev.vendor_id = function.u16_at(0x00);
            dev.device_id = function.u16_at(0x02);
        }
        if flags.contains(FillFlags::CLASS) {
            let c = &function.config;
            dev.class = u32::from_le_bytes([c[0x09], c[0x0A], c[0x0B], 0]);
            dev.revision_id = c[0x08];
        }
        dev.known |= flags;
        Ok(())
    }
}

impl Drop for DummyBus {
    fn drop(&mut self) {
        log::debug!("Closing dummy PCI bus ({:?})", self.stats);
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pciheader_core::{lookup, render, HeaderKind};

    #[test]
    fn test_enumerate_sample() {
        let mut bus = DummyBus::sample();
        let devices = bus.enumerate().unwrap();
        assert_eq!(devices.len(), 4);
        assert!(lookup::find_device(&devices, DeviceId::new(0, 1, 0)).is_some());
        assert!(lookup::find_device(&devices, DeviceId::new(0, 3, 0)).is_none());
        assert_eq!(bus.stats().enumerations, 1);
    }

    #[test]
    fn test_read_and_fill() {
        let mut bus = DummyBus::sample();
        let mut dev = lookup::take_device(bus.enumerate().unwrap(), DeviceId::new(0, 2, 0))
            .unwrap();
        assert_eq!(bus.read_long(&dev, 0x00).unwrap(), 0x1234_8086);
        assert_eq!(bus.read_long(&dev, 0x10).unwrap(), 0xFD00_0008);
        assert_eq!(bus.read_byte(&dev, 0x3C).unwrap(), 0x0B);

        bus.fill_info(&mut dev, FillFlags::IDENT | FillFlags::CLASS)
            .unwrap();
        assert_eq!((dev.vendor_id, dev.device_id), (0x8086, 0x1234));
        assert_eq!(dev.class, 0x03_0000);
        assert_eq!(dev.revision_id, 0x02);
    }

    #[test]
    fn test_rejects_bad_reads() {
        let mut bus = DummyBus::sample();
        let dev = PciDevice::new(DeviceId::new(0, 2, 0));
        assert!(bus.read_long(&dev, 0x02).is_err());
        assert!(bus.read_long(&dev, 0x40).is_err());
        assert!(bus.read_byte(&dev, 0x40).is_err());

        let missing = PciDevice::new(DeviceId::new(7, 0, 0));
        assert!(matches!(
            bus.read_byte(&missing, 0),
            Err(Error::BusAccess(_))
        ));
    }

    #[test]
    fn test_builders() {
        let f = DummyFunction::bridge(DeviceId::new(0, 0x1c, 0), 0x8086, 0xa110, 0, 2, 4)
            .multifunction();
        assert_eq!(f.config()[HEADER_TYPE_REG as usize], 0x81);
        assert_eq!(&f.config()[0x09..0x0C], &[0x00, 0x04, 0x06]);
        assert_eq!(&f.config()[0x18..0x1B], &[0, 2, 4]);
    }

    #[test]
    fn test_render_sample_bridge() {
        let mut bus = DummyBus::sample();
        let dev = lookup::take_device(bus.enumerate().unwrap(), DeviceId::new(0, 1, 0))
            .unwrap();
        let kind = pciheader_core::header::read_header_kind(&mut bus, &dev).unwrap();
        assert_eq!(kind, HeaderKind::Bridge);

        let out = render::render_header(&mut bus, &dev).unwrap();
        assert!(out.starts_with("Selected device 0:1:0 is a Bridge\n"));
        assert!(out.contains("0xF800"));
        assert_eq!(bus.stats().long_reads, 16);
    }

    #[test]
    fn test_drop_sets_closed_flag() {
        let bus = DummyBus::sample();
        let closed = bus.closed_flag();
        assert!(!closed.load(Ordering::SeqCst));
        drop(bus);
        assert!(closed.load(Ordering::SeqCst));
    }
}
