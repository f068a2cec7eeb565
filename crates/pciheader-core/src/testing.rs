//! Single-function configuration image for unit tests

use crate::access::{BusAccess, DeviceId, FillFlags, PciDevice};
use crate::error::{Error, Result};

#[derive(Debug)]
struct ReadFailed(u8);

impl std::fmt::Display for ReadFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "read of {:#04x} failed", self.0)
    }
}

impl std::error::Error for ReadFailed {}

pub(crate) struct ImageBus {
    id: DeviceId,
    config: [u8; 64],
    fail_at: Option<u8>,
    long_reads: Vec<u8>,
}

impl ImageBus {
    pub(crate) fn new(id: DeviceId) -> Self {
        Self {
            id,
            config: [0; 64],
            fail_at: None,
            long_reads: Vec::new(),
        }
    }

    pub(crate) fn device(&self) -> PciDevice {
        PciDevice::new(self.id)
    }

    pub(crate) fn set_u8(&mut self, offset: usize, value: u8) {
        self.config[offset] = value;
    }

    pub(crate) fn set_u16(&mut self, offset: usize, value: u16) {
        self.config[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn set_u32(&mut self, offset: usize, value: u32) {
        self.config[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn fail_at(&mut self, offset: u8) {
        self.fail_at = Some(offset);
    }

    pub(crate) fn long_reads(&self) -> Vec<u8> {
        self.long_reads.clone()
    }

    fn check(&self, offset: u8) -> Result<()> {
        if self.fail_at == Some(offset) {
            return Err(Error::bus(ReadFailed(offset)));
        }
        Ok(())
    }
}

impl BusAccess for ImageBus {
    fn enumerate(&mut self) -> Result<Vec<PciDevice>> {
        Ok(vec![self.device()])
    }

    fn read_byte(&mut self, _dev: &PciDevice, offset: u8) -> Result<u8> {
        self.check(offset)?;
        Ok(self.config[offset as usize])
    }

    fn read_long(&mut self, _dev: &PciDevice, offset: u8) -> Result<u32> {
        self.long_reads.push(offset);
        self.check(offset)?;
        let o = offset as usize;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.config[o..o + 4]);
        Ok(u32::from_le_bytes(buf))
    }

    fn fill_info(&mut self, dev: &mut PciDevice, flags: FillFlags) -> Result<()> {
        if flags.contains(FillFlags::IDENT) {
            dev.vendor_id = u16::from_le_bytes([self.config[0], self.config[1]]);
            dev.device_id = u16::from_le_bytes([self.config[2], self.config[3]]);
        }
        dev.known |= flags;
        Ok(())
    }
}
