//! PCI device scanning and config space access
//!
//! This module provides PCI access through the Linux sysfs interface
//! (/sys/bus/pci/devices). Each function shows up as a directory named
//! `DDDD:BB:DD.F` holding identity attributes and a binary `config` file.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use pciheader_core::schema::HEADER_END;
use pciheader_core::{BusAccess, DeviceId, FillFlags, PciDevice};

use crate::error::{Result, SysfsError};

/// Default location of the PCI device directories
pub const SYSFS_PCI_DEVICES: &str = "/sys/bus/pci/devices";

/// PCI bus access through sysfs
///
/// Config files are opened lazily and kept until the bus is dropped.
///
/// # Example
///
/// ```ignore
/// use pciheader_core::BusAccess;
/// use pciheader_sysfs::SysfsBus;
///
/// let mut bus = SysfsBus::open()?;
/// for dev in bus.enumerate()? {
///     println!("{}", dev.bdf());
/// }
/// ```
#[derive(Debug)]
pub struct SysfsBus {
    root: PathBuf,
    configs: HashMap<PathBuf, File>,
}

impl SysfsBus {
    /// Open the system PCI device directory
    pub fn open() -> Result<Self> {
        Self::with_root(SYSFS_PCI_DEVICES)
    }

    /// Open a PCI device directory at a custom location
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SysfsError::NotFound(root));
        }
        log::debug!("Opened PCI sysfs at {}", root.display());
        Ok(Self {
            root,
            configs: HashMap::new(),
        })
    }

    /// Scan the device directory
    pub fn scan(&self) -> Result<Vec<PciDevice>> {
        let entries = fs::read_dir(&self.root).map_err(|source| SysfsError::Scan {
            path: self.root.clone(),
            source,
        })?;

        let mut devices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SysfsError::Scan {
                path: self.root.clone(),
                source,
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match parse_device_name(&name) {
                Some((domain, id)) => {
                    let mut dev = PciDevice::new(id);
                    dev.domain = domain;
                    devices.push(dev);
                }
                None => log::trace!("Skipping sysfs entry {}", name),
            }
        }

        devices.sort_by_key(|dev| (dev.domain, dev.id));
        log::debug!("Found {} PCI functions", devices.len());
        Ok(devices)
    }

    fn device_dir(&self, dev: &PciDevice) -> PathBuf {
        self.root.join(format!(
            "{:04x}:{:02x}:{:02x}.{:x}",
            dev.domain, dev.id.bus, dev.id.device, dev.id.function
        ))
    }

    /// Read `buf.len()` bytes of config space at `offset`
    fn read_config(&mut self, dev: &PciDevice, offset: u8, buf: &mut [u8]) -> Result<()> {
        if offset as usize + buf.len() > HEADER_END as usize {
            return Err(SysfsError::OutOfRange {
                register: offset,
                len: buf.len(),
                limit: HEADER_END,
            });
        }

        let path = self.device_dir(dev).join("config");
        let read_err = |source| SysfsError::ConfigRead {
            bdf: dev.bdf(),
            register: offset,
            source,
        };

        let file = match self.configs.entry(path) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                log::trace!("Opening {}", e.key().display());
                let file = File::open(e.key()).map_err(read_err)?;
                e.insert(file)
            }
        };

        file.seek(SeekFrom::Start(offset as u64)).map_err(read_err)?;
        file.read_exact(buf).map_err(read_err)?;
        Ok(())
    }
}

impl BusAccess for SysfsBus {
    fn enumerate(&mut self) -> pciheader_core::Result<Vec<PciDevice>> {
        Ok(self.scan()?)
    }

    fn read_byte(&mut self, dev: &PciDevice, offset: u8) -> pciheader_core::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_config(dev, offset, &mut buf)?;
        Ok(buf[0])
    }

    fn read_long(&mut self, dev: &PciDevice, offset: u8) -> pciheader_core::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_config(dev, offset, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn fill_info(&mut self, dev: &mut PciDevice, flags: FillFlags) -> pciheader_core::Result<()> {
        let dir = self.device_dir(dev);

        let ident = if flags.contains(FillFlags::IDENT) {
            Some((
                read_sysfs_hex_u16(&dir.join("vendor"))?,
                read_sysfs_hex_u16(&dir.join("device"))?,
            ))
        } else {
            None
        };

        let class = if flags.contains(FillFlags::CLASS) {
            let class = read_sysfs_hex_u32(&dir.join("class"))?;
            if class > 0x00FF_FFFF {
                return Err(SysfsError::SysfsParse {
                    path: dir.join("class"),
                    value: format!("{:#x}", class),
                }
                .into());
            }
            // Older kernels have no revision attribute
            let revision = match read_sysfs_hex_u8(&dir.join("revision")) {
                Ok(rev) => rev,
                Err(e @ SysfsError::SysfsRead { .. }) => {
                    log::debug!("{}: {}", dev.bdf(), e);
                    0
                }
                Err(e) => return Err(e.into()),
            };
            Some((class, revision))
        } else {
            None
        };

        if let Some((vendor_id, device_id)) = ident {
            dev.vendor_id = vendor_id;
            dev.device_id = device_id;
        }
        if let Some((class, revision_id)) = class {
            dev.class = class;
            dev.revision_id = revision_id;
        }
        dev.known |= flags;
        Ok(())
    }
}

impl Drop for SysfsBus {
    fn drop(&mut self) {
        log::debug!(
            "Closing PCI sysfs access ({} config files open)",
            self.configs.len()
        );
        self.configs.clear();
    }
}

/// Parse a sysfs device directory name (format: "0000:00:1f.0")
pub fn parse_device_name(name: &str) -> Option<(u16, DeviceId)> {
    let parts: Vec<&str> = name.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let domain = u16::from_str_radix(parts[0], 16).ok()?;
    let bus = u8::from_str_radix(parts[1], 16).ok()?;

    let (device, function) = parts[2].split_once('.')?;
    let device = u8::from_str_radix(device, 16).ok()?;
    let function = u8::from_str_radix(function, 16).ok()?;

    Some((domain, DeviceId::new(bus, device, function)))
}

/// Read a sysfs attribute and strip the "0x" prefix
fn read_sysfs_attr(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|source| SysfsError::SysfsRead {
        path: path.to_path_buf(),
        source,
    })?;
    let content = content.trim();
    Ok(content.strip_prefix("0x").unwrap_or(content).to_string())
}

fn parse_error(path: &Path, value: &str) -> SysfsError {
    SysfsError::SysfsParse {
        path: path.to_path_buf(),
        value: value.to_string(),
    }
}

fn read_sysfs_hex_u8(path: &Path) -> Result<u8> {
    let value = read_sysfs_attr(path)?;
    u8::from_str_radix(&value, 16).map_err(|_| parse_error(path, &value))
}

fn read_sysfs_hex_u16(path: &Path) -> Result<u16> {
    let value = read_sysfs_attr(path)?;
    u16::from_str_radix(&value, 16).map_err(|_| parse_error(path, &value))
}

fn read_sysfs_hex_u32(path: &Path) -> Result<u32> {
    let value = read_sysfs_attr(path)?;
    u32::from_str_radix(&value, 16).map_err(|_| parse_error(path, &value))
}
