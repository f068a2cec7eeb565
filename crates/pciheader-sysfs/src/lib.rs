//! pciheader-sysfs - Linux sysfs PCI bus access
//!
//! Implements [`pciheader_core::BusAccess`] on top of
//! `/sys/bus/pci/devices`. Reading the first 64 bytes of configuration
//! space through sysfs works without root; the rest of the config file is
//! never touched.
//!
//! # Example
//!
//! ```ignore
//! use pciheader_core::{lookup, render, BusAccess, DeviceId};
//! use pciheader_sysfs::SysfsBus;
//!
//! let mut bus = SysfsBus::open()?;
//! let dev = lookup::take_device(bus.enumerate()?, DeviceId::new(0, 0x1f, 0))?;
//! print!("{}", render::render_header(&mut bus, &dev)?);
//! ```

mod error;
mod pci;

pub use error::{Result, SysfsError};
pub use pci::{parse_device_name, SysfsBus, SYSFS_PCI_DEVICES};
