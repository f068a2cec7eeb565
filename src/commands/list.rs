//! List the functions present on the bus

use pciheader_core::header::read_header_kind;
use pciheader_core::{BusAccess, FillFlags, Result};

/// One line per function: address, IDs, class code and header kind
pub fn list_devices(bus: &mut dyn BusAccess) -> Result<String> {
    let mut out = String::new();

    for mut dev in bus.enumerate()? {
        bus.fill_info(&mut dev, FillFlags::IDENT | FillFlags::CLASS)?;
        let kind = read_header_kind(&mut *bus, &dev)?;
        out.push_str(&format!(
            "{}  {:04x}:{:04x}  class {:06x}  {}\n",
            dev.bdf(),
            dev.vendor_id,
            dev.device_id,
            dev.class,
            kind.name()
        ));
    }

    if out.is_empty() {
        log::warn!("No PCI devices found");
    }
    Ok(out)
}
