//! Print the configuration header of one device

use pciheader_core::{lookup, render, BusAccess, DeviceId, FillFlags, Result};

/// Locate `id` on the bus and render its header table
pub fn show_header(bus: &mut dyn BusAccess, id: DeviceId) -> Result<String> {
    let mut dev = lookup::take_device(bus.enumerate()?, id)?;
    bus.fill_info(&mut dev, FillFlags::IDENT | FillFlags::CLASS)?;
    log::info!(
        "Found {} [{:04x}:{:04x}] class {:06x} rev {:02x}",
        dev.bdf(),
        dev.vendor_id,
        dev.device_id,
        dev.class,
        dev.revision_id
    );

    render::render_header(bus, &dev)
}
