//! Header type selection

use crate::access::{BusAccess, PciDevice};
use crate::error::Result;
use crate::schema::{HeaderKind, HEADER_TYPE_REG};

/// Read the header type register of `dev` and pick its layout
///
/// Bit 7 (multi-function) and the upper layout bits are dropped; only bit 0
/// decides between the endpoint and bridge layouts. A type 2 (CardBus)
/// header therefore falls back to the endpoint layout, which is logged.
pub fn read_header_kind<B: BusAccess + ?Sized>(bus: &mut B, dev: &PciDevice) -> Result<HeaderKind> {
    let raw = bus.read_byte(dev, HEADER_TYPE_REG)?;
    let layout = raw & 0x7F;
    if layout > 1 {
        log::warn!(
            "{} reports header type {:#04x}, only types 0 and 1 are decoded",
            dev.bdf(),
            layout
        );
    }
    let kind = HeaderKind::from_header_type(raw);
    log::debug!("{} header type {:#04x} -> {}", dev.bdf(), raw, kind);
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::DeviceId;
    use crate::schema::Schema;
    use crate::testing::ImageBus;
    use crate::Error;

    fn kind_for(header_type: u8) -> HeaderKind {
        let mut bus = ImageBus::new(DeviceId::new(0, 3, 0));
        bus.set_u8(HEADER_TYPE_REG as usize, header_type);
        let dev = bus.device();
        read_header_kind(&mut bus, &dev).unwrap()
    }

    #[test]
    fn test_endpoint_and_bridge() {
        assert_eq!(kind_for(0x00), HeaderKind::Endpoint);
        assert_eq!(kind_for(0x01), HeaderKind::Bridge);
        assert_eq!(kind_for(0x01).schema(), Schema::TYPE1);
    }

    #[test]
    fn test_multifunction_bit_ignored() {
        assert_eq!(kind_for(0x80), HeaderKind::Endpoint);
        assert_eq!(kind_for(0x81), HeaderKind::Bridge);
    }

    #[test]
    fn test_cardbus_uses_low_bit_only() {
        assert_eq!(kind_for(0x02), HeaderKind::Endpoint);
    }

    #[test]
    fn test_read_error_propagates() {
        let mut bus = ImageBus::new(DeviceId::new(0, 3, 0));
        bus.fail_at(HEADER_TYPE_REG);
        let dev = bus.device();
        assert!(matches!(
            read_header_kind(&mut bus, &dev),
            Err(Error::BusAccess(_))
        ));
    }
}
