//! Device lookup by bus/device/function

use crate::access::{DeviceId, PciDevice};
use crate::error::{Error, Result};

/// Find the first device at `id`
pub fn find_device<'a, I>(devices: I, id: DeviceId) -> Option<&'a PciDevice>
where
    I: IntoIterator<Item = &'a PciDevice>,
{
    devices.into_iter().find(|dev| dev.matches(id))
}

/// Take the device at `id` out of an enumeration result
///
/// Returns [`Error::DeviceNotFound`] if nothing matches.
pub fn take_device(devices: Vec<PciDevice>, id: DeviceId) -> Result<PciDevice> {
    devices
        .into_iter()
        .find(|dev| dev.matches(id))
        .ok_or(Error::DeviceNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<PciDevice> {
        vec![
            PciDevice::new(DeviceId::new(0, 1, 0)),
            PciDevice::new(DeviceId::new(0, 1, 1)),
        ]
    }

    #[test]
    fn test_find_device_exact_match() {
        let devs = devices();
        let found = find_device(&devs, DeviceId::new(0, 1, 1)).unwrap();
        assert!(core::ptr::eq(found, &devs[1]));
    }

    #[test]
    fn test_find_device_not_found() {
        let devs = devices();
        assert!(find_device(&devs, DeviceId::new(1, 0, 0)).is_none());
        // No partial matching on bus/device alone
        assert!(find_device(&devs, DeviceId::new(0, 1, 2)).is_none());
    }

    #[test]
    fn test_find_device_first_match_wins() {
        let mut devs = devices();
        let mut dup = PciDevice::new(DeviceId::new(0, 1, 1));
        dup.domain = 1;
        devs.push(dup);
        assert_eq!(find_device(&devs, DeviceId::new(0, 1, 1)).unwrap().domain, 0);
    }

    #[test]
    fn test_take_device() {
        let dev = take_device(devices(), DeviceId::new(0, 1, 0)).unwrap();
        assert_eq!(dev.id, DeviceId::new(0, 1, 0));

        match take_device(devices(), DeviceId::new(1, 0, 0)) {
            Err(Error::DeviceNotFound(id)) => assert_eq!(id, DeviceId::new(1, 0, 0)),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
