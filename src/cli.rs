//! CLI argument parsing

use crate::backends;
use clap::Parser;
use pciheader_core::DeviceId;
use std::path::PathBuf;
use thiserror::Error;

/// Number of positional arguments needed to address a device
pub const ADDRESS_ARGS: usize = 3;

/// Parse a bus/device/function number: hex, with or without a `0x` prefix
pub fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value '{}': {}", s, e))
}

/// Generate dynamic help text for the access argument
fn access_help() -> String {
    format!(
        "Bus access backend [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser, Debug)]
#[command(name = "pciheader")]
#[command(author, version, about = "Print the configuration header of a PCI(e) device", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Bus access backend
    #[arg(
        short,
        long,
        default_value = backends::DEFAULT_BACKEND,
        help = access_help(),
        long_help = backends::backend_help()
    )]
    pub access: String,

    /// PCI device directory used by the sysfs backend
    /// Defaults to /sys/bus/pci/devices
    #[arg(long, env = "PCIHEADER_SYSFS_ROOT")]
    pub sysfs_root: Option<PathBuf>,

    /// List the functions on the bus instead of printing a header
    #[arg(short, long)]
    pub list: bool,

    /// Bus, device and function number of the device (hex, e.g. 0 1f 3 or 0x0 0x1f 0x3)
    #[arg(value_name = "BUS DEVICE FUNCTION")]
    pub address: Vec<String>,
}

/// What the invocation asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Print the header of one device
    Device(DeviceId),
    /// List every device on the bus
    List,
}

/// Problems with the positional arguments
#[derive(Debug, Error)]
pub enum ArgError {
    /// Wrong number of positional arguments
    #[error(transparent)]
    Count(pciheader_core::Error),

    /// A positional argument is not a hex byte
    #[error("Invalid {what} number: {reason}")]
    Value { what: &'static str, reason: String },

    /// --list was combined with a device address
    #[error("--list does not take a device address")]
    ListWithAddress,
}

impl Cli {
    /// Resolve the positional arguments
    pub fn target(&self) -> Result<Target, ArgError> {
        if self.list {
            return if self.address.is_empty() {
                Ok(Target::List)
            } else {
                Err(ArgError::ListWithAddress)
            };
        }

        if self.address.len() != ADDRESS_ARGS {
            return Err(ArgError::Count(pciheader_core::Error::InvalidArgumentCount {
                expected: ADDRESS_ARGS,
                got: self.address.len(),
            }));
        }

        let mut parts = [0u8; ADDRESS_ARGS];
        for ((part, arg), what) in parts
            .iter_mut()
            .zip(&self.address)
            .zip(["bus", "device", "function"])
        {
            *part = parse_hex_u8(arg).map_err(|reason| ArgError::Value { what, reason })?;
        }

        Ok(Target::Device(DeviceId::new(parts[0], parts[1], parts[2])))
    }
}

/// Usage text printed when the device address is incomplete
pub fn usage(program: &str) -> String {
    format!(
        "Three Arguments must be passed!\n\
         Usage: {program} [bus] [device] [function]\n\
         With:\n\
         \tbus:\tBus number of device to print PCI Header\n\
         \tdevice:\tDevice number of device to print PCI Header\n\
         \tfunction:\tFunction number of device to print PCI Header\n"
    )
}
