//! CLI command implementations
//!
//! Each command works on any [`BusAccess`](pciheader_core::BusAccess)
//! backend and returns its complete output as a string, so nothing is
//! printed until the command has succeeded.

mod list;
mod show;

pub use list::list_devices;
pub use show::show_header;
