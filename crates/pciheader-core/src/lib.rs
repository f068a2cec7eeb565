//! pciheader-core - PCI configuration header decoding
//!
//! This crate describes the standard PCI configuration header layouts as
//! data, extracts register values from raw dword reads, and renders the
//! header as a two-pane ASCII table.
//!
//! Hardware access is not part of this crate. Callers supply an
//! implementation of [`BusAccess`] (see `pciheader-sysfs` for Linux and
//! `pciheader-dummy` for an in-memory bus).
//!
//! # Example
//!
//! ```ignore
//! use pciheader_core::{lookup, render, BusAccess, DeviceId};
//!
//! fn show<B: BusAccess>(bus: &mut B, id: DeviceId) -> pciheader_core::Result<()> {
//!     let dev = lookup::take_device(bus.enumerate()?, id)?;
//!     print!("{}", render::render_header(bus, &dev)?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod access;
pub mod decode;
pub mod error;
pub mod header;
pub mod lookup;
pub mod render;
pub mod schema;

#[cfg(test)]
mod testing;

pub use access::{BusAccess, DeviceId, FillFlags, PciDevice};
pub use error::{BusError, Error, Result, Violation};
pub use schema::{schema_for, FieldDescriptor, HeaderKind, Schema};
