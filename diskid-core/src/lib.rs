//! Reads and normalizes disk-drive identification data across the native
//! ATA passthrough path and the ATA-over-SCSI path used by USB bridge
//! chipsets.

#[macro_use]
extern crate static_assertions;

#[macro_use]
extern crate log;

pub mod drive;
pub mod error;
pub mod iface;
pub mod identify;
pub mod io;
