//! Passthrough command envelopes and the OS device-I/O boundary.
//!
//! The envelopes model the portable fields of the platform's passthrough
//! request structures. A `DeviceIo` implementor owns the final ABI
//! marshalling (raw buffer pointers included) for whatever facility it
//! wraps; the in-tree backends never leave process memory.

use std::fmt::Debug;
use std::io;

pub mod backend;
pub mod reg;

mod ata;
mod scsi;

pub use ata::{ata_flags, AtaCmd, AtaPassThrough, IdeTaskFile};
pub use scsi::{
    scsi_direction, AtaReturnDescriptor, ScsiPassThrough, CDB10_LENGTH, SCSI_STATUS_GOOD_MAX,
    SENSE_BUFFER_LENGTH, SENSE_DESCRIPTOR_FORMAT, SENSE_DESCRIPTOR_OFFSET,
};

/// Data buffer accompanying a passthrough request, tagged with the
/// transfer direction.
pub enum DataXfer<'a> {
    /// Device to host.
    In(&'a mut [u8]),
    /// Host to device.
    Out(&'a [u8]),
    /// No data phase.
    None,
}

/// One open handle to a block device, as seen through the platform's
/// passthrough facility.
///
/// Implementations update the request envelope in place (returned task
/// file, SCSI status, sense data) exactly as the platform's device-I/O
/// call would, and return the number of bytes the call reported back.
pub trait DeviceIo: Debug + Send {
    /// Issue a native ATA task-file passthrough request.
    fn ata_pass_through(
        &mut self,
        req: &mut AtaPassThrough,
        data: DataXfer<'_>,
    ) -> io::Result<usize>;

    /// Issue a SCSI CDB passthrough request.
    fn scsi_pass_through(
        &mut self,
        req: &mut ScsiPassThrough,
        data: DataXfer<'_>,
    ) -> io::Result<usize>;

    /// Whether the underlying handle is open and usable.
    fn is_valid(&self) -> bool {
        true
    }

    /// Duplicate the underlying handle. The duplicate is independent of,
    /// and equally valid as, the original.
    fn try_clone(&self) -> io::Result<Box<dyn DeviceIo>>;
}
