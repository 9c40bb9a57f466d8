//! Native ATA task-file passthrough envelope.

use num_enum::TryFromPrimitive;

/// ATA passthrough request flags.
pub mod ata_flags {
    /// Wait for device ready before issuing the command.
    pub const DRDY_REQUIRED: u16 = 1 << 0;
    /// Data-in transfer (device to host).
    pub const DATA_IN: u16 = 1 << 1;
    /// Data-out transfer (host to device).
    pub const DATA_OUT: u16 = 1 << 2;
}

/// ATA command opcodes issued by this crate.
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive)]
#[repr(u8)]
pub enum AtaCmd {
    /// IDENTIFY DEVICE, PIO data-in.
    IdentifyDevice = 0xec,
    /// TRUSTED RECEIVE, PIO data-in (ATA8).
    TrustedReceive = 0x5c,
    /// TRUSTED SEND, PIO data-out (ATA8).
    TrustedSend = 0x5e,
}

/// ATA task-file register block, in platform order.
///
/// On completion the block is written back by the device: the `command`
/// slot then holds the status register, and the `features` slot holds
/// the error register.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct IdeTaskFile {
    pub features: u8,
    pub sector_count: u8,
    pub sector_no: u8,
    pub cyl_lo: u8,
    pub cyl_hi: u8,
    pub dev_head: u8,
    pub command: u8,
    pub reserved: u8,
}

const_assert_eq!(std::mem::size_of::<IdeTaskFile>(), 8);

/// Native ATA passthrough request envelope.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct AtaPassThrough {
    pub ata_flags: u16,
    pub data_transfer_length: u32,
    /// Operation timeout, in seconds.
    pub timeout_value: u32,
    pub previous_task_file: IdeTaskFile,
    pub current_task_file: IdeTaskFile,
}

impl AtaPassThrough {
    /// Size of the request envelope as reported back by the platform. A
    /// smaller returned byte count indicates a short transfer.
    pub const ENVELOPE_SIZE: usize = std::mem::size_of::<AtaPassThrough>();
}
