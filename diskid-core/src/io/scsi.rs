//! SCSI CDB passthrough envelope, used to tunnel ATA commands through a
//! USB bridge chipset.

use bytemuck::{Pod, Zeroable};
use byteorder::{BigEndian, ByteOrder};

/// Length of a 10-byte Command Descriptor Block.
pub const CDB10_LENGTH: u8 = 10;

/// Sense buffer size. The ATA return descriptor only needs bytes 8..22,
/// but the full 255 bytes match the largest length the platform accepts.
pub const SENSE_BUFFER_LENGTH: usize = 0xff;

/// SCSI status values at or below this count as success for the bridge
/// chipsets this crate understands.
pub const SCSI_STATUS_GOOD_MAX: u8 = 0x04;

/// First sense byte announcing descriptor-format sense data (T10 response
/// code 0x72); the Oxford and Initio bridges return it on success.
pub const SENSE_DESCRIPTOR_FORMAT: u8 = 0x72;

/// Offset of the ATA return descriptor within the sense buffer.
pub const SENSE_DESCRIPTOR_OFFSET: usize = 8;

/// Data-phase direction codes, in platform order.
pub mod scsi_direction {
    pub const OUT: u8 = 0;
    pub const IN: u8 = 1;
    pub const UNSPECIFIED: u8 = 2;
}

/// SCSI passthrough request envelope with an inline sense buffer.
#[derive(Copy, Clone)]
pub struct ScsiPassThrough {
    pub scsi_status: u8,
    pub path_id: u8,
    pub target_id: u8,
    pub lun: u8,
    pub cdb_length: u8,
    pub sense_info_length: u8,
    pub data_in: u8,
    pub data_transfer_length: u32,
    /// Operation timeout, in seconds.
    pub timeout_value: u32,
    pub cdb: [u8; 16],
    pub sense: [u8; SENSE_BUFFER_LENGTH],
}

impl Default for ScsiPassThrough {
    fn default() -> ScsiPassThrough {
        ScsiPassThrough {
            // 0xFF until the device writes back a real status
            scsi_status: 0xff,
            path_id: 0,
            target_id: 0,
            lun: 0,
            cdb_length: CDB10_LENGTH,
            sense_info_length: SENSE_BUFFER_LENGTH as u8,
            data_in: scsi_direction::UNSPECIFIED,
            data_transfer_length: 0,
            timeout_value: 0,
            cdb: [0; 16],
            sense: [0; SENSE_BUFFER_LENGTH],
        }
    }
}

impl std::fmt::Debug for ScsiPassThrough {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScsiPassThrough")
            .field("scsi_status", &self.scsi_status)
            .field("cdb", &&self.cdb[..self.cdb_length as usize])
            .field("sense", &"[...]")
            .finish()
    }
}

impl ScsiPassThrough {
    /// Size of the request envelope as reported back by the platform.
    pub const ENVELOPE_SIZE: usize = std::mem::size_of::<ScsiPassThrough>();

    /// Decode the ATA return descriptor overlaid on the sense buffer at
    /// offset 8.
    pub fn ata_return_descriptor(&self) -> AtaReturnDescriptor {
        let overlay = &self.sense[SENSE_DESCRIPTOR_OFFSET
            ..SENSE_DESCRIPTOR_OFFSET + std::mem::size_of::<AtaReturnDescriptor>()];
        *bytemuck::from_bytes(overlay)
    }

    /// Write an ATA return descriptor into the sense buffer (emulated
    /// backends).
    pub fn set_ata_return_descriptor(&mut self, desc: &AtaReturnDescriptor) {
        let overlay = &mut self.sense[SENSE_DESCRIPTOR_OFFSET
            ..SENSE_DESCRIPTOR_OFFSET + std::mem::size_of::<AtaReturnDescriptor>()];
        overlay.copy_from_slice(bytemuck::bytes_of(desc));
    }
}

/// ATA return descriptor: how a bridge chipset reports the completed
/// task file inside descriptor-format sense data.
///
/// `status` corresponds to the ATA features/error register upon a failed
/// response.
#[repr(C, packed)]
#[derive(Debug, Default, Copy, Clone)]
pub struct AtaReturnDescriptor {
    /// 09h
    pub descriptor_code: u8,
    /// 0Ch
    pub additional_length: u8,
    pub extend: u8,
    pub error: u8,
    pub sector_count_hi: u8,
    pub sector_count_lo: u8,
    pub lba_low_hi: u8,
    pub lba_low_lo: u8,
    pub lba_mid_hi: u8,
    pub lba_mid_lo: u8,
    pub lba_high_hi: u8,
    pub lba_high_lo: u8,
    pub device: u8,
    pub status: u8,
}

const_assert_eq!(std::mem::size_of::<AtaReturnDescriptor>(), 14);

// Safety:
// - All fields have type `u8`.
// - #[repr(C, packed)] ensures that there is no padding (and therefore, no
//   invalid bit patterns)
unsafe impl Zeroable for AtaReturnDescriptor {}
unsafe impl Pod for AtaReturnDescriptor {}

impl AtaReturnDescriptor {
    /// Number of sectors transferred, from the split byte pair.
    pub fn sector_count(&self) -> u16 {
        BigEndian::read_u16(&[self.sector_count_hi, self.sector_count_lo])
    }
}
