//! ATA-over-SCSI passthrough for SATA/ATA disks behind a USB bridge.
//!
//! The bridge exposes the disk to the host only as a SCSI target, so
//! every ATA command is tunneled inside a 10-byte CDB the bridge chipset
//! understands, and ATA status comes back inside descriptor-format sense
//! data instead of a task file. The CDB layouts and the success test
//! below are reverse engineered against the Oxford and Initio bridge
//! chipsets, not taken from the T10/T13 specifications, and may not hold
//! for other chipsets.

use crate::drive::ScsiAddress;
use crate::error::{AtaErrorFlags, DriveError, DriveResult};
use crate::identify::IdentifySector;
use crate::io::{
    scsi_direction, AtaCmd, DataXfer, DeviceIo, ScsiPassThrough, SCSI_STATUS_GOOD_MAX,
    SENSE_DESCRIPTOR_FORMAT,
};

#[derive(Debug)]
pub(crate) struct UsbScsiInterface {
    address: ScsiAddress,
    bytes_per_sector: u32,
    timeout_secs: u32,
}

impl UsbScsiInterface {
    pub(crate) fn new(
        address: ScsiAddress,
        bytes_per_sector: u32,
        timeout_secs: u32,
    ) -> UsbScsiInterface {
        UsbScsiInterface {
            address,
            bytes_per_sector,
            timeout_secs,
        }
    }

    pub(crate) fn read_identify_sector(
        &self,
        io: &mut dyn DeviceIo,
        sector: &mut IdentifySector,
    ) -> DriveResult<()> {
        trace!("UsbScsiInterface::read_identify_sector");

        let mut req = self.request(scsi_direction::IN, self.bytes_per_sector);
        req.cdb[..10].copy_from_slice(&[
            0xa1,
            0x08,
            0x2a,
            0x00,
            0x01,
            0,
            0,
            0,
            0,
            AtaCmd::IdentifyDevice as u8,
        ]);

        let issued = io.scsi_pass_through(&mut req, DataXfer::In(sector.as_bytes_mut()));
        decode(&req, issued)
    }

    pub(crate) fn send(&self, io: &mut dyn DeviceIo, buffer: &[u8]) -> DriveResult<()> {
        trace!("UsbScsiInterface::send");

        let mut req = self.request(scsi_direction::OUT, buffer.len() as u32);
        req.cdb[..10].copy_from_slice(&[
            0xa1,
            0x0a,
            0x22,
            0xf0,
            0x01,
            0,
            0,
            0,
            0,
            AtaCmd::TrustedSend as u8,
        ]);

        let issued = io.scsi_pass_through(&mut req, DataXfer::Out(buffer));
        decode(&req, issued)
    }

    pub(crate) fn receive(&self, io: &mut dyn DeviceIo, buffer: &mut [u8]) -> DriveResult<()> {
        trace!("UsbScsiInterface::receive");

        let mut req = self.request(scsi_direction::IN, buffer.len() as u32);
        req.cdb[..10].copy_from_slice(&[
            0xa1,
            0x08,
            0x2a,
            0xf0,
            0x01,
            0,
            0,
            0,
            0,
            AtaCmd::TrustedReceive as u8,
        ]);

        let issued = io.scsi_pass_through(&mut req, DataXfer::In(buffer));
        decode(&req, issued)
    }

    fn request(&self, direction: u8, transfer_length: u32) -> ScsiPassThrough {
        ScsiPassThrough {
            target_id: self.address.target_id as u8,
            lun: self.address.logical_unit as u8,
            data_in: direction,
            data_transfer_length: transfer_length,
            timeout_value: self.timeout_secs,
            ..ScsiPassThrough::default()
        }
    }
}

/// Bridge success convention: the OS call went through, the SCSI status
/// is at most 0x04, and the first sense byte announces descriptor-format
/// sense data. Anything else is decoded from the ATA return descriptor,
/// whose status byte mirrors the ATA error register on a failed
/// response.
fn decode(req: &ScsiPassThrough, issued: std::io::Result<usize>) -> DriveResult<()> {
    if issued.is_ok()
        && req.scsi_status <= SCSI_STATUS_GOOD_MAX
        && req.sense[0] == SENSE_DESCRIPTOR_FORMAT
    {
        return Ok(());
    }

    let desc = req.ata_return_descriptor();
    debug!(
        "bridged command failed: scsi_status={:#04x} sense[0]={:#04x} descriptor status={:#04x} sectors={}",
        req.scsi_status,
        req.sense[0],
        { desc.status },
        desc.sector_count(),
    );

    if desc.status > 0 {
        return Err(DriveError::Protocol {
            flags: AtaErrorFlags::from_error_register(desc.status),
        });
    }

    match issued {
        Err(e) => Err(DriveError::Issue(e)),
        Ok(_) => Err(DriveError::Protocol {
            flags: AtaErrorFlags::default(),
        }),
    }
}
