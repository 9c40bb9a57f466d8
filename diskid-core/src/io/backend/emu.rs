use std::convert::TryFrom;
use std::io;

use bit_field::BitField;

use crate::identify::IdentifySector;
use crate::io::reg;
use crate::io::{
    AtaCmd, AtaPassThrough, AtaReturnDescriptor, DataXfer, DeviceIo, ScsiPassThrough,
    CDB10_LENGTH, SENSE_DESCRIPTOR_FORMAT,
};

/// In-memory emulated disk drive.
///
/// Answers passthrough requests against a canned Identify Sector without
/// touching any real hardware, speaking both envelope dialects. Trusted
/// send stores the payload; trusted receive returns the most recently
/// stored payload.
#[derive(Debug, Clone)]
pub struct Emu {
    sector: IdentifySector,
    trust_store: Vec<u8>,
}

impl Emu {
    pub fn new(sector: IdentifySector) -> Emu {
        Emu {
            sector,
            trust_store: Vec::new(),
        }
    }
}

fn bad_direction() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        "data buffer direction does not match the command",
    )
}

impl DeviceIo for Emu {
    fn ata_pass_through(
        &mut self,
        req: &mut AtaPassThrough,
        data: DataXfer<'_>,
    ) -> io::Result<usize> {
        let tf = &mut req.current_task_file;
        match AtaCmd::try_from(tf.command) {
            Ok(AtaCmd::IdentifyDevice) => {
                let buf = match data {
                    DataXfer::In(buf) => buf,
                    _ => return Err(bad_direction()),
                };
                let n = (req.data_transfer_length as usize)
                    .min(buf.len())
                    .min(self.sector.as_bytes().len());
                buf[..n].copy_from_slice(&self.sector.as_bytes()[..n]);
            }
            Ok(AtaCmd::TrustedSend) => {
                let buf = match data {
                    DataXfer::Out(buf) => buf,
                    _ => return Err(bad_direction()),
                };
                self.trust_store = buf.to_vec();
            }
            Ok(AtaCmd::TrustedReceive) => {
                let buf = match data {
                    DataXfer::In(buf) => buf,
                    _ => return Err(bad_direction()),
                };
                let n = buf.len().min(self.trust_store.len());
                buf[..n].copy_from_slice(&self.trust_store[..n]);
            }
            Err(_) => {
                // unknown command: write back an aborted task file, and
                // fail the call the way the platform facility does
                tf.command = *0u8
                    .set_bit(reg::STATUS::DRDY, true)
                    .set_bit(reg::STATUS::ERR, true);
                tf.features = *0u8.set_bit(reg::ERROR::ABRT, true);
                return Err(io::Error::new(io::ErrorKind::Other, "command aborted"));
            }
        }

        tf.command = *0u8
            .set_bit(reg::STATUS::DRDY, true)
            .set_bit(reg::STATUS::DSC, true);
        tf.features = 0;
        Ok(AtaPassThrough::ENVELOPE_SIZE)
    }

    fn scsi_pass_through(
        &mut self,
        req: &mut ScsiPassThrough,
        data: DataXfer<'_>,
    ) -> io::Result<usize> {
        if req.cdb_length != CDB10_LENGTH || req.cdb[0] != 0xa1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unrecognized CDB",
            ));
        }

        let mut desc = AtaReturnDescriptor {
            descriptor_code: 0x09,
            additional_length: 0x0c,
            ..AtaReturnDescriptor::default()
        };

        // the embedded ATA opcode rides in the last CDB byte
        match AtaCmd::try_from(req.cdb[9]) {
            Ok(AtaCmd::IdentifyDevice) => {
                let buf = match data {
                    DataXfer::In(buf) => buf,
                    _ => return Err(bad_direction()),
                };
                let n = (req.data_transfer_length as usize)
                    .min(buf.len())
                    .min(self.sector.as_bytes().len());
                buf[..n].copy_from_slice(&self.sector.as_bytes()[..n]);
                desc.sector_count_lo = 1;
            }
            Ok(AtaCmd::TrustedSend) => {
                let buf = match data {
                    DataXfer::Out(buf) => buf,
                    _ => return Err(bad_direction()),
                };
                self.trust_store = buf.to_vec();
            }
            Ok(AtaCmd::TrustedReceive) => {
                let buf = match data {
                    DataXfer::In(buf) => buf,
                    _ => return Err(bad_direction()),
                };
                let n = buf.len().min(self.trust_store.len());
                buf[..n].copy_from_slice(&self.trust_store[..n]);
                desc.sector_count_lo = 1;
            }
            Err(_) => {
                // check condition, fixed-format sense, aborted task file
                req.scsi_status = 0x02;
                req.sense[0] = 0x70;
                desc.status = *0u8.set_bit(reg::ERROR::ABRT, true);
                req.set_ata_return_descriptor(&desc);
                return Ok(ScsiPassThrough::ENVELOPE_SIZE);
            }
        }

        req.scsi_status = 0x00;
        req.sense[0] = SENSE_DESCRIPTOR_FORMAT;
        req.set_ata_return_descriptor(&desc);
        Ok(ScsiPassThrough::ENVELOPE_SIZE)
    }

    fn try_clone(&self) -> io::Result<Box<dyn DeviceIo>> {
        Ok(Box::new(self.clone()))
    }
}
