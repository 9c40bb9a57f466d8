//! Direct ATA task-file passthrough.

use bit_field::BitField;

use crate::error::{AtaErrorFlags, DriveError, DriveResult};
use crate::identify::IdentifySector;
use crate::io::reg;
use crate::io::{ata_flags, AtaCmd, AtaPassThrough, DataXfer, DeviceIo};

/// Device/head register value for non-addressed commands: the fixed
/// always-one bit, no device select, no LBA.
const DEV_HEAD_FIXED: u8 = 0x40;

/// T13 vendor-unique protocol id carried in the features register by the
/// trusted send/receive commands.
const TRUSTED_PROTOCOL_VENDOR: u8 = 0xf0;

/// Native ATA passthrough: builds a task-file request, issues it, and
/// decodes the returned status/error registers.
#[derive(Debug)]
pub(crate) struct AtaInterface {
    bytes_per_sector: u32,
    timeout_secs: u32,
}

impl AtaInterface {
    pub(crate) fn new(bytes_per_sector: u32, timeout_secs: u32) -> AtaInterface {
        AtaInterface {
            bytes_per_sector,
            timeout_secs,
        }
    }

    pub(crate) fn read_identify_sector(
        &self,
        io: &mut dyn DeviceIo,
        sector: &mut IdentifySector,
    ) -> DriveResult<()> {
        trace!("AtaInterface::read_identify_sector");

        let mut req = AtaPassThrough {
            ata_flags: ata_flags::DATA_IN | ata_flags::DRDY_REQUIRED,
            data_transfer_length: self.bytes_per_sector,
            timeout_value: self.timeout_secs,
            ..AtaPassThrough::default()
        };
        req.current_task_file.command = AtaCmd::IdentifyDevice as u8;
        req.current_task_file.dev_head = DEV_HEAD_FIXED;

        let returned = io
            .ata_pass_through(&mut req, DataXfer::In(sector.as_bytes_mut()))
            .map_err(|e| taskfile_error(&req, e))?;

        if returned < AtaPassThrough::ENVELOPE_SIZE {
            return Err(DriveError::ShortTransfer {
                got: returned,
                expected: AtaPassThrough::ENVELOPE_SIZE,
            });
        }
        Ok(())
    }

    pub(crate) fn send(&self, io: &mut dyn DeviceIo, buffer: &[u8]) -> DriveResult<()> {
        trace!("AtaInterface::send");
        let mut req = self.trusted_request(ata_flags::DATA_OUT, AtaCmd::TrustedSend, buffer.len());
        io.ata_pass_through(&mut req, DataXfer::Out(buffer))
            .map_err(|e| taskfile_error(&req, e))?;
        Ok(())
    }

    pub(crate) fn receive(&self, io: &mut dyn DeviceIo, buffer: &mut [u8]) -> DriveResult<()> {
        trace!("AtaInterface::receive");
        let mut req = self.trusted_request(ata_flags::DATA_IN, AtaCmd::TrustedReceive, buffer.len());
        io.ata_pass_through(&mut req, DataXfer::In(buffer))
            .map_err(|e| taskfile_error(&req, e))?;
        Ok(())
    }

    fn trusted_request(&self, direction: u16, cmd: AtaCmd, len: usize) -> AtaPassThrough {
        let mut req = AtaPassThrough {
            ata_flags: direction | ata_flags::DRDY_REQUIRED,
            data_transfer_length: len as u32,
            timeout_value: self.timeout_secs,
            ..AtaPassThrough::default()
        };

        let tf = &mut req.current_task_file;
        tf.features = TRUSTED_PROTOCOL_VENDOR;
        tf.sector_count = (len as u32 / self.bytes_per_sector) as u8;
        tf.dev_head = DEV_HEAD_FIXED;
        tf.command = cmd as u8;
        req
    }
}

/// Decode a failed issue. A written-back task file with the status ERR
/// bit set means the drive itself rejected the command; anything else is
/// an OS-level failure.
fn taskfile_error(req: &AtaPassThrough, os: std::io::Error) -> DriveError {
    let tf = &req.current_task_file;
    if tf.command.get_bit(reg::STATUS::ERR) {
        DriveError::Protocol {
            flags: AtaErrorFlags::from_error_register(tf.features),
        }
    } else {
        DriveError::Issue(os)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::io::ScsiPassThrough;

    /// Captures the issued envelope, then runs a canned completion.
    #[derive(Debug)]
    struct Capture {
        seen: Option<AtaPassThrough>,
        complete: fn(&mut AtaPassThrough) -> io::Result<usize>,
    }

    impl Capture {
        fn new(complete: fn(&mut AtaPassThrough) -> io::Result<usize>) -> Capture {
            Capture {
                seen: None,
                complete,
            }
        }
    }

    impl DeviceIo for Capture {
        fn ata_pass_through(
            &mut self,
            req: &mut AtaPassThrough,
            _data: DataXfer<'_>,
        ) -> io::Result<usize> {
            self.seen = Some(*req);
            (self.complete)(req)
        }

        fn scsi_pass_through(
            &mut self,
            _req: &mut ScsiPassThrough,
            _data: DataXfer<'_>,
        ) -> io::Result<usize> {
            unreachable!("ATA transport must not build SCSI requests")
        }

        fn try_clone(&self) -> io::Result<Box<dyn DeviceIo>> {
            unreachable!()
        }
    }

    #[test]
    fn identify_request_layout() {
        let iface = AtaInterface::new(512, 15);
        let mut io = Capture::new(|_| Ok(AtaPassThrough::ENVELOPE_SIZE));
        let mut sector = IdentifySector::default();

        iface.read_identify_sector(&mut io, &mut sector).unwrap();

        let req = io.seen.unwrap();
        assert_eq!(req.ata_flags, ata_flags::DATA_IN | ata_flags::DRDY_REQUIRED);
        assert_eq!(req.data_transfer_length, 512);
        assert_eq!(req.timeout_value, 15);
        assert_eq!(req.current_task_file.command, 0xec);
        assert_eq!(req.current_task_file.dev_head, 0x40);
        assert_eq!(req.current_task_file.features, 0);
    }

    #[test]
    fn trusted_request_layout() {
        let iface = AtaInterface::new(512, 15);
        let req = iface.trusted_request(ata_flags::DATA_OUT, AtaCmd::TrustedSend, 1024);

        assert_eq!(req.ata_flags, ata_flags::DATA_OUT | ata_flags::DRDY_REQUIRED);
        assert_eq!(req.data_transfer_length, 1024);
        assert_eq!(req.current_task_file.command, 0x5e);
        assert_eq!(req.current_task_file.features, 0xf0);
        assert_eq!(req.current_task_file.sector_count, 2);
        assert_eq!(req.current_task_file.dev_head, 0x40);

        let req = iface.trusted_request(ata_flags::DATA_IN, AtaCmd::TrustedReceive, 512);
        assert_eq!(req.current_task_file.command, 0x5c);
        assert_eq!(req.current_task_file.sector_count, 1);
    }

    #[test]
    fn short_transfer_is_an_error() {
        let iface = AtaInterface::new(512, 15);
        let mut io = Capture::new(|_| Ok(10));
        let mut sector = IdentifySector::default();

        let err = iface.read_identify_sector(&mut io, &mut sector).unwrap_err();
        assert!(matches!(err, DriveError::ShortTransfer { got: 10, .. }));
    }

    #[test]
    fn error_bit_decodes_to_protocol_error() {
        let iface = AtaInterface::new(512, 15);
        let mut io = Capture::new(|req| {
            let tf = &mut req.current_task_file;
            tf.command = 0x51; // ERR | DRDY | DF
            tf.features = 0x44; // Uncorr | Abort
            Err(io::Error::new(io::ErrorKind::Other, "ioctl failed"))
        });
        let mut sector = IdentifySector::default();

        let err = iface.read_identify_sector(&mut io, &mut sector).unwrap_err();
        match err {
            DriveError::Protocol { flags } => {
                assert!(flags.abort());
                assert!(flags.uncorrectable());
                assert!(!flags.interface_crc());
            }
            other => panic!("expected protocol error, got {:?}", other),
        }
    }

    #[test]
    fn os_failure_without_error_bit_is_issue() {
        let iface = AtaInterface::new(512, 15);
        let mut io =
            Capture::new(|_| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));
        let mut sector = IdentifySector::default();

        let err = iface.read_identify_sector(&mut io, &mut sector).unwrap_err();
        assert!(matches!(err, DriveError::Issue(_)));
    }
}
