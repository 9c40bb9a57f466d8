use std::io;

use crate::io::{AtaPassThrough, DataXfer, DeviceIo, ScsiPassThrough};

/// A device handle that was never opened (or whose duplication failed).
/// Reports itself invalid; every issue fails.
#[derive(Debug)]
pub struct Null;

fn no_handle() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "no device handle")
}

impl DeviceIo for Null {
    fn ata_pass_through(
        &mut self,
        _req: &mut AtaPassThrough,
        _data: DataXfer<'_>,
    ) -> io::Result<usize> {
        Err(no_handle())
    }

    fn scsi_pass_through(
        &mut self,
        _req: &mut ScsiPassThrough,
        _data: DataXfer<'_>,
    ) -> io::Result<usize> {
        Err(no_handle())
    }

    fn is_valid(&self) -> bool {
        false
    }

    fn try_clone(&self) -> io::Result<Box<dyn DeviceIo>> {
        Ok(Box::new(Null))
    }
}
