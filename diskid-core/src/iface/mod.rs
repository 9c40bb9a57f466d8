//! Bus-interface dispatch.
//!
//! A drive is bound to exactly one transport variant, selected from the
//! externally supplied interface token when the drive is constructed and
//! never switched afterwards. The variants differ in how they wrap an
//! ATA command for the wire, not in what they ask the drive.

use crate::drive::ScsiAddress;
use crate::error::{DriveError, DriveResult};
use crate::identify::IdentifySector;
use crate::io::DeviceIo;

mod ata;
mod scsi;

pub(crate) use ata::AtaInterface;
pub(crate) use scsi::UsbScsiInterface;

/// Bus kind a drive is reached over, from the enumeration collaborator's
/// interface-type token.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Direct (S)ATA task-file passthrough ("IDE").
    Ata,
    /// SATA/ATA disk behind a USB-to-SCSI bridge ("USB").
    UsbScsi,
    /// No known command translation for this bus.
    Unsupported,
}

impl InterfaceKind {
    /// Map an enumeration token onto a bus kind. Unrecognized tokens
    /// route to `Unsupported`, so every enumerated drive stays
    /// constructable and fails informatively instead.
    pub fn from_token(token: &str) -> InterfaceKind {
        match token {
            "IDE" => InterfaceKind::Ata,
            "USB" => InterfaceKind::UsbScsi,
            _ => InterfaceKind::Unsupported,
        }
    }
}

impl std::fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterfaceKind::Ata => write!(f, "IDE"),
            InterfaceKind::UsbScsi => write!(f, "USB"),
            InterfaceKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// The transport variant bound to a drive.
#[derive(Debug)]
pub(crate) enum BusInterface {
    Ata(AtaInterface),
    UsbScsi(UsbScsiInterface),
    Unsupported,
}

impl BusInterface {
    pub(crate) fn new(
        kind: InterfaceKind,
        bytes_per_sector: u32,
        address: ScsiAddress,
        timeout_secs: u32,
    ) -> BusInterface {
        match kind {
            InterfaceKind::Ata => {
                BusInterface::Ata(AtaInterface::new(bytes_per_sector, timeout_secs))
            }
            InterfaceKind::UsbScsi => BusInterface::UsbScsi(UsbScsiInterface::new(
                address,
                bytes_per_sector,
                timeout_secs,
            )),
            InterfaceKind::Unsupported => BusInterface::Unsupported,
        }
    }

    pub(crate) fn read_identify_sector(
        &self,
        io: &mut dyn DeviceIo,
        sector: &mut IdentifySector,
    ) -> DriveResult<()> {
        match self {
            BusInterface::Ata(ata) => ata.read_identify_sector(io, sector),
            BusInterface::UsbScsi(usb) => usb.read_identify_sector(io, sector),
            BusInterface::Unsupported => Self::unsupported(),
        }
    }

    pub(crate) fn send(&self, io: &mut dyn DeviceIo, buffer: &[u8]) -> DriveResult<()> {
        match self {
            BusInterface::Ata(ata) => ata.send(io, buffer),
            BusInterface::UsbScsi(usb) => usb.send(io, buffer),
            BusInterface::Unsupported => Self::unsupported(),
        }
    }

    pub(crate) fn receive(&self, io: &mut dyn DeviceIo, buffer: &mut [u8]) -> DriveResult<()> {
        match self {
            BusInterface::Ata(ata) => ata.receive(io, buffer),
            BusInterface::UsbScsi(usb) => usb.receive(io, buffer),
            BusInterface::Unsupported => Self::unsupported(),
        }
    }

    fn unsupported() -> DriveResult<()> {
        trace!("BusInterface::unsupported");
        Err(DriveError::UnsupportedBus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_routing() {
        assert_eq!(InterfaceKind::from_token("IDE"), InterfaceKind::Ata);
        assert_eq!(InterfaceKind::from_token("USB"), InterfaceKind::UsbScsi);
        assert_eq!(InterfaceKind::from_token("SCSI"), InterfaceKind::Unsupported);
        assert_eq!(InterfaceKind::from_token("1394"), InterfaceKind::Unsupported);
        assert_eq!(InterfaceKind::from_token(""), InterfaceKind::Unsupported);
    }
}
