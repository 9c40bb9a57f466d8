//! Transport-neutral error model: every failure comes back as a value,
//! annotated but never swallowed on its way up.

use std::fmt;
use std::io;

use bit_field::BitField;
use thiserror::Error;

use crate::iface::InterfaceKind;
use crate::io::reg;

pub type DriveResult<T> = Result<T, DriveError>;

/// The seven ATA error-register categories a failed passthrough command
/// can report, as a bitmask over the returned error register.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct AtaErrorFlags(u8);

impl AtaErrorFlags {
    /// Decode a returned error register. Only the upper seven bits carry
    /// categories; bit 0 is obsolete and dropped.
    pub fn from_error_register(value: u8) -> AtaErrorFlags {
        AtaErrorFlags(value & !0x01)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn no_media(&self) -> bool {
        self.0.get_bit(reg::ERROR::NM)
    }

    pub fn abort(&self) -> bool {
        self.0.get_bit(reg::ERROR::ABRT)
    }

    pub fn media_change_request(&self) -> bool {
        self.0.get_bit(reg::ERROR::MCR)
    }

    pub fn device_not_found(&self) -> bool {
        self.0.get_bit(reg::ERROR::IDNF)
    }

    pub fn media_changed(&self) -> bool {
        self.0.get_bit(reg::ERROR::MC)
    }

    pub fn uncorrectable(&self) -> bool {
        self.0.get_bit(reg::ERROR::UNC)
    }

    pub fn interface_crc(&self) -> bool {
        self.0.get_bit(reg::ERROR::ICRC)
    }
}

impl fmt::Display for AtaErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }

        let categories = [
            (self.no_media(), "NoMedia"),
            (self.abort(), "Abort"),
            (self.media_change_request(), "MediaChangeRequest"),
            (self.device_not_found(), "DeviceNotFound"),
            (self.media_changed(), "MediaChanged"),
            (self.uncorrectable(), "Uncorr"),
            (self.interface_crc(), "IntrCRC"),
        ];

        let mut first = true;
        for (set, name) in categories.iter() {
            if *set {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Failure reported by a drive operation.
#[derive(Debug, Error)]
pub enum DriveError {
    /// The device handle is not open.
    #[error("invalid device handle")]
    InvalidHandle,

    /// No known command translation for the drive's bus kind.
    #[error("unsupported bus interface type")]
    UnsupportedBus,

    /// The OS-level device I/O call itself failed.
    #[error("device I/O failed: {0}")]
    Issue(#[from] io::Error),

    /// The device accepted the I/O call but reported command failure
    /// through its own status/error encoding.
    #[error("drive rejected command: {flags}")]
    Protocol { flags: AtaErrorFlags },

    /// Fewer bytes came back than the request envelope requires.
    #[error("short transfer: {got} of {expected} bytes")]
    ShortTransfer { got: usize, expected: usize },

    /// A failure annotated with the drive it occurred on.
    #[error("{name} ({iface}): {source}")]
    Drive {
        name: String,
        iface: InterfaceKind,
        #[source]
        source: Box<DriveError>,
    },
}

impl DriveError {
    /// Walk past any drive-context wrappers to the underlying failure.
    pub fn root(&self) -> &DriveError {
        match self {
            DriveError::Drive { source, .. } => source.root(),
            other => other,
        }
    }
}
