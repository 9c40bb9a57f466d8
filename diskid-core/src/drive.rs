//! The disk-drive wrapper: one open handle, one fixed bus interface, one
//! Identify Sector, one lock.

use std::io;
use std::sync::Mutex;

use crate::error::{DriveError, DriveResult};
use crate::identify::IdentifySector;
use crate::iface::{BusInterface, InterfaceKind};
use crate::io::DeviceIo;

/// Default per-operation hardware timeout, in seconds.
pub const DEFAULT_IO_TIMEOUT_SECS: u32 = 15;

/// SCSI addressing tuple reported by the enumeration collaborator. Only
/// meaningful for drives behind a USB-to-SCSI bridge.
#[derive(Debug, Default, Copy, Clone)]
pub struct ScsiAddress {
    pub bus: u16,
    pub logical_unit: u16,
    pub port: u16,
    pub target_id: u16,
}

/// Decoded Identify Sector strings, computed once per populated record.
#[derive(Debug, Clone)]
struct IdentifyFields {
    model: String,
    firmware: String,
    serial_no: String,
    vendor_id: String,
}

#[derive(Debug)]
struct DriveShared {
    io: Box<dyn DeviceIo>,
    sector: IdentifySector,
    fields: Option<IdentifyFields>,
}

/// One attached disk drive.
///
/// Owns the device handle and the drive's Identify Sector. All command
/// traffic runs under one lock, so a command/response pair issued by one
/// caller can never interleave with another caller's traffic on the same
/// handle. Distinct drives share nothing and proceed fully in parallel.
#[derive(Debug)]
pub struct DiskDrive {
    name: String,
    kind: InterfaceKind,
    bytes_per_sector: u32,
    scsi_address: ScsiAddress,
    timeout_secs: u32,
    bus: BusInterface,
    shared: Mutex<DriveShared>,
}

impl DiskDrive {
    /// Bind an open device handle to a drive.
    ///
    /// `interface_token` is the enumeration collaborator's bus token
    /// ("IDE", "USB", ...); an unrecognized token yields a drive whose
    /// every operation fails with `UnsupportedBus` rather than a
    /// construction error.
    pub fn new(
        name: impl Into<String>,
        interface_token: &str,
        io: Box<dyn DeviceIo>,
        bytes_per_sector: u32,
        scsi_address: ScsiAddress,
    ) -> DiskDrive {
        let kind = InterfaceKind::from_token(interface_token);
        DiskDrive {
            name: name.into(),
            kind,
            bytes_per_sector,
            scsi_address,
            timeout_secs: DEFAULT_IO_TIMEOUT_SECS,
            bus: BusInterface::new(kind, bytes_per_sector, scsi_address, DEFAULT_IO_TIMEOUT_SECS),
            shared: Mutex::new(DriveShared {
                io,
                sector: IdentifySector::default(),
                fields: None,
            }),
        }
    }

    /// Override the per-operation hardware timeout.
    pub fn with_io_timeout(mut self, secs: u32) -> DiskDrive {
        self.timeout_secs = secs;
        self.bus = BusInterface::new(self.kind, self.bytes_per_sector, self.scsi_address, secs);
        self
    }

    /// Read the drive's Identify Sector through the bound bus interface.
    ///
    /// The raw record is zero-filled first, so a failed query cannot
    /// leave stale data looking valid.
    pub fn query_identify_sector(&self) -> DriveResult<()> {
        trace!("DiskDrive::query_identify_sector");

        let mut shared = self.shared.lock().unwrap();
        if !shared.io.is_valid() {
            return Err(DriveError::InvalidHandle);
        }

        shared.sector.initialize();
        shared.fields = None;

        let DriveShared { io, sector, .. } = &mut *shared;
        self.bus
            .read_identify_sector(io.as_mut(), sector)
            .map_err(|e| self.annotate(e))
    }

    /// Issue a trusted-send payload to the drive.
    pub fn send(&self, buffer: &[u8]) -> DriveResult<()> {
        trace!("DiskDrive::send");

        let mut shared = self.shared.lock().unwrap();
        if !shared.io.is_valid() {
            return Err(DriveError::InvalidHandle);
        }
        self.bus
            .send(shared.io.as_mut(), buffer)
            .map_err(|e| self.annotate(e))
    }

    /// Read a trusted-receive payload from the drive.
    pub fn receive(&self, buffer: &mut [u8]) -> DriveResult<()> {
        trace!("DiskDrive::receive");

        let mut shared = self.shared.lock().unwrap();
        if !shared.io.is_valid() {
            return Err(DriveError::InvalidHandle);
        }
        self.bus
            .receive(shared.io.as_mut(), buffer)
            .map_err(|e| self.annotate(e))
    }

    /// Issue a trusted send and its matching receive as one atomic
    /// command/response pair: no other operation on this drive can run
    /// between the two.
    pub fn exchange(&self, command: &[u8], response: &mut [u8]) -> DriveResult<()> {
        trace!("DiskDrive::exchange");

        let mut shared = self.shared.lock().unwrap();
        if !shared.io.is_valid() {
            return Err(DriveError::InvalidHandle);
        }
        self.bus
            .send(shared.io.as_mut(), command)
            .map_err(|e| self.annotate(e))?;
        self.bus
            .receive(shared.io.as_mut(), response)
            .map_err(|e| self.annotate(e))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface_kind(&self) -> InterfaceKind {
        self.kind
    }

    pub fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector
    }

    pub fn scsi_address(&self) -> ScsiAddress {
        self.scsi_address
    }

    pub fn is_handle_valid(&self) -> bool {
        self.shared.lock().unwrap().io.is_valid()
    }

    /// An independent copy of the drive's Identify Sector.
    pub fn identify_sector(&self) -> IdentifySector {
        self.shared.lock().unwrap().sector
    }

    pub fn is_ata_passthru_capable(&self) -> bool {
        self.shared.lock().unwrap().sector.is_ata_passthru_capable()
    }

    pub fn is_drive_trust_capable(&self) -> bool {
        self.shared.lock().unwrap().sector.is_drive_trust_capable()
    }

    pub fn model(&self) -> String {
        self.cached(|f| f.model.clone())
    }

    pub fn firmware(&self) -> String {
        self.cached(|f| f.firmware.clone())
    }

    pub fn serial_no(&self) -> String {
        self.cached(|f| f.serial_no.clone())
    }

    pub fn vendor_id(&self) -> String {
        self.cached(|f| f.vendor_id.clone())
    }

    /// Duplicate the drive. The clone holds its own, equally valid handle
    /// to the same device, plus a copy of the current record.
    pub fn try_clone(&self) -> io::Result<DiskDrive> {
        let shared = self.shared.lock().unwrap();
        Ok(DiskDrive {
            name: self.name.clone(),
            kind: self.kind,
            bytes_per_sector: self.bytes_per_sector,
            scsi_address: self.scsi_address,
            timeout_secs: self.timeout_secs,
            bus: BusInterface::new(
                self.kind,
                self.bytes_per_sector,
                self.scsi_address,
                self.timeout_secs,
            ),
            shared: Mutex::new(DriveShared {
                io: shared.io.try_clone()?,
                sector: shared.sector,
                fields: shared.fields.clone(),
            }),
        })
    }

    fn cached<R>(&self, get: impl FnOnce(&IdentifyFields) -> R) -> R {
        let mut shared = self.shared.lock().unwrap();
        let DriveShared { sector, fields, .. } = &mut *shared;
        let fields = fields.get_or_insert_with(|| IdentifyFields {
            model: sector.model(),
            firmware: sector.firmware(),
            serial_no: sector.serial_no(),
            vendor_id: sector.vendor_id(),
        });
        get(fields)
    }

    fn annotate(&self, source: DriveError) -> DriveError {
        DriveError::Drive {
            name: self.name.clone(),
            iface: self.kind,
            source: Box::new(source),
        }
    }
}
