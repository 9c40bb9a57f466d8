//! The ATA "Identify Sector": the fixed 512-byte record a drive returns
//! describing its model, capabilities, and geometry.
//!
//! Field offsets and widths are defined by the T13 ATA/ATAPI drive
//! interface specification (see <http://www.t13.org>).

use bytemuck::{Pod, Zeroable};

/// Size, in bytes, of an ATA disk sector (and of the Identify Sector).
pub const ATA_SECTOR_SIZE: usize = 512;

/// Widest ASCII string field in the layout (current media serial number,
/// words 176-205). Field decoding fails closed past this length.
const MAX_STRING_FIELD: usize = 60;

/// Raw Identify Sector layout, word-for-word per the T13 spec.
///
/// Word-addressed offsets are noted per field. ASCII fields are stored
/// big-endian-per-word and read back byte-swapped.
#[derive(Copy, Clone)]
#[repr(C, packed)]
pub struct AtaIdentifySector {
    pub general_configuration: u16,        // 0, nonzero once populated
    pub obsolete1: u16,                    // 1
    pub specific_configuration: u16,       // 2
    pub obsolete2: u16,                    // 3
    pub retired1: [u16; 2],                // 4-5
    pub obsolete3: u16,                    // 6
    pub reserved_cfa: u32,                 // 7-8
    pub retired2: u16,                     // 9
    pub serial_no: [u8; 20],               // 10-19
    pub retired3: u32,                     // 20-21
    pub obsolete4: u16,                    // 22
    pub fw_rev: [u8; 8],                   // 23-26
    pub model: [u8; 40],                   // 27-46
    pub max_per_interrupt: u16,            // 47
    pub reserved48: u16,                   // 48
    pub capabilities1: u16,                // 49
    pub capabilities2: u16,                // 50
    pub obsolete5: u32,                    // 51-52
    pub field_valid: u16,                  // 53
    pub obsolete6: [u16; 5],               // 54-58
    pub mult_sector: u16,                  // 59
    pub total_addressable_sectors: u32,    // 60-61
    pub obsolete7: u16,                    // 62
    pub multiword_dma: u16,                // 63
    pub pio_modes: u16,                    // 64
    pub min_mwdma_cycle_time: u16,         // 65
    pub rec_mwdma_cycle_time: u16,         // 66
    pub min_pio_cycle_time: u16,           // 67
    pub min_pio_cycle_time_iordy: u16,     // 68
    pub reserved69_74: [u16; 6],           // 69-74
    pub queue_depth: u16,                  // 75
    pub reserved76_79: [u16; 4],           // 76-79
    pub major_version: u16,                // 80
    pub minor_version: u16,                // 81
    pub command_set_supported1: u16,       // 82
    pub command_set_supported2: u16,       // 83
    pub command_set_supported3: u16,       // 84
    pub command_set_enabled1: u16,         // 85
    pub command_set_enabled2: u16,         // 86
    pub command_set_default: u16,          // 87
    pub ultra_dma_mode: u16,               // 88
    pub security_erase_time: u16,          // 89
    pub enhanced_erase_time: u16,          // 90
    pub current_apm: u16,                  // 91
    pub master_password_rev: u16,          // 92
    pub hardware_reset_result: u16,        // 93
    pub acoustic_management: u16,          // 94
    pub stream_min_request_size: u16,      // 95
    pub streaming_time_dma: u16,           // 96
    pub streaming_access_latency: u16,     // 97
    pub streaming_performance: u32,        // 98-99
    pub max_user_lba: [u16; 4],            // 100-103
    pub streaming_time_pio: u16,           // 104
    pub reserved105: u16,                  // 105
    pub sector_size_info: u16,             // 106
    pub inter_seek_delay: u16,             // 107
    pub ieee_oui: u16,                     // 108
    pub unique_id: [u16; 3],               // 109-111
    pub reserved112_115: [u16; 4],         // 112-115
    pub reserved116: u16,                  // 116
    pub words_per_logical_sector: u32,     // 117-118
    pub reserved119_126: [u16; 8],         // 119-126
    pub removable_media_status: u16,       // 127
    pub security_status: u16,              // 128
    pub vendor_specific: [u16; 31],        // 129-159
    pub cfa_power_mode: u16,               // 160
    pub reserved161_175: [u16; 15],        // 161-175
    pub current_media_serial_no: [u8; 60], // 176-205
    pub reserved206_254: [u16; 49],        // 206-254
    pub integrity_word: u16,               // 255
}

// Must be exactly 512 bytes to conform to the ATA spec
const_assert_eq!(std::mem::size_of::<AtaIdentifySector>(), ATA_SECTOR_SIZE);

// Safety:
// - All fields have type `uX` and/or are arrays of `uX` types.
// - #[repr(C, packed)] ensures that there is no padding (and therefore, no
//   invalid bit patterns)
unsafe impl Zeroable for AtaIdentifySector {}
unsafe impl Pod for AtaIdentifySector {}

impl Default for AtaIdentifySector {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl std::fmt::Debug for AtaIdentifySector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AtaIdentifySector: {{ ... }}")
    }
}

/// Swap the two bytes of every 16-bit word in `buf`.
///
/// ATA string fields are stored big-endian-per-word while the host reads
/// little-endian. The transform is self-inverse: applying it twice
/// restores the original byte order.
pub(crate) fn swap_word_bytes(buf: &mut [u8]) {
    for pair in buf.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// A drive's Identify Sector, plus the queries the rest of the crate
/// asks of it. Populated in one shot by a transport query; zero until
/// then.
#[derive(Copy, Clone)]
pub struct IdentifySector {
    data: AtaIdentifySector,
}

impl Default for IdentifySector {
    fn default() -> Self {
        IdentifySector {
            data: AtaIdentifySector::zeroed(),
        }
    }
}

impl std::fmt::Debug for IdentifySector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifySector")
            .field("available", &self.is_data_available())
            .finish()
    }
}

impl IdentifySector {
    /// Reconstruct a sector from a raw 512-byte buffer.
    pub fn from_bytes(bytes: &[u8; ATA_SECTOR_SIZE]) -> IdentifySector {
        IdentifySector {
            data: *bytemuck::from_bytes(bytes),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.data)
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::bytes_of_mut(&mut self.data)
    }

    /// Zero-fill the record, so a failed query cannot leave stale data
    /// looking valid.
    pub fn initialize(&mut self) {
        self.data = AtaIdentifySector::zeroed();
    }

    /// True iff the record has been populated by a successful query (the
    /// general-configuration word is nonzero).
    pub fn is_data_available(&self) -> bool {
        self.data.general_configuration > 0
    }

    pub fn model(&self) -> String {
        let field = self.data.model;
        self.byte_swapped_field(&field)
    }

    pub fn firmware(&self) -> String {
        let field = self.data.fw_rev;
        self.byte_swapped_field(&field)
    }

    pub fn serial_no(&self) -> String {
        let field = self.data.serial_no;
        self.byte_swapped_field(&field)
    }

    pub fn vendor_id(&self) -> String {
        // TODO: build a table of vendor strings and return that based
        // upon model analysis.
        if !self.is_data_available() {
            String::new()
        } else if self.is_seagate_model() {
            "Seagate".to_string()
        } else {
            ":-)".to_string()
        }
    }

    pub fn is_seagate_model(&self) -> bool {
        if !self.is_data_available() {
            return false;
        }
        // the raw model field is still byte-swapped, so "ST" reads "TS"
        let model = self.data.model;
        model.starts_with(b"TS")
    }

    /// Nonzero values in reserved words 76 and 79 advertise the ATA
    /// passthrough feature set.
    pub fn is_ata_passthru_capable(&self) -> bool {
        if !self.is_data_available() {
            return false;
        }
        let reserved = self.data.reserved76_79;
        reserved[0] != 0 || reserved[3] != 0
    }

    /// Identify Sector word 150 is word 21 of the vendor-specific block;
    /// bits 0x10 and 0x1000 together advertise the trust protocol.
    pub fn is_drive_trust_capable(&self) -> bool {
        if !self.is_data_available() {
            return false;
        }
        let vendor = self.data.vendor_specific;
        (vendor[21] & 0x10) > 0 && (vendor[21] & 0x1000) > 0
    }

    /// Decode an ASCII field: copy, swap each adjacent byte pair, stop at
    /// the first NUL, and trim leading/trailing ASCII whitespace.
    ///
    /// Fails closed: an unavailable record or a field wider than any
    /// string field in the layout decodes to the empty string.
    fn byte_swapped_field(&self, field: &[u8]) -> String {
        if !self.is_data_available() || field.is_empty() || field.len() > MAX_STRING_FIELD {
            return String::new();
        }

        let mut buf = [0; MAX_STRING_FIELD];
        let buf = &mut buf[..field.len()];
        buf.copy_from_slice(field);
        swap_word_bytes(buf);

        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        String::from_utf8_lossy(&buf[..end])
            .trim_matches(|c: char| c.is_ascii_whitespace())
            .to_string()
    }
}

/// Drive metadata used to fabricate an Identify Sector (the emulated
/// backend and tests).
///
/// `serial`, `fw_version`, and `model` should be ASCII.
pub struct IdentifyMeta<'a> {
    pub serial: &'a [u8],
    pub fw_version: &'a [u8],
    pub model: &'a [u8],
    /// Advertise the ATA passthrough feature set (words 76/79).
    pub ata_passthru: bool,
    /// Advertise the vendor-specific trust protocol (word 150).
    pub drive_trust: bool,
}

impl IdentifyMeta<'_> {
    /// Populate an Identify Sector using the provided metadata.
    pub fn to_identify_sector(&self) -> IdentifySector {
        let mut id = AtaIdentifySector {
            general_configuration: 0x0040, // not removable controller and/or device
            ..AtaIdentifySector::default()
        };

        // writes text into dst buffer, padding with spaces if it's too short. also
        // handles the wonky endianess conversion stuff for strings
        let pad_ascii = |dst: &mut [u8], src: &[u8]| {
            for (i, b) in dst.iter_mut().enumerate() {
                *b = *src.get(i ^ 1).unwrap_or(&b' ');
            }
        };

        pad_ascii(&mut id.serial_no, self.serial);
        pad_ascii(&mut id.fw_rev, self.fw_version);
        pad_ascii(&mut id.model, self.model);

        if self.ata_passthru {
            let mut reserved = id.reserved76_79;
            reserved[0] = 1;
            reserved[3] = 1;
            id.reserved76_79 = reserved;
        }
        if self.drive_trust {
            let mut vendor = id.vendor_specific;
            vendor[21] = 0x1010;
            id.vendor_specific = vendor;
        }

        IdentifySector { data: id }
    }
}

#[cfg(test)]
mod tests {
    use byteorder::{ByteOrder, LittleEndian};

    use super::*;

    fn sector_with_model(model: &[u8]) -> IdentifySector {
        IdentifyMeta {
            serial: b"",
            fw_version: b"",
            model,
            ata_passthru: false,
            drive_trust: false,
        }
        .to_identify_sector()
    }

    #[test]
    fn swap_is_self_inverse() {
        let original: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(7) ^ 0x5a).collect();
        let mut buf = original.clone();
        swap_word_bytes(&mut buf);
        assert_ne!(buf, original);
        swap_word_bytes(&mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn unavailable_record_decodes_empty() {
        let sector = IdentifySector::default();
        assert!(!sector.is_data_available());
        assert_eq!(sector.model(), "");
        assert_eq!(sector.firmware(), "");
        assert_eq!(sector.serial_no(), "");
        assert_eq!(sector.vendor_id(), "");
        assert!(!sector.is_seagate_model());
        assert!(!sector.is_ata_passthru_capable());
        assert!(!sector.is_drive_trust_capable());
    }

    #[test]
    fn trims_edges_but_not_interior() {
        let sector = sector_with_model(b"  WDC WD1600 Drive  ");
        assert_eq!(sector.model(), "WDC WD1600 Drive");
    }

    #[test]
    fn all_space_field_decodes_empty() {
        let sector = sector_with_model(b"");
        assert!(sector.is_data_available());
        assert_eq!(sector.model(), "");
    }

    #[test]
    fn oversized_field_fails_closed() {
        let mut sector = sector_with_model(b"whatever");
        assert_eq!(sector.byte_swapped_field(&[b'a'; 61]), "");
        assert_eq!(sector.byte_swapped_field(&[]), "");
        // widest legitimate field still decodes
        sector.data.current_media_serial_no = [b'a'; 60];
        let field = sector.data.current_media_serial_no;
        assert_eq!(sector.byte_swapped_field(&field), "a".repeat(60));
    }

    #[test]
    fn vendor_heuristic() {
        assert_eq!(sector_with_model(b"ST3160023A").vendor_id(), "Seagate");
        assert!(sector_with_model(b"ST3160023A").is_seagate_model());
        assert_eq!(sector_with_model(b"WDC WD1600").vendor_id(), ":-)");
        assert!(!sector_with_model(b"WDC WD1600").is_seagate_model());
        // "ST" must lead the field, not merely appear in it
        assert_eq!(sector_with_model(b"FASTDISK").vendor_id(), ":-)");
    }

    #[test]
    fn end_to_end_model_decode() {
        let model: &[u8] = b"ST0123456789ABCDEFGHIJKLMNOPQRST";
        let sector = sector_with_model(model);

        // the raw field holds the byte-swapped text, leading with "TS"
        let raw = sector.data.model;
        assert!(raw.starts_with(b"TS"));

        assert_eq!(sector.model().as_bytes(), model);
        assert_eq!(sector.vendor_id(), "Seagate");
    }

    #[test]
    fn trust_capability_needs_both_bits() {
        let mut sector = sector_with_model(b"x");
        assert!(!sector.is_drive_trust_capable());

        let mut vendor = sector.data.vendor_specific;
        vendor[21] = 0x10;
        sector.data.vendor_specific = vendor;
        assert!(!sector.is_drive_trust_capable());

        vendor[21] = 0x1000;
        sector.data.vendor_specific = vendor;
        assert!(!sector.is_drive_trust_capable());

        vendor[21] = 0x1010;
        sector.data.vendor_specific = vendor;
        assert!(sector.is_drive_trust_capable());

        // unavailable data wins over the bits
        sector.data.general_configuration = 0;
        assert!(!sector.is_drive_trust_capable());
    }

    #[test]
    fn trust_word_is_word_150() {
        let mut raw = [0; ATA_SECTOR_SIZE];
        LittleEndian::write_u16(&mut raw[0..2], 0x0040);
        LittleEndian::write_u16(&mut raw[300..302], 0x1010);
        let sector = IdentifySector::from_bytes(&raw);
        assert!(sector.is_drive_trust_capable());
    }

    #[test]
    fn passthru_capability_words() {
        let mut raw = [0; ATA_SECTOR_SIZE];
        LittleEndian::write_u16(&mut raw[0..2], 0x0040);
        let sector = IdentifySector::from_bytes(&raw);
        assert!(!sector.is_ata_passthru_capable());

        // word 76
        LittleEndian::write_u16(&mut raw[152..154], 1);
        assert!(IdentifySector::from_bytes(&raw).is_ata_passthru_capable());

        // word 79
        LittleEndian::write_u16(&mut raw[152..154], 0);
        LittleEndian::write_u16(&mut raw[158..160], 1);
        assert!(IdentifySector::from_bytes(&raw).is_ata_passthru_capable());
    }

    #[test]
    fn meta_round_trips_strings() {
        let sector = IdentifyMeta {
            serial: b"9QZ1A2B3",
            fw_version: b"3.ADA",
            model: b"ST3160023A",
            ata_passthru: true,
            drive_trust: true,
        }
        .to_identify_sector();

        assert!(sector.is_data_available());
        assert_eq!(sector.serial_no(), "9QZ1A2B3");
        assert_eq!(sector.firmware(), "3.ADA");
        assert_eq!(sector.model(), "ST3160023A");
        assert!(sector.is_ata_passthru_capable());
        assert!(sector.is_drive_trust_capable());
    }
}
