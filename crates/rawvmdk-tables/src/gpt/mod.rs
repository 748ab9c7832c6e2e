//! GPT (GUID Partition Table) parsing
//!
//! # Structure
//!
//! ```text
//! LBA 0:    Protective MBR
//! LBA 1:    Primary GPT header
//! LBA 2+:   Entry array (typically 128 entries of 128 bytes)
//! ...
//! Last-32:  Backup entry array
//! Last:     Backup GPT header
//! ```
//!
//! Absence of a GPT is decided only by the signature and revision in the
//! second block and is never an error; a matching signature with an
//! inconsistent header is surfaced as [`Error::MalformedGpt`] instead of
//! being masked, since handing a hypervisor a half-parsed geometry would
//! produce a corrupt disk description.

pub mod types;

use rawvmdk_core::{Error, Partition, ReadSeek, Result, SECTOR_SIZE};
use std::io::{ErrorKind, SeekFrom};
use tracing::debug;
use types::{GptEntry, GptHeader};
use uuid::Uuid;

/// Upper bound on the entry-array size we will read (16 MiB)
///
/// A CRC-valid header can still request an absurd allocation; real entry
/// arrays are 16 KiB.
const MAX_ENTRY_AREA: usize = 16 * 1024 * 1024;

/// Parsed GPT: typed header, decoded entries, and the captured raw blocks
///
/// The raw header, backup header, and padded entry array are kept
/// verbatim because the descriptor generator writes them back out as side
/// files for the virtual machine.
#[derive(Debug, Clone)]
pub struct GptTable {
    header: GptHeader,
    raw_header: [u8; SECTOR_SIZE],
    raw_alternate: [u8; SECTOR_SIZE],
    raw_entries: Vec<u8>,
    entries: Vec<GptEntry>,
}

impl GptTable {
    /// Attempt to parse a GPT from a source positioned anywhere
    ///
    /// Returns `Ok(None)` when the device has no GPT: the second block is
    /// missing, or its signature/revision does not match.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedGpt`] when the signature matches but the header
    /// checksums fail, the entry geometry is implausible, or the entry
    /// array / backup header cannot be read.
    pub fn parse(source: &mut dyn ReadSeek) -> Result<Option<Self>> {
        source.seek(SeekFrom::Start(SECTOR_SIZE as u64))?;
        let mut raw_header = [0u8; SECTOR_SIZE];
        if let Err(e) = source.read_exact(&mut raw_header) {
            // A source too short to hold block 1 simply has no GPT
            if e.kind() == ErrorKind::UnexpectedEof {
                return Ok(None);
            }
            return Err(e.into());
        }

        let header = match GptHeader::from_bytes(&raw_header) {
            Some(header) => header,
            None => return Ok(None),
        };

        if !header.verify_header_crc32(&raw_header) {
            return Err(Error::malformed_gpt("header CRC32 mismatch"));
        }
        if header.alternate_lba == 0 {
            return Err(Error::malformed_gpt("alternate header LBA is zero"));
        }
        if (header.entry_size as usize) < GptEntry::MIN_ENTRY_SIZE {
            return Err(Error::malformed_gpt(format!(
                "entry size {} below the 128-byte layout",
                header.entry_size
            )));
        }

        let area = header.entry_count as usize * header.entry_size as usize;
        if area > MAX_ENTRY_AREA {
            return Err(Error::malformed_gpt(format!(
                "entry array of {} bytes is implausible",
                area
            )));
        }

        source.seek(SeekFrom::Start(header.entries_lba * SECTOR_SIZE as u64))?;
        let mut raw_entries = vec![0u8; area];
        source
            .read_exact(&mut raw_entries)
            .map_err(|_| Error::malformed_gpt("truncated entry array"))?;

        if !header.verify_entries_crc32(&raw_entries) {
            return Err(Error::malformed_gpt("entry array CRC32 mismatch"));
        }

        let entries: Vec<GptEntry> = raw_entries
            .chunks_exact(header.entry_size as usize)
            .enumerate()
            .map(|(i, bytes)| GptEntry::from_bytes(i as u32 + 1, bytes))
            .filter(|e| e.is_valid())
            .collect();

        // Pad the captured array to a whole number of blocks; the side
        // file and the extent covering it are block-sized.
        raw_entries.resize(area.div_ceil(SECTOR_SIZE) * SECTOR_SIZE, 0);

        // Capture the backup header block verbatim
        source.seek(SeekFrom::Start(header.alternate_lba * SECTOR_SIZE as u64))?;
        let mut raw_alternate = [0u8; SECTOR_SIZE];
        source.read_exact(&mut raw_alternate).map_err(|_| {
            Error::malformed_gpt(format!(
                "alternate header at LBA {} is unreadable",
                header.alternate_lba
            ))
        })?;

        debug!(
            entries = entries.len(),
            alternate_lba = header.alternate_lba,
            "parsed GPT"
        );

        Ok(Some(Self {
            header,
            raw_header,
            raw_alternate,
            raw_entries,
            entries,
        }))
    }

    /// The typed header
    pub fn header(&self) -> &GptHeader {
        &self.header
    }

    /// Disk GUID from the header
    pub fn disk_guid(&self) -> Uuid {
        self.header.disk_guid
    }

    /// LBA of the backup header near the end of the device
    pub fn alternate_lba(&self) -> u64 {
        self.header.alternate_lba
    }

    /// Number of blocks the entry array occupies, rounded up
    pub fn entry_blocks(&self) -> u64 {
        let area = self.header.entry_count as u64 * self.header.entry_size as u64;
        area.div_ceil(SECTOR_SIZE as u64)
    }

    /// The valid entries, in array order
    pub fn entries(&self) -> &[GptEntry] {
        &self.entries
    }

    /// The captured primary header block
    pub fn raw_header(&self) -> &[u8; SECTOR_SIZE] {
        &self.raw_header
    }

    /// The captured backup header block
    pub fn raw_alternate(&self) -> &[u8; SECTOR_SIZE] {
        &self.raw_alternate
    }

    /// The captured entry array, padded to whole blocks
    pub fn raw_entries(&self) -> &[u8] {
        &self.raw_entries
    }

    /// Format-agnostic view of the valid entries
    ///
    /// Partition numbers are the 1-based array positions, so holes in the
    /// entry array leave holes in the numbering.
    pub fn partitions(&self) -> Vec<Partition> {
        self.entries
            .iter()
            .map(|e| {
                let part = Partition::new(e.num, e.offset, e.size);
                if e.name.is_empty() {
                    part
                } else {
                    part.with_name(e.name.clone())
                }
            })
            .collect()
    }
}

/// Build a 2048-block GPT disk fixture: "EFI" at 34 (100 blocks) and
/// "root" at 134 (1000 blocks), backup header at LBA 2047
#[cfg(test)]
pub(crate) fn create_test_gpt_disk() -> Vec<u8> {
    use crate::gpt::types::type_guids;

    let total_blocks = 2048usize;
    let mut disk = vec![0u8; total_blocks * 512];

    // Protective MBR
    disk[0x1BE + 4] = 0xEE;
    disk[0x1BE + 8] = 0x01;
    disk[0x1BE + 12..0x1BE + 16].copy_from_slice(&(total_blocks as u32 - 1).to_le_bytes());
    disk[0x1FE] = 0x55;
    disk[0x1FF] = 0xAA;

    // Header at LBA 1
    let h = 512;
    disk[h..h + 8].copy_from_slice(b"EFI PART");
    disk[h + 8..h + 12].copy_from_slice(&0x00010000u32.to_le_bytes());
    disk[h + 12..h + 16].copy_from_slice(&92u32.to_le_bytes());
    disk[h + 24..h + 32].copy_from_slice(&1u64.to_le_bytes());
    disk[h + 32..h + 40].copy_from_slice(&2047u64.to_le_bytes());
    disk[h + 40..h + 48].copy_from_slice(&34u64.to_le_bytes());
    disk[h + 48..h + 56].copy_from_slice(&2014u64.to_le_bytes());
    disk[h + 56..h + 72].copy_from_slice(&type_guids::LINUX_FILESYSTEM.to_bytes_le());
    disk[h + 72..h + 80].copy_from_slice(&2u64.to_le_bytes());
    disk[h + 80..h + 84].copy_from_slice(&128u32.to_le_bytes());
    disk[h + 84..h + 88].copy_from_slice(&128u32.to_le_bytes());

    // Entry 1: "EFI", LBA 34..133
    let e = 2 * 512;
    disk[e..e + 16].copy_from_slice(&type_guids::EFI_SYSTEM.to_bytes_le());
    disk[e + 16] = 0x01;
    disk[e + 32..e + 40].copy_from_slice(&34u64.to_le_bytes());
    disk[e + 40..e + 48].copy_from_slice(&133u64.to_le_bytes());
    for (i, unit) in "EFI".encode_utf16().enumerate() {
        disk[e + 56 + i * 2..e + 58 + i * 2].copy_from_slice(&unit.to_le_bytes());
    }

    // Entry 2: "root", LBA 134..1133
    let e = e + 128;
    disk[e..e + 16].copy_from_slice(&type_guids::LINUX_FILESYSTEM.to_bytes_le());
    disk[e + 16] = 0x02;
    disk[e + 32..e + 40].copy_from_slice(&134u64.to_le_bytes());
    disk[e + 40..e + 48].copy_from_slice(&1133u64.to_le_bytes());
    for (i, unit) in "root".encode_utf16().enumerate() {
        disk[e + 56 + i * 2..e + 58 + i * 2].copy_from_slice(&unit.to_le_bytes());
    }

    // Entry-array CRC over 128 * 128 bytes
    let entries_crc = crc32fast::hash(&disk[2 * 512..2 * 512 + 128 * 128]);
    disk[h + 88..h + 92].copy_from_slice(&entries_crc.to_le_bytes());

    // Header CRC with the CRC field zeroed
    let mut header_copy = disk[h..h + 92].to_vec();
    header_copy[16..20].fill(0);
    let header_crc = crc32fast::hash(&header_copy);
    disk[h + 16..h + 20].copy_from_slice(&header_crc.to_le_bytes());

    // Backup header block (captured verbatim, not validated)
    let backup = 2047 * 512;
    let header_block: Vec<u8> = disk[512..1024].to_vec();
    disk[backup..backup + 512].copy_from_slice(&header_block);

    disk
}
