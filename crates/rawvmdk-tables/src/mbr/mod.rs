//! MBR (Master Boot Record) partition table parsing
//!
//! The MBR occupies the first 512-byte block of the device and is present
//! on every disk this tool accepts; GPT disks carry a protective MBR in
//! the same place.
//!
//! # Structure
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0x000   446   Bootstrap code
//! 0x1BE   16    Partition entry 1
//! 0x1CE   16    Partition entry 2
//! 0x1DE   16    Partition entry 3
//! 0x1EE   16    Partition entry 4
//! 0x1FE   2     Boot signature (0xAA55)
//! ```

pub mod types;

use rawvmdk_core::{Error, Partition, ReadSeek, Result, SECTOR_SIZE};
use std::io::SeekFrom;
use types::{MbrEntry, MbrPartitionType};

/// Parsed MBR: the captured boot block plus its four fixed entries
///
/// The raw block is kept verbatim because it is written back out as a
/// side file of the generated descriptor; the only transformation ever
/// applied to it is the copy-on-write activation in [`MbrTable::with_active`].
#[derive(Debug, Clone)]
pub struct MbrTable {
    raw: [u8; SECTOR_SIZE],
    entries: [MbrEntry; 4],
}

impl MbrTable {
    /// The boot signature that must be present at offset 0x1FE
    pub const BOOT_SIGNATURE: u16 = 0xAA55;

    /// Offset of the first partition entry
    pub const PARTITION_TABLE_OFFSET: usize = 0x1BE;

    /// Offset of the boot signature
    pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

    /// Size of each partition entry
    pub const PARTITION_ENTRY_SIZE: usize = 16;

    /// Number of partition entries in the MBR
    pub const NUM_PARTITIONS: usize = 4;

    /// Active flag in the entry status byte
    pub const ACTIVE_FLAG: u8 = 0x80;

    /// Parse the MBR from a source positioned anywhere
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the boot signature is missing and an
    /// I/O error if block 0 cannot be read.
    pub fn parse(source: &mut dyn ReadSeek) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let mut raw = [0u8; SECTOR_SIZE];
        source.read_exact(&mut raw)?;

        let boot_signature = u16::from_le_bytes([
            raw[Self::BOOT_SIGNATURE_OFFSET],
            raw[Self::BOOT_SIGNATURE_OFFSET + 1],
        ]);
        if boot_signature != Self::BOOT_SIGNATURE {
            return Err(Error::format(format!(
                "missing MBR boot signature: expected 0x{:04X}, got 0x{:04X}",
                Self::BOOT_SIGNATURE,
                boot_signature
            )));
        }

        let entries = std::array::from_fn(|i| Self::decode_entry(&raw, i));

        Ok(Self { raw, entries })
    }

    /// Decode one fixed 16-byte entry from the captured block
    ///
    /// Packed layout: status(1), CHS start(3), type(1), CHS end(3),
    /// start-LBA(4, LE), sector-count(4, LE). The CHS fields are dead
    /// weight on LBA-addressed disks and are not decoded.
    fn decode_entry(raw: &[u8; SECTOR_SIZE], num: usize) -> MbrEntry {
        let base = Self::PARTITION_TABLE_OFFSET + num * Self::PARTITION_ENTRY_SIZE;
        let entry = &raw[base..base + Self::PARTITION_ENTRY_SIZE];

        MbrEntry {
            num,
            kind: MbrPartitionType::from_byte(entry[4]),
            active: entry[0] & Self::ACTIVE_FLAG != 0,
            offset: u32::from_le_bytes([entry[8], entry[9], entry[10], entry[11]]),
            size: u32::from_le_bytes([entry[12], entry[13], entry[14], entry[15]]),
        }
    }

    /// All four entries, valid or not
    pub fn entries(&self) -> &[MbrEntry; 4] {
        &self.entries
    }

    /// The entries with a nonzero type byte, in slot order
    pub fn valid_entries(&self) -> impl Iterator<Item = &MbrEntry> {
        self.entries.iter().filter(|e| e.is_valid())
    }

    /// The captured boot block, untouched
    pub fn raw(&self) -> &[u8; SECTOR_SIZE] {
        &self.raw
    }

    /// Check whether this MBR is a GPT protective shell
    pub fn is_gpt_protective(&self) -> bool {
        self.valid_entries()
            .any(|e| e.kind == MbrPartitionType::GptProtective)
    }

    /// Format-agnostic view of the valid entries
    ///
    /// Partition numbers are the 1-based entry slots, so a table with
    /// entries in slots 1 and 3 yields partitions numbered 1 and 3.
    pub fn partitions(&self) -> Vec<Partition> {
        self.valid_entries()
            .map(|e| {
                Partition::new(e.num as u32 + 1, e.offset as u64, e.size as u64)
                    .with_active(e.active)
            })
            .collect()
    }

    /// Produce a copy of the boot block with the active flag moved
    ///
    /// Sets the status byte of the chosen entry slot (0..3) to 0x80 and
    /// clears it on the other three; `None` clears all four. The captured
    /// block itself is never mutated.
    pub fn with_active(&self, active: Option<usize>) -> [u8; SECTOR_SIZE] {
        let mut block = self.raw;
        for num in 0..Self::NUM_PARTITIONS {
            let base = Self::PARTITION_TABLE_OFFSET + num * Self::PARTITION_ENTRY_SIZE;
            block[base] = if active == Some(num) {
                Self::ACTIVE_FLAG
            } else {
                0x00
            };
        }
        block
    }

    /// First block past the end of the last partition, or 0 with no
    /// partitions
    pub fn last_block(&self) -> u64 {
        self.valid_entries()
            .map(|e| e.offset as u64 + e.size as u64)
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Create a minimal valid MBR with two partitions
    fn create_test_mbr() -> Vec<u8> {
        let mut mbr = vec![0u8; 512];

        // Entry 1: Linux, active, 2048 blocks at LBA 2048
        let base = 0x1BE;
        mbr[base] = 0x80;
        mbr[base + 4] = 0x83;
        mbr[base + 8..base + 12].copy_from_slice(&2048u32.to_le_bytes());
        mbr[base + 12..base + 16].copy_from_slice(&2048u32.to_le_bytes());

        // Entry 3: swap, 1024 blocks at LBA 4096 (slot 2 left empty)
        let base = 0x1BE + 2 * 16;
        mbr[base + 4] = 0x82;
        mbr[base + 8..base + 12].copy_from_slice(&4096u32.to_le_bytes());
        mbr[base + 12..base + 16].copy_from_slice(&1024u32.to_le_bytes());

        mbr[0x1FE] = 0x55;
        mbr[0x1FF] = 0xAA;

        mbr
    }

    #[test]
    fn test_parse_valid_mbr() {
        let mut cursor = Cursor::new(create_test_mbr());
        let table = MbrTable::parse(&mut cursor).unwrap();

        assert_eq!(table.entries().len(), 4);
        assert_eq!(table.valid_entries().count(), 2);
        assert!(!table.is_gpt_protective());
    }

    #[test]
    fn test_parse_entry_details() {
        let mut cursor = Cursor::new(create_test_mbr());
        let table = MbrTable::parse(&mut cursor).unwrap();

        let entry = &table.entries()[0];
        assert!(entry.is_valid());
        assert!(entry.active);
        assert_eq!(entry.kind, MbrPartitionType::LinuxNative);
        assert_eq!(entry.offset, 2048);
        assert_eq!(entry.size, 2048);

        assert!(!table.entries()[1].is_valid());
        assert!(!table.entries()[2].active);
        assert_eq!(table.entries()[2].size, 1024);
    }

    #[test]
    fn test_parse_missing_boot_signature() {
        let mut mbr = create_test_mbr();
        mbr[0x1FE] = 0x00;

        let mut cursor = Cursor::new(mbr);
        let result = MbrTable::parse(&mut cursor);

        assert!(matches!(result, Err(Error::Format(_))));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("boot signature"));
    }

    #[test]
    fn test_parse_empty_mbr() {
        let mut mbr = vec![0u8; 512];
        mbr[0x1FE] = 0x55;
        mbr[0x1FF] = 0xAA;

        let mut cursor = Cursor::new(mbr);
        let table = MbrTable::parse(&mut cursor).unwrap();

        assert_eq!(table.valid_entries().count(), 0);
        assert!(table.partitions().is_empty());
        assert_eq!(table.last_block(), 0);
    }

    #[test]
    fn test_partition_view_numbering() {
        let mut cursor = Cursor::new(create_test_mbr());
        let table = MbrTable::parse(&mut cursor).unwrap();

        let parts = table.partitions();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].num, 1);
        assert_eq!(parts[0].active, Some(true));
        assert_eq!(parts[1].num, 3);
        assert_eq!(parts[1].offset, 4096);
        assert!(parts[1].name.is_none());
    }

    #[test]
    fn test_last_block() {
        let mut cursor = Cursor::new(create_test_mbr());
        let table = MbrTable::parse(&mut cursor).unwrap();
        assert_eq!(table.last_block(), 4096 + 1024);
    }

    #[test]
    fn test_with_active_round_trip() {
        let mut cursor = Cursor::new(create_test_mbr());
        let table = MbrTable::parse(&mut cursor).unwrap();

        // Move the flag from slot 0 to slot 2 and re-parse the copy
        let block = table.with_active(Some(2));
        let mut cursor = Cursor::new(block.to_vec());
        let reparsed = MbrTable::parse(&mut cursor).unwrap();

        for entry in reparsed.entries() {
            assert_eq!(entry.active, entry.num == 2);
        }

        // Original capture is untouched
        assert!(table.entries()[0].active);
    }

    #[test]
    fn test_with_active_none_clears_all() {
        let mut cursor = Cursor::new(create_test_mbr());
        let table = MbrTable::parse(&mut cursor).unwrap();

        let block = table.with_active(None);
        let mut cursor = Cursor::new(block.to_vec());
        let reparsed = MbrTable::parse(&mut cursor).unwrap();

        assert!(reparsed.entries().iter().all(|e| !e.active));
    }

    #[test]
    fn test_gpt_protective_detection() {
        let mut mbr = vec![0u8; 512];
        mbr[0x1BE + 4] = 0xEE;
        mbr[0x1BE + 8] = 0x01;
        mbr[0x1BE + 12..0x1BE + 16].copy_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        mbr[0x1FE] = 0x55;
        mbr[0x1FF] = 0xAA;

        let mut cursor = Cursor::new(mbr);
        let table = MbrTable::parse(&mut cursor).unwrap();
        assert!(table.is_gpt_protective());
    }
}
