//! Combined partition-table model
//!
//! One parse pass over the device yields an [`MbrTable`] (always present
//! on an accepted device) and optionally a [`GptTable`]. Exactly one of
//! the two views is structurally complete; the GPT view is preferred
//! whenever it exists.

use crate::gpt::GptTable;
use crate::mbr::MbrTable;
use rawvmdk_core::{Partition, ReadSeek, Result};
use tracing::{debug, warn};

/// The parsed partition table of one device snapshot
///
/// Immutable once parsed; every derived view (partitions, device size)
/// is computed from the captured state.
#[derive(Debug, Clone)]
pub struct PartitionTable {
    mbr: MbrTable,
    gpt: Option<GptTable>,
}

impl PartitionTable {
    /// Parse both table formats from a source positioned at block 0
    ///
    /// # Errors
    ///
    /// Fails with [`rawvmdk_core::Error::Format`] when the MBR boot
    /// signature is missing and with
    /// [`rawvmdk_core::Error::MalformedGpt`] when a GPT signature is
    /// present but the table is inconsistent. A device without any GPT
    /// parses fine as MBR-only.
    pub fn parse(source: &mut dyn ReadSeek) -> Result<Self> {
        let mbr = MbrTable::parse(source)?;
        let gpt = GptTable::parse(source)?;

        if gpt.is_none() && mbr.is_gpt_protective() {
            warn!("protective MBR without a matching GPT; using the MBR view");
        }
        debug!(gpt = gpt.is_some(), "parsed partition table");

        Ok(Self { mbr, gpt })
    }

    /// Whether the device carries a GPT
    pub fn is_gpt(&self) -> bool {
        self.gpt.is_some()
    }

    /// The MBR view (always present)
    pub fn mbr(&self) -> &MbrTable {
        &self.mbr
    }

    /// The GPT view, if the device has one
    pub fn gpt(&self) -> Option<&GptTable> {
        self.gpt.as_ref()
    }

    /// The valid partitions of whichever view is structurally complete
    ///
    /// GPT wins over the (protective) MBR view when both exist.
    pub fn partitions(&self) -> Vec<Partition> {
        match &self.gpt {
            Some(gpt) => gpt.partitions(),
            None => self.mbr.partitions(),
        }
    }

    /// Device size in blocks, as implied by the table
    ///
    /// GPT pins the size through its backup header position; an MBR-only
    /// table implies nothing past the last partition, so the size is the
    /// last partition's end. A device with no partitions at all is just
    /// its boot block.
    pub fn device_blocks(&self) -> u64 {
        match &self.gpt {
            Some(gpt) => gpt.alternate_lba() + 1,
            None => self.mbr.last_block().max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn mbr_only_disk() -> Vec<u8> {
        let mut disk = vec![0u8; 512];
        let base = 0x1BE;
        disk[base + 4] = 0x83;
        disk[base + 8..base + 12].copy_from_slice(&64u32.to_le_bytes());
        disk[base + 12..base + 16].copy_from_slice(&1000u32.to_le_bytes());
        disk[0x1FE] = 0x55;
        disk[0x1FF] = 0xAA;
        disk
    }

    #[test]
    fn test_mbr_only_device() {
        let mut cursor = Cursor::new(mbr_only_disk());
        let table = PartitionTable::parse(&mut cursor).unwrap();

        assert!(!table.is_gpt());
        assert_eq!(table.partitions().len(), 1);
        assert_eq!(table.device_blocks(), 1064);
    }

    #[test]
    fn test_gpt_view_preferred() {
        let mut cursor = Cursor::new(crate::gpt::create_test_gpt_disk());
        let table = PartitionTable::parse(&mut cursor).unwrap();

        assert!(table.is_gpt());
        // The view comes from the GPT, not the protective MBR entry
        let parts = table.partitions();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].name.as_deref(), Some("EFI"));
        assert_eq!(table.device_blocks(), 2048);
    }

    #[test]
    fn test_empty_table_is_valid() {
        let mut disk = vec![0u8; 512];
        disk[0x1FE] = 0x55;
        disk[0x1FF] = 0xAA;

        let mut cursor = Cursor::new(disk);
        let table = PartitionTable::parse(&mut cursor).unwrap();

        assert!(table.partitions().is_empty());
        assert_eq!(table.device_blocks(), 1);
    }
}
