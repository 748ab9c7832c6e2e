//! Output artifact writing
//!
//! One run produces a descriptor file plus the captured table blocks as
//! side files next to it. Everything is computed before the first file
//! is created, so a failing run leaves no partial artifact set behind.

use crate::layout::{GPT_ALTERNATE_FILE, GPT_ENTRIES_FILE, GPT_HEADER_FILE, MBR_FILE};
use crate::render::Descriptor;
use rawvmdk_core::{Error, Result};
use rawvmdk_tables::PartitionTable;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes the artifact set of one descriptor-generation run
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    name: String,
}

impl ArtifactWriter {
    /// Create a writer targeting `<dir>/<name>.vmdk` and its side files
    pub fn new(dir: &Path, name: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            name: name.to_string(),
        }
    }

    /// Path of the descriptor file this writer produces
    pub fn descriptor_path(&self) -> PathBuf {
        self.dir.join(format!("{}.vmdk", self.name))
    }

    /// Write the descriptor and the captured table blocks
    ///
    /// With `active_slot` set, the MBR side file carries the activation
    /// flag for that slot (0..3), applied to a copy of the captured
    /// block; without it the block is written as captured. The device is
    /// never touched. GPT side files are written only for GPT devices.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperation`] when the descriptor already exists,
    /// I/O errors from the filesystem otherwise.
    pub fn write(
        &self,
        table: &PartitionTable,
        descriptor: &Descriptor,
        active_slot: Option<usize>,
    ) -> Result<PathBuf> {
        let path = self.descriptor_path();
        if path.exists() {
            return Err(Error::invalid_operation(format!(
                "refusing to overwrite {}",
                path.display()
            )));
        }

        // Compute every artifact before creating any file
        let text = descriptor.render();
        let mbr_block = match active_slot {
            Some(slot) => table.mbr().with_active(Some(slot)),
            None => *table.mbr().raw(),
        };

        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(MBR_FILE), mbr_block)?;

        if let Some(gpt) = table.gpt() {
            fs::write(self.dir.join(GPT_HEADER_FILE), gpt.raw_header())?;
            fs::write(self.dir.join(GPT_ENTRIES_FILE), gpt.raw_entries())?;
            fs::write(self.dir.join(GPT_ALTERNATE_FILE), gpt.raw_alternate())?;
        }

        fs::write(&path, text)?;

        info!(path = %path.display(), "wrote descriptor set");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::build_extents;
    use rawvmdk_core::TargetPlatform;
    use std::collections::BTreeSet;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// 128-block GPT disk with one "data" partition at LBA 3 (100
    /// blocks) and a compact 4-entry array (one block per copy)
    fn small_gpt_disk() -> Vec<u8> {
        let mut disk = vec![0u8; 128 * 512];

        disk[0x1BE + 4] = 0xEE;
        disk[0x1BE + 8] = 0x01;
        disk[0x1BE + 12..0x1BE + 16].copy_from_slice(&127u32.to_le_bytes());
        disk[0x1FE] = 0x55;
        disk[0x1FF] = 0xAA;

        let h = 512;
        disk[h..h + 8].copy_from_slice(b"EFI PART");
        disk[h + 8..h + 12].copy_from_slice(&0x00010000u32.to_le_bytes());
        disk[h + 12..h + 16].copy_from_slice(&92u32.to_le_bytes());
        disk[h + 24..h + 32].copy_from_slice(&1u64.to_le_bytes());
        disk[h + 32..h + 40].copy_from_slice(&127u64.to_le_bytes());
        disk[h + 40..h + 48].copy_from_slice(&3u64.to_le_bytes());
        disk[h + 48..h + 56].copy_from_slice(&125u64.to_le_bytes());
        disk[h + 72..h + 80].copy_from_slice(&2u64.to_le_bytes());
        disk[h + 80..h + 84].copy_from_slice(&4u32.to_le_bytes());
        disk[h + 84..h + 88].copy_from_slice(&128u32.to_le_bytes());

        let e = 2 * 512;
        disk[e] = 0xAF;
        disk[e + 16] = 0x01;
        disk[e + 32..e + 40].copy_from_slice(&3u64.to_le_bytes());
        disk[e + 40..e + 48].copy_from_slice(&102u64.to_le_bytes());
        for (i, unit) in "data".encode_utf16().enumerate() {
            disk[e + 56 + i * 2..e + 58 + i * 2].copy_from_slice(&unit.to_le_bytes());
        }

        let entries_crc = crc32fast::hash(&disk[e..e + 4 * 128]);
        disk[h + 88..h + 92].copy_from_slice(&entries_crc.to_le_bytes());
        let mut header_copy = disk[h..h + 92].to_vec();
        header_copy[16..20].fill(0);
        let header_crc = crc32fast::hash(&header_copy);
        disk[h + 16..h + 20].copy_from_slice(&header_crc.to_le_bytes());

        let header_block: Vec<u8> = disk[512..1024].to_vec();
        disk[127 * 512..128 * 512].copy_from_slice(&header_block);

        disk
    }

    fn mbr_only_disk() -> Vec<u8> {
        let mut disk = vec![0u8; 512];
        disk[0x1BE + 4] = 0x83;
        disk[0x1BE + 8..0x1BE + 12].copy_from_slice(&64u32.to_le_bytes());
        disk[0x1BE + 12..0x1BE + 16].copy_from_slice(&1000u32.to_le_bytes());
        disk[0x1FE] = 0x55;
        disk[0x1FF] = 0xAA;
        disk
    }

    fn descriptor_for(table: &PartitionTable, selected: &BTreeSet<u32>) -> Descriptor {
        let extents = build_extents(table, selected, TargetPlatform::Generic);
        Descriptor::with_cid(extents, Path::new("/dev/disk9"), TargetPlatform::Generic, 7)
    }

    #[test]
    fn test_write_gpt_artifact_set() {
        let disk = small_gpt_disk();
        let mut cursor = Cursor::new(disk.clone());
        let table = PartitionTable::parse(&mut cursor).unwrap();
        let descriptor = descriptor_for(&table, &BTreeSet::from([1u32]));

        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path(), "data");
        let path = writer.write(&table, &descriptor, None).unwrap();

        assert_eq!(path, dir.path().join("data.vmdk"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("createType=\"partitionedDevice\""));
        assert!(text.contains("RW 100 FLAT \"/dev/disk9\" 3"));

        assert_eq!(fs::read(dir.path().join("mbr")).unwrap().len(), 512);
        assert_eq!(
            fs::read(dir.path().join("gpt_header")).unwrap(),
            &disk[512..1024]
        );
        assert_eq!(fs::read(dir.path().join("gpt_entries")).unwrap().len(), 512);
        assert_eq!(
            fs::read(dir.path().join("gpt_alternate")).unwrap(),
            &disk[127 * 512..128 * 512]
        );
    }

    #[test]
    fn test_write_applies_activation_to_the_copy() {
        let mut cursor = Cursor::new(mbr_only_disk());
        let table = PartitionTable::parse(&mut cursor).unwrap();
        let descriptor = descriptor_for(&table, &BTreeSet::new());

        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path(), "plain");
        writer.write(&table, &descriptor, Some(0)).unwrap();

        let mbr = fs::read(dir.path().join("mbr")).unwrap();
        assert_eq!(mbr[0x1BE], 0x80);
        // The captured table still reports the original flag state
        assert!(!table.mbr().entries()[0].active);
    }

    #[test]
    fn test_write_without_activation_keeps_the_block_as_captured() {
        let mut disk = mbr_only_disk();
        disk[0x1BE] = 0x80;

        let mut cursor = Cursor::new(disk.clone());
        let table = PartitionTable::parse(&mut cursor).unwrap();
        let descriptor = descriptor_for(&table, &BTreeSet::new());

        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path(), "plain");
        writer.write(&table, &descriptor, None).unwrap();

        assert_eq!(fs::read(dir.path().join("mbr")).unwrap(), disk);
    }

    #[test]
    fn test_mbr_only_writes_no_gpt_files() {
        let mut cursor = Cursor::new(mbr_only_disk());
        let table = PartitionTable::parse(&mut cursor).unwrap();
        let descriptor = descriptor_for(&table, &BTreeSet::new());

        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path(), "plain");
        writer.write(&table, &descriptor, None).unwrap();

        assert!(!dir.path().join("gpt_header").exists());
        assert!(!dir.path().join("gpt_entries").exists());
        assert!(!dir.path().join("gpt_alternate").exists());
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let mut cursor = Cursor::new(mbr_only_disk());
        let table = PartitionTable::parse(&mut cursor).unwrap();
        let descriptor = descriptor_for(&table, &BTreeSet::new());

        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path(), "plain");
        writer.write(&table, &descriptor, None).unwrap();

        let result = writer.write(&table, &descriptor, None);
        assert!(matches!(result, Err(Error::InvalidOperation(_))));
    }
}
