//! Core types for rawvmdk

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Fixed block size; every offset and size in the table model is
/// expressed in 512-byte blocks unless noted otherwise.
pub const SECTOR_SIZE: usize = 512;

/// A resolved partition, independent of the table format it came from
///
/// Every valid MBR or GPT entry maps 1:1 onto a `Partition`; the table
/// exposes only valid entries, ordered by `num`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Table number of this partition (1-based entry slot)
    pub num: u32,

    /// Offset from the start of the device, in blocks
    pub offset: u64,

    /// Size in blocks
    pub size: u64,

    /// Partition name (GPT only; MBR entries are unnamed)
    pub name: Option<String>,

    /// Active/bootable flag (MBR only)
    pub active: Option<bool>,
}

impl Partition {
    /// Create a new partition record
    pub fn new(num: u32, offset: u64, size: u64) -> Self {
        Self {
            num,
            offset,
            size,
            name: None,
            active: None,
        }
    }

    /// Set the partition name
    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    /// Set the active flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Offset from the start of the device, in bytes
    pub fn byte_offset(&self) -> u64 {
        self.offset * SECTOR_SIZE as u64
    }

    /// First block past the end of this partition
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Partition {} [{} blocks @ {}]",
            self.num, self.size, self.offset
        )?;
        if let Some(ref name) = self.name {
            write!(f, " \"{}\"", name)?;
        }
        if self.active == Some(true) {
            write!(f, " (active)")?;
        }
        Ok(())
    }
}

/// Target platform for partition addressing in the generated descriptor
///
/// Some platforms expose each partition as its own device node (a
/// "slice"); there the descriptor references the slice node directly.
/// Everywhere else a selected partition is referenced as a block offset
/// into the whole device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetPlatform {
    /// Reference selected partitions as offsets into the whole device
    #[default]
    Generic,
    /// Reference selected partitions via `/dev/diskNsM` slice nodes
    MacOs,
}

impl TargetPlatform {
    /// Rewrite a whole-device path to the per-partition slice node
    ///
    /// Only meaningful for platforms with slice nodes; `Generic` returns
    /// the device path unchanged.
    pub fn slice_path(&self, device: &Path, num: u32) -> PathBuf {
        match self {
            TargetPlatform::Generic => device.to_path_buf(),
            TargetPlatform::MacOs => {
                let mut name = device.as_os_str().to_os_string();
                name.push(format!("s{}", num));
                PathBuf::from(name)
            }
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPlatform::Generic => write!(f, "generic"),
            TargetPlatform::MacOs => write!(f, "macos"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_byte_offset() {
        let part = Partition::new(1, 34, 100);
        assert_eq!(part.byte_offset(), 34 * 512);
        assert_eq!(part.end(), 134);
    }

    #[test]
    fn test_partition_display() {
        let part = Partition::new(2, 134, 1000)
            .with_name("root".to_string());
        let text = part.to_string();
        assert!(text.contains("Partition 2"));
        assert!(text.contains("\"root\""));
    }

    #[test]
    fn test_slice_path_macos() {
        let path = TargetPlatform::MacOs.slice_path(Path::new("/dev/disk2"), 3);
        assert_eq!(path, PathBuf::from("/dev/disk2s3"));
    }

    #[test]
    fn test_slice_path_generic() {
        let path = TargetPlatform::Generic.slice_path(Path::new("/dev/sda"), 3);
        assert_eq!(path, PathBuf::from("/dev/sda"));
    }
}
