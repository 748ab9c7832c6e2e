//! MBR entry records and partition type codes

use std::fmt;

/// MBR partition type codes
///
/// The subset of standard type identifiers the tool can name; anything
/// else is carried through as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbrPartitionType {
    /// Empty/unused partition entry
    Empty,
    /// FAT16 >= 32MB, CHS
    Fat16,
    /// NTFS/exFAT/HPFS
    Ntfs,
    /// FAT32, LBA
    Fat32Lba,
    /// Linux swap
    LinuxSwap,
    /// Linux native (ext2/ext3/ext4)
    LinuxNative,
    /// FreeBSD
    FreeBsd,
    /// GPT protective MBR
    GptProtective,
    /// EFI system partition
    EfiSystem,
    /// Unknown partition type
    Unknown(u8),
}

impl MbrPartitionType {
    /// Create a partition type from a byte value
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Empty,
            0x06 => Self::Fat16,
            0x07 => Self::Ntfs,
            0x0C => Self::Fat32Lba,
            0x82 => Self::LinuxSwap,
            0x83 => Self::LinuxNative,
            0xA5 => Self::FreeBsd,
            0xEE => Self::GptProtective,
            0xEF => Self::EfiSystem,
            _ => Self::Unknown(b),
        }
    }

    /// Get the byte value of this partition type
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Empty => 0x00,
            Self::Fat16 => 0x06,
            Self::Ntfs => 0x07,
            Self::Fat32Lba => 0x0C,
            Self::LinuxSwap => 0x82,
            Self::LinuxNative => 0x83,
            Self::FreeBsd => 0xA5,
            Self::GptProtective => 0xEE,
            Self::EfiSystem => 0xEF,
            Self::Unknown(b) => b,
        }
    }

    /// Get a human-readable name for this partition type
    pub fn name(&self) -> &str {
        match self {
            Self::Empty => "Empty",
            Self::Fat16 => "FAT16",
            Self::Ntfs => "NTFS/exFAT",
            Self::Fat32Lba => "FAT32 (LBA)",
            Self::LinuxSwap => "Linux swap",
            Self::LinuxNative => "Linux",
            Self::FreeBsd => "FreeBSD",
            Self::GptProtective => "GPT Protective",
            Self::EfiSystem => "EFI System",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for MbrPartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One of the four fixed partition entries in the MBR
#[derive(Debug, Clone, Copy)]
pub struct MbrEntry {
    /// Entry slot in the table (0..3)
    pub num: usize,
    /// Partition type byte; 0 marks the entry unused
    pub kind: MbrPartitionType,
    /// Active/bootable flag from the status byte (0x80)
    pub active: bool,
    /// Start LBA, in blocks
    pub offset: u32,
    /// Sector count, in blocks
    pub size: u32,
}

impl MbrEntry {
    /// An entry is valid iff its type byte is nonzero
    pub fn is_valid(&self) -> bool {
        self.kind != MbrPartitionType::Empty
    }
}

impl fmt::Display for MbrEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entry {} [{} @ {}, {} blocks]{}",
            self.num,
            self.kind,
            self.offset,
            self.size,
            if self.active { " (active)" } else { "" }
        )
    }
}
