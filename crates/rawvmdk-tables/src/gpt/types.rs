//! GPT header and entry structures

use uuid::{uuid, Uuid};

/// Well-known partition type GUIDs
///
/// GPT stores GUIDs in the mixed-endian on-disk encoding; everything in
/// this module holds them as decoded [`Uuid`] values.
pub mod type_guids {
    use super::*;

    /// EFI System Partition
    pub const EFI_SYSTEM: Uuid = uuid!("c12a7328-f81f-11d2-ba4b-00a0c93ec93b");
    /// Microsoft Basic Data (FAT, NTFS, exFAT)
    pub const MICROSOFT_BASIC_DATA: Uuid = uuid!("ebd0a0a2-b9e5-4433-87c0-68b6b72699c7");
    /// Linux filesystem
    pub const LINUX_FILESYSTEM: Uuid = uuid!("0fc63daf-8483-4772-8e79-3d69d8477de4");
    /// Linux swap
    pub const LINUX_SWAP: Uuid = uuid!("0657fd6d-a4ab-43c4-84e5-0933c84b4f4f");
    /// Apple APFS container
    pub const APPLE_APFS: Uuid = uuid!("7c3457ef-0000-11aa-aa11-00306543ecac");

    /// Get a human-readable name for a partition type GUID
    pub fn name(guid: &Uuid) -> &'static str {
        match *guid {
            EFI_SYSTEM => "EFI System",
            MICROSOFT_BASIC_DATA => "Microsoft Basic Data",
            LINUX_FILESYSTEM => "Linux filesystem",
            LINUX_SWAP => "Linux swap",
            APPLE_APFS => "Apple APFS",
            _ => "Unknown",
        }
    }
}

/// GPT header
///
/// Lives in the second block of the device. Presence of a GPT is decided
/// by the signature and revision alone; the rest of the header is then
/// required to be internally consistent.
#[derive(Debug, Clone)]
pub struct GptHeader {
    /// GPT revision (must be 0x00010000)
    pub revision: u32,
    /// Header size in bytes (usually 92)
    pub header_size: u32,
    /// CRC32 checksum of the header
    pub header_crc32: u32,
    /// LBA of this header (1 for the primary copy)
    pub current_lba: u64,
    /// LBA of the alternate (backup) header near the end of the device
    pub alternate_lba: u64,
    /// First usable LBA for partitions
    pub first_usable_lba: u64,
    /// Last usable LBA for partitions
    pub last_usable_lba: u64,
    /// Disk GUID
    pub disk_guid: Uuid,
    /// Starting LBA of the entry array
    pub entries_lba: u64,
    /// Number of entries in the array
    pub entry_count: u32,
    /// Size of each entry in bytes
    pub entry_size: u32,
    /// CRC32 of the entry array
    pub entries_crc32: u32,
}

impl GptHeader {
    /// GPT header signature
    pub const SIGNATURE: &'static [u8; 8] = b"EFI PART";

    /// The only revision this tool understands
    pub const REVISION: u32 = 0x0001_0000;

    /// Typical GPT header size
    pub const HEADER_SIZE: usize = 92;

    /// Decode a header from the captured block
    ///
    /// Returns `None` when the signature or revision does not match, in
    /// which case the device simply has no GPT.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::HEADER_SIZE || &bytes[0..8] != Self::SIGNATURE {
            return None;
        }

        let revision = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        if revision != Self::REVISION {
            return None;
        }

        let le_u32 = |off: usize| {
            u32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
        };
        let le_u64 = |off: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[off..off + 8]);
            u64::from_le_bytes(buf)
        };

        let mut disk_guid = [0u8; 16];
        disk_guid.copy_from_slice(&bytes[56..72]);

        Some(Self {
            revision,
            header_size: le_u32(12),
            header_crc32: le_u32(16),
            current_lba: le_u64(24),
            alternate_lba: le_u64(32),
            first_usable_lba: le_u64(40),
            last_usable_lba: le_u64(48),
            disk_guid: Uuid::from_bytes_le(disk_guid),
            entries_lba: le_u64(72),
            entry_count: le_u32(80),
            entry_size: le_u32(84),
            entries_crc32: le_u32(88),
        })
    }

    /// Verify the header CRC32 against the captured block
    ///
    /// The checksum covers `header_size` bytes with the CRC field itself
    /// zeroed.
    pub fn verify_header_crc32(&self, header_bytes: &[u8]) -> bool {
        let size = self.header_size as usize;
        if size < Self::HEADER_SIZE || header_bytes.len() < size {
            return false;
        }

        let mut copy = header_bytes[..size].to_vec();
        copy[16..20].fill(0);

        crc32fast::hash(&copy) == self.header_crc32
    }

    /// Verify the entry-array CRC32 against the raw array bytes
    pub fn verify_entries_crc32(&self, entry_bytes: &[u8]) -> bool {
        let expected = self.entry_count as usize * self.entry_size as usize;
        if entry_bytes.len() < expected {
            return false;
        }

        crc32fast::hash(&entry_bytes[..expected]) == self.entries_crc32
    }
}

/// One decoded GPT partition entry
#[derive(Debug, Clone)]
pub struct GptEntry {
    /// 1-based position in the entry array
    pub num: u32,
    /// Partition type GUID; nil marks the entry unused
    pub type_guid: Uuid,
    /// Unique partition GUID
    pub unique_guid: Uuid,
    /// First LBA, in blocks
    pub offset: u64,
    /// Size in blocks (last LBA is inclusive)
    pub size: u64,
    /// Attribute flags
    pub flags: u64,
    /// Partition name, decoded from 36 UTF-16LE code units
    pub name: String,
}

impl GptEntry {
    /// Minimum entry size the on-disk layout requires
    pub const MIN_ENTRY_SIZE: usize = 128;

    /// Offset of the name field within an entry
    pub const NAME_OFFSET: usize = 56;

    /// Width of the name field in bytes
    pub const NAME_SIZE: usize = 72;

    /// Decode an entry from its raw bytes
    pub fn from_bytes(num: u32, bytes: &[u8]) -> Self {
        let guid_at = |off: usize| {
            let mut buf = [0u8; 16];
            buf.copy_from_slice(&bytes[off..off + 16]);
            Uuid::from_bytes_le(buf)
        };
        let le_u64 = |off: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[off..off + 8]);
            u64::from_le_bytes(buf)
        };

        let first_lba = le_u64(32);
        let last_lba = le_u64(40);
        let size = if last_lba >= first_lba {
            last_lba - first_lba + 1
        } else {
            0
        };

        Self {
            num,
            type_guid: guid_at(0),
            unique_guid: guid_at(16),
            offset: first_lba,
            size,
            flags: le_u64(48),
            name: Self::decode_name(&bytes[Self::NAME_OFFSET..Self::NAME_OFFSET + Self::NAME_SIZE]),
        }
    }

    /// An entry is valid iff its type GUID is nonzero
    pub fn is_valid(&self) -> bool {
        !self.type_guid.is_nil()
    }

    /// Decode the fixed-width UTF-16LE name field, stopping at the first NUL
    fn decode_name(bytes: &[u8]) -> String {
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();

        String::from_utf16_lossy(&units)
    }
}
