//! Extent layout construction
//!
//! Walks the parsed table and the selection set into an ordered,
//! gap-free list of extents covering the full device: table metadata as
//! named side files, selected partitions as live device regions, and
//! everything else zero-filled so the guest never sees foreign data.
//!
//! The list is contiguous by construction: a running block position is
//! advanced by every extent pushed, and gaps are filled explicitly, so
//! the sizes sum to exactly the device size the table implies.

use rawvmdk_core::TargetPlatform;
use rawvmdk_tables::PartitionTable;
use std::collections::BTreeSet;
use tracing::debug;

/// Side file holding the (re-activated) MBR block
pub const MBR_FILE: &str = "mbr";
/// Side file holding the primary GPT header block
pub const GPT_HEADER_FILE: &str = "gpt_header";
/// Side file holding the padded GPT entry array
pub const GPT_ENTRIES_FILE: &str = "gpt_entries";
/// Side file holding the backup GPT header block
pub const GPT_ALTERNATE_FILE: &str = "gpt_alternate";

/// Where the bytes of one extent come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtentSource {
    /// Zero-filled placeholder; nothing on the host backs it
    ZeroFill,
    /// A side file written next to the descriptor
    NamedFile(&'static str),
    /// The source device itself, at a byte offset
    DeviceOffset(u64),
    /// A per-partition slice device node
    PlatformSlice(u32),
}

/// A contiguous run of blocks in the generated disk description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extent {
    /// Length in blocks
    pub blocks: u64,
    /// Backing source
    pub source: ExtentSource,
}

impl Extent {
    fn new(blocks: u64, source: ExtentSource) -> Self {
        Self { blocks, source }
    }
}

/// Sum of extent sizes, in blocks
pub fn total_blocks(extents: &[Extent]) -> u64 {
    extents.iter().map(|e| e.blocks).sum()
}

/// Append an extent and advance the running position
///
/// Zero-length extents are swallowed; a `RW 0` line means nothing to the
/// consumer.
fn push(extents: &mut Vec<Extent>, position: &mut u64, blocks: u64, source: ExtentSource) {
    if blocks > 0 {
        extents.push(Extent::new(blocks, source));
    }
    *position += blocks;
}

/// Build the extent list for one selection
///
/// `selected` holds partition numbers from the table's valid view
/// (see [`crate::resolve_all`]). Selected partitions become live device
/// references: a block offset into the whole device, or a slice node on
/// platforms that have them. Unselected partitions and unallocated space
/// become zero-fill. Table metadata (MBR block, GPT header/entry blocks
/// and their backup copies) is referenced through named side files.
pub fn build_extents(
    table: &PartitionTable,
    selected: &BTreeSet<u32>,
    platform: TargetPlatform,
) -> Vec<Extent> {
    let mut extents = Vec::new();
    let mut position = 0u64;

    push(&mut extents, &mut position, 1, ExtentSource::NamedFile(MBR_FILE));

    let entry_blocks = table.gpt().map(|gpt| gpt.entry_blocks()).unwrap_or(0);
    if table.is_gpt() {
        push(
            &mut extents,
            &mut position,
            1,
            ExtentSource::NamedFile(GPT_HEADER_FILE),
        );
        push(
            &mut extents,
            &mut position,
            entry_blocks,
            ExtentSource::NamedFile(GPT_ENTRIES_FILE),
        );
    }

    let mut partitions = table.partitions();
    partitions.sort_by_key(|p| p.offset);

    for part in &partitions {
        if position < part.offset {
            let gap = part.offset - position;
            push(&mut extents, &mut position, gap, ExtentSource::ZeroFill);
        }

        let source = if selected.contains(&part.num) {
            match platform {
                TargetPlatform::Generic => ExtentSource::DeviceOffset(part.byte_offset()),
                TargetPlatform::MacOs => ExtentSource::PlatformSlice(part.num),
            }
        } else {
            ExtentSource::ZeroFill
        };
        push(&mut extents, &mut position, part.size, source);
    }

    if let Some(gpt) = table.gpt() {
        let backup_entries = gpt.alternate_lba() - entry_blocks;
        if backup_entries > position {
            let gap = backup_entries - position;
            push(&mut extents, &mut position, gap, ExtentSource::ZeroFill);
        }
        push(
            &mut extents,
            &mut position,
            entry_blocks,
            ExtentSource::NamedFile(GPT_ENTRIES_FILE),
        );
        push(
            &mut extents,
            &mut position,
            1,
            ExtentSource::NamedFile(GPT_ALTERNATE_FILE),
        );
    }

    debug_assert_eq!(total_blocks(&extents), table.device_blocks());
    debug!(
        extents = extents.len(),
        blocks = total_blocks(&extents),
        "built extent layout"
    );

    extents
}
