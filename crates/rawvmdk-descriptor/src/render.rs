//! Descriptor text rendering
//!
//! Produces the line-oriented VMware descriptor the hypervisor consumes:
//! a header block, one `RW` line per extent in layout order, and the
//! trailing disk-database section. The grammar is exact; nothing beyond
//! it is validated here.

use crate::layout::{Extent, ExtentSource};
use rawvmdk_core::{TargetPlatform, SECTOR_SIZE};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// A renderable descriptor: the extent layout plus the header fields
#[derive(Debug, Clone)]
pub struct Descriptor {
    extents: Vec<Extent>,
    device: PathBuf,
    platform: TargetPlatform,
    cid: u32,
}

impl Descriptor {
    /// Descriptor format version marker
    pub const VERSION: u32 = 1;

    /// The "no parent" content identifier sentinel
    pub const PARENT_CID: &'static str = "ffffffff";

    /// Disk type marker for a partitioned raw device
    pub const CREATE_TYPE: &'static str = "partitionedDevice";

    /// Create a descriptor with a freshly generated content identifier
    pub fn new(extents: Vec<Extent>, device: &Path, platform: TargetPlatform) -> Self {
        Self::with_cid(extents, device, platform, new_cid())
    }

    /// Create a descriptor with an explicit content identifier
    ///
    /// The seam for deterministic output in tests; production callers use
    /// [`Descriptor::new`].
    pub fn with_cid(
        extents: Vec<Extent>,
        device: &Path,
        platform: TargetPlatform,
        cid: u32,
    ) -> Self {
        Self {
            extents,
            device: device.to_path_buf(),
            platform,
            cid,
        }
    }

    /// The content identifier of this descriptor
    pub fn cid(&self) -> u32 {
        self.cid
    }

    /// The extent layout, in emission order
    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }

    /// Render the descriptor text
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str("# Disk DescriptorFile\n");
        let _ = writeln!(out, "version={}", Self::VERSION);
        out.push_str("encoding=\"UTF-8\"\n");
        let _ = writeln!(out, "CID={:08x}", self.cid);
        let _ = writeln!(out, "parentCID={}", Self::PARENT_CID);
        let _ = writeln!(out, "createType=\"{}\"", Self::CREATE_TYPE);

        out.push_str("\n# Extent description\n");
        for extent in &self.extents {
            out.push_str(&self.extent_line(extent));
            out.push('\n');
        }

        out.push_str("\n# The Disk Data Base\n#DDB\n\n");
        out.push_str("ddb.virtualHWVersion = \"4\"\n");

        debug!(extents = self.extents.len(), cid = self.cid, "rendered descriptor");
        out
    }

    /// One `RW <blocks> <source>` line
    ///
    /// Access is always read-write; the reference and start block depend
    /// on the source kind.
    fn extent_line(&self, extent: &Extent) -> String {
        match &extent.source {
            ExtentSource::ZeroFill => format!("RW {} ZERO", extent.blocks),
            ExtentSource::NamedFile(name) => {
                format!("RW {} FLAT \"{}\" 0", extent.blocks, name)
            }
            ExtentSource::DeviceOffset(byte_offset) => format!(
                "RW {} FLAT \"{}\" {}",
                extent.blocks,
                self.device.display(),
                byte_offset / SECTOR_SIZE as u64
            ),
            ExtentSource::PlatformSlice(num) => format!(
                "RW {} FLAT \"{}\" 0",
                extent.blocks,
                self.platform.slice_path(&self.device, *num).display()
            ),
        }
    }
}

/// Generate a fresh random 32-bit content identifier
fn new_cid() -> u32 {
    let bytes = Uuid::new_v4().into_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
