//! # rawvmdk Descriptor
//!
//! Turns a parsed partition table plus a partition selection into a
//! VMware raw-device descriptor: the extent layout covering the whole
//! device, the rendered descriptor text, and the captured table blocks
//! written out as side files.
//!
//! The pieces compose in one linear pass:
//!
//! ```text
//! identifiers -> resolve  -> partition numbers
//! table + numbers -> layout -> extent list
//! extents -> render -> descriptor text
//! text + table -> write -> descriptor + side files on disk
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use rawvmdk_core::TargetPlatform;
//! use rawvmdk_descriptor::{build_extents, resolve_all, Descriptor};
//! use rawvmdk_tables::PartitionTable;
//! use std::fs::File;
//! use std::path::Path;
//!
//! let device = Path::new("/dev/disk2");
//! let mut file = File::open(device).unwrap();
//! let table = PartitionTable::parse(&mut file).unwrap();
//!
//! let selected = resolve_all(&table.partitions(), &["root".to_string()]).unwrap();
//! let extents = build_extents(&table, &selected, TargetPlatform::Generic);
//! let descriptor = Descriptor::new(extents, device, TargetPlatform::Generic);
//! println!("{}", descriptor.render());
//! ```

pub mod layout;
pub mod render;
pub mod resolve;
pub mod write;

pub use layout::{build_extents, Extent, ExtentSource};
pub use render::Descriptor;
pub use resolve::{resolve, resolve_all, resolve_bootable_slot};
pub use write::ArtifactWriter;
