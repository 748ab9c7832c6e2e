//! # rawvmdk Tables
//!
//! Binary partition-table parsers for rawvmdk.
//!
//! This crate decodes the two on-disk table formats the tool understands:
//! - **MBR**: Master Boot Record (BIOS/legacy partitioning)
//! - **GPT**: GUID Partition Table (UEFI/modern partitioning)
//!
//! and combines them into a single [`PartitionTable`] model. The parsers
//! capture the raw table blocks verbatim alongside the decoded records,
//! because the descriptor generator writes those blocks back out as side
//! files for the virtual machine.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rawvmdk_tables::PartitionTable;
//! use std::fs::File;
//!
//! let mut file = File::open("/dev/disk2").unwrap();
//! let table = PartitionTable::parse(&mut file).unwrap();
//!
//! println!("GPT: {}", table.is_gpt());
//! for part in table.partitions() {
//!     println!("  {}", part);
//! }
//! ```

pub mod disk;
pub mod gpt;
pub mod mbr;

pub use disk::PartitionTable;
pub use gpt::GptTable;
pub use mbr::MbrTable;
