//! # rawvmdk Core
//!
//! Shared types, traits, and error handling for rawvmdk.
//!
//! rawvmdk exposes selected partitions of a physical block device to a
//! virtual machine without copying their data. This crate provides the
//! foundational pieces the other crates build on:
//! - **Error**: the one error taxonomy for parse/resolve/write failures
//! - **ReadSeek**: the byte-addressable source seam (device or image file)
//! - **Partition**: the format-agnostic view of a table entry
//! - **TargetPlatform**: slice-device addressing conventions
//!
//! ## Example
//!
//! ```rust
//! use rawvmdk_core::{Partition, SECTOR_SIZE};
//!
//! let part = Partition::new(1, 34, 100).with_name("EFI".to_string());
//! assert_eq!(part.byte_offset(), 34 * SECTOR_SIZE as u64);
//! ```

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use error::{Error, Result};
pub use traits::ReadSeek;
pub use types::{Partition, TargetPlatform, SECTOR_SIZE};
