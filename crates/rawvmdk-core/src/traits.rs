//! Core traits for rawvmdk

use std::io::{Read, Seek};

/// Combined trait for Read + Seek
///
/// The parsers take any byte-addressable source positioned at block 0:
/// a raw block device, a disk image file, or an in-memory cursor in tests.
pub trait ReadSeek: Read + Seek + Send {}

/// Blanket implementation for any type that implements Read + Seek
impl<T: Read + Seek + Send> ReadSeek for T {}
