//! Partition identifier resolution
//!
//! Users name partitions either by 1-based position in the valid-partition
//! list or by exact (GPT) name. Both forms resolve against the view the
//! table exposes; anything unresolvable aborts the run with the offending
//! identifier in the error.

use rawvmdk_core::{Error, Partition, Result};
use std::collections::BTreeSet;

/// Resolve one identifier to a partition
///
/// An identifier that parses as an integer is a 1-based position into the
/// ordered valid-partition list; anything else must match exactly one
/// partition name.
///
/// # Errors
///
/// [`Error::PartSpec`] when the position is out of range, no partition
/// carries the name, or the name matches more than one partition.
pub fn resolve<'a>(partitions: &'a [Partition], identifier: &str) -> Result<&'a Partition> {
    if let Ok(position) = identifier.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|i| partitions.get(i))
            .ok_or_else(|| {
                Error::part_spec(format!(
                    "index {} out of range (device has {} partitions)",
                    identifier,
                    partitions.len()
                ))
            });
    }

    let mut matches = partitions
        .iter()
        .filter(|p| p.name.as_deref() == Some(identifier));

    match (matches.next(), matches.next()) {
        (Some(part), None) => Ok(part),
        (Some(_), Some(_)) => Err(Error::part_spec(format!(
            "name \"{}\" is ambiguous",
            identifier
        ))),
        (None, _) => Err(Error::part_spec(format!(
            "no partition named \"{}\"",
            identifier
        ))),
    }
}

/// Resolve a list of identifiers to the set of partition numbers
///
/// The result is ascending and duplicate-free; naming the same partition
/// twice is harmless.
pub fn resolve_all(partitions: &[Partition], identifiers: &[String]) -> Result<BTreeSet<u32>> {
    identifiers
        .iter()
        .map(|ident| resolve(partitions, ident).map(|p| p.num))
        .collect()
}

/// Resolve the partition that should receive the MBR active flag
///
/// The flag lives in the MBR entry array, so the partition must occupy
/// one of the four MBR slots; returns the 0-based slot index.
///
/// # Errors
///
/// [`Error::PartSpec`] from resolution, or
/// [`Error::InvalidOperation`] when the partition has no MBR slot.
pub fn resolve_bootable_slot(partitions: &[Partition], identifier: &str) -> Result<usize> {
    let part = resolve(partitions, identifier)?;
    if (1..=4).contains(&part.num) {
        Ok(part.num as usize - 1)
    } else {
        Err(Error::invalid_operation(format!(
            "partition {} has no MBR entry slot, cannot mark it bootable",
            part.num
        )))
    }
}
