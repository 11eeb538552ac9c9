//! Access validation for reads and writes
//!
//! Two tiers of checking run before any byte access:
//!
//! 1. The hard address-space limit, enforced unconditionally: an access may
//!    never extend past the end of the store.
//! 2. Optional bounds checking: when enabled, the whole access range must be
//!    contained in a single live allocation, so reads and writes can never
//!    span allocation boundaries or touch unallocated memory.

use super::alloc::Allocation;
use super::value::Address;
use crate::error::{MemoryError, Result};

/// Enforce the hard address-space limit
pub fn check_access(address: Address, length: usize, memory_size: usize) -> Result<()> {
    let end = address.checked_add(length);

    match end {
        Some(end) if end <= memory_size => Ok(()),
        _ => Err(MemoryError::OutOfBounds {
            address,
            end: end.unwrap_or(usize::MAX),
            size: memory_size,
        }),
    }
}

/// Require that a single allocation fully contains the access range
pub fn check_containment<'a>(
    address: Address,
    length: usize,
    mut allocations: impl Iterator<Item = &'a Allocation>,
) -> Result<()> {
    if allocations.any(|a| a.contains(address, length)) {
        Ok(())
    } else {
        Err(MemoryError::BoundsViolation {
            address,
            end: address + length,
        })
    }
}
