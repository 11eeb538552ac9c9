//! Error types for the memory sandbox
//!
//! This module defines [`MemoryError`], the single error taxonomy for every
//! operation on a [`crate::memory::Memory`] instance.
//!
//! All errors are fatal to the operation that raised them and leave prior
//! state untouched; none of them is fatal to the engine itself. Capacity
//! errors ([`MemoryError::CapacityExceeded`]) are ordinary conditions the
//! caller can retry after freeing space, the rest indicate a misuse of the
//! API (bad address, wrong region, invalid snapshot index).

use crate::memory::alloc::Region;
use crate::memory::value::Address;
use thiserror::Error;

/// Errors raised by memory, allocator, codec, and history operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Heap out of memory, stack overflow, or a zero-sized request
    #[error("capacity exceeded: cannot allocate {requested} bytes in the {region} region")]
    CapacityExceeded { requested: usize, region: Region },

    /// No allocation record starts at the given address
    #[error("no allocation at address {address}")]
    InvalidAddress { address: Address },

    /// The allocation at the address belongs to the other region
    #[error("region mismatch at address {address}: expected a {expected} allocation")]
    RegionMismatch { address: Address, expected: Region },

    /// Access falls outside the address space (enforced unconditionally)
    #[error("out of bounds: access {address}..{end} exceeds memory of size {size}")]
    OutOfBounds {
        address: Address,
        end: usize,
        size: usize,
    },

    /// Bounds checking is enabled and no single allocation contains the access
    #[error("bounds violation: access {address}..{end} is not contained in any allocation")]
    BoundsViolation { address: Address, end: usize },

    /// A codec was handed a byte sequence of the wrong length
    #[error("invalid byte sequence length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    /// Snapshot index outside the recorded history
    #[error("snapshot index {index} out of range ({count} snapshots recorded)")]
    InvalidSnapshotIndex { index: usize, count: usize },
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, MemoryError>;
