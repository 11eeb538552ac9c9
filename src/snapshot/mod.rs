//! Snapshot history for time travel
//!
//! Every mutating operation on the memory facade records a [`Snapshot`]: an
//! independently-owned deep copy of the byte store, the allocation records,
//! and the stack pointer, plus a human-readable message and a timestamp.
//! Because snapshots share no state with the live store, mutating "current"
//! memory can never retroactively alter history.
//!
//! Navigation is linear with branch truncation: recording a snapshot while
//! the current index sits before the end first discards everything after the
//! index. Going back and writing overwrites the future, it does not branch.

use crate::error::{MemoryError, Result};
use crate::memory::alloc::Allocation;
use crate::memory::value::{Address, Byte};
use std::time::SystemTime;

/// A full copy of the engine state at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub bytes: Vec<Byte>,
    pub allocations: Vec<Allocation>,
    pub stack_pointer: isize,
    pub message: String,
    pub timestamp: SystemTime,
}

/// One differing byte between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDiff {
    pub address: Address,
    pub old_value: u8,
    pub new_value: u8,
}

/// Ordered snapshot sequence plus the current position
#[derive(Debug, Default)]
pub struct History {
    snapshots: Vec<Snapshot>,
    index: usize,
}

impl History {
    pub fn new() -> Self {
        History {
            snapshots: Vec::new(),
            index: 0,
        }
    }

    /// Append a snapshot, truncating any future beyond the current index
    pub fn record(
        &mut self,
        message: impl Into<String>,
        bytes: Vec<Byte>,
        allocations: Vec<Allocation>,
        stack_pointer: isize,
    ) {
        if self.index + 1 < self.snapshots.len() {
            self.snapshots.truncate(self.index + 1);
        }

        self.snapshots.push(Snapshot {
            bytes,
            allocations,
            stack_pointer,
            message: message.into(),
            timestamp: SystemTime::now(),
        });

        self.index = self.snapshots.len() - 1;
    }

    /// Reposition the current index and return the snapshot to restore
    ///
    /// This does not record anything; restoring state is the caller's job.
    pub fn go_to(&mut self, index: usize) -> Result<&Snapshot> {
        if index >= self.snapshots.len() {
            return Err(self.invalid_index(index));
        }

        self.index = index;
        Ok(&self.snapshots[index])
    }

    pub fn get(&self, index: usize) -> Result<&Snapshot> {
        self.snapshots
            .get(index)
            .ok_or_else(|| self.invalid_index(index))
    }

    /// Number of recorded snapshots
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Index of the current snapshot
    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn message(&self, index: usize) -> Result<&str> {
        Ok(&self.get(index)?.message)
    }

    /// Independent copies of a snapshot's allocation records
    pub fn allocations(&self, index: usize) -> Result<Vec<Allocation>> {
        Ok(self.get(index)?.allocations.clone())
    }

    /// Byte-level diff between two snapshots
    ///
    /// Compares over the shorter of the two byte sequences and reports every
    /// position whose value differs, in ascending address order.
    pub fn diff(&self, a: usize, b: usize) -> Result<Vec<MemoryDiff>> {
        let bytes_a = &self.get(a)?.bytes;
        let bytes_b = &self.get(b)?.bytes;

        let diffs = bytes_a
            .iter()
            .zip(bytes_b)
            .enumerate()
            .filter(|(_, (old, new))| old.value() != new.value())
            .map(|(address, (old, new))| MemoryDiff {
                address,
                old_value: old.value(),
                new_value: new.value(),
            })
            .collect();

        Ok(diffs)
    }

    /// Discard all snapshots
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.index = 0;
    }

    fn invalid_index(&self, index: usize) -> MemoryError {
        MemoryError::InvalidSnapshotIndex {
            index,
            count: self.snapshots.len(),
        }
    }
}
