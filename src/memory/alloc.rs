//! Dual stack/heap allocator with optional reference counting
//!
//! This module tracks allocation records over the byte store's address space:
//! - Heap allocations grow up from address 0 using first-fit placement
//! - Stack allocations grow down from the top, driven by the stack pointer
//! - An optional reference-counting collector sweeps heap records whose
//!   count reaches zero
//!
//! The allocator never touches byte contents. It only maintains the record
//! table and the stack pointer; the facade keeps the two consistent.
//!
//! # Regions
//!
//! The address space is split at `stack_start`: heap records lie in
//! `[0, stack_start)`, stack records in `[stack_start, size)`. Records in the
//! same table never overlap.

use super::value::Address;
use crate::error::{MemoryError, Result};
use rustc_hash::FxHashMap;
use std::fmt;
use tracing::warn;

/// The region an allocation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Heap,
    Stack,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Heap => write!(f, "heap"),
            Region::Stack => write!(f, "stack"),
        }
    }
}

/// A single allocation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub address: Address,
    pub size: usize,
    pub ref_count: i32,
    pub region: Region,
}

impl Allocation {
    /// Whether this allocation fully contains `[address, address + length)`
    pub fn contains(&self, address: Address, length: usize) -> bool {
        address >= self.address && address + length <= self.address + self.size
    }
}

/// Outcome of a heap free, used by the facade to describe the snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreeOutcome {
    /// GC disabled: the record was removed immediately
    Removed,
    /// GC enabled: the count was decremented but the record survived
    Decremented { ref_count: i32 },
    /// GC enabled: the sweep collected these addresses (ascending)
    Collected(Vec<Address>),
}

/// Allocation table plus stack pointer over a fixed address space
#[derive(Debug)]
pub struct Allocator {
    table: FxHashMap<Address, Allocation>,
    memory_size: usize,
    stack_start: Address,
    // Highest free stack slot; stack_start - 1 when the stack is full,
    // memory_size - 1 when it is empty. Signed because a full stack at
    // stack_start == 0 drives it to -1.
    stack_pointer: isize,
    gc_enabled: bool,
}

impl Allocator {
    pub fn new(memory_size: usize, stack_start: Address, gc_enabled: bool) -> Self {
        Allocator {
            table: FxHashMap::default(),
            memory_size,
            stack_start,
            stack_pointer: memory_size as isize - 1,
            gc_enabled,
        }
    }

    // =======
    // Config
    // =======

    pub fn set_gc_enabled(&mut self, enabled: bool) {
        self.gc_enabled = enabled;
    }

    pub fn gc_enabled(&self) -> bool {
        self.gc_enabled
    }

    // =====
    // Heap
    // =====

    /// Allocate a heap block using first-fit placement
    ///
    /// Fails with [`MemoryError::CapacityExceeded`] if the size is zero,
    /// exceeds the heap region, or no sufficiently large gap exists.
    pub fn allocate(&mut self, size: usize) -> Result<Address> {
        let address = self.find_free_heap_block(size).ok_or_else(|| {
            warn!(requested = size, "heap out of memory");
            MemoryError::CapacityExceeded {
                requested: size,
                region: Region::Heap,
            }
        })?;

        self.table.insert(
            address,
            Allocation {
                address,
                size,
                ref_count: if self.gc_enabled { 1 } else { 0 },
                region: Region::Heap,
            },
        );

        Ok(address)
    }

    /// Release a heap allocation
    ///
    /// With GC disabled the record is removed immediately. With GC enabled
    /// the reference count is decremented and a sweep runs.
    pub fn free(&mut self, address: Address) -> Result<FreeOutcome> {
        self.expect_allocation(address, Region::Heap)?;

        if self.gc_enabled {
            // expect_allocation just confirmed the entry exists
            let ref_count = match self.table.get_mut(&address) {
                Some(allocation) => {
                    allocation.ref_count -= 1;
                    allocation.ref_count
                }
                None => return Err(MemoryError::InvalidAddress { address }),
            };

            let collected = self.sweep();

            if collected.is_empty() {
                Ok(FreeOutcome::Decremented { ref_count })
            } else {
                Ok(FreeOutcome::Collected(collected))
            }
        } else {
            self.table.remove(&address);
            Ok(FreeOutcome::Removed)
        }
    }

    /// First-fit search over heap records sorted by address
    ///
    /// Candidates in order: address 0 (empty heap, or a gap before the first
    /// record), each gap between consecutive records, then the tail gap
    /// before `stack_start`.
    fn find_free_heap_block(&self, size: usize) -> Option<Address> {
        let heap_limit = self.stack_start;

        if size == 0 || size > heap_limit {
            return None;
        }

        let sorted = self.sorted_heap_allocations();

        if sorted.is_empty() {
            return Some(0);
        }

        // Gap at the very start
        if sorted[0].address >= size {
            return Some(0);
        }

        // Gaps between consecutive allocations
        for pair in sorted.windows(2) {
            let current_end = pair[0].address + pair[0].size;
            let next_start = pair[1].address;

            if next_start - current_end >= size {
                return Some(current_end);
            }
        }

        // Space after the last allocation
        let last = &sorted[sorted.len() - 1];
        let last_end = last.address + last.size;

        if heap_limit - last_end >= size {
            return Some(last_end);
        }

        None
    }

    // ======
    // Stack
    // ======

    /// Allocate a stack frame below the current stack pointer
    ///
    /// The new frame's address is `stack_pointer - size + 1`; on success the
    /// stack pointer drops to just below the frame.
    pub fn allocate_stack(&mut self, size: usize) -> Result<Address> {
        let candidate = self.stack_pointer - size as isize + 1;

        if size == 0 || candidate < self.stack_start as isize {
            warn!(requested = size, "stack overflow");
            return Err(MemoryError::CapacityExceeded {
                requested: size,
                region: Region::Stack,
            });
        }

        let address = candidate as Address;
        self.stack_pointer = candidate - 1;

        self.table.insert(
            address,
            Allocation {
                address,
                size,
                ref_count: if self.gc_enabled { 1 } else { 0 },
                region: Region::Stack,
            },
        );

        Ok(address)
    }

    /// Release a stack frame
    ///
    /// Releasing the topmost frame restores the stack pointer above it.
    /// Releasing a non-topmost frame removes the record but leaves the
    /// pointer untouched: a logical hole, mirroring manual frame teardown.
    pub fn free_stack(&mut self, address: Address) -> Result<()> {
        let allocation = self.expect_allocation(address, Region::Stack)?;
        let size = allocation.size;

        if address as isize == self.stack_pointer + 1 {
            self.stack_pointer = (address + size) as isize - 1;
        }

        self.table.remove(&address);
        Ok(())
    }

    /// Current stack pointer (highest free slot)
    pub fn stack_pointer(&self) -> isize {
        self.stack_pointer
    }

    /// First address of the live stack: `stack_pointer + 1`
    pub fn stack_boundary(&self) -> Address {
        (self.stack_pointer + 1) as Address
    }

    /// First address of the stack region
    pub fn stack_start(&self) -> Address {
        self.stack_start
    }

    // ===
    // GC
    // ===

    /// Increment the reference count of a heap allocation
    ///
    /// Returns the new count, or `None` when GC is disabled, no allocation
    /// starts at the address, or the record belongs to the stack.
    pub fn add_ref(&mut self, address: Address) -> Option<i32> {
        if !self.gc_enabled {
            return None;
        }

        let allocation = self.table.get_mut(&address)?;

        if allocation.region == Region::Stack {
            return None;
        }

        allocation.ref_count += 1;
        Some(allocation.ref_count)
    }

    /// Remove every heap record whose count reached zero
    ///
    /// Stack frames are never sweep-eligible; their counts are never
    /// decremented, so scanning them would only mask region bugs.
    fn sweep(&mut self) -> Vec<Address> {
        let mut collected: Vec<Address> = self
            .table
            .values()
            .filter(|a| a.region == Region::Heap && a.ref_count <= 0)
            .map(|a| a.address)
            .collect();
        collected.sort_unstable();

        for address in &collected {
            self.table.remove(address);
        }

        collected
    }

    // ========
    // Queries
    // ========

    /// Look up the allocation record starting at an address
    pub fn get(&self, address: Address) -> Option<&Allocation> {
        self.table.get(&address)
    }

    /// Iterate all live allocation records (unordered)
    pub fn iter(&self) -> impl Iterator<Item = &Allocation> {
        self.table.values()
    }

    /// All allocation records, sorted by address for stable output
    pub fn allocations(&self) -> Vec<Allocation> {
        let mut all: Vec<Allocation> = self.table.values().cloned().collect();
        all.sort_unstable_by_key(|a| a.address);
        all
    }

    pub fn heap_allocations(&self) -> Vec<Allocation> {
        self.region_allocations(Region::Heap)
    }

    pub fn stack_allocations(&self) -> Vec<Allocation> {
        self.region_allocations(Region::Stack)
    }

    /// Heap records in ascending address order (the first-fit scan order)
    pub fn sorted_heap_allocations(&self) -> Vec<Allocation> {
        self.heap_allocations()
    }

    fn region_allocations(&self, region: Region) -> Vec<Allocation> {
        let mut subset: Vec<Allocation> = self
            .table
            .values()
            .filter(|a| a.region == region)
            .cloned()
            .collect();
        subset.sort_unstable_by_key(|a| a.address);
        subset
    }

    /// Total bytes held by heap records
    pub fn used_heap_size(&self) -> usize {
        self.table
            .values()
            .filter(|a| a.region == Region::Heap)
            .map(|a| a.size)
            .sum()
    }

    // ============
    // Maintenance
    // ============

    /// Drop every record and reset the stack pointer
    pub fn clear(&mut self) {
        self.table.clear();
        self.stack_pointer = self.memory_size as isize - 1;
    }

    /// Rebuild the table and stack pointer from a snapshot
    pub fn restore(&mut self, allocations: &[Allocation], stack_pointer: isize) {
        self.table = allocations
            .iter()
            .map(|a| (a.address, a.clone()))
            .collect();
        self.stack_pointer = stack_pointer;
    }

    /// Fetch a record, validating existence and region
    fn expect_allocation(&self, address: Address, expected: Region) -> Result<&Allocation> {
        let allocation = self
            .table
            .get(&address)
            .ok_or(MemoryError::InvalidAddress { address })?;

        if allocation.region != expected {
            return Err(MemoryError::RegionMismatch { address, expected });
        }

        Ok(allocation)
    }
}
