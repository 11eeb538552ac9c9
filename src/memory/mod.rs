//! Memory model for the sandbox
//!
//! This module provides the core memory abstractions:
//! - [`value`]: typed codecs ([`value::Byte`], [`value::Int32`],
//!   [`value::FixedString`])
//! - [`store`]: the fixed-length byte store covering the address space
//! - [`alloc`]: the dual stack/heap allocator with optional ref counting
//! - [`guard`]: access validation (hard limit + optional bounds checking)
//! - [`Memory`]: the facade composing all of the above
//!
//! # Layout
//!
//! A single address space of `size` bytes is split at `stack_start`: the heap
//! occupies `[0, stack_start)` and grows up, the stack occupies
//! `[stack_start, size)` and grows down from the top. Addresses are plain
//! integers; no richer pointer type is modeled.
//!
//! # History
//!
//! Every mutating facade operation appends a deep-copy snapshot to the
//! [`crate::snapshot::History`], so any prior state can be restored
//! byte-for-byte. Read operations never touch history.

pub mod alloc;
pub mod guard;
pub mod store;
pub mod value;

use crate::error::Result;
use crate::snapshot::{History, MemoryDiff};
use self::alloc::{Allocation, Allocator, FreeOutcome};
use self::store::ByteStore;
use self::value::{Address, Byte, FixedString, Int32, INT32_SIZE};

/// Default address space size in bytes
pub const MEMORY_SIZE: usize = 96;

/// Default first address of the stack region
pub const STACK_START_ADDRESS: usize = 80;

/// Format a value as uppercase hex with a `0x` prefix
pub fn format_hex(value: u64) -> String {
    format!("0x{:02X}", value)
}

/// Hex plus the decimal value, e.g. `0xFF (255)`
pub fn format_hex_display(value: u64) -> String {
    format!("{} ({})", format_hex(value), value)
}

/// Format a byte value as a `0b`-prefixed 8-bit binary string
pub fn format_binary(value: u8) -> String {
    format!("0b{:08b}", value)
}

/// Render the address range of a field at `base + offset`
///
/// Stack ranges run downward (`start - end` with `end < start`), heap ranges
/// upward. A single-byte field renders as a bare address.
pub fn address_range_display(base: Address, offset: usize, size: usize, is_stack: bool) -> String {
    let start = (base + offset) as isize;

    let end = if is_stack {
        start - size as isize + 1
    } else {
        start + size as isize - 1
    };

    if start == end {
        format!("{start}")
    } else {
        format!("{start} - {end}")
    }
}

/// The memory facade: byte store, allocator, bounds policy, and history
///
/// Mutating operations validate access, mutate the store and/or allocation
/// table, then record a snapshot describing the operation. On any error the
/// operation aborts before mutating, so no partial state is ever committed
/// or snapshotted.
#[derive(Debug)]
pub struct Memory {
    store: ByteStore,
    allocator: Allocator,
    bounds_checking: bool,
    history: History,
}

impl Memory {
    /// Create a memory of `size` bytes, split 50/50, with GC disabled
    pub fn new(size: usize) -> Self {
        Self::with_layout(size, None, false)
    }

    /// Create a memory with an explicit stack boundary and GC setting
    ///
    /// Always records the initial snapshot, so history is never empty.
    pub fn with_layout(size: usize, stack_start: Option<usize>, enable_gc: bool) -> Self {
        let stack_start = stack_start.unwrap_or(size / 2);

        let mut memory = Memory {
            store: ByteStore::new(size),
            allocator: Allocator::new(size, stack_start, enable_gc),
            bounds_checking: false,
            history: History::new(),
        };

        memory.record("Initial memory state");
        memory
    }

    // =======
    // Config
    // =======

    /// Toggle the reference-counting collector
    ///
    /// Policy only: existing records keep their counts and no snapshot is
    /// recorded.
    pub fn set_gc_enabled(&mut self, enabled: bool) {
        self.allocator.set_gc_enabled(enabled);
    }

    pub fn gc_enabled(&self) -> bool {
        self.allocator.gc_enabled()
    }

    /// Toggle bounds checking; policy only, no snapshot
    pub fn set_bounds_checking(&mut self, enabled: bool) {
        self.bounds_checking = enabled;
    }

    pub fn bounds_checking_enabled(&self) -> bool {
        self.bounds_checking
    }

    // =====
    // Heap
    // =====

    /// Allocate a heap block, first-fit
    pub fn allocate(&mut self, size: usize) -> Result<Address> {
        let address = self.allocator.allocate(size)?;
        self.record(format!("allocate({size}) -> address {address}"));
        Ok(address)
    }

    /// Release a heap block (or drop one reference when GC is enabled)
    pub fn free(&mut self, address: Address) -> Result<()> {
        let message = match self.allocator.free(address)? {
            FreeOutcome::Removed => format!("free({address}) - manual free"),
            FreeOutcome::Decremented { ref_count } => {
                format!("free({address}) (ref count: {ref_count})")
            }
            FreeOutcome::Collected(collected) => {
                let joined = collected
                    .iter()
                    .map(Address::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("free({address}) (collected: {joined})")
            }
        };

        self.record(message);
        Ok(())
    }

    /// Increment the reference count of a heap allocation
    ///
    /// Returns `false` (without snapshotting) when GC is disabled, the
    /// address is unknown, or the record belongs to the stack.
    pub fn add_ref(&mut self, address: Address) -> bool {
        match self.allocator.add_ref(address) {
            Some(ref_count) => {
                self.record(format!("add_ref({address}) -> {ref_count}"));
                true
            }
            None => false,
        }
    }

    // ======
    // Stack
    // ======

    /// Push a stack frame of `size` bytes
    pub fn allocate_stack(&mut self, size: usize) -> Result<Address> {
        let address = self.allocator.allocate_stack(size)?;
        self.record(format!("allocate_stack({size}) -> address {address}"));
        Ok(address)
    }

    /// Release a stack frame
    pub fn free_stack(&mut self, address: Address) -> Result<()> {
        self.allocator.free_stack(address)?;
        self.record(format!("free_stack({address})"));
        Ok(())
    }

    // ===========
    // Raw access
    // ===========

    /// Read the byte at an address
    pub fn read_byte(&self, address: Address) -> Result<Byte> {
        self.validate_access(address, 1)?;
        Ok(self.store.get(address))
    }

    /// Write a byte at an address
    pub fn write_byte(&mut self, address: Address, value: impl Into<Byte>) -> Result<()> {
        self.validate_access(address, 1)?;

        let byte = value.into();
        self.store.set(address, byte);
        self.record(format!("write_byte({address}, {})", byte.value()));
        Ok(())
    }

    /// Write a byte tagged as holding a pointer
    ///
    /// The target address is masked to 8 bits, like any other byte value.
    pub fn write_pointer(&mut self, address: Address, target: Address) -> Result<()> {
        self.validate_access(address, 1)?;

        self.store
            .set(address, Byte::pointer((target & 0xff) as u8));
        self.record(format!("write_pointer({address}, {target})"));
        Ok(())
    }

    /// Bulk-write a run of bytes
    ///
    /// An empty slice is a silent no-op: nothing is written and no snapshot
    /// is recorded.
    pub fn write_bytes(
        &mut self,
        address: Address,
        data: &[Byte],
        message: Option<&str>,
    ) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        self.validate_access(address, data.len())?;
        self.store.write(address, data);

        let message = match message {
            Some(message) => message.to_string(),
            None => format!("write_bytes({address}, len={})", data.len()),
        };
        self.record(message);
        Ok(())
    }

    // =============
    // Typed access
    // =============

    pub fn read_int32(&self, address: Address) -> Result<Int32> {
        self.validate_access(address, INT32_SIZE)?;
        Int32::from_bytes(self.store.slice(address, INT32_SIZE))
    }

    pub fn write_int32(&mut self, address: Address, value: Int32) -> Result<()> {
        self.validate_access(address, INT32_SIZE)?;

        let message = format!("write_int32({address}, {})", value.value());
        self.write_bytes(address, &value.to_bytes(), Some(&message))
    }

    pub fn read_string(&self, address: Address, length: usize) -> Result<FixedString> {
        self.validate_access(address, length)?;
        Ok(FixedString::from_bytes(self.store.slice(address, length)))
    }

    pub fn write_string(&mut self, address: Address, value: &FixedString) -> Result<()> {
        self.validate_access(address, value.length())?;

        let message = format!("write_string({address}, {:?})", value.value());
        self.write_bytes(address, &value.to_bytes(), Some(&message))
    }

    // =================
    // Whole-memory ops
    // =================

    /// Zero all bytes, drop all allocations, reset the stack pointer
    pub fn clear_memory(&mut self, message: Option<&str>) {
        self.store.zero();
        self.allocator.clear();
        self.record(message.unwrap_or("clear_memory()"));
    }

    /// Clear memory and discard all history, then record a fresh snapshot
    pub fn reset_memory(&mut self) {
        self.store.zero();
        self.allocator.clear();
        self.history.clear();
        self.record("Memory reset");
    }

    // ========
    // History
    // ========

    /// Restore the engine to a recorded snapshot
    ///
    /// Repositions the current index without recording a new snapshot.
    pub fn go_to_snapshot(&mut self, index: usize) -> Result<()> {
        let snapshot = self.history.go_to(index)?;

        self.store.restore(&snapshot.bytes);
        self.allocator
            .restore(&snapshot.allocations, snapshot.stack_pointer);
        Ok(())
    }

    /// Step one snapshot back, clamped at the first
    pub fn previous_snapshot(&mut self) -> Result<()> {
        let target = self.history.current_index().saturating_sub(1);
        self.go_to_snapshot(target)
    }

    /// Step one snapshot forward, clamped at the last
    pub fn next_snapshot(&mut self) -> Result<()> {
        let last = self.history.len().saturating_sub(1);
        let target = (self.history.current_index() + 1).min(last);
        self.go_to_snapshot(target)
    }

    pub fn snapshot_count(&self) -> usize {
        self.history.len()
    }

    /// Index of the snapshot the engine currently reflects
    pub fn current_snapshot(&self) -> usize {
        self.history.current_index()
    }

    pub fn snapshot_message(&self, index: usize) -> Result<&str> {
        self.history.message(index)
    }

    /// Message of the current snapshot
    pub fn current_snapshot_message(&self) -> &str {
        self.history
            .message(self.history.current_index())
            .unwrap_or("")
    }

    pub fn snapshot_allocations(&self, index: usize) -> Result<Vec<Allocation>> {
        self.history.allocations(index)
    }

    /// Byte-level diff between two snapshots, ascending by address
    pub fn diff_snapshots(&self, a: usize, b: usize) -> Result<Vec<MemoryDiff>> {
        self.history.diff(a, b)
    }

    // ==============
    // Introspection
    // ==============

    /// Total address space size
    pub fn size(&self) -> usize {
        self.store.len()
    }

    /// All allocation records, sorted by address
    pub fn allocations(&self) -> Vec<Allocation> {
        self.allocator.allocations()
    }

    pub fn heap_allocations(&self) -> Vec<Allocation> {
        self.allocator.heap_allocations()
    }

    pub fn stack_allocations(&self) -> Vec<Allocation> {
        self.allocator.stack_allocations()
    }

    /// Heap records in ascending address order
    pub fn sorted_heap_allocations(&self) -> Vec<Allocation> {
        self.allocator.sorted_heap_allocations()
    }

    /// Heap region length
    pub fn heap_size(&self) -> usize {
        self.allocator.stack_start()
    }

    /// Stack region length
    pub fn stack_size(&self) -> usize {
        self.size() - self.allocator.stack_start()
    }

    pub fn used_heap_size(&self) -> usize {
        self.allocator.used_heap_size()
    }

    pub fn available_heap_size(&self) -> usize {
        self.heap_size() - self.used_heap_size()
    }

    /// First address of the live stack (`stack_pointer + 1`)
    pub fn stack_boundary(&self) -> Address {
        self.allocator.stack_boundary()
    }

    /// Bytes between the stack boundary and the top of memory
    pub fn used_stack_size(&self) -> usize {
        self.size() - self.stack_boundary()
    }

    /// Free bytes between the region start and the stack pointer
    pub fn available_stack_size(&self) -> usize {
        let free =
            self.allocator.stack_pointer() - self.allocator.stack_start() as isize + 1;
        free.max(0) as usize
    }

    /// Boolean mask of allocated addresses for the active snapshot
    pub fn allocated_address_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.size()];

        if let Ok(snapshot) = self.history.get(self.history.current_index()) {
            for allocation in &snapshot.allocations {
                let start = allocation.address.min(mask.len());
                let end = (allocation.address + allocation.size).min(mask.len());
                mask[start..end].fill(true);
            }
        }

        mask
    }

    /// Flat hex dump of all byte values
    pub fn dump(&self) -> String {
        self.store.dump()
    }

    // ==========
    // Internals
    // ==========

    /// Two-tier access validation (see [`guard`])
    fn validate_access(&self, address: Address, length: usize) -> Result<()> {
        guard::check_access(address, length, self.store.len())?;

        if self.bounds_checking {
            guard::check_containment(address, length, self.allocator.iter())?;
        }

        Ok(())
    }

    /// Deep-copy the current state into history
    fn record(&mut self, message: impl Into<String>) {
        self.history.record(
            message,
            self.store.bytes().to_vec(),
            self.allocator.allocations(),
            self.allocator.stack_pointer(),
        );
    }
}

impl Default for Memory {
    /// The classroom default: 96 bytes with the stack starting at 80
    fn default() -> Self {
        Self::with_layout(MEMORY_SIZE, Some(STACK_START_ADDRESS), false)
    }
}
