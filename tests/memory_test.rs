// Integration tests for the memory facade: allocation, access, and GC

use membox::memory::alloc::Region;
use membox::memory::value::{Byte, FixedString, Int32};
use membox::memory::Memory;
use membox::MemoryError;

// === HEAP ===

#[test]
fn test_heap_first_fit_picks_earliest_gap() {
    let mut memory = Memory::with_layout(128, Some(100), false);

    assert_eq!(memory.allocate(10).unwrap(), 0);
    assert_eq!(memory.allocate(10).unwrap(), 10);
    assert_eq!(memory.allocate(10).unwrap(), 20);
    memory.free(10).unwrap();

    // Heap records now sit at [0,10) and [20,30); the first sufficient gap
    // starts at 10, not after the last record
    assert_eq!(memory.allocate(8).unwrap(), 10);
}

#[test]
fn test_heap_capacity_failures() {
    let mut memory = Memory::new(64); // heap region is [0, 32)

    assert_eq!(
        memory.allocate(0),
        Err(MemoryError::CapacityExceeded {
            requested: 0,
            region: Region::Heap,
        })
    );
    assert_eq!(
        memory.allocate(33),
        Err(MemoryError::CapacityExceeded {
            requested: 33,
            region: Region::Heap,
        })
    );

    // Fill the heap, then ask for one more byte
    memory.allocate(32).unwrap();
    assert!(memory.allocate(1).is_err());

    // Capacity failures never commit partial state
    assert_eq!(memory.heap_allocations().len(), 1);
}

#[test]
fn test_free_requires_existing_heap_address() {
    let mut memory = Memory::new(64);
    let frame = memory.allocate_stack(4).unwrap();

    assert_eq!(
        memory.free(7),
        Err(MemoryError::InvalidAddress { address: 7 })
    );
    assert_eq!(
        memory.free(frame),
        Err(MemoryError::RegionMismatch {
            address: frame,
            expected: Region::Heap,
        })
    );
}

// === STACK ===

#[test]
fn test_stack_grows_down_and_overflows() {
    let mut memory = Memory::with_layout(20, Some(10), false);

    // sp starts at 19, so a 4-byte frame lands at 16, the next at 12
    assert_eq!(memory.allocate_stack(4).unwrap(), 16);
    assert_eq!(memory.allocate_stack(4).unwrap(), 12);

    // Candidate 11 - 5 + 1 = 7 would cross into the heap region
    assert_eq!(
        memory.allocate_stack(5),
        Err(MemoryError::CapacityExceeded {
            requested: 5,
            region: Region::Stack,
        })
    );
}

#[test]
fn test_free_stack_restores_pointer_for_topmost_frame_only() {
    let mut memory = Memory::with_layout(20, Some(10), false);

    let first = memory.allocate_stack(4).unwrap();
    let second = memory.allocate_stack(4).unwrap();
    assert_eq!(memory.stack_boundary(), second);

    // Non-topmost release leaves a hole and the boundary unchanged
    memory.free_stack(first).unwrap();
    assert_eq!(memory.stack_boundary(), second);
    assert_eq!(memory.stack_allocations().len(), 1);

    // Topmost release moves the boundary back up past the frame
    memory.free_stack(second).unwrap();
    assert_eq!(memory.stack_boundary(), second + 4);
}

// === GC ===

#[test]
fn test_ref_counting_lifecycle() {
    let mut memory = Memory::with_layout(64, None, true);

    let address = memory.allocate(4).unwrap();
    assert_eq!(memory.heap_allocations()[0].ref_count, 1);

    // One reference, one free: collected
    memory.free(address).unwrap();
    assert!(memory.heap_allocations().is_empty());
    assert!(memory
        .current_snapshot_message()
        .contains(&format!("collected: {address}")));

    // The record is gone, so a second free is an invalid address
    assert_eq!(
        memory.free(address),
        Err(MemoryError::InvalidAddress { address })
    );
}

#[test]
fn test_add_ref_keeps_allocation_alive() {
    let mut memory = Memory::with_layout(64, None, true);

    let address = memory.allocate(4).unwrap();
    assert!(memory.add_ref(address));

    memory.free(address).unwrap();
    assert_eq!(memory.heap_allocations()[0].ref_count, 1);

    memory.free(address).unwrap();
    assert!(memory.heap_allocations().is_empty());
}

#[test]
fn test_add_ref_rejections() {
    let mut memory = Memory::new(64);
    let block = memory.allocate(4).unwrap();
    let frame = memory.allocate_stack(4).unwrap();

    // GC disabled
    assert!(!memory.add_ref(block));

    memory.set_gc_enabled(true);
    // Unknown address and stack frames are not ref-counted
    assert!(!memory.add_ref(50));
    assert!(!memory.add_ref(frame));
    assert!(memory.add_ref(block));
}

// === ACCESS ===

#[test]
fn test_bounds_checking_confines_access_to_allocations() {
    let mut memory = Memory::new(64);
    memory.allocate(4).unwrap(); // [0, 4)
    memory.set_bounds_checking(true);

    assert!(memory.write_byte(3, 0xAB).is_ok());
    // Address 4 is inside the address space but outside the allocation
    assert_eq!(
        memory.write_byte(4, 0xAB),
        Err(MemoryError::BoundsViolation { address: 4, end: 5 })
    );

    // Reads are held to the same policy
    assert!(memory.read_byte(3).is_ok());
    assert!(memory.read_byte(4).is_err());

    // A 4-byte access fits the allocation exactly; shifted by one it spans
    // the boundary
    assert!(memory.read_int32(0).is_ok());
    assert!(memory.read_int32(1).is_err());
}

#[test]
fn test_hard_limit_is_always_enforced() {
    let mut memory = Memory::new(16);

    assert_eq!(
        memory.write_byte(16, 1),
        Err(MemoryError::OutOfBounds {
            address: 16,
            end: 17,
            size: 16,
        })
    );
    assert!(memory.read_int32(13).is_err());
    assert!(memory.write_byte(15, 1).is_ok());
}

#[test]
fn test_write_pointer_tags_the_byte() {
    let mut memory = Memory::new(64);

    memory.write_byte(0, 42).unwrap();
    assert!(!memory.read_byte(0).unwrap().is_pointer());

    memory.write_pointer(1, 42).unwrap();
    let byte = memory.read_byte(1).unwrap();
    assert!(byte.is_pointer());
    assert_eq!(byte.value(), 42);
}

#[test]
fn test_typed_round_trips_through_memory() {
    let mut memory = Memory::new(64);

    memory.write_int32(0, Int32::new(-123456)).unwrap();
    assert_eq!(memory.read_int32(0).unwrap().value(), -123456);

    let name = FixedString::new("alice", 8);
    memory.write_string(8, &name).unwrap();
    let read = memory.read_string(8, 8).unwrap();
    assert_eq!(read.value(), "alice");
    assert_eq!(read.length(), 8);
}

#[test]
fn test_bulk_write_and_dump() {
    let mut memory = Memory::new(4);

    let data = [0xDE, 0xAD, 0xBE, 0xEF].map(Byte::new);
    memory.write_bytes(0, &data, None).unwrap();
    assert_eq!(memory.dump(), "de ad be ef");

    // Empty writes are silent no-ops with no snapshot
    let before = memory.snapshot_count();
    memory.write_bytes(0, &[], None).unwrap();
    assert_eq!(memory.snapshot_count(), before);
}

// === INTROSPECTION ===

#[test]
fn test_region_sizes() {
    let mut memory = Memory::with_layout(96, Some(80), false);

    assert_eq!(memory.size(), 96);
    assert_eq!(memory.heap_size(), 80);
    assert_eq!(memory.stack_size(), 16);
    assert_eq!(memory.used_heap_size(), 0);
    assert_eq!(memory.available_stack_size(), 16);

    memory.allocate(10).unwrap();
    memory.allocate_stack(4).unwrap();

    assert_eq!(memory.used_heap_size(), 10);
    assert_eq!(memory.available_heap_size(), 70);
    assert_eq!(memory.used_stack_size(), 4);
    assert_eq!(memory.available_stack_size(), 12);
}

#[test]
fn test_allocated_address_mask_tracks_active_snapshot() {
    let mut memory = Memory::new(8);
    memory.allocate(2).unwrap();

    let mask = memory.allocated_address_mask();
    assert_eq!(mask, [true, true, false, false, false, false, false, false]);

    // The mask reflects the snapshot the engine currently sits on
    memory.go_to_snapshot(0).unwrap();
    assert!(memory.allocated_address_mask().iter().all(|used| !used));
}

#[test]
fn test_allocation_lists_are_sorted() {
    let mut memory = Memory::with_layout(64, Some(48), false);

    memory.allocate(4).unwrap();
    memory.allocate(4).unwrap();
    memory.allocate_stack(4).unwrap();
    memory.free(0).unwrap();
    memory.allocate(2).unwrap();

    let heap = memory.sorted_heap_allocations();
    let addresses: Vec<usize> = heap.iter().map(|a| a.address).collect();
    assert_eq!(addresses, [0, 4]);

    let all = memory.allocations();
    assert!(all.windows(2).all(|w| w[0].address < w[1].address));
    assert_eq!(all.last().unwrap().region, Region::Stack);
}
